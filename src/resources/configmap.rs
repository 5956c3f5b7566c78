use crate::{
    crds::TestRun,
    error::{Error, Result},
    reconciler::Context,
    resources::labels,
    utils,
};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    api::{Api, PostParams},
    Resource, ResourceExt,
};
use std::collections::BTreeMap;
use tracing::info;

/// File name the inline script is exposed under inside the runner pod
pub const SCRIPT_FILE: &str = "test.lua";

/// ConfigMap carrying a run's inline script
pub fn build_script_configmap(run: &TestRun) -> ConfigMap {
    let mut data = BTreeMap::new();
    data.insert(SCRIPT_FILE.to_string(), run.spec.script.clone());

    ConfigMap {
        metadata: kube::api::ObjectMeta {
            name: Some(utils::script_configmap_name(&run.name_any())),
            namespace: run.metadata.namespace.clone(),
            labels: Some(labels::runner_labels(run)),
            owner_references: Some(vec![run.controller_owner_ref(&()).unwrap()]),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Create the script ConfigMap. Its content is fully determined by the run's
/// spec, so an already-existing map from a partially applied earlier attempt
/// counts as success.
pub async fn create(run: &TestRun, namespace: &str, ctx: &Context) -> Result<()> {
    let api: Api<ConfigMap> = Api::namespaced(ctx.client.clone(), namespace);
    let cm = build_script_configmap(run);
    let name = cm.name_any();

    match api.create(&PostParams::default(), &cm).await {
        Ok(_) => {
            info!("Created script ConfigMap {}", name);
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            info!("Script ConfigMap {} already exists", name);
            Ok(())
        }
        Err(kube::Error::Api(ae)) => Err(Error::Apply {
            kind: "ConfigMap",
            name,
            reason: ae.message,
        }),
        Err(e) => Err(e.into()),
    }
}
