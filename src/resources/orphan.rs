use crate::{
    crds::App,
    error::Result,
    reconciler::Context,
    resources::labels,
};
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use kube::{
    api::{Api, DeleteParams, ListParams},
    ResourceExt,
};
use std::collections::BTreeSet;
use tracing::info;

/// Names in `listed` that the current spec no longer declares
pub fn orphaned_names(listed: impl IntoIterator<Item = String>, managed: &BTreeSet<String>) -> Vec<String> {
    listed
        .into_iter()
        .filter(|name| !managed.contains(name))
        .collect()
}

/// Delete every group-labeled Deployment whose name is absent from the
/// managed set, along with its paired Service. Resources that are already
/// gone count as deleted.
pub async fn collect(app: &App, managed: &BTreeSet<String>, ctx: &Context) -> Result<()> {
    let namespace = app.namespace().unwrap_or_default();
    let deployments: Api<Deployment> = Api::namespaced(ctx.client.clone(), &namespace);
    let services: Api<Service> = Api::namespaced(ctx.client.clone(), &namespace);

    let lp = ListParams::default().labels(&labels::group_selector(&app.name_any()));
    let listed = deployments.list(&lp).await?;

    for name in orphaned_names(listed.items.into_iter().map(|d| d.name_any()), managed) {
        info!("Deleting orphaned Deployment {}", name);
        delete_ignoring_absent(&deployments, &name).await?;
        delete_ignoring_absent(&services, &name).await?;
        ctx.metrics.record_orphan_deleted();
    }

    Ok(())
}

async fn delete_ignoring_absent<K>(api: &Api<K>, name: &str) -> Result<()>
where
    K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}
