use crate::error::{Error, Result};
use kube::{
    api::{Api, PostParams},
    Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, info};

/// What a converge call did to the cluster
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

/// Create the desired resource, or overwrite the fields this operator
/// controls on the existing one. `overwrite` receives the fetched resource
/// and the desired one and must only touch controlled fields; everything the
/// API server assigned (cluster IPs, resource versions) is left as fetched.
///
/// Reports `Unchanged` without writing when the overwrite is a no-op, which
/// makes a repeated reconcile of an unchanged spec free of mutations.
pub async fn converge<K, F>(
    api: &Api<K>,
    kind: &'static str,
    desired: &K,
    overwrite: F,
) -> Result<Outcome>
where
    K: Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned,
    F: FnOnce(&mut K, &K),
{
    let name = desired.name_any();

    match api.get(&name).await {
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            match api.create(&PostParams::default(), desired).await {
                Ok(_) => {
                    info!("Created {} {}", kind, name);
                    Ok(Outcome::Created)
                }
                Err(kube::Error::Api(ae)) if ae.code == 409 => Err(Error::Conflict { kind, name }),
                Err(kube::Error::Api(ae)) => Err(Error::Apply {
                    kind,
                    name,
                    reason: ae.message,
                }),
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
        Ok(mut existing) => {
            let before = serde_json::to_value(&existing)?;
            overwrite(&mut existing, desired);
            if serde_json::to_value(&existing)? == before {
                debug!("{} {} unchanged", kind, name);
                return Ok(Outcome::Unchanged);
            }

            match api.replace(&name, &PostParams::default(), &existing).await {
                Ok(_) => {
                    info!("Updated {} {}", kind, name);
                    Ok(Outcome::Updated)
                }
                Err(kube::Error::Api(ae)) if ae.code == 409 => Err(Error::Conflict { kind, name }),
                Err(kube::Error::Api(ae)) => Err(Error::Apply {
                    kind,
                    name,
                    reason: ae.message,
                }),
                Err(e) => Err(e.into()),
            }
        }
    }
}
