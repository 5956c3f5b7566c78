use crate::{error::Result, reconciler::Context, resources::labels};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};

/// Cluster-wide ceiling on concurrently non-terminal runner pods. Advisory:
/// concurrent admissions of different runs can overshoot by a small margin.
pub const MAX_CONCURRENT_RUNNERS: usize = 5;

/// Count runner pods that still occupy an admission slot
pub fn active_count(pods: &[Pod]) -> usize {
    pods.iter()
        .filter(|p| {
            matches!(
                p.status.as_ref().and_then(|s| s.phase.as_deref()),
                Some("Running") | Some("Pending")
            )
        })
        .count()
}

/// Re-evaluated from a fresh cluster-wide list every cycle; no state is
/// retained between calls.
pub async fn admit(ctx: &Context) -> Result<bool> {
    let pods: Api<Pod> = Api::all(ctx.client.clone());
    let lp = ListParams::default().labels(&labels::runner_selector());
    let list = pods.list(&lp).await?;
    Ok(active_count(&list.items) < MAX_CONCURRENT_RUNNERS)
}
