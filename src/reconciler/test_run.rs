use super::{admission, Context};
use crate::{
    crds::{TestRun, TestRunStatus, TestState},
    date_time::DateTime,
    error::{Error, Result},
    resources::{configmap, pod},
};
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, Patch, PatchParams, PostParams},
    runtime::controller::Action,
    ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Delay before re-checking admission when the ceiling is reached
const ADMISSION_RETRY: Duration = Duration::from_secs(30);

/// Delay between runner pod phase checks
const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[instrument(skip(ctx, run), fields(run_name = %run.name_any()))]
pub async fn reconcile(run: Arc<TestRun>, ctx: Arc<Context>) -> Result<Action> {
    ctx.metrics.record_reconcile();

    let state = run
        .status
        .as_ref()
        .and_then(|s| s.state)
        .unwrap_or(TestState::Pending);

    match state {
        TestState::Pending => reconcile_pending(run, ctx).await,
        TestState::Running => reconcile_running(run, ctx).await,
        // terminal, nothing left to drive
        TestState::Passed | TestState::Failed | TestState::Error => Ok(Action::await_change()),
    }
}

/// Pending: admit under the concurrency ceiling, materialize the script,
/// launch the runner pod, record the Running transition.
async fn reconcile_pending(run: Arc<TestRun>, ctx: Arc<Context>) -> Result<Action> {
    let name = run.name_any();
    info!("Reconciling Pending TestRun {}", name);

    if !admission::admit(&ctx).await? {
        info!(
            "Concurrency limit reached (ceiling {}), deferring {}",
            admission::MAX_CONCURRENT_RUNNERS,
            name
        );
        ctx.metrics.record_deferral();
        return Ok(Action::requeue(ADMISSION_RETRY));
    }

    let namespace = run.namespace().unwrap_or_default();

    if !run.spec.script.is_empty() {
        configmap::create(&run, &namespace, &ctx).await?;
    }

    let desired = pod::build_runner_pod(&run, &ctx.config);
    let pod_name = desired.name_any();
    let pods: Api<Pod> = Api::namespaced(ctx.client.clone(), &namespace);
    match pods.create(&PostParams::default(), &desired).await {
        Ok(_) => info!("Created runner pod {}", pod_name),
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            return Err(Error::Conflict {
                kind: "Pod",
                name: pod_name,
            })
        }
        Err(kube::Error::Api(ae)) => {
            return Err(Error::Apply {
                kind: "Pod",
                name: pod_name,
                reason: ae.message,
            })
        }
        Err(e) => return Err(e.into()),
    }

    ctx.metrics.record_admission();
    update_status(&run, &ctx, |status| {
        status.state = Some(TestState::Running);
        status.runner_pod = Some(pod_name);
        status.start_time = Some(DateTime::now());
    })
    .await?;

    Ok(Action::await_change())
}

/// Running: propagate the runner pod's terminal phase, or keep polling
async fn reconcile_running(run: Arc<TestRun>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = run.namespace().unwrap_or_default();
    let pod_name = run
        .status
        .as_ref()
        .and_then(|s| s.runner_pod.clone())
        .unwrap_or_default();

    let pods: Api<Pod> = Api::namespaced(ctx.client.clone(), &namespace);
    let runner = match pods.get(&pod_name).await {
        Ok(p) => p,
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            // a vanished runner cannot self-heal: runnerPod is immutable
            update_status(&run, &ctx, |status| {
                status.state = Some(TestState::Error);
                status.result = Some("Runner Pod not found".to_string());
                status.completion_time = Some(DateTime::now());
            })
            .await?;
            return Err(Error::RunnerPodMissing { name: pod_name });
        }
        Err(e) => return Err(e.into()),
    };

    match runner.status.as_ref().and_then(|s| s.phase.as_deref()) {
        Some("Succeeded") => {
            info!("Runner pod {} succeeded", pod_name);
            update_status(&run, &ctx, |status| {
                status.state = Some(TestState::Passed);
                status.result = Some("Success".to_string());
                status.completion_time = Some(DateTime::now());
            })
            .await?;
            Ok(Action::await_change())
        }
        Some("Failed") => {
            info!("Runner pod {} failed", pod_name);
            update_status(&run, &ctx, |status| {
                status.state = Some(TestState::Failed);
                status.result = Some("Runner Pod Failed".to_string());
                status.completion_time = Some(DateTime::now());
            })
            .await?;
            Ok(Action::await_change())
        }
        _ => Ok(Action::requeue(POLL_INTERVAL)),
    }
}

/// Patch the status subresource. A TestRun deleted mid-cycle is treated as a
/// completed reconcile rather than an error.
pub async fn update_status<F>(run: &TestRun, ctx: &Context, mutate: F) -> Result<()>
where
    F: FnOnce(&mut TestRunStatus),
{
    let namespace = run.namespace().unwrap_or_default();
    let api: Api<TestRun> = Api::namespaced(ctx.client.clone(), &namespace);

    let mut status = run.status.clone().unwrap_or_default();
    mutate(&mut status);

    let patch = serde_json::json!({
        "status": status
    });

    match api
        .patch_status(&run.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await
    {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}
