use crate::{config::ControllerConfig, error::Error, telemetry::Metrics};
use kube::{client::Client, runtime::controller::Action};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

pub mod admission;
pub mod app;
pub mod test_run;

#[derive(Clone)]
pub struct Context {
    pub client: Client,
    pub config: Arc<ControllerConfig>,
    pub metrics: Arc<Metrics>,
}

/// Error handling for reconciliation, shared by both controllers
pub fn error_policy<K>(_obj: Arc<K>, error: &Error, ctx: Arc<Context>) -> Action {
    error!("Reconciliation error: {:?}", error);
    ctx.metrics.record_error();

    if error.is_retryable() {
        Action::requeue(Duration::from_secs(10))
    } else {
        Action::requeue(Duration::from_secs(300))
    }
}
