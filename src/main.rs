use futures::StreamExt;
use k8s_openapi::api::{
    apps::v1::Deployment,
    batch::v1::Job,
    core::v1::{ConfigMap, Pod, Service},
};
use kube::{
    runtime::{controller::Controller, watcher::Config as WatcherConfig},
    Api, Client,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};
use topas_operator::{
    config::ControllerConfig,
    crds::{App, TestRun},
    reconciler::{self, Context},
    telemetry::{self, Metrics},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();
    let metrics = Arc::new(Metrics::default());

    info!("Starting Topas Operator");
    let config = Arc::new(ControllerConfig::from_env()?);
    info!("Configuration loaded");
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let ctx = Arc::new(Context {
        client: client.clone(),
        config,
        metrics,
    });

    let apps = Api::<App>::all(client.clone());
    let runs = Api::<TestRun>::all(client.clone());

    // owned resources. changes to these trigger reconciliation of the parent
    let deployments = Api::<Deployment>::all(client.to_owned());
    let services = Api::<Service>::all(client.to_owned());
    let jobs = Api::<Job>::all(client.to_owned());
    let pods = Api::<Pod>::all(client.to_owned());
    let config_maps = Api::<ConfigMap>::all(client.to_owned());

    let (mut reload_tx, reload_rx) = futures::channel::mpsc::channel(0);
    let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel::<()>();
    let handle = std::thread::spawn(move || {
        let interval = Duration::from_secs(60 * 30);
        while let Err(std::sync::mpsc::RecvTimeoutError::Timeout) =
            shutdown_rx.recv_timeout(interval)
        {
            let _ = reload_tx.try_send(());
        }
    });

    info!("Starting controller loops");
    let app_controller = Controller::new(apps, WatcherConfig::default())
        .owns(deployments, WatcherConfig::default())
        .owns(services, WatcherConfig::default())
        .owns(jobs, WatcherConfig::default())
        .reconcile_all_on(reload_rx.map(|_| ()))
        .shutdown_on_signal()
        .run(reconciler::app::reconcile, reconciler::error_policy, ctx.clone())
        .for_each(|res| async move {
            match res {
                Ok(o) => debug!("Reconciled App: {:?}", o),
                // if the object cannot be found it was likely deleted. we can ignore this.
                Err(kube::runtime::controller::Error::ObjectNotFound(_)) => {}
                Err(e) => tracing::warn!("App reconciliation error: {:?}", e),
            }
        });

    let run_controller = Controller::new(runs, WatcherConfig::default())
        .owns(pods, WatcherConfig::default())
        .owns(config_maps, WatcherConfig::default())
        .shutdown_on_signal()
        .run(
            reconciler::test_run::reconcile,
            reconciler::error_policy,
            ctx.clone(),
        )
        .for_each(|res| async move {
            match res {
                Ok(o) => debug!("Reconciled TestRun: {:?}", o),
                Err(kube::runtime::controller::Error::ObjectNotFound(_)) => {}
                Err(e) => tracing::warn!("TestRun reconciliation error: {:?}", e),
            }
        });

    tokio::join!(app_controller, run_controller);

    let _ = shutdown_tx.send(());
    let _ = handle.join();

    Ok(())
}
