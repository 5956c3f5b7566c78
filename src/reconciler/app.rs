use super::Context;
use crate::{
    crds::{App, AppStatus, Condition, ConditionStatus, DatabaseMember, Health, ServiceMember},
    date_time::DateTime,
    error::Result,
    resources::{deployment, job, orphan, service},
    utils,
};
use kube::{
    api::{Api, Patch, PatchParams},
    runtime::controller::Action,
    ResourceExt,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};

#[instrument(skip(ctx, app), fields(app_name = %app.name_any()))]
pub async fn reconcile(app: Arc<App>, ctx: Arc<Context>) -> Result<Action> {
    let name = app.name_any();
    let namespace = app.namespace().unwrap_or_default();

    info!(
        "Reconciling App {} ({} services, {} databases)",
        name,
        app.spec.services.len(),
        app.spec.databases.len()
    );
    ctx.metrics.record_reconcile();

    let mut managed = BTreeSet::new();

    // Databases first: services may assume database network identity exists
    for db in &app.spec.databases {
        let resource = utils::member_resource_name(&name, &db.name);
        managed.insert(resource.clone());
        reconcile_database(&app, db, &resource, &namespace, &ctx).await?;
    }

    for svc in &app.spec.services {
        let resource = utils::member_resource_name(&name, &svc.name);
        managed.insert(resource.clone());
        reconcile_service_member(&app, svc, &resource, &namespace, &ctx).await?;
    }

    // Members removed from the spec leave orphaned resources behind
    orphan::collect(&app, &managed, &ctx).await?;

    let endpoint_count = (app.spec.services.len() + app.spec.databases.len()) as i32;
    update_status(&app, &ctx, |status| {
        status.endpoint_count = Some(endpoint_count);
        status.health = Some(Health::Healthy);
        status.last_checked = Some(DateTime::now());
        upsert_condition(
            &mut status.conditions,
            Condition {
                r#type: "Reconciled".to_string(),
                status: ConditionStatus::True,
                last_transition_time: Some(DateTime::now()),
                reason: Some("ConvergeSucceeded".to_string()),
                message: Some("All declared members converged".to_string()),
            },
        );
    })
    .await?;

    info!("App {} reconciled successfully", name);
    Ok(Action::await_change())
}

async fn reconcile_database(
    app: &App,
    db: &DatabaseMember,
    resource: &str,
    namespace: &str,
    ctx: &Context,
) -> Result<()> {
    let desired = deployment::build_database_deployment(app, db, resource);
    deployment::reconcile(&desired, namespace, ctx).await?;

    let endpoint = service::build_database_endpoint(app, db, resource);
    service::reconcile(&endpoint, namespace, ctx).await?;

    if !db.init_sql.is_empty() {
        job::ensure(app, db, resource, namespace, ctx).await?;
    }

    Ok(())
}

async fn reconcile_service_member(
    app: &App,
    member: &ServiceMember,
    resource: &str,
    namespace: &str,
    ctx: &Context,
) -> Result<()> {
    let desired = deployment::build_service_deployment(app, member, resource);
    deployment::reconcile(&desired, namespace, ctx).await?;

    let endpoint = service::build_service_endpoint(app, member, resource);
    service::reconcile(&endpoint, namespace, ctx).await?;

    Ok(())
}

fn upsert_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        *existing = condition;
    } else {
        conditions.push(condition);
    }
}

/// Patch the status subresource. An App deleted mid-cycle is treated as a
/// completed reconcile rather than an error.
pub async fn update_status<F>(app: &App, ctx: &Context, mutate: F) -> Result<()>
where
    F: FnOnce(&mut AppStatus),
{
    let namespace = app.namespace().unwrap_or_default();
    let api: Api<App> = Api::namespaced(ctx.client.clone(), &namespace);

    let mut status = app.status.clone().unwrap_or_default();
    mutate(&mut status);

    let patch = serde_json::json!({
        "status": status
    });

    match api
        .patch_status(&app.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await
    {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}
