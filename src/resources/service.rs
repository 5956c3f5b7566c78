use crate::{
    crds::{App, DatabaseMember, ServiceMember},
    error::Result,
    reconciler::Context,
    resources::{
        apply::{self, Outcome},
        labels,
    },
};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{api::Api, Resource};

/// Desired network endpoint for a service member: the primary port is always
/// named "http", the secondary "grpc" when declared.
pub fn build_service_endpoint(app: &App, member: &ServiceMember, name: &str) -> Service {
    let mut ports = vec![ServicePort {
        name: Some("http".to_string()),
        port: member.port,
        target_port: Some(IntOrString::Int(member.port)),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }];
    if let Some(grpc_port) = member.grpc_port {
        ports.push(ServicePort {
            name: Some("grpc".to_string()),
            port: grpc_port,
            target_port: Some(IntOrString::Int(grpc_port)),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        });
    }

    Service {
        metadata: kube::api::ObjectMeta {
            name: Some(name.to_string()),
            namespace: app.metadata.namespace.clone(),
            labels: Some(labels::service_labels(app, member)),
            owner_references: Some(vec![app.controller_owner_ref(&()).unwrap()]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(labels::service_selector_labels(app, member)),
            ports: Some(ports),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Desired network endpoint for a database member: a single unnamed port
pub fn build_database_endpoint(app: &App, member: &DatabaseMember, name: &str) -> Service {
    let member_labels = labels::database_labels(app, member);

    Service {
        metadata: kube::api::ObjectMeta {
            name: Some(name.to_string()),
            namespace: app.metadata.namespace.clone(),
            labels: Some(member_labels.clone()),
            owner_references: Some(vec![app.controller_owner_ref(&()).unwrap()]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(member_labels),
            ports: Some(vec![ServicePort {
                port: member.port,
                target_port: Some(IntOrString::Int(member.port)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Converge a desired Service. Only ports, selector and labels are
/// overwritten so the assigned cluster IP survives updates.
pub async fn reconcile(desired: &Service, namespace: &str, ctx: &Context) -> Result<Outcome> {
    let api: Api<Service> = Api::namespaced(ctx.client.clone(), namespace);
    apply::converge(&api, "Service", desired, |existing, desired| {
        existing.metadata.labels = desired.metadata.labels.clone();
        if let (Some(existing_spec), Some(desired_spec)) =
            (existing.spec.as_mut(), desired.spec.as_ref())
        {
            existing_spec.ports = desired_spec.ports.clone();
            existing_spec.selector = desired_spec.selector.clone();
        }
    })
    .await
}
