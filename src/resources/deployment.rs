use crate::{
    crds::{App, DatabaseMember, ServiceMember},
    error::Result,
    reconciler::Context,
    resources::{
        apply::{self, Outcome},
        labels,
    },
};
use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec},
    core::v1::{Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec},
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::{api::Api, Resource};

/// Desired workload for a service member. Env vars are copied verbatim from
/// the spec; a named gRPC container port is added when declared.
pub fn build_service_deployment(app: &App, member: &ServiceMember, name: &str) -> Deployment {
    let selector = labels::service_selector_labels(app, member);

    let env: Vec<EnvVar> = member
        .env_vars
        .iter()
        .map(|(k, v)| EnvVar {
            name: k.clone(),
            value: Some(v.clone()),
            ..Default::default()
        })
        .collect();

    let mut ports = vec![ContainerPort {
        container_port: member.port,
        ..Default::default()
    }];
    if let Some(grpc_port) = member.grpc_port {
        ports.push(ContainerPort {
            container_port: grpc_port,
            name: Some("grpc".to_string()),
            ..Default::default()
        });
    }

    let container = Container {
        name: member.name.clone(),
        image: Some(member.image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        env: if env.is_empty() { None } else { Some(env) },
        ports: Some(ports),
        ..Default::default()
    };

    Deployment {
        metadata: kube::api::ObjectMeta {
            name: Some(name.to_string()),
            namespace: app.metadata.namespace.clone(),
            labels: Some(labels::service_labels(app, member)),
            owner_references: Some(vec![app.controller_owner_ref(&()).unwrap()]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(member.replicas.unwrap_or(1)),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(kube::api::ObjectMeta {
                    labels: Some(selector),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Desired workload for a database member. Credentials present in the map
/// become the conventional POSTGRES_* environment variables; absent keys are
/// simply not injected.
pub fn build_database_deployment(app: &App, member: &DatabaseMember, name: &str) -> Deployment {
    let member_labels = labels::database_labels(app, member);

    let mut env = vec![];
    if let Some(user) = member.credentials.get("user") {
        env.push(EnvVar {
            name: "POSTGRES_USER".to_string(),
            value: Some(user.clone()),
            ..Default::default()
        });
    }
    if let Some(password) = member.credentials.get("password") {
        env.push(EnvVar {
            name: "POSTGRES_PASSWORD".to_string(),
            value: Some(password.clone()),
            ..Default::default()
        });
    }
    if let Some(dbname) = member.credentials.get("dbname") {
        env.push(EnvVar {
            name: "POSTGRES_DB".to_string(),
            value: Some(dbname.clone()),
            ..Default::default()
        });
    }

    let container = Container {
        name: member.name.clone(),
        image: Some(member.image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        env: if env.is_empty() { None } else { Some(env) },
        ports: Some(vec![ContainerPort {
            container_port: member.port,
            ..Default::default()
        }]),
        ..Default::default()
    };

    Deployment {
        metadata: kube::api::ObjectMeta {
            name: Some(name.to_string()),
            namespace: app.metadata.namespace.clone(),
            labels: Some(member_labels.clone()),
            owner_references: Some(vec![app.controller_owner_ref(&()).unwrap()]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(member_labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(kube::api::ObjectMeta {
                    labels: Some(member_labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Converge a desired Deployment, overwriting only the spec and labels
pub async fn reconcile(desired: &Deployment, namespace: &str, ctx: &Context) -> Result<Outcome> {
    let api: Api<Deployment> = Api::namespaced(ctx.client.clone(), namespace);
    apply::converge(&api, "Deployment", desired, |existing, desired| {
        existing.metadata.labels = desired.metadata.labels.clone();
        existing.spec = desired.spec.clone();
    })
    .await
}
