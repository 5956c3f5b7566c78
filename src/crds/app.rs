use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::date_time::DateTime;

/// App declares a multi-service application topology: a set of stateless
/// services and a set of databases, all converged onto Deployments and
/// Services owned by this resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "apps.example.com",
    version = "v1alpha1",
    kind = "App",
    plural = "apps",
    singular = "app",
    namespaced,
    status = "AppStatus",
    printcolumn = r#"{"name":"Health", "type":"string", "jsonPath":".status.health"}"#,
    printcolumn = r#"{"name":"Endpoints", "type":"integer", "jsonPath":".status.endpointCount"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    /// Stateless service members. Names must be unique within the App.
    #[serde(default)]
    pub services: Vec<ServiceMember>,

    /// Database members, provisioned before any service member.
    #[serde(default)]
    pub databases: Vec<DatabaseMember>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMember {
    pub name: String,
    pub image: String,
    pub version: String,

    /// Desired replica count, 1 if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Primary (HTTP) port
    pub port: i32,

    /// Optional secondary gRPC port, exposed under the port name "grpc"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_port: Option<i32>,

    /// Environment variables injected verbatim into the workload
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseMember {
    pub name: String,
    pub image: String,
    pub port: i32,

    /// Connection credentials. The keys `user`, `password` and `dbname` are
    /// looked up at provisioning time; other keys are ignored.
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,

    /// Inline DDL executed once by the schema init job. Changing this after
    /// the init job exists has no effect.
    #[serde(default, rename = "initSQL", skip_serializing_if = "String::is_empty")]
    pub init_sql: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppStatus {
    /// Latest observations of the App's state
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// When the last successful reconcile cycle completed
    pub last_checked: Option<DateTime>,

    /// Number of declared endpoints (services + databases)
    pub endpoint_count: Option<i32>,

    /// Health summary
    pub health: Option<Health>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
pub enum Health {
    Healthy,
    Unhealthy,
    Unknown,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: ConditionStatus,
    pub last_transition_time: Option<DateTime>,
    pub reason: Option<String>,
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}
