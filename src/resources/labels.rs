use crate::crds::{App, DatabaseMember, ServiceMember, TestRun};
use kube::ResourceExt;
use std::collections::BTreeMap;

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const PART_OF_LABEL: &str = "app.kubernetes.io/part-of";
pub const RUNNER_TYPE_LABEL: &str = "runner-type";

/// Value of the identity marker on every resource this operator manages
pub const MANAGER: &str = "topas";

/// Stable identity labels for an App member. Used as the workload selector,
/// so the key set must never grow version- or revision-shaped values.
fn member_labels(app: &App, member_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), member_name.to_string());
    labels.insert(
        "app.kubernetes.io/name".to_string(),
        member_name.to_string(),
    );
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGER.to_string());
    labels.insert(PART_OF_LABEL.to_string(), app.name_any());
    labels
}

/// Selector and pod-template labels for a service member
pub fn service_selector_labels(app: &App, member: &ServiceMember) -> BTreeMap<String, String> {
    member_labels(app, &member.name)
}

/// Metadata labels for a service member's Deployment and Service
pub fn service_labels(app: &App, member: &ServiceMember) -> BTreeMap<String, String> {
    let mut labels = member_labels(app, &member.name);
    labels.insert(
        "app.kubernetes.io/version".to_string(),
        member.version.clone(),
    );
    labels
}

/// Labels for a database member's resources, selector included
pub fn database_labels(app: &App, member: &DatabaseMember) -> BTreeMap<String, String> {
    let mut labels = member_labels(app, &member.name);
    labels.insert(
        "app.kubernetes.io/component".to_string(),
        "database".to_string(),
    );
    labels
}

/// Labels for a run's script ConfigMap and runner pod. The runner-type
/// marker is what the admission gate counts.
pub fn runner_labels(run: &TestRun) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGER.to_string());
    labels.insert(PART_OF_LABEL.to_string(), run.spec.app_name.clone());
    labels.insert(RUNNER_TYPE_LABEL.to_string(), MANAGER.to_string());
    labels.insert("testrun".to_string(), run.name_any());
    labels
}

/// List selector matching every resource in an App's group
pub fn group_selector(app_name: &str) -> String {
    format!("{}={},{}={}", MANAGED_BY_LABEL, MANAGER, PART_OF_LABEL, app_name)
}

/// List selector matching every runner pod cluster-wide
pub fn runner_selector() -> String {
    format!("{}={}", RUNNER_TYPE_LABEL, MANAGER)
}
