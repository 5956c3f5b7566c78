/// Naming helpers for the topas-operator
///
/// Every derived resource is named deterministically from its declaring
/// object; the name is the sole adoption key across reconcile cycles.

/// Name of the Deployment/Service pair for an App member
pub fn member_resource_name(app_name: &str, member_name: &str) -> String {
    format!("{}-{}", app_name, member_name)
}

/// Name of the schema init job for a database member resource
pub fn init_job_name(resource_name: &str) -> String {
    format!("{}-init", resource_name)
}

/// Name of the ConfigMap carrying a run's inline script
pub fn script_configmap_name(run_name: &str) -> String {
    format!("{}-script", run_name)
}

/// Name of a run's execution pod
pub fn runner_pod_name(run_name: &str) -> String {
    format!("{}-runner", run_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_resource_name() {
        assert_eq!(member_resource_name("shop", "cart"), "shop-cart");
        assert_eq!(
            init_job_name(&member_resource_name("shop", "orders-db")),
            "shop-orders-db-init"
        );
    }

    #[test]
    fn test_run_artifact_names() {
        assert_eq!(script_configmap_name("smoke-1"), "smoke-1-script");
        assert_eq!(runner_pod_name("smoke-1"), "smoke-1-runner");
    }
}
