use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::date_time::DateTime;

/// TestRun declares a single test execution against an App. The controller
/// drives it through a run-to-completion state machine; terminal states are
/// never re-processed.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "apps.example.com",
    version = "v1alpha1",
    kind = "TestRun",
    plural = "testruns",
    singular = "testrun",
    namespaced,
    status = "TestRunStatus",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Result", "type":"string", "jsonPath":".status.result"}"#,
    printcolumn = r#"{"name":"Pod", "type":"string", "jsonPath":".status.runnerPod"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TestRunSpec {
    /// Name of the target App. Not validated for existence at admission time.
    pub app_name: String,

    /// Inline test script. Takes precedence over `git` when both are set.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script: String,

    /// Git source for the script, used when no inline script is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSource>,

    /// Execution timeout as a duration string (e.g. "60s", "5m").
    /// Unparsable values leave the runner without a deadline.
    #[serde(default = "default_timeout")]
    pub timeout: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitSource {
    /// Repository URL
    pub url: String,

    /// Path to the script within the repository
    pub path: String,

    /// Branch, tag or sha to check out
    #[serde(default = "default_revision")]
    pub revision: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct TestRunStatus {
    /// Current state. Unset is treated as Pending.
    pub state: Option<TestState>,

    /// Name of the runner pod. Set once on admission, immutable thereafter.
    pub runner_pod: Option<String>,

    /// Set on the Pending -> Running transition
    pub start_time: Option<DateTime>,

    /// Set on entry to a terminal state
    pub completion_time: Option<DateTime>,

    /// Human-readable one-line outcome
    pub result: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq)]
pub enum TestState {
    Pending,
    Running,
    Passed,
    Failed,
    Error,
}

impl TestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TestState::Passed | TestState::Failed | TestState::Error)
    }
}

fn default_timeout() -> Option<String> {
    Some("60s".to_string())
}

fn default_revision() -> String {
    "main".to_string()
}
