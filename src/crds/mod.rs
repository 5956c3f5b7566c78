pub mod app;
pub mod test_run;

// Re-export types
pub use app::{
    App, AppSpec, AppStatus, Condition, ConditionStatus, DatabaseMember, Health, ServiceMember,
};
pub use test_run::{GitSource, TestRun, TestRunSpec, TestRunStatus, TestState};
