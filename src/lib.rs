//! Control-plane extension converging declared application topologies
//! (App) and short-lived test executions (TestRun) onto cluster resources.
//!
//! All durable state lives in the declared objects; reconcilers are pure
//! functions of the current object plus cluster reads, so concurrent
//! invocations for different object names are safe by construction. The
//! dispatching controller runtime guarantees a single in-flight reconcile
//! per object name.

pub mod config;
pub mod crds;
pub mod date_time;
pub mod error;
pub mod reconciler;
pub mod resources;
pub mod telemetry;
pub mod utils;
