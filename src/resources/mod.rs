pub mod apply;
pub mod configmap;
pub mod deployment;
pub mod job;
pub mod labels;
pub mod orphan;
pub mod pod;
pub mod service;
