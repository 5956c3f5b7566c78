use crate::error::Result;
use std::env;

#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Image used for test runner pods
    pub runner_image: String,

    /// Timeout applied to runs that do not specify one
    pub default_timeout: String,
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            runner_image: env::var("RUNNER_IMAGE")
                .unwrap_or_else(|_| "localhost/topas-runner:latest".to_string()),
            default_timeout: env::var("DEFAULT_TIMEOUT").unwrap_or_else(|_| "60s".to_string()),
        })
    }
}
