use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Conflicting write on {kind} {name}")]
    Conflict { kind: &'static str, name: String },

    #[error("{kind} {name} rejected by the API server: {reason}")]
    Apply {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("Runner pod {name} not found")]
    RunnerPodMissing { name: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl Error {
    /// Determine if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::KubeError(_) | Error::Conflict { .. } | Error::Apply { .. }
        )
    }
}
