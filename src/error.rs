use crate::config::ConfigError;
use crate::params::InvalidPair;

/// Errors that stop the `gbe-invoker` binary before or around invocation.
/// Job failures never show up here; they are carried in `JobResult`.
#[derive(Debug, thiserror::Error)]
pub enum InvokerError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Parameters(#[from] InvalidPair),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("logging: {0}")]
    Logging(String),
}
