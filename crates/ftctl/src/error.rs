//! Error types for ftctl

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Scenario '{name}' failed: {reason}")]
    ScenarioFailed { name: &'static str, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Fault tolerance error: {0}")]
    FaultTolerance(#[from] rtos_ft::FtError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ScenarioFailed { .. } => 2,
            Self::FaultTolerance(_) => 3,
            Self::InvalidArgument(_) | Self::JsonError(_) => 4,
        }
    }
}
