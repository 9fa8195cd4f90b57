//! CLI error types.

use pipegraph::config::ConfigError;
use pipegraph::controller::ControllerError;
use pipegraph::supervisor::GroupError;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Pipeline file could not be loaded or validated.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Graph build or reload failed.
    #[error("controller error: {0}")]
    Controller(#[from] ControllerError),

    /// Logging could not be initialized.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A supervised task failed at runtime.
    #[error("runtime error: {0}")]
    Runtime(#[from] GroupError),
}
