//! CLI runner for common setup and operations.
//!
//! Encapsulates logging initialization and pipeline-file loading to reduce
//! duplication across command handlers.

use crate::error::CliError;
use pipegraph::config::PipelineFile;
use pipegraph::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};
use std::path::Path;
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while the runner exists.
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded pipeline file.
    file: PipelineFile,
}

impl CliRunner {
    /// Creates a runner: initializes logging and loads the pipeline file.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Path to the pipeline file
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    pub fn new(config_path: &Path, debug_mode: bool) -> Result<Self, CliError> {
        let logging_guard = init_logging(default_log_dir(), default_log_file(), true, debug_mode)
            .map_err(|err| CliError::LoggingInit(err.to_string()))?;

        let file = PipelineFile::load(config_path)?;

        Ok(Self {
            logging_guard,
            file,
        })
    }

    /// The loaded pipeline file.
    pub fn file(&self) -> &PipelineFile {
        &self.file
    }

    /// Logs startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("PipeGraph v{}", pipegraph::VERSION);
        info!(
            command = command,
            components = self.file.components.len(),
            "PipeGraph CLI starting"
        );
    }
}
