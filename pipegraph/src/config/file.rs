//! Pipeline file loading and validation.

use crate::component::ComponentDecl;
use crate::controller::ControllerConfig;
use serde::Deserialize;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating a pipeline file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The file is not valid JSON for the expected schema.
    #[error("failed to parse pipeline file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two component declarations share an id.
    #[error("duplicate component id `{0}`")]
    DuplicateId(String),

    /// A component id is empty or contains whitespace.
    #[error("invalid component id `{0}`")]
    InvalidId(String),
}

/// Controller settings section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerSection {
    /// Per-evaluation deadline in milliseconds.
    pub evaluation_timeout_ms: Option<u64>,

    /// Dirty-set depth that triggers a backlog warning.
    pub queue_warn_depth: Option<usize>,
}

/// A parsed and validated pipeline file.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineFile {
    /// Controller settings; defaults apply when omitted.
    #[serde(default)]
    pub controller: ControllerSection,

    /// Declared components.
    pub components: Vec<ComponentDecl>,
}

impl PipelineFile {
    /// Loads and validates a pipeline file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parses and validates pipeline file contents.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let file: Self = serde_json::from_str(contents)?;
        file.validate()?;
        Ok(file)
    }

    /// Converts the settings section into a controller configuration.
    pub fn controller_config(&self) -> ControllerConfig {
        let defaults = ControllerConfig::default();
        ControllerConfig {
            evaluation_timeout: self
                .controller
                .evaluation_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.evaluation_timeout),
            queue_warn_depth: self
                .controller
                .queue_warn_depth
                .unwrap_or(defaults.queue_warn_depth),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for decl in &self.components {
            let id = decl.id.as_str();
            if id.is_empty() || id.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidId(id.to_string()));
            }
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateId(id.to_string()));
            }
        }
        Ok(())
    }
}
