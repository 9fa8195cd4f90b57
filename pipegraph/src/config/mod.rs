//! Declarative pipeline configuration.
//!
//! A pipeline file is a JSON document with a `controller` settings section
//! and the `components` list the graph is built from:
//!
//! ```json
//! {
//!   "controller": { "evaluation_timeout_ms": 30000 },
//!   "components": [
//!     { "id": "static_value.targets", "kind": "static_value",
//!       "arguments": { "value": ["10.0.0.1:9100"] } },
//!     { "id": "transform.labels", "kind": "transform",
//!       "arguments": { "input": "${static_value.targets}" } }
//!   ]
//! }
//! ```

mod file;

pub use file::{ConfigError, ControllerSection, PipelineFile};
