//! Component abstraction for the pipeline graph.
//!
//! A component is a single declared unit in the pipeline (a source, a
//! processor, an exporter). The controller knows nothing about what a
//! component does; it only drives the [`Component::update`] capability with
//! freshly resolved arguments and reads back the export the call produces.
//!
//! Concrete implementations live in [`builtin`] and are constructed through
//! the [`ComponentRegistry`](registry::ComponentRegistry), an explicit
//! factory structure built at startup. There is no process-wide registration;
//! tests build their own registries with mock components.

pub mod builtin;
pub mod registry;
pub mod value;

pub use registry::{BuildContext, BuildError, ComponentRegistry};
pub use value::ExportValue;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Component Identity
// =============================================================================

/// Unique path identifying a declared component instance.
///
/// Ids are opaque dotted strings such as `static_value.targets` or
/// `rule_sync.default`, stable for the lifetime of the process. References in
/// declared arguments name a component by its full id, optionally followed by
/// export field segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Creates a new component id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// Allows map lookups keyed by `ComponentId` using a plain `&str`.
impl std::borrow::Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Declared Components
// =============================================================================

/// One component as declared in the pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDecl {
    /// Unique id of this instance.
    pub id: ComponentId,

    /// Component kind, resolved against the registry (e.g. `static_value`).
    pub kind: String,

    /// Declared arguments. String values of the form `"${other.id.field}"`
    /// are references resolved against other components' exports at each
    /// evaluation.
    #[serde(default = "empty_arguments")]
    pub arguments: ExportValue,
}

fn empty_arguments() -> ExportValue {
    ExportValue::Object(serde_json::Map::new())
}

// =============================================================================
// Update Capability
// =============================================================================

/// Error returned by a component update.
///
/// Opaque to the controller: it only classifies updates as success or
/// failure and records the message against the component's health.
#[derive(Debug, Clone)]
pub struct UpdateError {
    message: String,
}

impl UpdateError {
    /// Creates a new update error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for UpdateError {}

/// Context handed to [`Component::update`] for a single evaluation.
#[derive(Debug, Clone)]
pub struct UpdateContext {
    /// Declared arguments with every reference substituted by the referenced
    /// component's current export. Must not be retained beyond the call.
    pub arguments: ExportValue,

    /// Cancelled when the controller shuts down mid-evaluation. Long-running
    /// updates should watch this and abort promptly.
    pub cancellation: CancellationToken,
}

/// Boxed future returned by [`Component::update`].
pub type UpdateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ExportValue, UpdateError>> + Send + 'a>>;

/// Boxed future returned by [`Component::on_remove`].
pub type RemoveFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// A live pipeline component.
///
/// The controller serializes calls per instance: no two `update` calls for
/// the same component ever overlap. Implementations must tolerate repeated
/// calls with different arguments.
///
/// # Example
///
/// ```ignore
/// struct Echo;
///
/// impl Component for Echo {
///     fn kind(&self) -> &str {
///         "echo"
///     }
///
///     fn update<'a>(&'a mut self, cx: UpdateContext) -> UpdateFuture<'a> {
///         Box::pin(async move { Ok(cx.arguments) })
///     }
/// }
/// ```
pub trait Component: Send + 'static {
    /// Component kind name, matching its registry entry.
    fn kind(&self) -> &str;

    /// Re-evaluates the component with freshly resolved arguments.
    ///
    /// On success the returned export replaces the component's previous
    /// export snapshot; on failure the previous export stays visible to
    /// dependents.
    fn update<'a>(&'a mut self, cx: UpdateContext) -> UpdateFuture<'a>;

    /// Called when the component is dropped from the graph by a reload.
    ///
    /// Components that mirror state into external systems use this to clean
    /// up; the default does nothing.
    fn on_remove<'a>(&'a mut self) -> RemoveFuture<'a> {
        Box::pin(async {})
    }
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component").field("kind", &self.kind()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_id_display() {
        let id = ComponentId::new("static_value.targets");
        assert_eq!(id.to_string(), "static_value.targets");
        assert_eq!(id.as_str(), "static_value.targets");
    }

    #[test]
    fn test_component_id_borrow_lookup() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(ComponentId::new("a.b"), 1);
        assert_eq!(map.get("a.b"), Some(&1));
        assert_eq!(map.get("a"), None);
    }

    #[test]
    fn test_decl_defaults_empty_arguments() {
        let decl: ComponentDecl =
            serde_json::from_str(r#"{"id": "static_value.a", "kind": "static_value"}"#).unwrap();
        assert_eq!(decl.id.as_str(), "static_value.a");
        assert!(decl.arguments.as_object().is_some_and(|o| o.is_empty()));
    }

    #[test]
    fn test_update_error_display() {
        let err = UpdateError::new("remote endpoint unreachable");
        assert_eq!(err.to_string(), "remote endpoint unreachable");
    }
}
