//! Explicit component factory registry.
//!
//! The registry maps component kind names to factory functions. It is a
//! plain value constructed at startup and passed to the graph builder, so
//! every test can assemble its own registry with mock components instead of
//! relying on global registration side effects.

use super::{Component, ComponentId, ExportValue};
use crate::rules::RuleStore;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while instantiating components at graph build time.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The declared kind has no registered factory.
    #[error("unknown component kind `{0}`")]
    UnknownKind(String),

    /// The factory rejected the declared arguments.
    #[error("invalid declaration for `{id}`: {reason}")]
    InvalidDeclaration { id: ComponentId, reason: String },
}

/// Context handed to component factories.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Id of the instance being built.
    pub id: ComponentId,
}

type FactoryFn =
    Box<dyn Fn(&BuildContext, &ExportValue) -> Result<Box<dyn Component>, BuildError> + Send + Sync>;

/// Registry of component factories, keyed by kind.
pub struct ComponentRegistry {
    factories: HashMap<String, FactoryFn>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in component set.
    ///
    /// `rule_store` is the external rule-group API used by `rule_sync`
    /// instances; tests pass an in-memory store.
    pub fn builtin(rule_store: Arc<dyn RuleStore>) -> Self {
        let mut registry = Self::new();

        registry.register("static_value", |_, _| {
            Ok(Box::new(super::builtin::StaticValue::new()))
        });
        registry.register("transform", |_, _| {
            Ok(Box::new(super::builtin::Transform::new()))
        });
        registry.register("rule_sync", move |_, _| {
            Ok(Box::new(super::builtin::RuleSync::new(Arc::clone(
                &rule_store,
            ))))
        });

        registry
    }

    /// Registers a factory for `kind`, replacing any previous entry.
    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&BuildContext, &ExportValue) -> Result<Box<dyn Component>, BuildError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.to_string(), Box::new(factory));
    }

    /// Returns whether `kind` has a registered factory.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Instantiates a component of the given kind.
    pub fn build(
        &self,
        cx: &BuildContext,
        kind: &str,
        arguments: &ExportValue,
    ) -> Result<Box<dyn Component>, BuildError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| BuildError::UnknownKind(kind.to_string()))?;
        factory(cx, arguments)
    }

    /// Returns the registered kind names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
