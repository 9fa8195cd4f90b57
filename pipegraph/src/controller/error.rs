//! Error types for the controller.

use crate::component::registry::BuildError;
use crate::component::{ComponentId, UpdateError};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building or reloading the dependency graph.
///
/// All of these are fatal to the load/reload operation: the new graph is
/// never activated and a previously active graph keeps running unmodified.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The declared components form a dependency cycle.
    #[error("dependency cycle detected: {}", chain.join(" -> "))]
    Cycle {
        /// The participating component chain; first and last entries match.
        chain: Vec<String>,
    },

    /// Two declarations share the same id.
    #[error("duplicate component id `{0}`")]
    DuplicateId(ComponentId),

    /// A reference does not match any declared component id.
    #[error("component `{id}` references unknown component in `${{{reference}}}`")]
    UnknownReference {
        id: ComponentId,
        reference: String,
    },

    /// A component instance could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Outcome classification for a single failed evaluation.
#[derive(Debug, Error)]
pub enum EvaluateError {
    /// A referenced component has not produced an export yet.
    ///
    /// Expected during startup seeding; the dependent is re-enqueued by the
    /// dependency's own first successful evaluation, so this is never
    /// escalated as a component failure.
    #[error("dependency `{dependency}` has not produced an export yet")]
    DependencyUnavailable { dependency: ComponentId },

    /// The declared arguments could not be resolved against current exports.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A reference names a field the dependency's export does not have.
    #[error("reference `${{{reference}}}` does not match a field of `{dependency}`'s export")]
    UnknownExportField {
        dependency: ComponentId,
        reference: String,
    },

    /// The component's update call returned an error.
    #[error("update failed: {0}")]
    Update(UpdateError),

    /// The component's update call panicked.
    #[error("update panicked: {0}")]
    Panic(String),

    /// The component's update call exceeded the evaluation deadline.
    #[error("update timed out after {0:?}")]
    Timeout(Duration),
}

impl EvaluateError {
    /// Whether this outcome is the expected startup race rather than a
    /// component failure.
    pub fn is_dependency_unavailable(&self) -> bool {
        matches!(self, Self::DependencyUnavailable { .. })
    }
}

/// Error returned by [`DirtyQueue::dequeue`](super::DirtyQueue::dequeue)
/// when the shutdown token fires while waiting for work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("controller shut down while waiting for dirty components")]
pub struct ShutdownError;
