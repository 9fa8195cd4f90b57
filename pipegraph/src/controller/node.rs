//! Live component node state.

use super::health::ComponentHealth;
use crate::component::{Component, ComponentId, ExportValue};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct NodeStatus {
    health: ComponentHealth,
    last_error: Option<String>,
}

/// One live component instance in the dependency graph.
///
/// The node owns the component behind an async mutex so that update calls
/// are serialized, and publishes the component's export behind an immutable
/// handle: readers clone an `Arc` and can never observe a half-written
/// value. Only the node's own evaluation replaces the export; a failed
/// evaluation leaves the previous export in place so dependents keep
/// operating on last-known-good data.
pub struct ComponentNode {
    id: ComponentId,
    kind: String,
    declared_config: ExportValue,
    component: tokio::sync::Mutex<Box<dyn Component>>,
    /// Arguments from the last successful evaluation.
    resolved_arguments: Mutex<Option<ExportValue>>,
    /// Current export snapshot, replaced wholesale on success.
    export: RwLock<Option<Arc<ExportValue>>>,
    status: Mutex<NodeStatus>,
    /// Guards against overlapping evaluations of the same node.
    evaluating: AtomicBool,
}

impl ComponentNode {
    /// Creates a node in the `Unevaluated` state with no export.
    pub fn new(
        id: ComponentId,
        kind: impl Into<String>,
        declared_config: ExportValue,
        component: Box<dyn Component>,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            declared_config,
            component: tokio::sync::Mutex::new(component),
            resolved_arguments: Mutex::new(None),
            export: RwLock::new(None),
            status: Mutex::new(NodeStatus {
                health: ComponentHealth::Unevaluated,
                last_error: None,
            }),
            evaluating: AtomicBool::new(false),
        }
    }

    /// The node's id.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// The component kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The declared (unresolved) configuration.
    pub fn declared_config(&self) -> &ExportValue {
        &self.declared_config
    }

    /// Returns the current export snapshot, if any.
    ///
    /// The returned handle is immutable; a concurrent evaluation replacing
    /// the snapshot does not affect it.
    pub fn export(&self) -> Option<Arc<ExportValue>> {
        self.export.read().clone()
    }

    /// Returns the arguments of the last successful evaluation.
    pub fn resolved_arguments(&self) -> Option<ExportValue> {
        self.resolved_arguments.lock().clone()
    }

    /// Current health state.
    pub fn health(&self) -> ComponentHealth {
        self.status.lock().health
    }

    /// Error recorded by the most recent failed evaluation.
    pub fn last_error(&self) -> Option<String> {
        self.status.lock().last_error.clone()
    }

    /// The component instance, serialized behind an async mutex.
    pub(crate) fn component(&self) -> &tokio::sync::Mutex<Box<dyn Component>> {
        &self.component
    }

    /// Marks the node in-progress.
    ///
    /// Returns `false` when another evaluation is already in flight; the
    /// dirty set prevents duplicate membership, but not two workers racing
    /// on a dequeue-then-re-add sequence.
    pub(crate) fn begin_evaluation(&self) -> bool {
        self.evaluating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clears the in-progress flag.
    pub(crate) fn end_evaluation(&self) {
        self.evaluating.store(false, Ordering::Release);
    }

    /// Whether an evaluation is currently in flight.
    pub fn is_evaluating(&self) -> bool {
        self.evaluating.load(Ordering::Acquire)
    }

    /// Records a successful evaluation.
    ///
    /// Replaces the export snapshot only when `export` is `Some`; an
    /// unchanged export keeps the existing handle so readers holding it see
    /// no spurious replacement.
    pub(crate) fn record_success(&self, arguments: ExportValue, export: Option<Arc<ExportValue>>) {
        if let Some(export) = export {
            *self.export.write() = Some(export);
        }
        *self.resolved_arguments.lock() = Some(arguments);
        let mut status = self.status.lock();
        status.health = ComponentHealth::Healthy;
        status.last_error = None;
    }

    /// Records a failed evaluation, retaining the previous export.
    pub(crate) fn record_failure(&self, error: impl ToString) {
        let mut status = self.status.lock();
        status.health = ComponentHealth::Unhealthy;
        status.last_error = Some(error.to_string());
    }
}

impl std::fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("health", &self.health().as_str())
            .field("has_export", &self.export.read().is_some())
            .finish_non_exhaustive()
    }
}
