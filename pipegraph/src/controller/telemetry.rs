//! Telemetry for evaluation observability.
//!
//! The controller emits structured events via a sink abstraction and does
//! not know how events are consumed (logging, metrics registries, UIs).
//! Sinks must be fast and non-blocking; expensive consumers should buffer.

use crate::component::ComponentId;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Controller Events
// =============================================================================

/// Events emitted while the controller evaluates the graph.
#[derive(Clone, Debug)]
pub enum ControllerEvent {
    /// A component was marked dirty.
    ComponentEnqueued {
        id: ComponentId,
        queue_depth: usize,
    },

    /// An evaluation started.
    EvaluationStarted { id: ComponentId },

    /// An evaluation finished successfully.
    EvaluationCompleted {
        id: ComponentId,
        duration: Duration,
        /// Whether the export changed and dependents were re-triggered.
        changed: bool,
    },

    /// An evaluation was deferred because a dependency has no export yet.
    EvaluationDeferred {
        id: ComponentId,
        dependency: ComponentId,
    },

    /// An evaluation failed; the previous export is retained.
    EvaluationFailed {
        id: ComponentId,
        duration: Duration,
    },

    /// A graph was built and activated.
    GraphLoaded { components: usize, edges: usize },

    /// A reload was rejected; the previous graph keeps running.
    GraphReloadRejected { reason: String },
}

impl ControllerEvent {
    /// Returns the component id associated with this event, if any.
    pub fn component_id(&self) -> Option<&ComponentId> {
        match self {
            Self::ComponentEnqueued { id, .. }
            | Self::EvaluationStarted { id }
            | Self::EvaluationCompleted { id, .. }
            | Self::EvaluationDeferred { id, .. }
            | Self::EvaluationFailed { id, .. } => Some(id),
            Self::GraphLoaded { .. } | Self::GraphReloadRejected { .. } => None,
        }
    }

    /// Returns a short name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ComponentEnqueued { .. } => "component_enqueued",
            Self::EvaluationStarted { .. } => "evaluation_started",
            Self::EvaluationCompleted { .. } => "evaluation_completed",
            Self::EvaluationDeferred { .. } => "evaluation_deferred",
            Self::EvaluationFailed { .. } => "evaluation_failed",
            Self::GraphLoaded { .. } => "graph_loaded",
            Self::GraphReloadRejected { .. } => "graph_reload_rejected",
        }
    }
}

// =============================================================================
// Telemetry Sink Trait
// =============================================================================

/// Sink for controller events.
///
/// Implementations must be thread-safe; events may be emitted from the
/// evaluation loop and from reload callers concurrently.
pub trait TelemetrySink: Send + Sync {
    /// Called when a controller event occurs.
    fn emit(&self, event: ControllerEvent);
}

// =============================================================================
// Built-in Sink Implementations
// =============================================================================

/// No-op sink for when telemetry is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetrySink;

impl TelemetrySink for NullTelemetrySink {
    fn emit(&self, _event: ControllerEvent) {
        // Intentionally empty
    }
}

/// Sink that logs events using the `tracing` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn emit(&self, event: ControllerEvent) {
        match &event {
            ControllerEvent::ComponentEnqueued { id, queue_depth } => {
                tracing::trace!(
                    component_id = %id,
                    queue_depth = queue_depth,
                    "Component enqueued"
                );
            }
            ControllerEvent::EvaluationStarted { id } => {
                tracing::trace!(component_id = %id, "Evaluation started");
            }
            ControllerEvent::EvaluationCompleted {
                id,
                duration,
                changed,
            } => {
                tracing::debug!(
                    component_id = %id,
                    duration_us = duration.as_micros() as u64,
                    changed = changed,
                    "Evaluation completed"
                );
            }
            ControllerEvent::EvaluationDeferred { id, dependency } => {
                tracing::debug!(
                    component_id = %id,
                    dependency = %dependency,
                    "Evaluation deferred; dependency has no export yet"
                );
            }
            ControllerEvent::EvaluationFailed { id, duration } => {
                tracing::warn!(
                    component_id = %id,
                    duration_us = duration.as_micros() as u64,
                    "Evaluation failed"
                );
            }
            ControllerEvent::GraphLoaded { components, edges } => {
                tracing::info!(
                    components = components,
                    edges = edges,
                    "Component graph loaded"
                );
            }
            ControllerEvent::GraphReloadRejected { reason } => {
                tracing::error!(reason = %reason, "Graph reload rejected");
            }
        }
    }
}

/// Sink that forwards events to multiple sinks.
pub struct MultiplexTelemetrySink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl MultiplexTelemetrySink {
    /// Creates a new multiplex sink with the given sinks.
    pub fn new(sinks: Vec<Arc<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }

    /// Adds a sink to the multiplex.
    pub fn add_sink(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }
}

impl TelemetrySink for MultiplexTelemetrySink {
    fn emit(&self, event: ControllerEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

impl std::fmt::Debug for MultiplexTelemetrySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiplexTelemetrySink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}
