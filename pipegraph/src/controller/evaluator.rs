//! Evaluation loop - drives components from dirty to converged.
//!
//! The loop drains the [`DirtyQueue`], and for each id looks up the node in
//! the currently active graph and evaluates it:
//!
//! 1. Mark the node in-progress (guards a future multi-worker deployment
//!    against overlapping evaluations; the dirty set only prevents duplicate
//!    membership, not a dequeue-then-re-add race).
//! 2. Resolve declared arguments by substituting every reference with the
//!    referenced component's current export snapshot.
//! 3. Invoke the component's update capability under the evaluation deadline
//!    with panic isolation.
//! 4. On success, compare the new export to the previous snapshot by value:
//!    unchanged exports stop propagation (this bounds propagation depth and
//!    is what makes convergence terminate); changed exports atomically
//!    replace the snapshot and enqueue every direct dependent.
//! 5. On failure, mark the node unhealthy and retain the previous export so
//!    dependents keep operating on last-known-good data.
//! 6. Clear in-progress, then re-check dirty-set membership: an enqueue that
//!    arrived mid-evaluation means the node must be evaluated again before
//!    the worker picks a new id, otherwise that update would be silently
//!    dropped.

use super::config::ControllerConfig;
use super::error::EvaluateError;
use super::graph::DependencyGraph;
use super::health::SharedControllerHealth;
use super::node::ComponentNode;
use super::queue::DirtyQueue;
use super::telemetry::{ControllerEvent, TelemetrySink};
use crate::component::value::{lookup_path, substitute_references};
use crate::component::{ComponentId, ExportValue, UpdateContext};
use futures::FutureExt;
use parking_lot::RwLock;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shared handle to the currently active graph.
///
/// Swapped atomically on reload; the loop re-reads it for every dequeued id,
/// so ids from a graph that has since been replaced simply miss the lookup.
pub(crate) type SharedGraph = Arc<RwLock<Arc<DependencyGraph>>>;

/// The single evaluation worker.
///
/// One worker per controller keeps all export writes on one task and avoids
/// cross-node write races; the per-node in-progress guard already makes the
/// algorithm safe for a bounded worker pool if one is ever needed.
pub struct EvaluationLoop {
    queue: Arc<DirtyQueue>,
    graph: SharedGraph,
    telemetry: Arc<dyn TelemetrySink>,
    health: SharedControllerHealth,
    config: ControllerConfig,
}

impl EvaluationLoop {
    pub(crate) fn new(
        queue: Arc<DirtyQueue>,
        graph: SharedGraph,
        telemetry: Arc<dyn TelemetrySink>,
        health: SharedControllerHealth,
        config: ControllerConfig,
    ) -> Self {
        Self {
            queue,
            graph,
            telemetry,
            health,
            config,
        }
    }

    /// Runs the loop until `shutdown` is cancelled.
    ///
    /// Cancellation unblocks a waiting dequeue immediately; an in-flight
    /// evaluation is finished (never abandoned mid-write) before the loop
    /// returns.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            evaluation_timeout_ms = self.config.evaluation_timeout.as_millis() as u64,
            "Evaluation loop started"
        );

        loop {
            let id = match self.queue.dequeue(&shutdown).await {
                Ok(id) => id,
                Err(_) => break,
            };

            // Always read the graph fresh: a reload may have swapped it
            // since the id was enqueued.
            let graph = self.graph.read().clone();
            let Some(node) = graph.get(&id).cloned() else {
                debug!(component_id = %id, "Skipping id not present in active graph");
                continue;
            };

            self.evaluate_until_clean(&graph, &node, &shutdown).await;
        }

        info!("Evaluation loop stopped");
    }

    /// Evaluates `node`, looping while it keeps getting re-dirtied.
    ///
    /// The membership re-check after clearing in-progress is the guarantee
    /// that an enqueue arriving mid-evaluation is never lost.
    async fn evaluate_until_clean(
        &self,
        graph: &DependencyGraph,
        node: &Arc<ComponentNode>,
        shutdown: &CancellationToken,
    ) {
        loop {
            if !node.begin_evaluation() {
                // Another worker holds the node; put the id back so the
                // update is re-examined once that evaluation finishes.
                self.enqueue(node.id().clone());
                return;
            }

            self.evaluate_node(graph, node, shutdown).await;
            node.end_evaluation();

            if !self.queue.remove(node.id()) {
                return;
            }
            debug!(
                component_id = %node.id(),
                "Component re-dirtied during evaluation; evaluating again"
            );
        }
    }

    /// Runs a single evaluation of `node` against the given graph.
    async fn evaluate_node(
        &self,
        graph: &DependencyGraph,
        node: &Arc<ComponentNode>,
        shutdown: &CancellationToken,
    ) {
        let started = Instant::now();
        self.telemetry.emit(ControllerEvent::EvaluationStarted {
            id: node.id().clone(),
        });

        let arguments = match self.resolve_arguments(graph, node) {
            Ok(arguments) => arguments,
            Err(err) if err.is_dependency_unavailable() => {
                // Expected startup race: the dependency's own first
                // successful evaluation re-enqueues this node.
                let dependency = match &err {
                    EvaluateError::DependencyUnavailable { dependency } => dependency.clone(),
                    _ => unreachable!(),
                };
                debug!(
                    component_id = %node.id(),
                    dependency = %dependency,
                    "Evaluation deferred; dependency has no export yet"
                );
                self.health.evaluation_deferred();
                self.telemetry.emit(ControllerEvent::EvaluationDeferred {
                    id: node.id().clone(),
                    dependency,
                });
                return;
            }
            Err(err) => {
                // Structurally invalid arguments: unhealthy, no retry until
                // an external trigger or dependency change re-dirties us.
                warn!(
                    component_id = %node.id(),
                    error = %err,
                    "Argument resolution failed"
                );
                node.record_failure(&err);
                self.health.evaluation_failed();
                self.telemetry.emit(ControllerEvent::EvaluationFailed {
                    id: node.id().clone(),
                    duration: started.elapsed(),
                });
                return;
            }
        };

        let result = self.run_update(node, arguments.clone(), shutdown).await;
        let duration = started.elapsed();

        match result {
            Ok(export) => {
                let changed = match node.export() {
                    Some(previous) => *previous != export,
                    None => true,
                };

                node.record_success(arguments, changed.then(|| Arc::new(export)));
                self.health.evaluation_succeeded(changed);
                self.telemetry.emit(ControllerEvent::EvaluationCompleted {
                    id: node.id().clone(),
                    duration,
                    changed,
                });
                debug!(
                    component_id = %node.id(),
                    duration_us = duration.as_micros() as u64,
                    changed = changed,
                    "Component evaluated"
                );

                // Propagation stops on unchanged exports; that bound is what
                // makes convergence terminate on a finite DAG.
                if changed {
                    for dependent in graph.dependents_of(node.id()) {
                        self.enqueue(dependent.clone());
                    }
                }
            }
            Err(err) => {
                if shutdown.is_cancelled() {
                    // Shutdown interrupted the update; not a component
                    // failure, and the node keeps its previous state.
                    debug!(
                        component_id = %node.id(),
                        "Evaluation interrupted by shutdown"
                    );
                    return;
                }
                warn!(
                    component_id = %node.id(),
                    error = %err,
                    duration_us = duration.as_micros() as u64,
                    "Component evaluation failed; previous export retained"
                );
                node.record_failure(&err);
                self.health.evaluation_failed();
                self.telemetry.emit(ControllerEvent::EvaluationFailed {
                    id: node.id().clone(),
                    duration,
                });
            }
        }
    }

    /// Invokes the component's update under deadline and panic isolation.
    async fn run_update(
        &self,
        node: &Arc<ComponentNode>,
        arguments: ExportValue,
        shutdown: &CancellationToken,
    ) -> Result<ExportValue, EvaluateError> {
        let mut component = node.component().lock().await;
        let cx = UpdateContext {
            arguments,
            cancellation: shutdown.child_token(),
        };

        let update = AssertUnwindSafe(component.update(cx)).catch_unwind();
        match tokio::time::timeout(self.config.evaluation_timeout, update).await {
            Err(_) => Err(EvaluateError::Timeout(self.config.evaluation_timeout)),
            Ok(Err(panic)) => Err(EvaluateError::Panic(panic_message(panic))),
            Ok(Ok(Err(err))) => Err(EvaluateError::Update(err)),
            Ok(Ok(Ok(export))) => Ok(export),
        }
    }

    /// Resolves declared arguments against current dependency exports.
    fn resolve_arguments(
        &self,
        graph: &DependencyGraph,
        node: &Arc<ComponentNode>,
    ) -> Result<ExportValue, EvaluateError> {
        substitute_references(node.declared_config(), &mut |path| {
            let (dependency, fields) = graph.resolve_reference(path).ok_or_else(|| {
                // Build-time validation makes this unreachable for ids from
                // the same graph; classify defensively anyway.
                EvaluateError::InvalidArguments(format!("unresolvable reference `${{{path}}}`"))
            })?;

            let export =
                dependency
                    .export()
                    .ok_or_else(|| EvaluateError::DependencyUnavailable {
                        dependency: dependency.id().clone(),
                    })?;

            let value =
                lookup_path(&export, &fields).ok_or_else(|| EvaluateError::UnknownExportField {
                    dependency: dependency.id().clone(),
                    reference: path.to_string(),
                })?;

            Ok(value.clone())
        })
    }

    /// Marks a component dirty and records queue telemetry.
    fn enqueue(&self, id: ComponentId) {
        self.queue.enqueue(id.clone());
        let depth = self.queue.len();
        self.health.observe_queue_depth(depth);
        if depth > self.config.queue_warn_depth {
            warn!(queue_depth = depth, "Dirty queue backlog is high");
        }
        self.telemetry
            .emit(ControllerEvent::ComponentEnqueued { id, queue_depth: depth });
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
