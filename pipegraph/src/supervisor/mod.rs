//! Supervisor - owns graph construction, startup seeding, reload, and
//! graceful shutdown.
//!
//! The supervisor is the only structural write path into the controller:
//! callers hand it a declared-component set, it builds and validates a
//! [`DependencyGraph`], and only a graph that passed validation is ever
//! activated. On reload the new graph is swapped in atomically; on a
//! rejected reload the active graph keeps running unmodified.
//!
//! External collaborators (file watchers, API servers) interact through two
//! narrow contracts: [`Supervisor::enqueue`] to mark a component dirty, and
//! the read-only accessors for exports and health.

pub mod group;

pub use group::{BoxError, GroupError, TaskGroup};

use crate::component::{ComponentDecl, ComponentId, ComponentRegistry, ExportValue};
use crate::controller::{
    ComponentHealth, ControllerConfig, ControllerError, ControllerEvent, ControllerHealth,
    DependencyGraph, DirtyQueue, EvaluationLoop, HealthSnapshot, SharedControllerHealth,
    SharedGraph, TelemetrySink, TracingTelemetrySink,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Configuration for a [`Supervisor`].
pub struct SupervisorOptions {
    /// Evaluation loop configuration.
    pub config: ControllerConfig,

    /// Sink receiving controller events.
    pub telemetry: Arc<dyn TelemetrySink>,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            config: ControllerConfig::default(),
            telemetry: Arc::new(TracingTelemetrySink),
        }
    }
}

/// Owns the active graph, the dirty queue, and the evaluation loop task.
pub struct Supervisor {
    registry: ComponentRegistry,
    queue: Arc<DirtyQueue>,
    graph: SharedGraph,
    health: SharedControllerHealth,
    telemetry: Arc<dyn TelemetrySink>,
    config: ControllerConfig,
    shutdown: CancellationToken,
    loop_handle: Option<JoinHandle<()>>,
}

impl Supervisor {
    /// Creates a supervisor with an empty graph and no running loop.
    pub fn new(registry: ComponentRegistry, options: SupervisorOptions) -> Self {
        Self {
            registry,
            queue: Arc::new(DirtyQueue::new()),
            graph: Arc::new(RwLock::new(Arc::new(DependencyGraph::empty()))),
            health: Arc::new(ControllerHealth::new()),
            telemetry: options.telemetry,
            config: options.config,
            shutdown: CancellationToken::new(),
            loop_handle: None,
        }
    }

    /// Builds the initial graph, seeds every node, and spawns the
    /// evaluation loop.
    ///
    /// Must be called from within a tokio runtime. Fails without starting
    /// anything when the declared set does not validate.
    pub fn start(&mut self, decls: &[ComponentDecl]) -> Result<(), ControllerError> {
        let graph = DependencyGraph::build(&self.registry, decls)?;
        info!(
            components = graph.len(),
            edges = graph.edge_count(),
            "Starting supervisor"
        );
        self.telemetry.emit(ControllerEvent::GraphLoaded {
            components: graph.len(),
            edges: graph.edge_count(),
        });

        *self.graph.write() = Arc::new(graph);
        self.seed();

        let evaluation_loop = EvaluationLoop::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.graph),
            Arc::clone(&self.telemetry),
            Arc::clone(&self.health),
            self.config.clone(),
        );
        self.loop_handle = Some(tokio::spawn(evaluation_loop.run(self.shutdown.clone())));
        Ok(())
    }

    /// Replaces the declared-component set.
    ///
    /// The new graph is built and validated first; a validation failure
    /// (including a dependency cycle) leaves the active graph running and
    /// returns the error. On success every node of the new graph is seeded
    /// and components dropped from the set get their removal hook.
    pub async fn reload(&self, decls: &[ComponentDecl]) -> Result<(), ControllerError> {
        let new_graph = match DependencyGraph::build(&self.registry, decls) {
            Ok(graph) => graph,
            Err(err) => {
                self.telemetry.emit(ControllerEvent::GraphReloadRejected {
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        info!(
            components = new_graph.len(),
            edges = new_graph.edge_count(),
            "Reloading component graph"
        );
        self.telemetry.emit(ControllerEvent::GraphLoaded {
            components: new_graph.len(),
            edges: new_graph.edge_count(),
        });

        let old_graph = {
            let mut active = self.graph.write();
            std::mem::replace(&mut *active, Arc::new(new_graph))
        };

        // Components no longer declared clean up after themselves.
        let current = self.graph.read().clone();
        for node in old_graph.nodes() {
            if current.get(node.id()).is_none() {
                debug!(component_id = %node.id(), "Component removed by reload");
                node.component().lock().await.on_remove().await;
            }
        }

        self.seed();
        Ok(())
    }

    /// Marks a component dirty; the sole external write path into the
    /// scheduler.
    ///
    /// Returns `false` when the id is not part of the active graph.
    pub fn enqueue(&self, id: &ComponentId) -> bool {
        if self.graph.read().get(id).is_none() {
            return false;
        }
        self.queue.enqueue(id.clone());
        let depth = self.queue.len();
        self.health.observe_queue_depth(depth);
        self.telemetry.emit(ControllerEvent::ComponentEnqueued {
            id: id.clone(),
            queue_depth: depth,
        });
        true
    }

    /// Current export of a component, if it has one.
    pub fn export_of(&self, id: &ComponentId) -> Option<Arc<ExportValue>> {
        self.graph.read().get(id)?.export()
    }

    /// Health and last error of a component.
    pub fn health_of(&self, id: &ComponentId) -> Option<(ComponentHealth, Option<String>)> {
        let graph = self.graph.read();
        let node = graph.get(id)?;
        Some((node.health(), node.last_error()))
    }

    /// Ids in the active graph, sorted.
    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.graph.read().ids()
    }

    /// Snapshot of controller-wide health counters.
    pub fn health_snapshot(&self) -> HealthSnapshot {
        self.health.snapshot()
    }

    /// Shared handle to the health monitor, e.g. for the panic handler.
    pub fn health_handle(&self) -> SharedControllerHealth {
        Arc::clone(&self.health)
    }

    /// Number of components currently awaiting evaluation.
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    /// Cancels the loop and waits for the in-flight evaluation (if any) to
    /// finish.
    pub async fn stop(mut self) {
        info!("Stopping supervisor");
        self.shutdown.cancel();
        if let Some(handle) = self.loop_handle.take() {
            let _ = handle.await;
        }
        info!("Supervisor stopped");
    }

    fn seed(&self) {
        for id in self.graph.read().ids() {
            self.queue.enqueue(id.clone());
            let depth = self.queue.len();
            self.health.observe_queue_depth(depth);
            self.telemetry
                .emit(ControllerEvent::ComponentEnqueued { id, queue_depth: depth });
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("components", &self.graph.read().len())
            .field("queue_depth", &self.queue.len())
            .field("running", &self.loop_handle.is_some())
            .finish_non_exhaustive()
    }
}
