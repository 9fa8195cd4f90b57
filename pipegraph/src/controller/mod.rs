//! Dependency-aware re-evaluation scheduler.
//!
//! The controller drives declared components from "dirty" to "converged":
//!
//! - [`DirtyQueue`] coalesces change notifications per component id and
//!   hands them to the evaluation loop with blocking, cancelable retrieval.
//! - [`DependencyGraph`] holds the component nodes and the directed edges
//!   derived from argument references; it is validated acyclic at build time
//!   and never mutated while active.
//! - [`EvaluationLoop`] dequeues dirty ids, resolves each node's arguments
//!   from its dependencies' current exports, invokes the component's update
//!   capability, and propagates dirtiness to dependents when the export
//!   changed.
//!
//! Failures stay local: a failing component keeps its previous export
//! visible to dependents, is marked unhealthy, and never stops the loop or
//! touches other nodes' exports.

mod config;
mod error;
mod evaluator;
mod graph;
mod health;
mod node;
mod queue;
mod telemetry;

pub use config::{ControllerConfig, DEFAULT_EVALUATION_TIMEOUT_SECS, DEFAULT_QUEUE_WARN_DEPTH};
pub use error::{ControllerError, EvaluateError, ShutdownError};
pub use evaluator::EvaluationLoop;
pub(crate) use evaluator::SharedGraph;
pub use graph::DependencyGraph;
pub use health::{
    ComponentHealth, ControllerHealth, HealthSnapshot, HealthStatus, SharedControllerHealth,
};
pub use node::ComponentNode;
pub use queue::DirtyQueue;
pub use telemetry::{
    ControllerEvent, MultiplexTelemetrySink, NullTelemetrySink, TelemetrySink,
    TracingTelemetrySink,
};
