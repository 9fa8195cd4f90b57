//! PipeGraph - control plane for a telemetry pipeline agent.
//!
//! This library holds a live, declaratively-configured graph of pipeline
//! components (sources, processors, exporters, rule-sync controllers) whose
//! arguments may reference the outputs of other components. When
//! configuration or upstream state changes, only the affected subset of the
//! graph is re-evaluated; unaffected components keep running untouched.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Supervisor                              │
//! │                                                                  │
//! │  declared components ──► ┌──────────────┐                        │
//! │                          │ GraphBuilder │──► cycle? ──► rejected │
//! │                          └──────┬───────┘                        │
//! │                                 │ DAG                            │
//! │                                 ▼                                │
//! │  Enqueue(id) ──────────► ┌──────────────┐     ┌───────────────┐  │
//! │  (any trigger)           │  DirtyQueue  │◄────│ propagation   │  │
//! │                          └──────┬───────┘     └───────▲───────┘  │
//! │                                 │ Dequeue                │        │
//! │                                 ▼                        │        │
//! │                          ┌──────────────┐   export       │        │
//! │                          │ Evaluation   │── changed ─────┘        │
//! │                          │ Loop         │── unchanged ─► stop     │
//! │                          └──────────────┘                        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # High-Level API
//!
//! For most use cases, the [`supervisor`] module provides the entry point:
//!
//! ```ignore
//! use pipegraph::component::ComponentRegistry;
//! use pipegraph::rules::InMemoryRuleStore;
//! use pipegraph::supervisor::{Supervisor, SupervisorOptions};
//!
//! let registry = ComponentRegistry::builtin(Arc::new(InMemoryRuleStore::new()));
//! let mut supervisor = Supervisor::new(registry, SupervisorOptions::default());
//! supervisor.start(&pipeline.components)?;
//!
//! // ... components converge in the background ...
//!
//! supervisor.stop().await;
//! ```

pub mod component;
pub mod config;
pub mod controller;
pub mod logging;
pub mod panic;
pub mod rules;
pub mod supervisor;

/// Version of the PipeGraph library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
