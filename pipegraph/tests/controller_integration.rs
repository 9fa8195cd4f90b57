//! Integration tests for the controller workflow.
//!
//! These tests drive the public supervisor API end to end:
//! - Startup seeding and chain convergence
//! - Propagation on changed exports, and only on changed exports
//! - Failure isolation with last-known-good exports
//! - Reload validation (cycle rejection) and atomic swap

use pipegraph::component::{
    Component, ComponentDecl, ComponentId, ComponentRegistry, UpdateContext, UpdateError,
    UpdateFuture,
};
use pipegraph::controller::{ComponentHealth, ControllerConfig, ControllerError, NullTelemetrySink};
use pipegraph::supervisor::{Supervisor, SupervisorOptions};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Test Helpers
// =============================================================================

/// Source that exports a shared value readable and writable by the test.
struct SharedSource {
    value: Arc<AtomicUsize>,
}

impl Component for SharedSource {
    fn kind(&self) -> &str {
        "shared_source"
    }

    fn update<'a>(&'a mut self, _cx: UpdateContext) -> UpdateFuture<'a> {
        let value = self.value.load(Ordering::SeqCst);
        Box::pin(async move { Ok(json!({ "value": value })) })
    }
}

/// Processor that doubles its numeric input and counts evaluations.
struct Doubler {
    evaluations: Arc<AtomicUsize>,
}

impl Component for Doubler {
    fn kind(&self) -> &str {
        "doubler"
    }

    fn update<'a>(&'a mut self, cx: UpdateContext) -> UpdateFuture<'a> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let input = cx.arguments["input"]
                .as_u64()
                .ok_or_else(|| UpdateError::new("input must be a number"))?;
            Ok(json!({ "value": input * 2 }))
        })
    }
}

/// Processor that fails while a flag is set, passing input through otherwise.
struct Breakable {
    broken: Arc<AtomicBool>,
}

impl Component for Breakable {
    fn kind(&self) -> &str {
        "breakable"
    }

    fn update<'a>(&'a mut self, cx: UpdateContext) -> UpdateFuture<'a> {
        let broken = self.broken.load(Ordering::SeqCst);
        Box::pin(async move {
            if broken {
                Err(UpdateError::new("injected failure"))
            } else {
                Ok(json!({ "value": cx.arguments["input"] }))
            }
        })
    }
}

struct Fixture {
    source_value: Arc<AtomicUsize>,
    doubler_evaluations: Arc<AtomicUsize>,
    broken: Arc<AtomicBool>,
    registry: ComponentRegistry,
}

impl Fixture {
    fn new() -> Self {
        let source_value = Arc::new(AtomicUsize::new(1));
        let doubler_evaluations = Arc::new(AtomicUsize::new(0));
        let broken = Arc::new(AtomicBool::new(false));

        let mut registry = ComponentRegistry::new();
        {
            let source_value = Arc::clone(&source_value);
            registry.register("shared_source", move |_, _| {
                Ok(Box::new(SharedSource {
                    value: Arc::clone(&source_value),
                }))
            });
        }
        {
            let doubler_evaluations = Arc::clone(&doubler_evaluations);
            registry.register("doubler", move |_, _| {
                Ok(Box::new(Doubler {
                    evaluations: Arc::clone(&doubler_evaluations),
                }))
            });
        }
        {
            let broken = Arc::clone(&broken);
            registry.register("breakable", move |_, _| {
                Ok(Box::new(Breakable {
                    broken: Arc::clone(&broken),
                }))
            });
        }

        Self {
            source_value,
            doubler_evaluations,
            broken,
            registry,
        }
    }

    fn options() -> SupervisorOptions {
        SupervisorOptions {
            config: ControllerConfig::default(),
            telemetry: Arc::new(NullTelemetrySink),
        }
    }
}

fn decl(id: &str, kind: &str, arguments: serde_json::Value) -> ComponentDecl {
    ComponentDecl {
        id: ComponentId::new(id),
        kind: kind.to_string(),
        arguments,
    }
}

async fn wait_until(what: &str, mut predicate: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !predicate() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test]
async fn test_chain_converges_after_source_change() {
    let fixture = Fixture::new();
    let mut supervisor = Supervisor::new(fixture.registry, Fixture::options());

    // A -> B -> C: C's arguments reference B's export, B's reference A's.
    supervisor
        .start(&[
            decl("shared_source.a", "shared_source", json!({})),
            decl(
                "doubler.b",
                "doubler",
                json!({ "input": "${shared_source.a.value}" }),
            ),
            decl("doubler.c", "doubler", json!({ "input": "${doubler.b.value}" })),
        ])
        .unwrap();

    let c = ComponentId::new("doubler.c");

    // Initial convergence: 1 -> 2 -> 4, regardless of seeding order.
    wait_until("initial convergence", || {
        supervisor
            .export_of(&c)
            .is_some_and(|export| export["value"] == json!(4))
    })
    .await;

    // Change the source and re-trigger it: the chain converges to the new
    // fixed point.
    fixture.source_value.store(5, Ordering::SeqCst);
    assert!(supervisor.enqueue(&ComponentId::new("shared_source.a")));

    wait_until("convergence after source change", || {
        supervisor
            .export_of(&c)
            .is_some_and(|export| export["value"] == json!(20))
    })
    .await;

    let b = ComponentId::new("doubler.b");
    assert_eq!(
        supervisor.export_of(&b).unwrap()["value"],
        json!(10),
        "intermediate export must be consistent with the source"
    );

    supervisor.stop().await;
}

#[tokio::test]
async fn test_unchanged_export_stops_propagation() {
    let fixture = Fixture::new();
    let mut supervisor = Supervisor::new(fixture.registry, Fixture::options());

    supervisor
        .start(&[
            decl("shared_source.a", "shared_source", json!({})),
            decl(
                "doubler.b",
                "doubler",
                json!({ "input": "${shared_source.a.value}" }),
            ),
        ])
        .unwrap();

    let b = ComponentId::new("doubler.b");
    wait_until("initial convergence", || {
        supervisor.export_of(&b).is_some()
    })
    .await;

    // Re-trigger the source without changing its value: the source
    // re-evaluates, its export is unchanged, and the doubler must not run.
    let evaluations_before = fixture.doubler_evaluations.load(Ordering::SeqCst);
    assert!(supervisor.enqueue(&ComponentId::new("shared_source.a")));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        fixture.doubler_evaluations.load(Ordering::SeqCst),
        evaluations_before,
        "unchanged export must not re-trigger dependents"
    );

    supervisor.stop().await;
}

#[tokio::test]
async fn test_failure_isolation_keeps_last_known_good() {
    let fixture = Fixture::new();
    let mut supervisor = Supervisor::new(fixture.registry, Fixture::options());

    supervisor
        .start(&[
            decl("shared_source.a", "shared_source", json!({})),
            decl(
                "breakable.b",
                "breakable",
                json!({ "input": "${shared_source.a.value}" }),
            ),
            decl(
                "doubler.c",
                "doubler",
                json!({ "input": "${breakable.b.value}" }),
            ),
        ])
        .unwrap();

    let b = ComponentId::new("breakable.b");
    let c = ComponentId::new("doubler.c");

    wait_until("initial convergence", || {
        supervisor.export_of(&c).is_some()
    })
    .await;
    let good_export = supervisor.export_of(&b).unwrap();
    let c_evaluations = fixture.doubler_evaluations.load(Ordering::SeqCst);

    // Break B and re-trigger it via a source change.
    fixture.broken.store(true, Ordering::SeqCst);
    fixture.source_value.store(9, Ordering::SeqCst);
    assert!(supervisor.enqueue(&ComponentId::new("shared_source.a")));

    wait_until("B marked unhealthy", || {
        supervisor
            .health_of(&b)
            .is_some_and(|(health, _)| health == ComponentHealth::Unhealthy)
    })
    .await;

    // B's export stays at its last successful value, the error is recorded,
    // and C is not re-triggered by the failure.
    assert_eq!(supervisor.export_of(&b).unwrap(), good_export);
    let (_, last_error) = supervisor.health_of(&b).unwrap();
    assert!(last_error.is_some_and(|err| err.contains("injected failure")));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        fixture.doubler_evaluations.load(Ordering::SeqCst),
        c_evaluations,
        "failure must not propagate to dependents"
    );

    // Repair B and re-trigger: the chain recovers.
    fixture.broken.store(false, Ordering::SeqCst);
    assert!(supervisor.enqueue(&b));
    wait_until("B healthy again", || {
        supervisor
            .health_of(&b)
            .is_some_and(|(health, _)| health == ComponentHealth::Healthy)
    })
    .await;
    wait_until("C consistent with repaired B", || {
        supervisor
            .export_of(&c)
            .is_some_and(|export| export["value"] == json!(18))
    })
    .await;

    supervisor.stop().await;
}

#[tokio::test]
async fn test_cyclic_reload_is_rejected_and_graph_keeps_running() {
    let fixture = Fixture::new();
    let mut supervisor = Supervisor::new(fixture.registry, Fixture::options());

    supervisor
        .start(&[
            decl("shared_source.a", "shared_source", json!({})),
            decl(
                "doubler.b",
                "doubler",
                json!({ "input": "${shared_source.a.value}" }),
            ),
        ])
        .unwrap();

    let b = ComponentId::new("doubler.b");
    wait_until("initial convergence", || {
        supervisor.export_of(&b).is_some()
    })
    .await;

    let err = supervisor
        .reload(&[
            decl("doubler.x", "doubler", json!({ "input": "${doubler.y.value}" })),
            decl("doubler.y", "doubler", json!({ "input": "${doubler.x.value}" })),
        ])
        .await
        .unwrap_err();

    match err {
        ControllerError::Cycle { chain } => {
            assert_eq!(chain.first(), chain.last());
            assert!(chain.iter().any(|id| id == "doubler.x"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // The previous graph still serves and still converges on new input.
    fixture.source_value.store(3, Ordering::SeqCst);
    assert!(supervisor.enqueue(&ComponentId::new("shared_source.a")));
    wait_until("old graph still converging", || {
        supervisor
            .export_of(&b)
            .is_some_and(|export| export["value"] == json!(6))
    })
    .await;

    supervisor.stop().await;
}

#[tokio::test]
async fn test_reload_replaces_component_set() {
    let fixture = Fixture::new();
    let mut supervisor = Supervisor::new(fixture.registry, Fixture::options());

    supervisor
        .start(&[decl("shared_source.a", "shared_source", json!({}))])
        .unwrap();

    let a = ComponentId::new("shared_source.a");
    wait_until("initial convergence", || {
        supervisor.export_of(&a).is_some()
    })
    .await;

    // Swap to a new set that also references the surviving source.
    supervisor
        .reload(&[
            decl("shared_source.a", "shared_source", json!({})),
            decl(
                "doubler.new",
                "doubler",
                json!({ "input": "${shared_source.a.value}" }),
            ),
        ])
        .await
        .unwrap();

    let new_id = ComponentId::new("doubler.new");
    wait_until("new component converges", || {
        supervisor
            .export_of(&new_id)
            .is_some_and(|export| export["value"] == json!(2))
    })
    .await;

    let ids = supervisor.component_ids();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a) && ids.contains(&new_id));

    supervisor.stop().await;
}
