//! Controller and per-component health tracking.
//!
//! Per-component health reflects the outcome of the most recent evaluation;
//! controller-wide counters feed the status dashboard and the panic
//! handler's state dump.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Health of a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentHealth {
    /// The component has not completed an evaluation yet.
    Unevaluated,
    /// The most recent evaluation succeeded.
    Healthy,
    /// The most recent evaluation failed; the previous export is retained.
    Unhealthy,
}

impl ComponentHealth {
    /// Returns a string representation of the health state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentHealth::Unevaluated => "unevaluated",
            ComponentHealth::Healthy => "healthy",
            ComponentHealth::Unhealthy => "unhealthy",
        }
    }
}

/// Aggregate status of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Evaluations are succeeding normally.
    Healthy,
    /// Recent evaluations are predominantly failing.
    Degraded,
}

impl HealthStatus {
    /// Returns a string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
        }
    }
}

/// A point-in-time snapshot of controller health.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    /// Derived aggregate status.
    pub status: HealthStatus,
    /// Evaluations that completed successfully.
    pub evaluations_succeeded: u64,
    /// Evaluations that failed (update error, panic, timeout, bad config).
    pub evaluations_failed: u64,
    /// Evaluations deferred because a dependency had no export yet.
    pub evaluations_deferred: u64,
    /// Successful evaluations whose export differed from the previous one.
    pub exports_changed: u64,
    /// Highest dirty-set depth observed.
    pub peak_queue_depth: usize,
    /// Time since the controller started.
    pub uptime: Duration,
}

/// Controller health monitor with atomic counters.
///
/// Thread-safe; shared between the evaluation loop, the supervisor, and
/// observers such as the panic handler.
pub struct ControllerHealth {
    evaluations_succeeded: AtomicU64,
    evaluations_failed: AtomicU64,
    evaluations_deferred: AtomicU64,
    exports_changed: AtomicU64,
    peak_queue_depth: AtomicUsize,
    start_time: Instant,
}

impl Default for ControllerHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerHealth {
    /// Creates a new health monitor.
    pub fn new() -> Self {
        Self {
            evaluations_succeeded: AtomicU64::new(0),
            evaluations_failed: AtomicU64::new(0),
            evaluations_deferred: AtomicU64::new(0),
            exports_changed: AtomicU64::new(0),
            peak_queue_depth: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a successful evaluation.
    pub fn evaluation_succeeded(&self, changed: bool) {
        self.evaluations_succeeded.fetch_add(1, Ordering::Relaxed);
        if changed {
            self.exports_changed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a failed evaluation.
    pub fn evaluation_failed(&self) {
        self.evaluations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an evaluation deferred on an unavailable dependency.
    pub fn evaluation_deferred(&self) {
        self.evaluations_deferred.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the dirty-set depth seen at an enqueue.
    pub fn observe_queue_depth(&self, depth: usize) {
        let mut peak = self.peak_queue_depth.load(Ordering::Relaxed);
        while depth > peak {
            match self.peak_queue_depth.compare_exchange_weak(
                peak,
                depth,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }

    /// Gets a snapshot of current health.
    pub fn snapshot(&self) -> HealthSnapshot {
        let evaluations_succeeded = self.evaluations_succeeded.load(Ordering::Relaxed);
        let evaluations_failed = self.evaluations_failed.load(Ordering::Relaxed);

        let status = if evaluations_failed > 0 && evaluations_failed >= evaluations_succeeded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthSnapshot {
            status,
            evaluations_succeeded,
            evaluations_failed,
            evaluations_deferred: self.evaluations_deferred.load(Ordering::Relaxed),
            exports_changed: self.exports_changed.load(Ordering::Relaxed),
            peak_queue_depth: self.peak_queue_depth.load(Ordering::Relaxed),
            uptime: self.start_time.elapsed(),
        }
    }
}

/// Shared controller health monitor.
pub type SharedControllerHealth = Arc<ControllerHealth>;
