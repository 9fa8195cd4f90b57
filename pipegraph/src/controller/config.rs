//! Controller configuration.

use std::time::Duration;

/// Default per-evaluation deadline, in seconds.
///
/// A single evaluation worker accepts blocking component updates as a
/// bounded-latency tradeoff; the deadline bounds how long one component can
/// hold up the rest of the graph.
pub const DEFAULT_EVALUATION_TIMEOUT_SECS: u64 = 30;

/// Default queue depth above which a warning is logged.
pub const DEFAULT_QUEUE_WARN_DEPTH: usize = 1024;

/// Configuration for the evaluation loop.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Deadline applied to each component update call.
    pub evaluation_timeout: Duration,

    /// Dirty-set depth that triggers a backlog warning.
    pub queue_warn_depth: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            evaluation_timeout: Duration::from_secs(DEFAULT_EVALUATION_TIMEOUT_SECS),
            queue_warn_depth: DEFAULT_QUEUE_WARN_DEPTH,
        }
    }
}
