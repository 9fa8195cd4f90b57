//! Panic handler for state logging.
//!
//! Component panics during evaluation are caught at the node boundary and
//! never reach this hook; it exists for unexpected panics elsewhere in the
//! process. The hook writes the panic location and a controller health
//! snapshot to stderr, then chains to the default panic behavior.
//!
//! The hook uses a global callback registry since panic hooks must be
//! `'static`; the supervisor registers its health monitor at startup.

use std::io::Write;
use std::panic::{self, PanicHookInfo};
use std::sync::{Mutex, OnceLock};

use crate::controller::HealthSnapshot;

type SnapshotCallback = Box<dyn Fn() -> HealthSnapshot + Send + Sync>;

/// Global callback registry for panic-time state capture.
static SNAPSHOT_CALLBACK: OnceLock<Mutex<Option<SnapshotCallback>>> = OnceLock::new();

/// Initializes the panic handler.
///
/// Should be called once early in application startup; subsequent calls
/// keep re-wrapping the current hook and are best avoided.
pub fn init() {
    let _ = SNAPSHOT_CALLBACK.get_or_init(|| Mutex::new(None));

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
        handle_panic(info);
        original_hook(info);
    }));
}

/// Registers the callback used to capture controller health on panic.
pub fn set_health_callback<F>(callback: F)
where
    F: Fn() -> HealthSnapshot + Send + Sync + 'static,
{
    if let Some(registry) = SNAPSHOT_CALLBACK.get() {
        if let Ok(mut guard) = registry.lock() {
            *guard = Some(Box::new(callback));
        }
    }
}

/// Writes panic information and controller state to stderr.
fn handle_panic(info: &PanicHookInfo<'_>) {
    // Write to stderr directly since logging may be broken mid-panic.
    let mut stderr = std::io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "━━━ PipeGraph Panic ━━━");
    if let Some(location) = info.location() {
        let _ = writeln!(
            stderr,
            "Location: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
    }
    if let Some(message) = info.payload().downcast_ref::<&str>() {
        let _ = writeln!(stderr, "Message: {}", message);
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        let _ = writeln!(stderr, "Message: {}", message);
    }

    if let Some(registry) = SNAPSHOT_CALLBACK.get() {
        if let Ok(guard) = registry.lock() {
            if let Some(ref callback) = *guard {
                let snapshot = callback();
                let _ = writeln!(stderr, "━━━ Controller State ━━━");
                let _ = writeln!(stderr, "Status:                {}", snapshot.status.as_str());
                let _ = writeln!(
                    stderr,
                    "Evaluations succeeded: {}",
                    snapshot.evaluations_succeeded
                );
                let _ = writeln!(
                    stderr,
                    "Evaluations failed:    {}",
                    snapshot.evaluations_failed
                );
                let _ = writeln!(
                    stderr,
                    "Evaluations deferred:  {}",
                    snapshot.evaluations_deferred
                );
                let _ = writeln!(stderr, "Exports changed:       {}", snapshot.exports_changed);
                let _ = writeln!(stderr, "Peak queue depth:      {}", snapshot.peak_queue_depth);
                let _ = writeln!(stderr, "Uptime:                {:?}", snapshot.uptime);
            }
        }
    }

    let _ = writeln!(stderr, "━━━ End of PipeGraph Panic ━━━");
    let _ = stderr.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerHealth;
    use std::sync::Arc;

    #[test]
    fn test_health_callback_registration() {
        init();

        let health = Arc::new(ControllerHealth::new());
        health.evaluation_succeeded(true);

        let captured = Arc::clone(&health);
        set_health_callback(move || captured.snapshot());

        let registry = SNAPSHOT_CALLBACK.get().unwrap();
        let guard = registry.lock().unwrap();
        let callback = guard.as_ref().expect("callback should be registered");
        assert_eq!(callback().evaluations_succeeded, 1);
    }
}
