//! `run` command - start the agent and evaluate until interrupted.

use crate::error::CliError;
use crate::runner::CliRunner;
use pipegraph::component::ComponentRegistry;
use pipegraph::rules::InMemoryRuleStore;
use pipegraph::supervisor::{Supervisor, SupervisorOptions, TaskGroup};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Interval between periodic health reports.
const HEALTH_REPORT_INTERVAL_SECS: u64 = 60;

/// Runs the pipeline until ctrl-c.
pub async fn execute(config_path: &Path, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path, debug)?;
    runner.log_startup("run");

    pipegraph::panic::init();

    let registry = ComponentRegistry::builtin(Arc::new(InMemoryRuleStore::new()));
    let options = SupervisorOptions {
        config: runner.file().controller_config(),
        ..SupervisorOptions::default()
    };
    let mut supervisor = Supervisor::new(registry, options);
    supervisor.start(&runner.file().components)?;

    let health = supervisor.health_handle();
    pipegraph::panic::set_health_callback({
        let health = Arc::clone(&health);
        move || health.snapshot()
    });

    // The signal waiter and the health reporter live and die together; the
    // first to exit (ctrl-c) interrupts the other.
    let mut group = TaskGroup::new();
    group.add("signal", |cancel| async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                info!("Interrupt received; shutting down");
                result.map_err(Into::into)
            }
            _ = cancel.cancelled() => Ok(()),
        }
    });
    group.add("health_reporter", move |cancel| async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(HEALTH_REPORT_INTERVAL_SECS));
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = health.snapshot();
                    info!(
                        status = snapshot.status.as_str(),
                        evaluations_succeeded = snapshot.evaluations_succeeded,
                        evaluations_failed = snapshot.evaluations_failed,
                        exports_changed = snapshot.exports_changed,
                        peak_queue_depth = snapshot.peak_queue_depth,
                        "Controller health"
                    );
                }
                _ = cancel.cancelled() => return Ok(()),
            }
        }
    });

    let result = group.run().await;
    supervisor.stop().await;
    result?;
    Ok(())
}
