//! `check` command - validate a pipeline file without activating it.

use crate::error::CliError;
use pipegraph::component::ComponentRegistry;
use pipegraph::config::PipelineFile;
use pipegraph::controller::DependencyGraph;
use pipegraph::rules::InMemoryRuleStore;
use std::path::Path;
use std::sync::Arc;

/// Builds and validates the graph; nothing is evaluated.
pub fn execute(config_path: &Path) -> Result<(), CliError> {
    let file = PipelineFile::load(config_path)?;

    let registry = ComponentRegistry::builtin(Arc::new(InMemoryRuleStore::new()));
    let graph = DependencyGraph::build(&registry, &file.components)?;

    println!(
        "OK: {} component(s), {} edge(s)",
        graph.len(),
        graph.edge_count()
    );
    Ok(())
}
