//! `graph` command - print the resolved nodes and edges.

use crate::error::CliError;
use pipegraph::component::ComponentRegistry;
use pipegraph::config::PipelineFile;
use pipegraph::controller::DependencyGraph;
use pipegraph::rules::InMemoryRuleStore;
use std::path::Path;
use std::sync::Arc;

/// Prints each component with its dependencies and dependents.
pub fn execute(config_path: &Path) -> Result<(), CliError> {
    let file = PipelineFile::load(config_path)?;

    let registry = ComponentRegistry::builtin(Arc::new(InMemoryRuleStore::new()));
    let graph = DependencyGraph::build(&registry, &file.components)?;

    println!("{} component(s), {} edge(s)", graph.len(), graph.edge_count());
    for id in graph.ids() {
        let Some(node) = graph.get(&id) else { continue };
        println!("  {} ({})", id, node.kind());
        for dependency in graph.dependencies_of(&id) {
            println!("    <- {dependency}");
        }
        for dependent in graph.dependents_of(&id) {
            println!("    -> {dependent}");
        }
    }
    Ok(())
}
