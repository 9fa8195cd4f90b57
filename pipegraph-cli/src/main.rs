//! PipeGraph CLI - command-line interface.
//!
//! This binary provides a command-line interface to the PipeGraph library:
//! run a declared pipeline, validate it, or inspect its dependency graph.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "pipegraph")]
#[command(version = pipegraph::VERSION)]
#[command(about = "Dependency-aware telemetry pipeline agent", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline until interrupted
    Run {
        /// Path to the pipeline file
        #[arg(long, default_value = "pipeline.json")]
        config: PathBuf,

        /// Enable debug-level logging
        #[arg(long)]
        debug: bool,
    },

    /// Validate the pipeline file without running it
    Check {
        /// Path to the pipeline file
        #[arg(long, default_value = "pipeline.json")]
        config: PathBuf,
    },

    /// Print the resolved dependency graph
    Graph {
        /// Path to the pipeline file
        #[arg(long, default_value = "pipeline.json")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let result = match args.command {
        Command::Run { config, debug } => commands::run::execute(&config, debug).await,
        Command::Check { config } => commands::check::execute(&config),
        Command::Graph { config } => commands::graph::execute(&config),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
