use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "strata",
    version,
    about = "Check architectural contracts against a module import graph"
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as structured JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log progress while checking contracts
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Check the configured contracts and print a report
    Lint {
        /// Contracts configuration file
        #[arg(long, default_value = strata_core::config::DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Import graph snapshot
        #[arg(long, default_value = strata_core::config::DEFAULT_GRAPH_PATH)]
        graph: PathBuf,
        /// Only check the contract with this id (repeatable)
        #[arg(long = "contract", value_name = "ID")]
        contracts: Vec<String>,
        /// Report how long the graph build and each contract took
        #[arg(long)]
        show_timings: bool,
        /// Check contracts in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// List contract types (those used by a configuration, when given one)
    Contracts {
        /// Contracts configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate for (bash, zsh, fish, elvish, powershell)
        shell: String,
    },
}

#[cfg(test)]
#[path = "cli_args_tests.rs"]
mod tests;
