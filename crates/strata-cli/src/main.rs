//! strata CLI: check architectural contracts against a module import graph.
//!
//! This binary provides the `strata` command with subcommands for linting, listing
//! contract types, and shell completion. See `strata --help` for usage.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli_args;
mod commands;

use cli_args::{Cli, Commands};
use commands::lint::LintArgs;

/// Environment variable overriding the log filter, e.g. `STRATA_LOG=strata_enforce=debug`.
const LOG_ENV: &str = "STRATA_LOG";

fn setup_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let formatter: Box<dyn strata_output::OutputFormatter> = if cli.json {
        Box::new(strata_output::json::JsonFormatter)
    } else {
        Box::new(strata_output::human::HumanFormatter)
    };

    let exit_code = match cli.command {
        Commands::Lint {
            config,
            graph,
            contracts,
            show_timings,
            parallel,
        } => commands::lint::run(
            &*formatter,
            cli.verbose,
            LintArgs {
                config,
                graph,
                contracts,
                show_timings,
                parallel,
            },
        ),
        Commands::Contracts { config } => commands::contracts::run(&*formatter, config.as_deref()),
        Commands::Completion { shell } => commands::completion::run(&shell),
    };

    std::process::exit(exit_code);
}
