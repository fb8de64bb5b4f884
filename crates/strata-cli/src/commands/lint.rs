use std::path::{Path, PathBuf};

use strata_core::builder::SnapshotBuilder;
use strata_core::config::UserOptions;
use strata_enforce::engine::{lint, EngineError, Report, RunOptions};
use strata_enforce::ContractRegistry;
use strata_output::OutputFormatter;

/// Arguments of `strata lint`.
#[derive(Debug, Clone)]
pub(crate) struct LintArgs {
    pub config: PathBuf,
    pub graph: PathBuf,
    pub contracts: Vec<String>,
    pub show_timings: bool,
    pub parallel: bool,
}

/// Run `strata lint`: check every configured contract against the graph snapshot.
///
/// Exit codes: 0 when every contract is kept, 1 when one is broken or misconfigured,
/// 2 when the run could not be performed.
pub fn run(formatter: &dyn OutputFormatter, verbose: bool, args: LintArgs) -> i32 {
    match execute(verbose, &args) {
        Ok(report) => {
            print!("{}", formatter.format_report(&report));
            exit_code(&report)
        }
        Err(e) => {
            eprintln!("strata lint: {e}");
            2
        }
    }
}

fn execute(verbose: bool, args: &LintArgs) -> Result<Report, EngineError> {
    let user_options = UserOptions::load(&args.config)?;
    tracing::debug!(
        config = %args.config.display(),
        contracts = user_options.contracts.len(),
        "loaded configuration"
    );
    let run = RunOptions {
        limit_to_contracts: args.contracts.clone(),
        verbose,
        parallel: args.parallel,
        show_timings: args.show_timings,
    };
    lint(
        &SnapshotBuilder::new(Path::new(&args.graph)),
        &user_options,
        &ContractRegistry::with_builtins(),
        &run,
    )
}

fn exit_code(report: &Report) -> i32 {
    if report.passed() {
        0
    } else {
        1
    }
}
