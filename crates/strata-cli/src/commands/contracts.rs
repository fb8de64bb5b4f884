use std::collections::BTreeSet;
use std::path::Path;

use strata_core::config::{ConfigError, UserOptions};
use strata_enforce::ContractRegistry;
use strata_output::OutputFormatter;

/// Run `strata contracts`: list the registered contract types.
///
/// With a configuration, only the types it declares are listed, sorted.
pub fn run(formatter: &dyn OutputFormatter, config: Option<&Path>) -> i32 {
    let registry = ContractRegistry::with_builtins();
    match type_names(&registry, config) {
        Ok(names) => {
            print!("{}", formatter.format_contract_types(&names));
            0
        }
        Err(e) => {
            eprintln!("strata contracts: {e}");
            2
        }
    }
}

fn type_names<'a>(
    registry: &'a ContractRegistry,
    config: Option<&Path>,
) -> Result<Vec<&'a str>, ConfigError> {
    let Some(path) = config else {
        return Ok(registry.type_names().collect());
    };
    let user_options = UserOptions::load(path)?;
    let declared: BTreeSet<&str> = user_options
        .contracts
        .iter()
        .filter_map(|c| registry.canonical_name(&c.contract_type))
        .collect();
    Ok(declared.into_iter().collect())
}
