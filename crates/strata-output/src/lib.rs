//! Output formatters for strata reports.
//!
//! Two output modes:
//! - **Human** (default): headings, one result line per contract, then the details of
//!   every broken contract
//! - **JSON** (`--json`): machine-readable structured output

pub mod human;
pub(crate) mod human_helpers;
pub mod json;

use strata_enforce::engine::Report;

pub trait OutputFormatter {
    /// The whole report of a run.
    fn format_report(&self, report: &Report) -> String;
    /// The registered contract type names.
    fn format_contract_types(&self, type_names: &[&str]) -> String;
}
