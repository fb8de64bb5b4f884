//! Contract checking for strata.
//!
//! A contract is a rule about which modules may import which. This crate holds the
//! built-in contract types, the option fields they are configured with, the chain
//! diagnostics they share, and the engine that checks a whole configuration against an
//! import graph:
//!
//! - `forbidden`, `layers`, `independence`, `multi_layers`: chain-based rules
//! - `acyclic`, `tree`, `acyclic_siblings`, `modular`: cycle rules
//! - `protected`, `standalone`: direct-import rules

pub mod alerting;
pub mod chains;
pub mod contract;
pub mod contracts;
pub mod engine;
pub mod fields;
pub mod types;

#[cfg(test)]
mod test_support;

pub use contract::{Contract, ContractRegistry};
pub use engine::{create_report, lint, EngineError, Report, RunOptions};
