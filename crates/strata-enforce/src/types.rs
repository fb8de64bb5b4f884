use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strata_core::expression::ExpressionError;
use strata_core::graph_cycles::CycleBreaker;
use strata_core::types::{GraphError, PackageDependency};

/// One hop of an import chain, with every line the import appears on.
///
/// A hop recorded without line details carries a single `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub importer: String,
    pub imported: String,
    pub line_numbers: Vec<Option<u32>>,
}

impl Link {
    pub fn new(importer: &str, imported: &str, line_numbers: Vec<Option<u32>>) -> Self {
        Self {
            importer: importer.to_string(),
            imported: imported.to_string(),
            line_numbers,
        }
    }

    /// `l.3, l.5`, with `l.?` for an unknown line.
    pub fn format_line_numbers(&self) -> String {
        self.line_numbers
            .iter()
            .map(|n| match n {
                Some(n) => format!("l.{n}"),
                None => "l.?".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A chain of links, plus alternative first and last hops that collapse into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DetailedChain {
    pub chain: Vec<Link>,
    pub extra_firsts: Vec<Link>,
    pub extra_lasts: Vec<Link>,
}

impl DetailedChain {
    pub fn direct(link: Link) -> Self {
        Self {
            chain: vec![link],
            extra_firsts: Vec::new(),
            extra_lasts: Vec::new(),
        }
    }
}

/// Every chain by which `downstream` illegally reaches `upstream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainViolation {
    pub downstream: String,
    pub upstream: String,
    pub chains: Vec<DetailedChain>,
}

/// Cycles grouped by their common parent package and the siblings they run through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleFamily {
    pub parent: String,
    pub siblings: Vec<String>,
    pub cycles: Vec<Vec<String>>,
}

/// A cycle breaker rolled up to child-package granularity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiblingDependency {
    pub downstream: String,
    pub upstream: String,
    pub num_imports: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageSummary {
    pub package: String,
    pub dependencies: Vec<SiblingDependency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedViolation {
    pub top_level_module: String,
    pub illegal_links: Vec<Link>,
    /// The wildcard expression the protected module was matched by, if any.
    pub original_expression: Option<String>,
}

/// Per-type evidence attached to a check. Only rendering reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMetadata {
    Forbidden {
        invalid_chains: Vec<ChainViolation>,
    },
    Layers {
        invalid_dependencies: Vec<ChainViolation>,
        undeclared_modules: BTreeSet<String>,
    },
    Independence {
        invalid_chains: Vec<ChainViolation>,
    },
    Acyclic {
        cycle_families: Vec<CycleFamily>,
    },
    Tree {
        cycles: Vec<Vec<String>>,
    },
    AcyclicSiblings {
        cycle_breakers_by_package: BTreeMap<String, BTreeSet<CycleBreaker>>,
        summaries: Vec<PackageSummary>,
    },
    Protected {
        illegal_imports: Vec<ProtectedViolation>,
    },
    Standalone {
        violations: BTreeMap<String, Vec<PackageDependency>>,
    },
    Modular {
        violations: BTreeMap<String, Vec<String>>,
    },
    MultiLayers {
        violations: Vec<ChainViolation>,
    },
}

/// Outcome of checking one contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCheck {
    pub kept: bool,
    pub warnings: Vec<String>,
    pub metadata: CheckMetadata,
}

/// A single option that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors raised while building or checking contracts.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// Every invalid option of one contract, collected together.
    #[error("Invalid contract options: {}", join_field_errors(.0))]
    InvalidOptions(Vec<FieldError>),

    #[error("No contract type named '{0}' is registered.")]
    NoSuchContractType(String),

    #[error("{0}")]
    MissingImport(String),

    #[error("Module '{0}' does not exist.")]
    ModuleNotFound(String),

    #[error("{0}")]
    UnmatchedExpression(String),

    /// A structural assumption of the contract does not hold for this graph.
    #[error("{0}")]
    Precondition(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
