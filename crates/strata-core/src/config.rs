//! Configuration file loading for strata.
//!
//! Reads `.strata/contracts.json`: the session options (root packages, whether external
//! packages are part of the graph) and the list of declared contracts. Contract options
//! are kept raw here; each contract type validates its own.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default location of the contracts file, relative to the project root.
pub const DEFAULT_CONFIG_PATH: &str = ".strata/contracts.json";

/// Default location of the graph snapshot, relative to the project root.
pub const DEFAULT_GRAPH_PATH: &str = ".strata/graph.json";

/// A raw option value: a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Single(String),
    Multiple(Vec<String>),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Single(value.to_string())
    }
}

impl From<Vec<&str>> for RawValue {
    fn from(values: Vec<&str>) -> Self {
        RawValue::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for RawValue {
    fn from(values: Vec<String>) -> Self {
        RawValue::Multiple(values)
    }
}

/// Boolean options may be written as JSON booleans or as `"true"`/`"false"` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    /// The flag's value. Text other than `true`/`false` (any case) is rejected.
    pub fn parse(&self, name: &str) -> Result<bool, ConfigError> {
        match self {
            Flag::Bool(b) => Ok(*b),
            Flag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(ConfigError::InvalidFlag {
                    name: name.to_string(),
                    value: s.clone(),
                }),
            },
        }
    }
}

/// Options shared by every contract in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionOptions {
    #[serde(default)]
    pub root_packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_external_packages: Option<Flag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_timings: Option<Flag>,
}

impl SessionOptions {
    fn flags(&self) -> [(&'static str, Option<&Flag>); 2] {
        [
            ("include_external_packages", self.include_external_packages.as_ref()),
            ("show_timings", self.show_timings.as_ref()),
        ]
    }

    /// Reject flags that are not booleans.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, flag) in self.flags() {
            if let Some(flag) = flag {
                flag.parse(name)?;
            }
        }
        Ok(())
    }

    /// Unset and invalid flags read as false; [`SessionOptions::validate`] reports the latter.
    pub fn include_external_packages(&self) -> bool {
        flag_value(self.include_external_packages.as_ref(), "include_external_packages")
    }

    pub fn show_timings(&self) -> bool {
        flag_value(self.show_timings.as_ref(), "show_timings")
    }
}

fn flag_value(flag: Option<&Flag>, name: &str) -> bool {
    flag.map_or(false, |f| f.parse(name).unwrap_or(false))
}

/// One declared contract, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub contract_type: String,
    #[serde(flatten)]
    pub options: BTreeMap<String, RawValue>,
}

impl ContractOptions {
    pub fn new(name: &str, contract_type: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            contract_type: contract_type.to_string(),
            options: BTreeMap::new(),
        }
    }

    /// Builder-style option setter, mostly for tests and embedding.
    pub fn with(mut self, key: &str, value: impl Into<RawValue>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// The id used by `--contract`; falls back to the contract name.
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}

/// Top-level strata configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserOptions {
    #[serde(flatten)]
    pub session: SessionOptions,
    #[serde(default)]
    pub contracts: Vec<ContractOptions>,
}

/// Errors reading or validating the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Could not parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("No root packages configured; set \"root_packages\" or \"root_package\".")]
    MissingRootPackages,

    #[error("Duplicate contract id '{0}'.")]
    DuplicateContractId(String),

    #[error("Invalid value for {name}: expected \"true\" or \"false\", got \"{value}\".")]
    InvalidFlag { name: String, value: String },
}

impl UserOptions {
    /// Load and normalize the configuration at `path`.
    ///
    /// Unlike graph snapshots, a missing or unreadable configuration is an error: there is
    /// nothing sensible to check without it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let options: UserOptions =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        options.normalized()
    }

    /// Fold `root_package` into `root_packages`, check session flags and that contract ids
    /// are unique.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        self.session.validate()?;
        if let Some(root) = self.session.root_package.take() {
            if !self.session.root_packages.contains(&root) {
                self.session.root_packages.insert(0, root);
            }
        }
        if self.session.root_packages.is_empty() {
            return Err(ConfigError::MissingRootPackages);
        }
        let mut seen = std::collections::HashSet::new();
        for contract in &self.contracts {
            if !seen.insert(contract.id().to_string()) {
                return Err(ConfigError::DuplicateContractId(contract.id().to_string()));
            }
        }
        Ok(self)
    }
}
