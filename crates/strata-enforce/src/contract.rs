//! The contract abstraction, option validation, and the contract-type registry.

use std::collections::BTreeMap;
use std::time::Duration;

use strata_core::config::{ContractOptions, SessionOptions};
use strata_core::graph::ImportGraph;

use crate::contracts;
use crate::fields::Field;
use crate::types::{ContractCheck, ContractError, FieldError};

/// A declared architectural rule, validated and ready to check.
pub trait Contract: Send + Sync {
    fn name(&self) -> &str;

    /// The registry name of this contract's type, e.g. `"layers"`.
    fn type_name(&self) -> &'static str;

    /// Check the contract against `graph`.
    ///
    /// The graph belongs to this check alone and may be mutated freely.
    fn check(&self, graph: &mut ImportGraph, verbose: bool) -> Result<ContractCheck, ContractError>;

    /// Human-readable explanation of a broken check, one entry per output line.
    fn render_broken_contract(&self, check: &ContractCheck) -> Vec<String>;
}

/// Builds a contract from its declared options.
pub type ContractFactory =
    fn(&ContractOptions, &SessionOptions) -> Result<Box<dyn Contract>, ContractError>;

/// Reads declared options field by field, collecting every validation failure.
///
/// ```ignore
/// let mut reader = OptionReader::new(options);
/// let modules = reader.required("modules", ListField(ModuleField));
/// let as_packages = reader.with_default("as_packages", BooleanField, true);
/// reader.finish()?;
/// ```
pub struct OptionReader<'a> {
    options: &'a ContractOptions,
    errors: Vec<FieldError>,
}

impl<'a> OptionReader<'a> {
    pub fn new(options: &'a ContractOptions) -> Self {
        Self {
            options,
            errors: Vec::new(),
        }
    }

    /// A field that must be present. Absent or invalid values are recorded as errors.
    pub fn required<F: Field>(&mut self, name: &str, field: F) -> Option<F::Value> {
        if !self.options.options.contains_key(name) {
            self.fail(name, "This is a required field.");
            return None;
        }
        self.optional(name, field)
    }

    /// A field that may be absent.
    pub fn optional<F: Field>(&mut self, name: &str, field: F) -> Option<F::Value> {
        let raw = self.options.options.get(name)?;
        match field.parse(raw) {
            Ok(value) => Some(value),
            Err(message) => {
                self.fail(name, &message);
                None
            }
        }
    }

    /// A field that falls back to `default` when absent.
    pub fn with_default<F: Field>(&mut self, name: &str, field: F, default: F::Value) -> F::Value {
        self.optional(name, field).unwrap_or(default)
    }

    fn fail(&mut self, name: &str, message: &str) {
        self.errors.push(FieldError {
            field: name.to_string(),
            message: message.to_string(),
        });
    }

    /// Succeed only if every field read so far was valid.
    pub fn finish(self) -> Result<(), ContractError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ContractError::InvalidOptions(self.errors))
        }
    }
}

/// Maps contract type names to factories.
///
/// Built-in types are registered by [`ContractRegistry::with_builtins`]; later
/// registrations under the same name replace earlier ones.
#[derive(Clone, Default)]
pub struct ContractRegistry {
    factories: BTreeMap<String, ContractFactory>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every contract type shipped with strata.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(contracts::forbidden::TYPE_NAME, contracts::forbidden::build);
        registry.register(contracts::layers::TYPE_NAME, contracts::layers::build);
        registry.register(contracts::independence::TYPE_NAME, contracts::independence::build);
        registry.register(contracts::acyclic::TYPE_NAME, contracts::acyclic::build);
        registry.register(contracts::tree::TYPE_NAME, contracts::tree::build);
        registry.register(
            contracts::acyclic_siblings::TYPE_NAME,
            contracts::acyclic_siblings::build,
        );
        registry.register(contracts::protected::TYPE_NAME, contracts::protected::build);
        registry.register(contracts::standalone::TYPE_NAME, contracts::standalone::build);
        registry.register(contracts::modular::TYPE_NAME, contracts::modular::build);
        registry.register(contracts::multi_layers::TYPE_NAME, contracts::multi_layers::build);
        registry
    }

    pub fn register(&mut self, type_name: &str, factory: ContractFactory) {
        if self
            .factories
            .insert(type_name.to_string(), factory)
            .is_some()
        {
            tracing::debug!(type_name, "contract type replaced");
        }
    }

    /// The registered name for `type_name`. Hyphens and underscores are interchangeable, so
    /// `multi-layers` finds `multi_layers`.
    pub fn canonical_name(&self, type_name: &str) -> Option<&str> {
        self.factories
            .get_key_value(type_name)
            .or_else(|| self.factories.get_key_value(&type_name.replace('-', "_")))
            .map(|(name, _)| name.as_str())
    }

    pub fn get(&self, type_name: &str) -> Result<ContractFactory, ContractError> {
        self.canonical_name(type_name)
            .and_then(|name| self.factories.get(name))
            .copied()
            .ok_or_else(|| ContractError::NoSuchContractType(type_name.to_string()))
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Look up the declared type and build the contract.
    pub fn build(
        &self,
        options: &ContractOptions,
        session: &SessionOptions,
    ) -> Result<Box<dyn Contract>, ContractError> {
        let factory = self.get(&options.contract_type)?;
        factory(options, session)
    }
}

/// Progress message: `info` when the check is verbose, `debug` otherwise.
pub(crate) fn progress(verbose: bool, message: &str) {
    if verbose {
        tracing::info!("{}", message);
    } else {
        tracing::debug!("{}", message);
    }
}

/// `"12ms"` below a second, `"1.2s"` above.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// `"1 cycle"`, `"2 cycles"`.
pub(crate) fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}
