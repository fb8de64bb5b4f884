//! Typed parsers for raw contract options.
//!
//! Raw option values are always a string or a list of strings. A [`Field`] turns one raw
//! value into a typed value, or explains why it could not.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strata_core::config::RawValue;
use strata_core::expression::{ImportExpression, ModuleExpression};
use strata_core::types::Module;

/// Parses one raw option value.
pub trait Field {
    type Value;

    /// Parse `raw`, returning a user-facing message on failure.
    fn parse(&self, raw: &RawValue) -> Result<Self::Value, String>;
}

/// Reject lists; return the single string.
fn single(raw: &RawValue) -> Result<&str, String> {
    match raw {
        RawValue::Single(value) => Ok(value),
        RawValue::Multiple(_) => Err("Expected a single value, got multiple values.".to_string()),
    }
}

/// The items of a multi-value option.
///
/// A single string holding several lines is split into one item per non-empty line.
fn items(raw: &RawValue) -> Vec<String> {
    match raw {
        RawValue::Multiple(values) => values.clone(),
        RawValue::Single(value) if value.contains('\n') => value
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        RawValue::Single(value) => vec![value.clone()],
    }
}

pub struct StringField;

impl Field for StringField {
    type Value = String;

    fn parse(&self, raw: &RawValue) -> Result<String, String> {
        single(raw).map(str::to_string)
    }
}

/// `"true"` / `"false"`, in any case.
pub struct BooleanField;

impl Field for BooleanField {
    type Value = bool;

    fn parse(&self, raw: &RawValue) -> Result<bool, String> {
        let value = single(raw)?.trim();
        if value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(format!("Could not parse a boolean from '{value}'."))
        }
    }
}

pub struct IntegerField {
    pub minimum: Option<i64>,
}

impl Field for IntegerField {
    type Value = i64;

    fn parse(&self, raw: &RawValue) -> Result<i64, String> {
        let value = single(raw)?.trim();
        let parsed: i64 = value
            .parse()
            .map_err(|_| format!("Could not parse an integer from '{value}'."))?;
        if let Some(minimum) = self.minimum {
            if parsed < minimum {
                return Err(format!("Must be >= {minimum}."));
            }
        }
        Ok(parsed)
    }
}

/// One of a fixed set of string choices.
pub struct EnumField<T: 'static> {
    pub choices: &'static [(&'static str, T)],
}

impl<T: Copy> Field for EnumField<T> {
    type Value = T;

    fn parse(&self, raw: &RawValue) -> Result<T, String> {
        let value = single(raw)?.trim();
        self.choices
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, choice)| *choice)
            .ok_or_else(|| {
                let names: Vec<String> =
                    self.choices.iter().map(|(name, _)| format!("'{name}'")).collect();
                let expected = match names.split_last() {
                    Some((last, [])) => last.clone(),
                    Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
                    None => String::new(),
                };
                format!("Invalid value '{value}': expected {expected}.")
            })
    }
}

/// An ordered list; a single value is a one-item list.
pub struct ListField<F>(pub F);

impl<F: Field> Field for ListField<F> {
    type Value = Vec<F::Value>;

    fn parse(&self, raw: &RawValue) -> Result<Self::Value, String> {
        items(raw)
            .into_iter()
            .map(|item| self.0.parse(&RawValue::Single(item)))
            .collect()
    }
}

/// An unordered, deduplicated set; a single value is a one-item set.
pub struct SetField<F>(pub F);

impl<F> Field for SetField<F>
where
    F: Field,
    F::Value: Ord,
{
    type Value = BTreeSet<F::Value>;

    fn parse(&self, raw: &RawValue) -> Result<Self::Value, String> {
        items(raw)
            .into_iter()
            .map(|item| self.0.parse(&RawValue::Single(item)))
            .collect()
    }
}

pub struct ModuleField;

impl Field for ModuleField {
    type Value = Module;

    fn parse(&self, raw: &RawValue) -> Result<Module, String> {
        let value = single(raw)?.trim();
        if value.is_empty() {
            return Err("Module names cannot be empty.".to_string());
        }
        Ok(Module::new(value))
    }
}

pub struct ModuleExpressionField;

impl Field for ModuleExpressionField {
    type Value = ModuleExpression;

    fn parse(&self, raw: &RawValue) -> Result<ModuleExpression, String> {
        ModuleExpression::parse(single(raw)?).map_err(|e| e.to_string())
    }
}

/// `"importer -> imported"`, either side possibly a wildcard expression.
pub struct ImportExpressionField;

impl Field for ImportExpressionField {
    type Value = ImportExpression;

    fn parse(&self, raw: &RawValue) -> Result<ImportExpression, String> {
        ImportExpression::parse(single(raw)?.trim()).map_err(|e| e.to_string())
    }
}

/// A layer entry, relative to its container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleTail {
    pub name: String,
    pub is_optional: bool,
}

/// One rank of a layered architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub module_tails: BTreeSet<ModuleTail>,
    /// Whether siblings in this layer are forbidden from importing each other.
    pub is_independent: bool,
}

const INDEPENDENT_DELIMITER: char = '|';
const GROUPED_DELIMITER: char = ':';

/// `"a | b"` (independent siblings), `"a : b"` (grouped siblings), `"(c)"` (optional).
pub struct LayerField;

impl Field for LayerField {
    type Value = Layer;

    fn parse(&self, raw: &RawValue) -> Result<Layer, String> {
        let value = single(raw)?;
        let independent = value.contains(INDEPENDENT_DELIMITER);
        let grouped = value.contains(GROUPED_DELIMITER);
        if independent && grouped {
            return Err(
                "Layer cannot have a mixture of independent and non-independent elements."
                    .to_string(),
            );
        }
        let raw_tails: Vec<&str> = if independent {
            value.split(INDEPENDENT_DELIMITER).map(str::trim).collect()
        } else if grouped {
            value.split(GROUPED_DELIMITER).map(str::trim).collect()
        } else {
            vec![value.trim()]
        };

        let mut module_tails = BTreeSet::new();
        for raw_tail in raw_tails {
            let (name, is_optional) = match raw_tail
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
            {
                Some(inner) => (inner.trim(), true),
                None => (raw_tail, false),
            };
            if name.is_empty() {
                return Err("Layer names cannot be empty.".to_string());
            }
            module_tails.insert(ModuleTail {
                name: name.to_string(),
                is_optional,
            });
        }
        Ok(Layer {
            module_tails,
            is_independent: !grouped,
        })
    }
}

#[cfg(test)]
#[path = "fields_tests.rs"]
mod tests;
