//! Module and import expressions.
//!
//! An expression is a dotted module pattern in which a whole segment may be replaced by
//! `*` (exactly one segment) or `**` (zero or more segments). Import expressions pair two
//! module expressions as `"importer -> imported"`.
//!
//! Matching is delegated to `globset` by mapping dots onto path separators, so `*` never
//! crosses a segment boundary.

use std::collections::BTreeSet;

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::graph::ImportGraph;

/// Errors raised while parsing or resolving expressions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    #[error("A wildcard can only replace a whole module.")]
    PartialWildcard,

    #[error("Must be in the form \"package.importer -> package.imported\".")]
    MalformedImport,

    #[error("Module expressions cannot be empty.")]
    Empty,

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("The expression '{0}' did not match any modules.")]
    Unmatched(String),
}

/// A module pattern such as `mypackage.*.models` or `mypackage.**`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleExpression(String);

impl ModuleExpression {
    pub fn parse(raw: &str) -> Result<Self, ExpressionError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ExpressionError::Empty);
        }
        for segment in raw.split('.') {
            if segment.contains('*') && segment != "*" && segment != "**" {
                return Err(ExpressionError::PartialWildcard);
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_wildcard(&self) -> bool {
        self.0.contains('*')
    }

    /// Compile into a reusable matcher.
    pub fn matcher(&self) -> Result<ModuleMatcher, ExpressionError> {
        if !self.has_wildcard() {
            return Ok(ModuleMatcher::Literal(self.0.clone()));
        }
        let glob_text = self
            .0
            .split('.')
            .map(|segment| match segment {
                "*" | "**" => segment.to_string(),
                literal => escape_segment(literal),
            })
            .collect::<Vec<_>>()
            .join("/");
        let glob = GlobBuilder::new(&glob_text)
            .literal_separator(true)
            .build()
            .map_err(|e| ExpressionError::InvalidPattern {
                pattern: self.0.clone(),
                reason: e.to_string(),
            })?;
        Ok(ModuleMatcher::Glob(glob.compile_matcher()))
    }

    /// Convenience single-shot match. Prefer [`matcher`](Self::matcher) in loops.
    pub fn matches(&self, module: &str) -> bool {
        self.matcher().map(|m| m.is_match(module)).unwrap_or(false)
    }
}

impl std::fmt::Display for ModuleExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ModuleExpression {
    type Error = ExpressionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ModuleExpression::parse(&value)
    }
}

impl From<ModuleExpression> for String {
    fn from(value: ModuleExpression) -> Self {
        value.0
    }
}

/// Compiled form of a [`ModuleExpression`].
#[derive(Debug, Clone)]
pub enum ModuleMatcher {
    Literal(String),
    Glob(GlobMatcher),
}

impl ModuleMatcher {
    pub fn is_match(&self, module: &str) -> bool {
        match self {
            ModuleMatcher::Literal(name) => name == module,
            ModuleMatcher::Glob(glob) => glob.is_match(module.replace('.', "/")),
        }
    }
}

fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '?' | '[' | ']' | '{' | '}' | '\\' | '!' => {
                escaped.push('[');
                escaped.push(c);
                escaped.push(']');
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// An import pattern: `importer -> imported`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImportExpression {
    pub importer: ModuleExpression,
    pub imported: ModuleExpression,
}

impl ImportExpression {
    pub fn parse(raw: &str) -> Result<Self, ExpressionError> {
        let (importer, imported) = raw
            .split_once(" -> ")
            .ok_or(ExpressionError::MalformedImport)?;
        if importer.trim().is_empty() || imported.trim().is_empty() {
            return Err(ExpressionError::MalformedImport);
        }
        Ok(Self {
            importer: ModuleExpression::parse(importer)?,
            imported: ModuleExpression::parse(imported)?,
        })
    }

    pub fn has_wildcard(&self) -> bool {
        self.importer.has_wildcard() || self.imported.has_wildcard()
    }

    /// Every (importer, imported) pair of graph modules matched by the two sides.
    ///
    /// Without wildcards this is the identity pair, whether or not the modules exist.
    pub fn to_module_pairs(
        &self,
        graph: &ImportGraph,
    ) -> Result<Vec<(String, String)>, ExpressionError> {
        if !self.has_wildcard() {
            return Ok(vec![(
                self.importer.as_str().to_string(),
                self.imported.as_str().to_string(),
            )]);
        }
        let importer_matcher = self.importer.matcher()?;
        let imported_matcher = self.imported.matcher()?;
        let mut importers = Vec::new();
        let mut importeds = Vec::new();
        for module in graph.modules() {
            if importer_matcher.is_match(module) {
                importers.push(module.to_string());
            }
            if imported_matcher.is_match(module) {
                importeds.push(module.to_string());
            }
        }
        importers.sort();
        importeds.sort();
        let mut pairs = Vec::with_capacity(importers.len() * importeds.len());
        for importer in &importers {
            for imported in &importeds {
                pairs.push((importer.clone(), imported.clone()));
            }
        }
        Ok(pairs)
    }
}

impl std::fmt::Display for ImportExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.importer, self.imported)
    }
}

/// A concrete module resolved from an expression, remembering the expression it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedModule {
    pub name: String,
    pub expression: ModuleExpression,
}

/// Resolve module expressions to the graph modules they match.
///
/// With `as_packages`, descendants of every match are included as well. With
/// `raise_if_unmatched`, an expression that matches nothing is an error.
pub fn resolve_module_expressions<'a>(
    graph: &ImportGraph,
    expressions: impl IntoIterator<Item = &'a ModuleExpression>,
    as_packages: bool,
    raise_if_unmatched: bool,
) -> Result<BTreeSet<ResolvedModule>, ExpressionError> {
    let mut resolved = BTreeSet::new();
    for expression in expressions {
        let matcher = expression.matcher()?;
        let mut matched: Vec<String> = graph
            .modules()
            .filter(|m| matcher.is_match(m))
            .map(str::to_string)
            .collect();
        if matched.is_empty() && raise_if_unmatched {
            return Err(ExpressionError::Unmatched(expression.to_string()));
        }
        if as_packages {
            let mut with_descendants = Vec::new();
            for module in &matched {
                with_descendants.extend(graph.find_descendants(module));
            }
            matched.extend(with_descendants);
        }
        for name in matched {
            resolved.insert(ResolvedModule {
                name,
                expression: expression.clone(),
            });
        }
    }
    Ok(resolved)
}
