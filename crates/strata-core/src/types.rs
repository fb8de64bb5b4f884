use serde::{Deserialize, Serialize};

/// A dotted module name such as `mypackage.foo.bar`.
///
/// Equality, ordering, and hashing all follow the string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Module(String);

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// First component of the dotted name.
    pub fn root_package_name(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// The enclosing package. Top-level modules have no parent.
    pub fn parent(&self) -> Result<Module, ModuleError> {
        match self.0.rsplit_once('.') {
            Some((parent, _)) => Ok(Module(parent.to_string())),
            None => Err(ModuleError::NoParent(self.0.clone())),
        }
    }

    pub fn is_child_of(&self, module: &Module) -> bool {
        self.parent().map(|p| &p == module).unwrap_or(false)
    }

    pub fn is_descendant_of(&self, module: &Module) -> bool {
        is_descendant(&self.0, &module.0)
    }

    /// True if this module is the package itself or lives anywhere beneath it.
    pub fn is_in_package(&self, package: &Module) -> bool {
        self == package || self.is_descendant_of(package)
    }

    /// Number of dotted components.
    pub fn depth(&self) -> usize {
        self.0.split('.').count()
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Module {
    fn from(name: &str) -> Self {
        Module(name.to_string())
    }
}

impl From<String> for Module {
    fn from(name: String) -> Self {
        Module(name)
    }
}

impl AsRef<str> for Module {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// String-level descendant test shared by [`Module`] and the graph.
pub fn is_descendant(candidate: &str, ancestor: &str) -> bool {
    candidate.len() > ancestor.len() + 1
        && candidate.starts_with(ancestor)
        && candidate.as_bytes()[ancestor.len()] == b'.'
}

/// String-level package membership (equal to, or descendant of).
pub fn is_in_package(candidate: &str, package: &str) -> bool {
    candidate == package || is_descendant(candidate, package)
}

/// A single observed import between two modules.
///
/// Two imports between the same pair of modules on different lines are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DirectImport {
    pub importer: String,
    pub imported: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_contents: Option<String>,
}

impl DirectImport {
    pub fn new(importer: impl Into<String>, imported: impl Into<String>) -> Self {
        Self {
            importer: importer.into(),
            imported: imported.into(),
            line_number: None,
            line_contents: None,
        }
    }

    pub fn with_line(mut self, line_number: u32, line_contents: impl Into<String>) -> Self {
        self.line_number = Some(line_number);
        self.line_contents = Some(line_contents.into());
        self
    }
}

impl std::fmt::Display for DirectImport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line_number {
            Some(line) => write!(f, "{} -> {} (l.{})", self.importer, self.imported, line),
            None => write!(f, "{} -> {}", self.importer, self.imported),
        }
    }
}

/// A package-level dependency discovered between two layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageDependency {
    pub importer: String,
    pub imported: String,
}

/// Errors raised by module-name arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleError {
    #[error("Module {0} has no parent.")]
    NoParent(String),
}

/// Errors that can occur during graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Cannot {operation} a squashed module: {module}")]
    ModuleSquashed { operation: &'static str, module: String },

    #[error("Modules have shared descendants: {importer} and {imported}")]
    SharedDescendants { importer: String, imported: String },

    #[error("Invalid graph snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for GraphError {
    fn from(e: std::io::Error) -> Self {
        GraphError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::InvalidSnapshot(e.to_string())
    }
}
