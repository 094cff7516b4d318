use crate::module::ModuleError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid module file syntax: {filename}: {source}")]
    Syntax {
        filename: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid module file value: {filename}: {path}: {reason}")]
    NotConcrete {
        filename: String,
        path: String,
        reason: String,
    },
    #[error("cannot determine language version: {0}")]
    LanguageVersionProbe(#[source] serde_json::Error),
    #[error("no language version declared in module file")]
    NoLanguageVersion,
    #[error("language version {0:?} in module file is not valid semantic version")]
    InvalidLanguageVersion(String),
    #[error(
        "language version {declared:?} declared in module file is too new for current language version {current:?}"
    )]
    LanguageVersionTooNew { declared: String, current: String },
    #[error(
        "language version {declared:?} declared in module file is earlier than the earliest known version {earliest:?}"
    )]
    LanguageVersionTooOld { declared: String, earliest: String },
    #[error("invalid module file {filename}:\n{violations}")]
    Validation {
        filename: String,
        violations: Violations,
    },
    /// A validation failure reworded by an `error:` annotation in the schema.
    #[error("invalid module file: {0}")]
    Annotated(String),
    #[error("invalid module file {filename}: cannot decode: {source}")]
    Decode {
        filename: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("module path {module:?} in {filename} does not contain major version")]
    MissingMajorVersion { module: String, filename: String },
    #[error("module path {module} in {filename:?} should contain the major version only")]
    NotMajorVersionOnly { module: String, filename: String },
    #[error("module path {module:?} in {filename:?} is not valid: {source}")]
    InvalidModulePath {
        module: String,
        filename: String,
        #[source]
        source: ModuleError,
    },
    #[error("language version {version:?} in {filename} is not well formed")]
    MalformedLanguageVersion { version: String, filename: String },
    #[error("language version {version} in {filename} is not canonical")]
    NonCanonicalLanguageVersion { version: String, filename: String },
    #[error(
        "invalid module file {filename}: cannot make version from module {module:?}, version {version:?}: {source}"
    )]
    InvalidDependency {
        filename: String,
        module: String,
        version: String,
        #[source]
        source: ModuleError,
    },
    #[error("invalid module file {filename}: no major version in {module:?}")]
    DependencyWithoutMajor { filename: String, module: String },
    #[error("multiple default major versions found for {0}")]
    MultipleDefaults(String),
    #[error("unrecognized source kind {0:?}")]
    UnknownSourceKind(String),
    #[error("cannot round-trip module file: {0}")]
    RoundTrip(String),
    #[error("language version {version} is too early for module file (need at least {need})")]
    LanguageVersionTooEarly { version: String, need: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ManifestError {
    /// Reports whether the error points at a defect in this crate or its
    /// embedded schemas rather than at the manifest being processed.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Location of a constraint inside the embedded schema catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPos {
    pub file: &'static str,
    /// Byte offset of the start of the constraint line.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
}

impl fmt::Display for SchemaPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A single schema violation reported by the validator.
#[derive(Debug, Clone)]
pub struct Violation {
    /// JSON Pointer to the offending value in the manifest.
    pub instance_path: String,
    /// JSON Pointer to the failing keyword within the selected schema.
    pub schema_path: String,
    pub position: Option<SchemaPos>,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)?;
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)?;
        }
        if let Some(pos) = &self.position {
            write!(f, " ({pos})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Violations(pub Vec<Violation>);

impl Violations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}
