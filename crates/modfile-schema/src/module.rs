//! Module paths and module versions.
//!
//! A module path is a slash-separated path such as `example.com/foo`,
//! optionally followed by a major version suffix: `example.com/foo@v1`.
//! The path without the suffix is the module's *base path*.

use crate::version;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    #[error("empty module path")]
    EmptyPath,
    #[error("module path {0:?} contains whitespace")]
    Whitespace(String),
    #[error("malformed module path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("module path {0:?} has no major version suffix")]
    MissingMajorVersion(String),
    #[error("version {0:?} is not a valid semantic version")]
    InvalidVersion(String),
    #[error("version {version:?} is not canonical (should be {canonical:?})")]
    NonCanonicalVersion { version: String, canonical: String },
    #[error("major version {major:?} in {path:?} does not match version {version:?}")]
    MajorMismatch {
        path: String,
        major: String,
        version: String,
    },
}

/// Splits `path` into its base path and major version suffix.
///
/// The third value reports whether a suffix was present; a suffix that is
/// not a valid semantic version counts as absent, in which case the whole
/// input is returned as the base path.
pub fn split_path_version(path: &str) -> (&str, &str, bool) {
    match path.split_once('@') {
        Some((base, vers)) if version::is_valid(vers) => (base, vers, true),
        _ => (path, "", false),
    }
}

/// Checks the syntax of a module path that carries no major version suffix.
pub fn check_path_without_version(path: &str) -> Result<(), ModuleError> {
    let invalid = |reason: &str| ModuleError::InvalidPath {
        path: path.to_owned(),
        reason: reason.to_owned(),
    };
    if path.is_empty() {
        return Err(ModuleError::EmptyPath);
    }
    if path.chars().any(char::is_whitespace) {
        return Err(ModuleError::Whitespace(path.to_owned()));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(invalid("leading or trailing slash"));
    }
    for (i, elem) in path.split('/').enumerate() {
        if elem.is_empty() {
            return Err(invalid("double slash"));
        }
        if elem == "." || elem == ".." {
            return Err(invalid("invalid path element"));
        }
        if let Some(c) = elem
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '-')))
        {
            return Err(invalid(&format!("invalid char {c:?}")));
        }
        if i == 0 && elem.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(invalid("leading path element must be lower case"));
        }
    }
    Ok(())
}

/// Checks a module path that must carry a bare major version suffix.
pub fn check_path(path: &str) -> Result<(), ModuleError> {
    let (base, vers, ok) = split_path_version(path);
    if !ok {
        return Err(ModuleError::MissingMajorVersion(path.to_owned()));
    }
    if version::major(vers) != vers {
        return Err(ModuleError::InvalidPath {
            path: path.to_owned(),
            reason: "suffix should contain the major version only".to_owned(),
        });
    }
    check_path_without_version(base)
}

/// A module path (including its major version suffix) paired with a
/// canonical version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Version {
    path: String,
    version: String,
}

impl Version {
    /// Builds a module version from a module path and a version.
    ///
    /// A path without a major version suffix has the version's major
    /// appended. An empty version is allowed and leaves the path as given,
    /// which must then carry its own suffix.
    pub fn new(path: &str, vers: &str) -> Result<Self, ModuleError> {
        if path.is_empty() {
            return Err(ModuleError::EmptyPath);
        }
        if path.chars().any(char::is_whitespace) {
            return Err(ModuleError::Whitespace(path.to_owned()));
        }
        if vers.is_empty() {
            check_path(path)?;
            return Ok(Self {
                path: path.to_owned(),
                version: String::new(),
            });
        }
        if !version::is_valid(vers) {
            return Err(ModuleError::InvalidVersion(vers.to_owned()));
        }
        let canonical = version::canonical(vers);
        if canonical != vers {
            return Err(ModuleError::NonCanonicalVersion {
                version: vers.to_owned(),
                canonical,
            });
        }
        let (_, path_major, has_major) = split_path_version(path);
        let full_path = if has_major {
            if path_major != version::major(vers) {
                return Err(ModuleError::MajorMismatch {
                    path: path.to_owned(),
                    major: path_major.to_owned(),
                    version: vers.to_owned(),
                });
            }
            path.to_owned()
        } else {
            format!("{path}@{}", version::major(vers))
        };
        check_path(&full_path)?;
        Ok(Self {
            path: full_path,
            version: vers.to_owned(),
        })
    }

    /// Module path including the major version suffix.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn base_path(&self) -> &str {
        split_path_version(&self.path).0
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Major version of the module, taken from the path suffix.
    pub fn major(&self) -> &str {
        split_path_version(&self.path).1
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}@{}", self.base_path(), self.version)
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base_path()
            .cmp(other.base_path())
            .then_with(|| version::compare(&self.version, &other.version))
            .then_with(|| self.path.cmp(&other.path))
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sorts module versions by base path, then by semantic version.
pub fn sort(list: &mut [Version]) {
    list.sort();
}
