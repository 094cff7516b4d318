//! Parsing, validation and formatting of module files (`module.toml`).
//!
//! A module file declares a module path, the language version it targets,
//! where its source comes from, and its versioned dependencies. The format
//! evolves through a catalog of schemas embedded in this crate (`catalog`):
//! each file is validated against the newest schema not newer than the
//! language version it declares, then decoded into a [`Manifest`].
//!
//! Parsing comes in three flavors: [`parse`] (major versions required
//! everywhere), [`parse_non_strict`] (missing major versions are filled in)
//! and [`parse_legacy`] (only the module path is read). [`Manifest::format`]
//! produces canonical text and checks that it reads back.

pub mod catalog;
mod document;
pub mod error;
mod format;
pub mod manifest;
pub mod module;
pub mod version;

pub use catalog::{
    earliest_closed_schema_version, earliest_version, known_versions, latest_version,
};
pub use error::{ManifestError, SchemaPos, Violation, Violations};
pub use manifest::{
    parse, parse_legacy, parse_non_strict, parse_with, Dep, Language, Manifest, ParseMode, Source,
    MODULE_FILE,
};
pub use module::ModuleError;
pub use version::LANGUAGE_VERSION;
