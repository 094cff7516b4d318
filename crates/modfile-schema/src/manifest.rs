use crate::catalog::{self, Catalog};
use crate::document;
use crate::error::ManifestError;
use crate::module::{self, Version};
use crate::version::{self, LANGUAGE_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Conventional file name of a module file.
pub const MODULE_FILE: &str = "module.toml";

/// The contents of a module file.
///
/// Values produced by [`parse`] and [`parse_non_strict`] also carry the
/// resolved dependency versions, the default major version of each module
/// and the schema version used for validation. Those are computed once at
/// parse time and do not follow later changes to the public fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Manifest {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deps: Option<BTreeMap<String, Dep>>,
    #[serde(skip)]
    versions: Vec<Version>,
    /// Module base path to the major version that is the default for it.
    #[serde(skip)]
    default_major_versions: Option<BTreeMap<String, String>>,
    #[serde(skip)]
    actual_schema_version: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Language {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// How to get from a module's source to its actual contents.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Source {
    pub kind: String,
}

impl Source {
    pub fn validate(&self) -> Result<(), ManifestError> {
        match self.kind.as_str() {
            "git" | "self" => Ok(()),
            _ => Err(ManifestError::UnknownSourceKind(self.kind.clone())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Dep {
    #[serde(rename = "v")]
    pub version: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub default: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

impl Manifest {
    /// Creates a manifest for `module` with no other fields set.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    /// Versions of all the modules depended on, sorted by base path and
    /// then by version. Empty unless the manifest came from [`parse`] or
    /// [`parse_non_strict`].
    pub fn dep_versions(&self) -> &[Version] {
        &self.versions
    }

    /// Map from module base path to the major version that is the default
    /// for that module. The main module is always its own default.
    pub fn default_major_versions(&self) -> Option<&BTreeMap<String, String>> {
        self.default_major_versions.as_ref()
    }

    /// The schema version used to validate the manifest; empty for a
    /// manifest that was not parsed.
    pub fn actual_schema_version(&self) -> &str {
        &self.actual_schema_version
    }
}

/// Selects how strictly a module file is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Dependencies and the main module must carry major versions.
    #[default]
    Strict,
    /// A main module path without a major version defaults to `v0`, and
    /// dependency keys may omit their major version.
    NonStrict,
    /// Only the `module` field is read; everything else is ignored.
    Legacy,
}

/// Parses and validates a module file. All module paths must carry major
/// versions and all dependency versions must be canonical.
///
/// `filename` is only used in error messages.
pub fn parse(data: &str, filename: &str) -> Result<Manifest, ManifestError> {
    parse_versioned(data, filename, true)
}

/// Like [`parse`], but a module path without a major version is accepted
/// and defaults to `v0`, and dependency keys may omit their major version.
pub fn parse_non_strict(data: &str, filename: &str) -> Result<Manifest, ManifestError> {
    parse_versioned(data, filename, false)
}

/// Parses a module file written before versioning was introduced. Only the
/// `module` field is read and all other fields are ignored.
pub fn parse_legacy(data: &str, filename: &str) -> Result<Manifest, ManifestError> {
    let value = document::load_fields(data, filename, &["module"])?;
    catalog::with_catalog(|catalog| {
        let module = decode_module_only(&value, filename)?;
        Ok(Decoded::module_only(module, catalog.earliest()).into_manifest())
    })
}

pub fn parse_with(mode: ParseMode, data: &str, filename: &str) -> Result<Manifest, ManifestError> {
    match mode {
        ParseMode::Strict => parse(data, filename),
        ParseMode::NonStrict => parse_non_strict(data, filename),
        ParseMode::Legacy => parse_legacy(data, filename),
    }
}

/// Result of decoding a validated value, tagged with the schema version
/// that validated it.
struct Decoded {
    schema_version: String,
    body: DecodedBody,
}

enum DecodedBody {
    ModuleOnly(String),
    Full(Box<Manifest>),
}

impl Decoded {
    fn module_only(module: String, schema_version: &str) -> Self {
        Self {
            schema_version: schema_version.to_owned(),
            body: DecodedBody::ModuleOnly(module),
        }
    }

    fn into_manifest(self) -> Manifest {
        let mut mf = match self.body {
            DecodedBody::ModuleOnly(module) => Manifest::new(module),
            DecodedBody::Full(mf) => *mf,
        };
        mf.actual_schema_version = self.schema_version;
        mf
    }
}

#[derive(Deserialize)]
struct BaseFileVersion {
    #[serde(default)]
    language: Option<LanguageProbe>,
}

#[derive(Deserialize)]
struct LanguageProbe {
    #[serde(default)]
    version: Option<String>,
}

#[derive(Deserialize)]
struct ModuleOnly {
    #[serde(default)]
    module: String,
}

fn decode_module_only(value: &Value, filename: &str) -> Result<String, ManifestError> {
    let f = ModuleOnly::deserialize(value).map_err(|source| ManifestError::Decode {
        filename: filename.to_owned(),
        source,
    })?;
    Ok(f.module)
}

/// Determines the declared language version of the module file.
fn declared_language_version(catalog: &Catalog, value: &Value) -> Result<String, ManifestError> {
    let base = BaseFileVersion::deserialize(value).map_err(ManifestError::LanguageVersionProbe)?;
    let declared = base
        .language
        .and_then(|l| l.version)
        .filter(|v| !v.is_empty())
        .ok_or(ManifestError::NoLanguageVersion)?;
    if !version::is_valid(&declared) {
        return Err(ManifestError::InvalidLanguageVersion(declared));
    }
    if version::compare(&declared, LANGUAGE_VERSION).is_gt() {
        return Err(ManifestError::LanguageVersionTooNew {
            declared,
            current: LANGUAGE_VERSION.to_owned(),
        });
    }
    if version::compare(&declared, catalog.earliest()).is_lt() {
        return Err(ManifestError::LanguageVersionTooOld {
            declared,
            earliest: catalog.earliest().to_owned(),
        });
    }
    Ok(declared)
}

fn decode(catalog: &Catalog, value: &Value, filename: &str) -> Result<Decoded, ManifestError> {
    let declared = declared_language_version(catalog, value)?;
    let schema = catalog.select(&declared).ok_or_else(|| {
        ManifestError::Internal(format!(
            "cannot find schema suitable for reading module file with language version {declared:?}"
        ))
    })?;
    debug!(
        "validating {filename} (language version {declared}) against schema {}",
        schema.version
    );
    catalog.validate(schema, value, filename)?;

    if schema.version == catalog.earliest() {
        // The permissive pre-versioning schema: the other fields carry no
        // meaning for such files, so decode the module path only.
        let module = decode_module_only(value, filename)?;
        return Ok(Decoded::module_only(module, &schema.version));
    }
    let mf = Manifest::deserialize(value).map_err(|e| {
        ManifestError::Internal(format!("cannot decode {filename} into manifest: {e}"))
    })?;
    Ok(Decoded {
        schema_version: schema.version.clone(),
        body: DecodedBody::Full(Box::new(mf)),
    })
}

fn parse_versioned(data: &str, filename: &str, strict: bool) -> Result<Manifest, ManifestError> {
    let value = document::load(data, filename)?;
    let mut mf = catalog::with_catalog(|catalog| decode(catalog, &value, filename))?.into_manifest();

    let (main_path, main_major) = resolve_main_module(&mut mf, filename, strict)?;

    if let Some(language) = &mf.language {
        let vers = &language.version;
        if !version::is_valid(vers) {
            return Err(ManifestError::MalformedLanguageVersion {
                version: vers.clone(),
                filename: filename.to_owned(),
            });
        }
        if version::canonical(vers) != *vers {
            return Err(ManifestError::NonCanonicalLanguageVersion {
                version: vers.clone(),
                filename: filename.to_owned(),
            });
        }
    }

    // The main module is always the default for its own major version.
    let mut defaults = BTreeMap::from([(main_path, main_major)]);
    let mut versions = Vec::new();
    for (m, dep) in mf.deps.iter().flatten() {
        let vers =
            Version::new(m, &dep.version).map_err(|source| ManifestError::InvalidDependency {
                filename: filename.to_owned(),
                module: m.clone(),
                version: dep.version.clone(),
                source,
            })?;
        if strict && vers.path() != m {
            return Err(ManifestError::DependencyWithoutMajor {
                filename: filename.to_owned(),
                module: m.clone(),
            });
        }
        if dep.default {
            let base = vers.base_path().to_owned();
            if defaults.contains_key(&base) {
                return Err(ManifestError::MultipleDefaults(base));
            }
            defaults.insert(base, version::major(vers.version()));
        }
        versions.push(vers);
    }
    module::sort(&mut versions);

    mf.versions = versions;
    if !defaults.is_empty() {
        mf.default_major_versions = Some(defaults);
    }
    Ok(mf)
}

/// Splits the main module path into base path and major version, applying
/// the `v0` default in non-strict mode.
fn resolve_main_module(
    mf: &mut Manifest,
    filename: &str,
    strict: bool,
) -> Result<(String, String), ManifestError> {
    let (base, major, ok) = module::split_path_version(&mf.module);
    if strict && !ok {
        return Err(ManifestError::MissingMajorVersion {
            module: mf.module.clone(),
            filename: filename.to_owned(),
        });
    }
    if ok {
        if version::major(major) != major {
            return Err(ManifestError::NotMajorVersionOnly {
                module: mf.module.clone(),
                filename: filename.to_owned(),
            });
        }
        return Ok((base.to_owned(), major.to_owned()));
    }
    let main_path = mf.module.clone();
    if main_path.is_empty() {
        return Ok((main_path, String::new()));
    }
    module::check_path_without_version(&main_path).map_err(|source| {
        ManifestError::InvalidModulePath {
            module: main_path.clone(),
            filename: filename.to_owned(),
            source,
        }
    })?;
    // No major version on the main module: default to v0.
    mf.module.push_str("@v0");
    Ok((main_path, "v0".to_owned()))
}
