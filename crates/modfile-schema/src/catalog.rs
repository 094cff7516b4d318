//! The embedded catalog of module file schemas.
//!
//! `schema/module.toml` holds one JSON Schema per language version. The
//! catalog is compiled on first use and lives for the rest of the process.
//! Every use of the compiled schemas goes through [`with_catalog`], which
//! serializes access behind a single lock.

use crate::error::{ManifestError, SchemaPos, Violation, Violations};
use crate::version;
use jsonschema::Validator;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{LazyLock, Mutex, PoisonError};
use tracing::debug;

/// Name under which the embedded catalog appears in schema positions.
pub const SCHEMA_FILE: &str = "modfile-schema/schema/module.toml";

const SCHEMA_SOURCE: &str = include_str!("../schema/module.toml");

const ERROR_ANNOTATION: &str = "# error: ";

static CATALOG: LazyLock<Mutex<Catalog>> = LazyLock::new(|| {
    let catalog = Catalog::compile(SCHEMA_SOURCE, SCHEMA_FILE)
        .unwrap_or_else(|e| panic!("internal error: invalid module file schema catalog: {e}"));
    Mutex::new(catalog)
});

/// Runs `f` with exclusive access to the process-wide schema catalog.
pub(crate) fn with_catalog<T>(f: impl FnOnce(&Catalog) -> T) -> T {
    let guard = CATALOG.lock().unwrap_or_else(PoisonError::into_inner);
    f(&guard)
}

/// Returns the earliest schema version in the catalog. This is the
/// permissive schema used for module files written before versioning.
pub fn earliest_version() -> String {
    with_catalog(|c| c.earliest().to_owned())
}

/// Returns the language version associated with the most recent schema.
pub fn latest_version() -> String {
    with_catalog(|c| c.latest().to_owned())
}

/// Returns the earliest schema version that rejects unknown fields. Any
/// language version declared in a module file should be at least this.
pub fn earliest_closed_schema_version() -> String {
    with_catalog(|c| c.earliest_closed().to_owned())
}

/// Returns every schema version in the catalog, oldest first.
pub fn known_versions() -> Vec<String> {
    with_catalog(|c| c.schemas.iter().map(|s| s.version.clone()).collect())
}

#[derive(Deserialize)]
struct CatalogDoc {
    earliest_closed_schema_version: String,
    versions: BTreeMap<String, Value>,
}

pub(crate) struct Schema {
    pub(crate) version: String,
    validator: Validator,
}

pub(crate) struct Catalog {
    source: &'static str,
    file: &'static str,
    /// Sorted by ascending semantic version.
    schemas: Vec<Schema>,
    earliest_closed: String,
}

impl Catalog {
    pub(crate) fn compile(source: &'static str, file: &'static str) -> Result<Self, String> {
        let doc: CatalogDoc =
            toml::from_str(source).map_err(|e| format!("cannot parse {file}: {e}"))?;
        if doc.versions.is_empty() {
            return Err(format!("{file} declares no schema versions"));
        }
        let mut schemas = Vec::with_capacity(doc.versions.len());
        for (vers, schema) in &doc.versions {
            if version::canonical(vers) != *vers {
                return Err(format!("schema version {vers:?} is not a canonical version"));
            }
            let mut opts = jsonschema::options();
            opts.with_draft(jsonschema::Draft::Draft202012);
            let validator = opts
                .build(schema)
                .map_err(|e| format!("cannot compile schema {vers}: {e}"))?;
            schemas.push(Schema {
                version: vers.clone(),
                validator,
            });
        }
        schemas.sort_by(|a, b| version::compare(&a.version, &b.version));
        if !doc.versions.contains_key(&doc.earliest_closed_schema_version) {
            return Err(format!(
                "earliest closed schema version {} has no schema",
                doc.earliest_closed_schema_version
            ));
        }
        debug!("compiled {} module file schemas from {file}", schemas.len());
        Ok(Self {
            source,
            file,
            schemas,
            earliest_closed: doc.earliest_closed_schema_version,
        })
    }

    pub(crate) fn earliest(&self) -> &str {
        &self.schemas[0].version
    }

    pub(crate) fn latest(&self) -> &str {
        &self.schemas[self.schemas.len() - 1].version
    }

    pub(crate) fn earliest_closed(&self) -> &str {
        &self.earliest_closed
    }

    /// Picks the schema with the greatest version not newer than `declared`.
    pub(crate) fn select(&self, declared: &str) -> Option<&Schema> {
        let mut latest: Option<&Schema> = None;
        for schema in &self.schemas {
            if version::compare(&schema.version, declared) == Ordering::Greater {
                continue;
            }
            match latest {
                Some(l) if version::compare(&schema.version, &l.version).is_le() => {}
                _ => latest = Some(schema),
            }
        }
        latest
    }

    /// Validates `instance` against `schema`, rewording the failure when a
    /// failing constraint carries an error annotation.
    pub(crate) fn validate(
        &self,
        schema: &Schema,
        instance: &Value,
        filename: &str,
    ) -> Result<(), ManifestError> {
        let violations = Violations(
            schema
                .validator
                .iter_errors(instance)
                .map(|e| {
                    let schema_path = e.schema_path.to_string();
                    Violation {
                        instance_path: e.instance_path.to_string(),
                        position: self.locate(&schema.version, &schema_path),
                        schema_path,
                        message: e.to_string(),
                    }
                })
                .collect(),
        );
        if violations.is_empty() {
            return Ok(());
        }
        debug!(
            "{filename}: {} violation(s) against schema {}",
            violations.len(),
            schema.version
        );
        for v in violations.iter() {
            if let Some(msg) = v.position.as_ref().and_then(|p| self.error_comment(p)) {
                return Err(ManifestError::Annotated(msg));
            }
        }
        Err(ManifestError::Validation {
            filename: filename.to_owned(),
            violations,
        })
    }

    /// Finds the line in the catalog source that defines the keyword at
    /// `schema_path` within the schema for `vers`.
    fn locate(&self, vers: &str, schema_path: &str) -> Option<SchemaPos> {
        let mut segments: Vec<String> = vec!["versions".to_owned(), vers.to_owned()];
        segments.extend(
            schema_path
                .split('/')
                .skip(1)
                .map(|s| s.replace("~1", "/").replace("~0", "~")),
        );
        if segments.len() < 3 {
            return None;
        }
        let keyword = segments.pop()?;
        let header = format!(
            "[{}]",
            segments
                .iter()
                .map(|s| toml_key(s))
                .collect::<Vec<_>>()
                .join(".")
        );

        let mut offset = 0;
        let mut in_table = false;
        for (i, line) in self.source.split_inclusive('\n').enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with('[') {
                in_table = trimmed == header;
            } else if in_table {
                let is_keyword = trimmed
                    .strip_prefix(keyword.as_str())
                    .is_some_and(|rest| rest.trim_start().starts_with('='));
                if is_keyword {
                    return Some(SchemaPos {
                        file: self.file,
                        offset,
                        line: i + 1,
                    });
                }
            }
            offset += line.len();
        }
        None
    }

    /// Returns the message of an `# error: ` annotation on the line directly
    /// above `pos`, if there is one.
    fn error_comment(&self, pos: &SchemaPos) -> Option<String> {
        if pos.file != self.file {
            return None;
        }
        let before = self.source.get(..pos.offset)?;
        let (before, _) = before.rsplit_once('\n')?;
        let line = before.rsplit_once('\n').map_or(before, |(_, line)| line);
        line.trim_end_matches('\r')
            .strip_prefix(ERROR_ANNOTATION)
            .map(str::to_owned)
    }
}

fn toml_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        key.to_owned()
    } else {
        format!("\"{key}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_SOURCE: &str = r#"earliest_closed_schema_version = "v1.0.0"

[versions."v0.0.0"]
type = "object"

[versions."v1.0.0"]
type = "object"
additionalProperties = false

[versions."v1.0.0".properties.name]
type = "string"
# error: custom message
minLength = 3

[versions."v2.0.0-alpha.0"]
type = "object"

[versions."v2.0.0-alpha.0".properties.name]
type = "string"
"#;

    fn test_catalog() -> Catalog {
        Catalog::compile(TEST_SOURCE, "test.toml").unwrap()
    }

    #[test]
    fn embedded_catalog_compiles() {
        let catalog = Catalog::compile(SCHEMA_SOURCE, SCHEMA_FILE).unwrap();
        assert_eq!(catalog.earliest(), "v0.0.0");
        assert_eq!(catalog.earliest_closed(), "v0.8.0-alpha.0");
        assert_eq!(catalog.latest(), "v0.9.0-alpha.0");
    }

    #[test]
    fn version_limits() {
        assert_eq!(earliest_version(), "v0.0.0");
        assert_eq!(latest_version(), "v0.9.0-alpha.0");
        assert_eq!(earliest_closed_schema_version(), "v0.8.0-alpha.0");
        assert_eq!(
            known_versions(),
            ["v0.0.0", "v0.8.0-alpha.0", "v0.9.0-alpha.0"]
        );
    }

    #[test]
    fn latest_schema_is_not_newer_than_language_version() {
        assert_ne!(
            version::compare(&latest_version(), version::LANGUAGE_VERSION),
            Ordering::Greater
        );
    }

    #[test]
    fn selects_greatest_version_not_above_declared() {
        let catalog = test_catalog();
        let pick = |v: &str| catalog.select(v).map(|s| s.version.as_str());
        assert_eq!(pick("v0.0.0"), Some("v0.0.0"));
        assert_eq!(pick("v0.9.9"), Some("v0.0.0"));
        assert_eq!(pick("v1.0.0"), Some("v1.0.0"));
        assert_eq!(pick("v1.5.0"), Some("v1.0.0"));
        assert_eq!(pick("v2.0.0-alpha.0"), Some("v2.0.0-alpha.0"));
        assert_eq!(pick("v2.0.0"), Some("v2.0.0-alpha.0"));
        assert_eq!(pick("v3.1.0"), Some("v2.0.0-alpha.0"));
    }

    #[test]
    fn annotated_failure_uses_annotation_text() {
        let catalog = test_catalog();
        let schema = catalog.select("v1.0.0").unwrap();
        let err = catalog
            .validate(schema, &json!({"name": "ab"}), "m.toml")
            .unwrap_err();
        match err {
            ManifestError::Annotated(msg) => assert_eq!(msg, "custom message"),
            other => panic!("expected annotated error, got {other}"),
        }
    }

    #[test]
    fn unannotated_failure_is_reported_as_is() {
        let catalog = test_catalog();
        let schema = catalog.select("v1.0.0").unwrap();
        let err = catalog
            .validate(schema, &json!({"name": 5}), "m.toml")
            .unwrap_err();
        match err {
            ManifestError::Validation { violations, .. } => {
                assert_eq!(violations.len(), 1);
                let v = violations.iter().next().unwrap();
                assert_eq!(v.instance_path, "/name");
                assert_eq!(v.schema_path, "/properties/name/type");
                assert_eq!(v.position.as_ref().unwrap().line, 11);
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn valid_instance_passes() {
        let catalog = test_catalog();
        let schema = catalog.select("v1.0.0").unwrap();
        assert!(catalog
            .validate(schema, &json!({"name": "abc"}), "m.toml")
            .is_ok());
    }

    #[test]
    fn rejects_catalog_without_versions() {
        assert!(Catalog::compile("earliest_closed_schema_version = \"v1.0.0\"\n[versions]\n", "x").is_err());
    }

    #[test]
    fn rejects_non_canonical_version_keys() {
        let source = "earliest_closed_schema_version = \"v1\"\n[versions.\"v1\"]\ntype = \"object\"\n";
        assert!(Catalog::compile(source, "x").is_err());
    }

    #[test]
    fn shared_catalog_serves_concurrent_callers() {
        const INPUT: &str = r#"module = "example.com/main@v1"
language.version = "v0.9.0"
source.kind = "git"
deps."b.com@v1" = { v = "v1.0.0", default = true }
deps."a.com@v2" = { v = "v2.1.0" }
"#;
        let expected = crate::parse(INPUT, "module.toml").unwrap().format().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    let mut outputs = Vec::new();
                    for _ in 0..25 {
                        let mf = crate::parse(INPUT, "module.toml").unwrap();
                        let data = mf.format().unwrap();
                        let again = crate::parse(&data, "module.toml").unwrap();
                        assert_eq!(again.dep_versions(), mf.dep_versions());
                        outputs.push(data);
                    }
                    let addr = with_catalog(|c| std::ptr::from_ref(c) as usize);
                    (outputs, addr)
                })
            })
            .collect();

        let addr = with_catalog(|c| std::ptr::from_ref(c) as usize);
        for handle in handles {
            let (outputs, thread_addr) = handle.join().unwrap();
            assert_eq!(thread_addr, addr);
            assert!(outputs.iter().all(|o| *o == expected));
        }
    }

    #[test]
    fn quotes_non_bare_keys() {
        assert_eq!(toml_key("properties"), "properties");
        assert_eq!(toml_key("v0.8.0-alpha.0"), "\"v0.8.0-alpha.0\"");
    }
}
