use crate::catalog;
use crate::document;
use crate::error::ManifestError;
use crate::manifest::{parse_non_strict, Manifest};
use std::collections::BTreeMap;

impl Manifest {
    /// Returns the canonical module file text for the manifest.
    ///
    /// The output is parsed back before it is returned, so a manifest that
    /// could not be read again is reported as an error instead.
    pub fn format(&self) -> Result<String, ManifestError> {
        let mut out = self.clone();
        if out.deps.as_ref().is_some_and(BTreeMap::is_empty) {
            out.deps = None;
        }
        if let Some(source) = &out.source {
            source.validate()?;
        }

        // Encoding shares the engine lock with validation and decoding.
        let data = catalog::with_catalog(|_| encode(&out))?;

        let reparsed = parse_non_strict(&data, "-")
            .map_err(|e| ManifestError::RoundTrip(e.to_string().trim_end().to_owned()))?;
        if let Some(language) = &self.language {
            if reparsed.actual_schema_version() == catalog::earliest_version() {
                // A language field is present, yet the permissive
                // pre-versioning schema was chosen: the declared version
                // predates the language field itself.
                return Err(ManifestError::LanguageVersionTooEarly {
                    version: language.version.clone(),
                    need: catalog::earliest_closed_schema_version(),
                });
            }
        }
        Ok(data)
    }
}

fn encode(mf: &Manifest) -> Result<String, ManifestError> {
    let value = toml::Value::try_from(mf)
        .map_err(|e| ManifestError::Internal(format!("cannot encode module file: {e}")))?;
    document::check_concrete(&value, "-")?;
    toml::to_string_pretty(mf)
        .map_err(|e| ManifestError::Internal(format!("cannot format module file: {e}")))
}
