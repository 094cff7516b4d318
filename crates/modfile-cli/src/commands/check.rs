use super::{json_pretty, manifest_error, read_manifest, EXIT_SUCCESS};
use modfile_schema::{parse_with, Manifest, ParseMode};
use std::path::Path;
use tracing::debug;

pub fn run(manifest_path: &Path, mode: ParseMode, json: bool) -> Result<u8, String> {
    let data = read_manifest(manifest_path)?;
    let filename = manifest_path.display().to_string();
    debug!("checking {filename} in {mode:?} mode");
    let manifest = parse_with(mode, &data, &filename).map_err(|e| manifest_error(&e))?;

    if json {
        println!("{}", json_pretty(&summary(&manifest))?);
        return Ok(EXIT_SUCCESS);
    }

    println!("module:          {}", manifest.module);
    println!("schema version:  {}", manifest.actual_schema_version());
    if let Some(language) = &manifest.language {
        println!("language:        {}", language.version);
    }
    if let Some(source) = &manifest.source {
        println!("source:          {}", source.kind);
    }
    let deps = manifest.dep_versions();
    if !deps.is_empty() {
        println!("dependencies:");
        for dep in deps {
            println!("  {:<40} {}", dep.path(), dep.version());
        }
    }
    if let Some(defaults) = manifest.default_major_versions() {
        println!("default major versions:");
        for (base, major) in defaults {
            println!("  {base:<40} {major}");
        }
    }
    Ok(EXIT_SUCCESS)
}

fn summary(manifest: &Manifest) -> serde_json::Value {
    serde_json::json!({
        "module": manifest.module,
        "schema_version": manifest.actual_schema_version(),
        "language_version": manifest.language.as_ref().map(|l| l.version.as_str()),
        "source_kind": manifest.source.as_ref().map(|s| s.kind.as_str()),
        "deps": manifest.dep_versions(),
        "default_major_versions": manifest.default_major_versions(),
    })
}
