use super::{json_pretty, manifest_error, read_manifest, write_atomic, EXIT_SUCCESS};
use modfile_schema::{parse, parse_non_strict};
use std::path::Path;

pub fn run(manifest_path: &Path, lax: bool, check: bool, json: bool) -> Result<u8, String> {
    let data = read_manifest(manifest_path)?;
    let filename = manifest_path.display().to_string();
    let manifest = if lax {
        parse_non_strict(&data, &filename)
    } else {
        parse(&data, &filename)
    }
    .map_err(|e| manifest_error(&e))?;
    let formatted = manifest.format().map_err(|e| manifest_error(&e))?;
    let changed = formatted != data;

    if check {
        if changed {
            return Err(format!(
                "{} is not formatted (run 'modfile fmt')",
                manifest_path.display()
            ));
        }
    } else if changed {
        write_atomic(manifest_path, &formatted)?;
    }

    if json {
        let payload = serde_json::json!({
            "manifest": manifest_path,
            "changed": changed,
        });
        println!("{}", json_pretty(&payload)?);
    } else if changed {
        println!("formatted {}", manifest_path.display());
    } else {
        println!("{} already formatted", manifest_path.display());
    }
    Ok(EXIT_SUCCESS)
}
