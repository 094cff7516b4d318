use super::{json_pretty, EXIT_SUCCESS};
use modfile_schema::{
    earliest_closed_schema_version, earliest_version, known_versions, latest_version,
    LANGUAGE_VERSION,
};

pub fn run(json: bool) -> Result<u8, String> {
    let versions = known_versions();
    if json {
        let payload = serde_json::json!({
            "language_version": LANGUAGE_VERSION,
            "earliest": earliest_version(),
            "earliest_closed": earliest_closed_schema_version(),
            "latest": latest_version(),
            "versions": versions,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("language version: {LANGUAGE_VERSION}");
        println!("schema versions:");
        let earliest = earliest_version();
        let closed = earliest_closed_schema_version();
        for v in &versions {
            let note = if *v == earliest {
                " (legacy, module path only)"
            } else if *v == closed {
                " (earliest closed)"
            } else {
                ""
            };
            println!("  {v}{note}");
        }
    }
    Ok(EXIT_SUCCESS)
}
