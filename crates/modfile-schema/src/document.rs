//! Conversion between module file text and structured values.

use crate::error::ManifestError;
use serde_json::Value;

/// Parses module file text into a structured value, rejecting anything that
/// is not plain data.
pub(crate) fn load(data: &str, filename: &str) -> Result<Value, ManifestError> {
    let table = parse_table(data, filename)?;
    check_table(&table, "", filename)?;
    to_value(&table, filename)
}

/// Parses module file text and keeps only the top-level `fields`. Nothing
/// else in the file is inspected.
pub(crate) fn load_fields(
    data: &str,
    filename: &str,
    fields: &[&str],
) -> Result<Value, ManifestError> {
    let mut table = parse_table(data, filename)?;
    table.retain(|key, _| fields.contains(&key));
    to_value(&table, filename)
}

fn parse_table(data: &str, filename: &str) -> Result<toml::Table, ManifestError> {
    toml::from_str(data).map_err(|source| ManifestError::Syntax {
        filename: filename.to_owned(),
        source,
    })
}

fn to_value(table: &toml::Table, filename: &str) -> Result<Value, ManifestError> {
    serde_json::to_value(table)
        .map_err(|e| ManifestError::Internal(format!("cannot convert {filename}: {e}")))
}

/// Checks that `value` consists of plain data only.
pub(crate) fn check_concrete(value: &toml::Value, filename: &str) -> Result<(), ManifestError> {
    check_value(value, "", filename)
}

fn check_table(table: &toml::Table, path: &str, filename: &str) -> Result<(), ManifestError> {
    for (key, value) in table {
        let child = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        check_value(value, &child, filename)?;
    }
    Ok(())
}

fn check_value(value: &toml::Value, path: &str, filename: &str) -> Result<(), ManifestError> {
    match value {
        toml::Value::Datetime(dt) => Err(ManifestError::NotConcrete {
            filename: filename.to_owned(),
            path: if path.is_empty() { "(root)" } else { path }.to_owned(),
            reason: format!("date-time value {dt} is not supported"),
        }),
        toml::Value::Table(table) => check_table(table, path, filename),
        toml::Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| check_value(item, &format!("{path}[{i}]"), filename)),
        toml::Value::Float(f) if !f.is_finite() => Err(ManifestError::NotConcrete {
            filename: filename.to_owned(),
            path: path.to_owned(),
            reason: format!("number {f} is not finite"),
        }),
        toml::Value::String(_)
        | toml::Value::Integer(_)
        | toml::Value::Float(_)
        | toml::Value::Boolean(_) => Ok(()),
    }
}
