use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use doors_core::{Identifier, Record, ResultSet, FIELD_ACCOUNT};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input file not found: {0}")]
    Missing(PathBuf),
    #[error("unsupported input type {0:?}; expected .json or .csv")]
    Unsupported(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid csv: {0}")]
    Csv(String),
    #[error("json input must be an array of objects")]
    NotAnArray,
    #[error("no \"{FIELD_ACCOUNT}\" values in {0}")]
    NoAccounts(PathBuf),
}

impl From<csv::Error> for InputError {
    fn from(err: csv::Error) -> Self {
        InputError::Csv(err.to_string())
    }
}

/// Rows of a listing export, every value kept as text so identifiers keep
/// their leading zeros.
pub fn load_input(path: &Path) -> Result<ResultSet, InputError> {
    if !path.is_file() {
        return Err(InputError::Missing(path.to_path_buf()));
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => Err(InputError::Unsupported(other.to_string())),
    }
}

fn load_json(path: &Path) -> Result<ResultSet, InputError> {
    let text = fs::read_to_string(path)?;
    let Value::Array(items) = serde_json::from_str::<Value>(&text)? else {
        return Err(InputError::NotAnArray);
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map
                .into_iter()
                .map(|(key, value)| (key, value_text(value)))
                .collect::<Record>()),
            _ => Err(InputError::NotAnArray),
        })
        .collect()
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn load_csv(path: &Path) -> Result<ResultSet, InputError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut rows = ResultSet::new();
    for row in reader.records() {
        let row = row?;
        rows.push(headers.iter().zip(row.iter()).collect());
    }
    Ok(rows)
}

/// Accounts to scrape: every non-blank identifier, first occurrence of each
/// normalized value only.
pub fn accounts_from(rows: &ResultSet) -> Vec<Identifier> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.get(FIELD_ACCOUNT))
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(Identifier::new)
        .filter(|id| !id.normalized().is_empty())
        .filter(|id| seen.insert(id.normalized().to_string()))
        .collect()
}
