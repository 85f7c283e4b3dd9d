//! Left join of a primary record set against a secondary one on the
//! normalized account identifier.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::normalize_identifier;
use crate::record::{Record, ResultSet, FIELD_ACCOUNT, FIELD_EMAIL, FIELD_PHONE, SENTINEL};

/// Whether secondary rows that matched no primary row are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnmatchedSecondaryPolicy {
    #[default]
    Ignore,
    Report,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Field carrying the raw identifier in both sets.
    pub key_field: String,
    /// Fields copied from the matched secondary row.
    pub joined_fields: Vec<String>,
    pub sentinel: String,
    /// A row whose value for this field is still the sentinel after the join
    /// is listed in [`Reconciliation::missing`].
    pub missing_field: Option<String>,
    pub unmatched_secondary: UnmatchedSecondaryPolicy,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            key_field: FIELD_ACCOUNT.to_string(),
            joined_fields: vec![FIELD_PHONE.to_string(), FIELD_EMAIL.to_string()],
            sentinel: SENTINEL.to_string(),
            missing_field: Some(FIELD_PHONE.to_string()),
            unmatched_secondary: UnmatchedSecondaryPolicy::Ignore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledRow {
    pub fields: Record,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    /// One row per primary record, in primary order.
    pub rows: Vec<ReconciledRow>,
    /// Indices into `rows` still missing the watched field.
    pub missing: Vec<usize>,
    /// Secondary rows no primary row claimed. Always empty under
    /// [`UnmatchedSecondaryPolicy::Ignore`].
    pub unmatched_secondary: Vec<Record>,
}

impl Reconciliation {
    pub fn missing_rows(&self) -> impl Iterator<Item = &ReconciledRow> {
        self.missing.iter().filter_map(|&idx| self.rows.get(idx))
    }

    pub fn matched_count(&self) -> usize {
        self.rows.iter().filter(|row| row.matched).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("secondary rows {first} and {second} share account {key}")]
    DuplicateKey {
        key: String,
        first: usize,
        second: usize,
    },
}

/// Joins `primary` against `secondary`.
///
/// Every primary row appears exactly once in the output. Secondary rows with
/// an empty normalized identifier can never match and are not checked for
/// duplicates. Two secondary rows sharing a non-empty normalized identifier
/// fail the whole join.
pub fn reconcile(
    primary: &ResultSet,
    secondary: &ResultSet,
    options: &ReconcileOptions,
) -> Result<Reconciliation, ReconcileError> {
    let index = index_secondary(secondary, &options.key_field)?;
    let mut claimed = HashSet::new();
    let mut rows = Vec::with_capacity(primary.len());
    let mut missing = Vec::new();

    for record in primary {
        let key = record
            .get(&options.key_field)
            .map(normalize_identifier)
            .unwrap_or_default();
        let matched = if key.is_empty() { None } else { index.get(&key) };

        let fields = match matched {
            Some(&idx) => {
                claimed.insert(idx);
                let companion = &secondary.records()[idx];
                let joined: Vec<(&str, &str)> = options
                    .joined_fields
                    .iter()
                    .map(|field| (field.as_str(), value_or(companion, field, &options.sentinel)))
                    .collect();
                record.merged_with(joined)
            }
            None => record.merged_with(
                options
                    .joined_fields
                    .iter()
                    .map(|field| (field.as_str(), options.sentinel.as_str())),
            ),
        };

        if let Some(watched) = &options.missing_field {
            if fields.get(watched).map_or(true, |v| v == options.sentinel) {
                missing.push(rows.len());
            }
        }
        rows.push(ReconciledRow {
            fields,
            matched: matched.is_some(),
        });
    }

    let unmatched_secondary = match options.unmatched_secondary {
        UnmatchedSecondaryPolicy::Ignore => Vec::new(),
        UnmatchedSecondaryPolicy::Report => secondary
            .iter()
            .enumerate()
            .filter(|(idx, _)| !claimed.contains(idx))
            .map(|(_, record)| record.clone())
            .collect(),
    };

    Ok(Reconciliation {
        rows,
        missing,
        unmatched_secondary,
    })
}

fn index_secondary(
    secondary: &ResultSet,
    key_field: &str,
) -> Result<HashMap<String, usize>, ReconcileError> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(secondary.len());
    for (idx, record) in secondary.iter().enumerate() {
        let key = record
            .get(key_field)
            .map(normalize_identifier)
            .unwrap_or_default();
        if key.is_empty() {
            continue;
        }
        if let Some(&first) = index.get(&key) {
            return Err(ReconcileError::DuplicateKey {
                key,
                first,
                second: idx,
            });
        }
        index.insert(key, idx);
    }
    Ok(index)
}

fn value_or<'a>(record: &'a Record, field: &str, sentinel: &'a str) -> &'a str {
    match record.get(field) {
        Some(value) if !value.trim().is_empty() => value,
        _ => sentinel,
    }
}
