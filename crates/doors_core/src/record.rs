use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Field holding the account identifier on both portals.
pub const FIELD_ACCOUNT: &str = "Compte client";
/// Client name on a listing detail page.
pub const FIELD_CLIENT: &str = "Client";
/// Canonical phone field filled by both account-detail variants.
pub const FIELD_PHONE: &str = "Téléphone";
/// Canonical email field filled by both account-detail variants.
pub const FIELD_EMAIL: &str = "Courriel";
/// Placeholder for a value that could not be collected.
pub const SENTINEL: &str = "N/A";

/// One extracted entity: field label to field value.
///
/// Records are built field by field by an extractor and then handed to a
/// [`ResultSet`], after which they are read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record seeded with its identifying field.
    pub fn keyed(key: &str, value: impl Into<String>) -> Self {
        let mut record = Self::new();
        record.insert(key, value);
        record
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(label.into(), value.into());
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields.get(label).map(String::as_str)
    }

    /// Value of `label`, or the sentinel when absent or blank.
    pub fn get_or_sentinel(&self, label: &str) -> &str {
        match self.get(label) {
            Some(value) if !value.trim().is_empty() => value,
            _ => SENTINEL,
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.fields.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A copy of this record with `companion` fields laid over it.
    pub fn merged_with<'a>(&self, companion: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut merged = self.clone();
        for (label, value) in companion {
            merged.insert(label, value);
        }
        merged
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Ordered, append-only collection of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    records: Vec<Record>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Sorted union of every label seen across all records.
    pub fn label_union(&self) -> Vec<String> {
        let labels: BTreeSet<&str> = self.records.iter().flat_map(Record::labels).collect();
        labels.into_iter().map(ToOwned::to_owned).collect()
    }
}

impl From<Vec<Record>> for ResultSet {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl FromIterator<Record> for ResultSet {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
