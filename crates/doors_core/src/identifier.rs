use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical form of an account identifier: its ASCII digits, in order.
///
/// Total and idempotent: any string normalizes, and normalizing twice is a no-op.
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// A raw identifier together with its normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    raw: String,
    normalized: String,
}

impl Identifier {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize_identifier(&raw);
        Self { raw, normalized }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn digit_count(&self) -> usize {
        self.normalized.len()
    }

    /// The last `n` digits of the normalized form (all of them if shorter).
    pub fn last_digits(&self, n: usize) -> &str {
        let start = self.normalized.len().saturating_sub(n);
        &self.normalized[start..]
    }

    /// Two identifiers name the same account iff their normalized forms match.
    pub fn same_account(&self, other: &Identifier) -> bool {
        self.normalized == other.normalized
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for Identifier {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
