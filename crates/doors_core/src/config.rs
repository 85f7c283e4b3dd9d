use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;
use crate::reconcile::UnmatchedSecondaryPolicy;
use crate::retry::RetryPolicy;

/// Portal an account identifier is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRoute {
    /// Short identifiers: search-panel account portal.
    AccountPortal,
    /// Long identifiers: modal-dialog portal.
    ModalPortal,
}

/// Recognized options. Every field has a default so partial files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Reserved; the engine drives one tab at a time.
    pub max_parallel_tabs: u32,
    /// How long to wait for the post-login landmark before asking for manual verification.
    pub verification_timeout_seconds: u64,
    /// Upper bound for every remote wait.
    pub remote_query_timeout_seconds: u64,
    pub headless: bool,
    pub webdriver_url: String,
    /// Identifiers with at most this many digits go to the account portal.
    pub account_length_threshold: usize,
    pub unmatched_secondary_policy: UnmatchedSecondaryPolicy,
    /// Case-insensitive substrings; a listing record whose client matches one is dropped.
    pub client_denylist: Vec<String>,
    pub pause_poll_millis: u64,
    pub retry_attempts: u32,
    pub retry_backoff_millis: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_parallel_tabs: 5,
            verification_timeout_seconds: 60,
            remote_query_timeout_seconds: 15,
            headless: false,
            webdriver_url: "http://localhost:9515".to_string(),
            account_length_threshold: 8,
            unmatched_secondary_policy: UnmatchedSecondaryPolicy::Ignore,
            client_denylist: vec!["fizz".to_string()],
            pause_poll_millis: 500,
            retry_attempts: 3,
            retry_backoff_millis: 1000,
        }
    }
}

impl ScrapeConfig {
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification_timeout_seconds)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_query_timeout_seconds)
    }

    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_millis)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_backoff_millis),
        )
    }

    pub fn route_for(&self, account: &Identifier) -> AccountRoute {
        if account.digit_count() <= self.account_length_threshold {
            AccountRoute::AccountPortal
        } else {
            AccountRoute::ModalPortal
        }
    }

    /// True when `client` contains any denylisted substring, ignoring case.
    pub fn is_denied_client(&self, client: &str) -> bool {
        let client = client.to_lowercase();
        self.client_denylist
            .iter()
            .filter(|needle| !needle.is_empty())
            .any(|needle| client.contains(&needle.to_lowercase()))
    }
}
