use std::fmt;
use std::path::PathBuf;

/// Login for one portal. The password never appears in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Parameters of a listing scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingParams {
    pub credentials: Credentials,
    pub city: String,
    pub street: Option<String>,
    /// Regional area code filter.
    pub rta: Option<String>,
    pub dest_dir: PathBuf,
}

impl ListingParams {
    /// Text typed into the global search box: the street with spaces turned
    /// into dashes when present, else the city.
    pub fn query(&self) -> String {
        match self.street.as_deref().map(str::trim) {
            Some(street) if !street.is_empty() => street.replace(' ', "-"),
            _ => self.city.clone(),
        }
    }
}

/// Credentials needed by the account-detail portals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetailCredentials {
    pub account_portal: Credentials,
    /// Operator code typed into the modal portal's dialog.
    pub operator_code: String,
}

/// Parameters of an account-detail scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailParams {
    pub input: PathBuf,
    pub dest_dir: PathBuf,
    pub credentials: DetailCredentials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Listing,
    Details,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Listing => write!(f, "listing"),
            JobKind::Details => write!(f, "details"),
        }
    }
}

/// A run requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    Listing(ListingParams),
    Details(DetailParams),
    /// Listing, then details over the listing's own export.
    Full {
        listing: ListingParams,
        details: DetailCredentials,
    },
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Stopped,
    Failed(String),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Success => write!(f, "success"),
            JobOutcome::Stopped => write!(f, "stopped"),
            JobOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}
