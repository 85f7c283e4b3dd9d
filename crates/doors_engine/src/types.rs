use std::fmt;

use doors_core::PhaseError;
use thiserror::Error;

use crate::export::ExportError;
use crate::input::InputError;

/// How to find an element in the remote document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
    Name(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Locator::XPath(path.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Locator::Name(name.into())
    }

    /// WebDriver `using`/`value` pair. Id and name lookups go through CSS.
    pub fn strategy(&self) -> (&'static str, String) {
        match self {
            Locator::Css(s) => ("css selector", s.clone()),
            Locator::XPath(s) => ("xpath", s.clone()),
            Locator::Id(s) => ("css selector", format!("[id=\"{s}\"]")),
            Locator::Name(s) => ("css selector", format!("[name=\"{s}\"]")),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={s}"),
            Locator::XPath(s) => write!(f, "xpath={s}"),
            Locator::Id(s) => write!(f, "id={s}"),
            Locator::Name(s) => write!(f, "name={s}"),
        }
    }
}

/// Opaque reference to a remote element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Opaque reference to a browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TabHandle(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    NotFound,
    StaleReference,
    ClickIntercepted,
    NotInteractable,
    NoSuchWindow,
    Timeout,
    Protocol,
}

impl fmt::Display for SessionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionErrorKind::NotFound => write!(f, "not found"),
            SessionErrorKind::StaleReference => write!(f, "stale reference"),
            SessionErrorKind::ClickIntercepted => write!(f, "click intercepted"),
            SessionErrorKind::NotInteractable => write!(f, "not interactable"),
            SessionErrorKind::NoSuchWindow => write!(f, "no such window"),
            SessionErrorKind::Timeout => write!(f, "timeout"),
            SessionErrorKind::Protocol => write!(f, "protocol error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: SessionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::new(SessionErrorKind::NotFound, what.to_string())
    }

    pub fn timeout(what: impl fmt::Display) -> Self {
        Self::new(SessionErrorKind::Timeout, what.to_string())
    }

    /// Conditions a retry can plausibly clear.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            SessionErrorKind::NotFound
                | SessionErrorKind::StaleReference
                | SessionErrorKind::ClickIntercepted
                | SessionErrorKind::NotInteractable
                | SessionErrorKind::Timeout
        )
    }

    pub fn is_stale(&self) -> bool {
        self.kind == SessionErrorKind::StaleReference
    }
}

/// Failures that end a job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("login failed: {0}")]
    Login(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("input error: {0}")]
    Input(#[from] InputError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Phase(#[from] PhaseError),
}
