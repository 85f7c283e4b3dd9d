use std::fmt;

use thiserror::Error;

/// Named stage of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    LoggingIn,
    AwaitingVerification,
    Searching,
    Listing { page: u32 },
    Extracting,
    Finished,
    Stopped,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Stopped | Phase::Failed)
    }

    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        if self.is_terminal() {
            return false;
        }
        if matches!(next, Stopped | Failed) {
            return true;
        }
        match (self, next) {
            (Init, LoggingIn | Extracting) => true,
            (LoggingIn, AwaitingVerification | Searching | Extracting) => true,
            (AwaitingVerification, Searching | Extracting) => true,
            (Searching, Listing { page: 1 } | Finished) => true,
            (Listing { page }, Listing { page: next_page }) => next_page >= page,
            (Listing { .. }, Finished) => true,
            (Extracting, LoggingIn | Finished) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::LoggingIn => write!(f, "logging in"),
            Phase::AwaitingVerification => write!(f, "awaiting verification"),
            Phase::Searching => write!(f, "searching"),
            Phase::Listing { page } => write!(f, "listing page {page}"),
            Phase::Extracting => write!(f, "extracting"),
            Phase::Finished => write!(f, "finished"),
            Phase::Stopped => write!(f, "stopped"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal phase transition {from} -> {to}")]
pub struct PhaseError {
    pub from: Phase,
    pub to: Phase,
}

/// Current phase plus the path that led to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTracker {
    current: Phase,
    history: Vec<Phase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            current: Phase::Init,
            history: vec![Phase::Init],
        }
    }

    pub fn current(&self) -> Phase {
        self.current
    }

    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    /// Moves to `next`, returning the phase that was left.
    pub fn transition(&mut self, next: Phase) -> Result<Phase, PhaseError> {
        if !self.current.can_transition_to(next) {
            return Err(PhaseError {
                from: self.current,
                to: next,
            });
        }
        let previous = std::mem::replace(&mut self.current, next);
        if previous != next {
            self.history.push(next);
        }
        Ok(previous)
    }
}
