use std::path::PathBuf;

use crate::job::{JobKind, JobOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Everything a job tells its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Log {
        level: LogLevel,
        message: String,
    },
    /// One listing page has been processed.
    Progress {
        page: u32,
        range_text: String,
        record_count: usize,
        /// Unknown until the last page is found.
        fraction: Option<f64>,
    },
    DetailProgress {
        done: usize,
        total: usize,
    },
    /// The job has paused itself and waits for a human to finish logging in.
    VerificationRequired,
    /// Listing export written.
    Done {
        primary_path: PathBuf,
        secondary_path: PathBuf,
        record_count: usize,
    },
    /// Account-detail export written.
    DetailDone {
        output_path: PathBuf,
        record_count: usize,
    },
    Error {
        message: String,
    },
    /// Last event of every job.
    Finished {
        kind: JobKind,
        outcome: JobOutcome,
    },
}

impl JobEvent {
    pub fn info(message: impl Into<String>) -> Self {
        JobEvent::Log {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        JobEvent::Log {
            level: LogLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error_log(message: impl Into<String>) -> Self {
        JobEvent::Log {
            level: LogLevel::Error,
            message: message.into(),
        }
    }
}
