use std::collections::VecDeque;
use std::path::PathBuf;

use crate::view_model::RunViewModel;

/// Lines of log kept for display.
pub const LOG_TAIL: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Paused,
    AwaitingVerification,
    Stopping,
    Finished,
    Failed,
}

impl RunStatus {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RunStatus::Running
                | RunStatus::Paused
                | RunStatus::AwaitingVerification
                | RunStatus::Stopping
        )
    }
}

/// Caller-side view of the current run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunState {
    pub(crate) status: RunStatus,
    /// Full run whose detail step has not started yet.
    pub(crate) awaiting_details: bool,
    pub(crate) page: u32,
    pub(crate) range_text: String,
    pub(crate) record_count: usize,
    pub(crate) fraction: Option<f64>,
    pub(crate) outputs: Vec<PathBuf>,
    pub(crate) log: VecDeque<String>,
    pub(crate) last_error: Option<String>,
    dirty: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn view(&self) -> RunViewModel {
        RunViewModel {
            status: self.status,
            page: self.page,
            range_text: self.range_text.clone(),
            record_count: self.record_count,
            fraction: self.fraction,
            outputs: self.outputs.clone(),
            log: self.log.iter().cloned().collect(),
            last_error: self.last_error.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn begin_run(&mut self, awaiting_details: bool) {
        self.status = RunStatus::Running;
        self.awaiting_details = awaiting_details;
        self.page = 0;
        self.range_text.clear();
        self.record_count = 0;
        self.fraction = None;
        self.outputs.clear();
        self.last_error = None;
        self.mark_dirty();
    }

    pub(crate) fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_TAIL {
            self.log.pop_front();
        }
        self.log.push_back(line);
        self.mark_dirty();
    }
}
