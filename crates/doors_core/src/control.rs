use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Pause and stop flags shared between a running job and its caller.
///
/// Cloning yields another handle onto the same flags.
#[derive(Debug, Clone, Default)]
pub struct JobControl {
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// True while the job should keep waiting: paused and not stopped.
    pub fn should_wait(&self) -> bool {
        self.is_paused() && !self.is_stopped()
    }

    /// Clears both flags before the next run.
    pub fn reset(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.stopped.store(false, Ordering::SeqCst);
    }
}
