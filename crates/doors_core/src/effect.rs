use crate::job::JobRequest;

/// Side effects requested by [`crate::update`], executed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartJob(JobRequest),
    SetPaused(bool),
    Stop,
}
