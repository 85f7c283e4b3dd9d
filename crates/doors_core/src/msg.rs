use crate::event::JobEvent;
use crate::job::JobRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Operator asked for a run.
    Start(JobRequest),
    /// Operator toggled pause/resume.
    PauseToggled,
    /// Operator asked to stop.
    StopClicked,
    /// Event drained from the engine queue.
    Engine(JobEvent),
    /// Render tick.
    Tick,
    NoOp,
}
