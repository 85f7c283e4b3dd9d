use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use doors_core::{Effect, JobEvent, JobRequest};
use doors_engine::EngineHandle;
use doors_logging::doors_info;

/// Executes the effects returned by `update` against the engine.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartJob(request) => {
                    doors_info!("StartJob {}", describe(&request));
                    self.engine.start(request);
                }
                Effect::SetPaused(paused) => self.engine.control().set_paused(paused),
                Effect::Stop => {
                    doors_info!("Stop requested");
                    self.engine.control().stop();
                }
            }
        }
    }

    /// Next engine event. Fails with `Timeout` when `timeout` passes without
    /// one and with `Disconnected` once the worker is gone.
    pub fn next_event(&self, timeout: Duration) -> Result<JobEvent, RecvTimeoutError> {
        self.engine.recv_timeout(timeout)
    }
}

fn describe(request: &JobRequest) -> String {
    match request {
        JobRequest::Listing(params) => format!("listing city={}", params.city),
        JobRequest::Details(params) => {
            format!("details input={}", params.input.display())
        }
        JobRequest::Full { listing, .. } => format!("full city={}", listing.city),
    }
}
