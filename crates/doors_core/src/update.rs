use crate::event::{JobEvent, LogLevel};
use crate::job::{JobKind, JobOutcome, JobRequest};
use crate::{Effect, Msg, RunState, RunStatus};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start(request) => {
            if state.status.is_active() {
                return (state, Vec::new());
            }
            let full = matches!(request, JobRequest::Full { .. });
            state.begin_run(full);
            vec![Effect::StartJob(request)]
        }
        Msg::PauseToggled => match state.status {
            RunStatus::Running => {
                state.status = RunStatus::Paused;
                state.push_log("paused".to_string());
                vec![Effect::SetPaused(true)]
            }
            RunStatus::Paused | RunStatus::AwaitingVerification => {
                state.status = RunStatus::Running;
                state.push_log("resumed".to_string());
                vec![Effect::SetPaused(false)]
            }
            _ => Vec::new(),
        },
        Msg::StopClicked => {
            if matches!(
                state.status,
                RunStatus::Running | RunStatus::Paused | RunStatus::AwaitingVerification
            ) {
                state.status = RunStatus::Stopping;
                state.push_log("stopping...".to_string());
                // Stop first so a job blocked on the pause flag wakes up into a stop.
                vec![Effect::Stop, Effect::SetPaused(false)]
            } else {
                Vec::new()
            }
        }
        Msg::Engine(event) => {
            apply_event(&mut state, event);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn apply_event(state: &mut RunState, event: JobEvent) {
    match event {
        JobEvent::Log { level, message } => {
            let line = match level {
                LogLevel::Info => message,
                LogLevel::Warn => format!("warning: {message}"),
                LogLevel::Error => format!("error: {message}"),
            };
            state.push_log(line);
        }
        JobEvent::Progress {
            page,
            range_text,
            record_count,
            fraction,
        } => {
            state.page = page;
            state.range_text = range_text;
            state.record_count = record_count;
            state.fraction = fraction;
            state.mark_dirty();
        }
        JobEvent::DetailProgress { done, total } => {
            if total > 0 {
                state.fraction = Some(done as f64 / total as f64);
            }
            state.mark_dirty();
        }
        JobEvent::VerificationRequired => {
            if matches!(state.status, RunStatus::Running | RunStatus::Paused) {
                state.status = RunStatus::AwaitingVerification;
            }
            state.push_log("manual verification required in the browser window".to_string());
        }
        JobEvent::Done {
            primary_path,
            secondary_path,
            record_count,
        } => {
            state.record_count = record_count;
            state.push_log(format!(
                "listing export: {record_count} records -> {}",
                primary_path.display()
            ));
            state.outputs.push(primary_path);
            state.outputs.push(secondary_path);
        }
        JobEvent::DetailDone {
            output_path,
            record_count,
        } => {
            state.record_count = record_count;
            state.push_log(format!(
                "detail export: {record_count} rows -> {}",
                output_path.display()
            ));
            state.outputs.push(output_path);
        }
        JobEvent::Error { message } => {
            state.push_log(format!("error: {message}"));
            state.last_error = Some(message);
        }
        JobEvent::Finished { kind, outcome } => {
            let chain = state.awaiting_details
                && kind == JobKind::Listing
                && outcome == JobOutcome::Success
                && state.status != RunStatus::Stopping;
            state.awaiting_details = false;
            if chain {
                state.page = 0;
                state.fraction = None;
                state.push_log("listing finished, starting account details".to_string());
                return;
            }
            state.status = match outcome {
                JobOutcome::Success | JobOutcome::Stopped => RunStatus::Finished,
                JobOutcome::Failed(_) => RunStatus::Failed,
            };
            state.fraction = Some(1.0);
            state.push_log(format!("{kind} {outcome}"));
        }
    }
}
