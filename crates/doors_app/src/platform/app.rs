use std::io::{self, BufRead};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use doors_core::{update, JobEvent, JobRequest, Msg, RunState, RunStatus};
use doors_logging::{doors_error, doors_info};

use super::effects::EffectRunner;
use super::render::Renderer;

/// How long to wait on the engine before ticking.
const TICK: Duration = Duration::from_millis(75);

/// Runs one request to the end and returns the final status.
pub fn run_app(runner: EffectRunner, request: JobRequest) -> RunStatus {
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    spawn_stdin_reader(msg_tx);
    println!("commands: p + enter to pause/resume, s + enter to stop");

    let mut app = App {
        state: RunState::new(),
        runner,
        renderer: Renderer::default(),
    };
    app.dispatch(Msg::Start(request));

    while !matches!(app.state.status(), RunStatus::Finished | RunStatus::Failed) {
        while let Ok(msg) = msg_rx.try_recv() {
            app.dispatch(msg);
        }
        let Some(msg) = engine_msg(app.runner.next_event(TICK)) else {
            doors_error!("job worker stopped unexpectedly");
            return RunStatus::Failed;
        };
        app.dispatch(msg);
    }

    doors_info!("run ended: {:?}", app.state.status());
    app.state.status()
}

struct App {
    state: RunState,
    runner: EffectRunner,
    renderer: Renderer,
}

impl App {
    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        self.runner.apply(effects);
        if state.consume_dirty() {
            self.renderer.draw(state.view());
        }
        self.state = state;
    }
}

/// `None` once the worker has hung up.
fn engine_msg(received: Result<JobEvent, RecvTimeoutError>) -> Option<Msg> {
    match received {
        Ok(event) => Some(Msg::Engine(event)),
        Err(RecvTimeoutError::Timeout) => Some(Msg::Tick),
        Err(RecvTimeoutError::Disconnected) => None,
    }
}

/// Operator command typed on stdin.
fn parse_command(line: &str) -> Option<Msg> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" | "resume" => Some(Msg::PauseToggled),
        "s" | "stop" => Some(Msg::StopClicked),
        _ => None,
    }
}

fn spawn_stdin_reader(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if let Some(msg) = parse_command(&line) {
                if msg_tx.send(msg).is_err() {
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdin_commands_map_to_messages() {
        assert_eq!(parse_command("p\n"), Some(Msg::PauseToggled));
        assert_eq!(parse_command(" S "), Some(Msg::StopClicked));
        assert_eq!(parse_command("resume"), Some(Msg::PauseToggled));
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("quit"), None);
    }

    #[test]
    fn dead_worker_ends_the_loop() {
        let event = JobEvent::Error {
            message: "boom".to_string(),
        };
        assert_eq!(engine_msg(Ok(event.clone())), Some(Msg::Engine(event)));
        assert_eq!(engine_msg(Err(RecvTimeoutError::Timeout)), Some(Msg::Tick));
        assert_eq!(engine_msg(Err(RecvTimeoutError::Disconnected)), None);
    }
}
