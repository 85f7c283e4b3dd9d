use std::sync::mpsc;

use doors_core::{JobEvent, LogLevel};
use doors_logging::{doors_error, doors_info, doors_warn};

/// Receives every event a job produces.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: JobEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<JobEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<JobEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: JobEvent) {
        let _ = self.tx.send(event);
    }
}

/// Writes log lines to both the logger and the event stream, so the log file
/// and the caller's log view carry the same messages.
#[derive(Clone, Copy)]
pub struct Reporter<'a> {
    sink: &'a dyn EventSink,
}

impl<'a> Reporter<'a> {
    pub fn new(sink: &'a dyn EventSink) -> Self {
        Self { sink }
    }

    pub fn emit(&self, event: JobEvent) {
        self.sink.emit(event);
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => doors_info!("{message}"),
            LogLevel::Warn => doors_warn!("{message}"),
            LogLevel::Error => doors_error!("{message}"),
        }
        self.sink.emit(JobEvent::Log { level, message });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }
}
