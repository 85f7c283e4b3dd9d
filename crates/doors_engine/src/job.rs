use std::path::PathBuf;

use doors_core::{JobControl, JobEvent, JobKind, JobOutcome, Phase, PhaseTracker, ScrapeConfig};
use doors_logging::{clear_job_label, doors_debug, doors_warn, set_job_label};

use crate::control::wait_while_paused;
use crate::export::ExportError;
use crate::session::{Session, SessionFactory};
use crate::sink::{EventSink, Reporter};
use crate::JobError;

/// Whether a phase wants the job to go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// What a running job may consult: configuration, control flags, the event
/// stream, and its own phase history.
pub struct JobContext<'a> {
    pub config: &'a ScrapeConfig,
    pub control: &'a JobControl,
    pub reporter: Reporter<'a>,
    phases: PhaseTracker,
}

impl<'a> JobContext<'a> {
    pub fn new(config: &'a ScrapeConfig, control: &'a JobControl, reporter: Reporter<'a>) -> Self {
        Self {
            config,
            control,
            reporter,
            phases: PhaseTracker::new(),
        }
    }

    pub fn enter(&mut self, phase: Phase) -> Result<(), JobError> {
        let previous = self.phases.transition(phase)?;
        if previous != phase {
            doors_debug!("phase {previous} -> {phase}");
        }
        Ok(())
    }

    pub fn stop_requested(&self) -> bool {
        self.control.is_stopped()
    }

    /// Honors an operator pause; reports whether the job should stop.
    pub async fn pause_point(&self) -> Flow {
        if wait_while_paused(self.control, self.config.pause_poll()).await {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

/// login, navigate, extract, then one finalize.
#[async_trait::async_trait]
pub trait PhasedJob: Send {
    fn kind(&self) -> JobKind;

    /// Short name prefixed to every log line of the job.
    fn label(&self) -> String;

    /// Work that needs no session, such as reading the input file.
    /// A failure here means no session is ever opened.
    async fn prepare(&mut self, _ctx: &mut JobContext<'_>) -> Result<(), JobError> {
        Ok(())
    }

    async fn login(&mut self, session: &mut Session, ctx: &mut JobContext<'_>)
        -> Result<Flow, JobError>;

    async fn navigate(
        &mut self,
        session: &mut Session,
        ctx: &mut JobContext<'_>,
    ) -> Result<Flow, JobError>;

    async fn extract(
        &mut self,
        session: &mut Session,
        ctx: &mut JobContext<'_>,
    ) -> Result<Flow, JobError>;

    /// Writes whatever was collected. Consumes the job, so it runs once.
    /// Returns the completion event to emit, if anything was written.
    fn finalize(
        self: Box<Self>,
        outcome: &JobOutcome,
        reporter: Reporter<'_>,
    ) -> Result<Option<JobEvent>, ExportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub outcome: JobOutcome,
    /// Lossless export of the job, when one was written.
    pub primary_output: Option<PathBuf>,
}

/// Drives `job` through its phases and always finalizes it.
///
/// Events end with `Finished`. A failed job emits its completion event (if
/// an export was written) before the `Error` carrying the failure reason.
pub async fn run_job(
    mut job: Box<dyn PhasedJob>,
    factory: &dyn SessionFactory,
    config: &ScrapeConfig,
    control: &JobControl,
    sink: &dyn EventSink,
) -> JobReport {
    let kind = job.kind();
    set_job_label(job.label());
    let reporter = Reporter::new(sink);
    let mut ctx = JobContext::new(config, control, reporter);
    reporter.info(format!("{kind} job started"));

    let result = match job.prepare(&mut ctx).await {
        Err(err) => Err(err),
        Ok(()) => match factory.open().await {
            Err(err) => Err(JobError::Session(err)),
            Ok(port) => {
                let mut session = Session::new(port, config.query_timeout());
                let result = drive(job.as_mut(), &mut session, &mut ctx).await;
                if let Err(err) = session.close().await {
                    doors_warn!("closing session failed: {err}");
                }
                result
            }
        },
    };

    let (outcome, terminal) = match result {
        Ok(Flow::Continue) => (JobOutcome::Success, Phase::Finished),
        Ok(Flow::Stop) => (JobOutcome::Stopped, Phase::Stopped),
        Err(err) => (JobOutcome::Failed(err.to_string()), Phase::Failed),
    };
    if let Err(err) = ctx.enter(terminal) {
        doors_warn!("{err}");
    }
    match &outcome {
        JobOutcome::Failed(reason) => reporter.error(format!("{kind} job failed: {reason}")),
        other => reporter.info(format!("{kind} job {other}")),
    }

    let primary_output = match job.finalize(&outcome, reporter) {
        Ok(Some(event)) => {
            let path = match &event {
                JobEvent::Done { primary_path, .. } => Some(primary_path.clone()),
                JobEvent::DetailDone { output_path, .. } => Some(output_path.clone()),
                _ => None,
            };
            reporter.emit(event);
            path
        }
        Ok(None) => None,
        Err(err) => {
            let message = format!("export failed: {err}");
            reporter.error(message.clone());
            reporter.emit(JobEvent::Error { message });
            None
        }
    };

    if let JobOutcome::Failed(reason) = &outcome {
        reporter.emit(JobEvent::Error {
            message: reason.clone(),
        });
    }
    reporter.emit(JobEvent::Finished {
        kind,
        outcome: outcome.clone(),
    });
    clear_job_label();

    JobReport {
        outcome,
        primary_output,
    }
}

async fn drive(
    job: &mut dyn PhasedJob,
    session: &mut Session,
    ctx: &mut JobContext<'_>,
) -> Result<Flow, JobError> {
    if job.login(session, ctx).await? == Flow::Stop {
        return Ok(Flow::Stop);
    }
    if job.navigate(session, ctx).await? == Flow::Stop {
        return Ok(Flow::Stop);
    }
    job.extract(session, ctx).await
}
