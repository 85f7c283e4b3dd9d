use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use doors_core::{
    DetailParams, JobControl, JobEvent, JobKind, JobOutcome, JobRequest, ListingParams,
    ScrapeConfig,
};
use doors_logging::{clear_job_label, doors_error, doors_info};

use crate::detail_job::DetailJob;
use crate::export::{local_clock, Clock};
use crate::job::{run_job, JobReport};
use crate::listing_job::ListingJob;
use crate::locators::{AccountPortal, ListingPortal, ModalPortal};
use crate::session::SessionFactory;
use crate::sink::{ChannelEventSink, EventSink};

/// Everything a job needs besides its own parameters.
#[derive(Clone)]
pub struct EngineSettings {
    pub config: ScrapeConfig,
    pub clock: Clock,
    pub listing_portal: ListingPortal,
    pub account_portal: AccountPortal,
    pub modal_portal: ModalPortal,
}

impl EngineSettings {
    pub fn new(config: ScrapeConfig) -> Self {
        Self {
            config,
            clock: local_clock(),
            listing_portal: ListingPortal::default(),
            account_portal: AccountPortal::default(),
            modal_portal: ModalPortal::default(),
        }
    }
}

enum EngineCommand {
    Start(JobRequest),
}

/// Owns the worker thread jobs run on. Jobs run one at a time, in order.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<JobEvent>,
    control: JobControl,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings, factory: Arc<dyn SessionFactory>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let control = JobControl::new();
        let worker_control = control.clone();

        thread::spawn(move || {
            let sink = ChannelEventSink::new(event_tx);
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    let reason = format!("cannot start the job runtime: {err}");
                    doors_error!("{reason}");
                    while let Ok(EngineCommand::Start(request)) = cmd_rx.recv() {
                        fail_request(&sink, &request, reason.clone());
                    }
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Start(request) => {
                        let kind = first_kind(&request);
                        let run = panic::catch_unwind(AssertUnwindSafe(|| {
                            runtime.block_on(run_request(
                                request,
                                &settings,
                                factory.as_ref(),
                                &worker_control,
                                &sink,
                            ))
                        }));
                        if let Err(payload) = run {
                            clear_job_label();
                            let reason =
                                format!("job worker panicked: {}", panic_text(payload.as_ref()));
                            doors_error!("{reason}");
                            sink.emit(JobEvent::Error {
                                message: reason.clone(),
                            });
                            sink.emit(JobEvent::Finished {
                                kind,
                                outcome: JobOutcome::Failed(reason),
                            });
                            break;
                        }
                    }
                }
            }
        });

        Self {
            cmd_tx,
            event_rx,
            control,
        }
    }

    /// Queues a run. Pause and stop flags are cleared first.
    pub fn start(&self, request: JobRequest) {
        self.control.reset();
        let _ = self.cmd_tx.send(EngineCommand::Start(request));
    }

    /// Flags shared with the running job.
    pub fn control(&self) -> &JobControl {
        &self.control
    }

    /// Next event. `Disconnected` means the worker is gone and no more
    /// events will come.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<JobEvent, RecvTimeoutError> {
        self.event_rx.recv_timeout(timeout)
    }
}

/// Kind of the first job a request runs.
fn first_kind(request: &JobRequest) -> JobKind {
    match request {
        JobRequest::Listing(_) | JobRequest::Full { .. } => JobKind::Listing,
        JobRequest::Details(_) => JobKind::Details,
    }
}

fn fail_request(sink: &dyn EventSink, request: &JobRequest, reason: String) {
    sink.emit(JobEvent::Error {
        message: reason.clone(),
    });
    sink.emit(JobEvent::Finished {
        kind: first_kind(request),
        outcome: JobOutcome::Failed(reason),
    });
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs one request to completion on the current thread.
pub async fn run_request(
    request: JobRequest,
    settings: &EngineSettings,
    factory: &dyn SessionFactory,
    control: &JobControl,
    sink: &dyn EventSink,
) {
    match request {
        JobRequest::Listing(params) => {
            run_listing(params, settings, factory, control, sink).await;
        }
        JobRequest::Details(params) => {
            run_details(params, settings, factory, control, sink).await;
        }
        JobRequest::Full { listing, details } => {
            let dest_dir = listing.dest_dir.clone();
            let report = run_listing(listing, settings, factory, control, sink).await;
            match (report.outcome, report.primary_output) {
                (JobOutcome::Success, Some(input)) => {
                    doors_info!("chaining details on {}", input.display());
                    let params = DetailParams {
                        input,
                        dest_dir,
                        credentials: details,
                    };
                    run_details(params, settings, factory, control, sink).await;
                }
                (outcome, _) => doors_info!("full run ends after listing ({outcome})"),
            }
        }
    }
}

async fn run_listing(
    params: ListingParams,
    settings: &EngineSettings,
    factory: &dyn SessionFactory,
    control: &JobControl,
    sink: &dyn EventSink,
) -> JobReport {
    let job = ListingJob::new(params, settings.clock.clone())
        .with_portal(settings.listing_portal.clone());
    run_job(Box::new(job), factory, &settings.config, control, sink).await
}

async fn run_details(
    params: DetailParams,
    settings: &EngineSettings,
    factory: &dyn SessionFactory,
    control: &JobControl,
    sink: &dyn EventSink,
) -> JobReport {
    let job = DetailJob::new(params, settings.clock.clone()).with_portals(
        settings.account_portal.clone(),
        settings.modal_portal.clone(),
    );
    run_job(Box::new(job), factory, &settings.config, control, sink).await
}
