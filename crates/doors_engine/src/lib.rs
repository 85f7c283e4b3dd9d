//! Doors engine: remote session, navigation, extraction, export and the job worker.
mod account_detail;
mod control;
mod csr_detail;
mod detail_job;
mod engine;
mod export;
mod filename;
mod input;
mod job;
mod listing_detail;
mod listing_job;
mod locators;
mod navigation;
mod persist;
mod retry;
mod session;
mod sink;
mod types;
mod webdriver;

pub use account_detail::{extract_account, interleaved_pairs, login_account_portal, ContactPatterns};
pub use control::wait_while_paused;
pub use csr_detail::extract_modal;
pub use detail_job::DetailJob;
pub use engine::{run_request, EngineHandle, EngineSettings};
pub use export::{
    export_details, export_details_unreconciled, export_listing, local_clock, Clock,
    DetailExport, ExportError, ExportSettings, ListingColumns, ListingExport, TEMPLATE_COLUMNS,
    TIMESTAMP_FORMAT,
};
pub use filename::{detail_prefix, export_filename, listing_prefix, slug};
pub use input::{accounts_from, load_input, InputError};
pub use job::{run_job, Flow, JobContext, JobReport, PhasedJob};
pub use listing_detail::{extract_row, label_value_pairs};
pub use listing_job::ListingJob;
pub use locators::{AccountPortal, ListingPortal, ModalPortal};
pub use navigation::{await_verification, login, search_and_filter, traverse_listing};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use retry::{attempt, AttemptFuture};
pub use session::{keys, RemoteSession, Session, SessionFactory};
pub use sink::{ChannelEventSink, EventSink, Reporter};
pub use types::{ElementRef, JobError, Locator, SessionError, SessionErrorKind, TabHandle};
pub use webdriver::{WebDriverFactory, WebDriverSession, WebDriverSettings};
