//! Doors core: pure domain types, reconciliation and the caller-side run state machine.
mod config;
mod control;
mod effect;
mod event;
mod identifier;
mod job;
mod msg;
mod pagination;
mod phase;
mod reconcile;
mod record;
mod retry;
mod state;
mod update;
mod view_model;

pub use config::{AccountRoute, ScrapeConfig};
pub use control::JobControl;
pub use effect::Effect;
pub use event::{JobEvent, LogLevel};
pub use identifier::{normalize_identifier, Identifier};
pub use job::{
    Credentials, DetailCredentials, DetailParams, JobKind, JobOutcome, JobRequest, ListingParams,
};
pub use msg::Msg;
pub use pagination::{NextControl, PageCursor, PageDecision, MAX_STALE_RETRIES};
pub use phase::{Phase, PhaseError, PhaseTracker};
pub use reconcile::{
    reconcile, ReconcileError, ReconcileOptions, ReconciledRow, Reconciliation,
    UnmatchedSecondaryPolicy,
};
pub use record::{
    Record, ResultSet, FIELD_ACCOUNT, FIELD_CLIENT, FIELD_EMAIL, FIELD_PHONE, SENTINEL,
};
pub use retry::RetryPolicy;
pub use state::{RunState, RunStatus, LOG_TAIL};
pub use update::update;
pub use view_model::RunViewModel;
