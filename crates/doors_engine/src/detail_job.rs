use doors_core::{
    reconcile, AccountRoute, DetailParams, Identifier, JobEvent, JobKind, JobOutcome, Phase,
    ReconcileOptions, ResultSet, UnmatchedSecondaryPolicy,
};

use crate::account_detail::{extract_account, login_account_portal, ContactPatterns};
use crate::csr_detail::extract_modal;
use crate::export::{
    export_details, export_details_unreconciled, Clock, ExportError, ExportSettings,
};
use crate::filename::detail_prefix;
use crate::input::{accounts_from, load_input, InputError};
use crate::job::{Flow, JobContext, PhasedJob};
use crate::locators::{AccountPortal, ModalPortal};
use crate::session::Session;
use crate::sink::Reporter;
use crate::JobError;

/// Look every account of a listing export up on the detail portals and merge
/// phone and email back into the listing rows.
pub struct DetailJob {
    params: DetailParams,
    account_portal: AccountPortal,
    modal_portal: ModalPortal,
    export: ExportSettings,
    policy: UnmatchedSecondaryPolicy,
    /// Set once the input has been read; nothing is exported before that.
    primary: Option<ResultSet>,
    short_accounts: Vec<Identifier>,
    long_accounts: Vec<Identifier>,
    patterns: Option<ContactPatterns>,
    secondary: ResultSet,
}

impl DetailJob {
    pub fn new(params: DetailParams, clock: Clock) -> Self {
        let export = ExportSettings::new(params.dest_dir.clone()).with_clock(clock);
        Self {
            params,
            account_portal: AccountPortal::default(),
            modal_portal: ModalPortal::default(),
            export,
            policy: UnmatchedSecondaryPolicy::default(),
            primary: None,
            short_accounts: Vec::new(),
            long_accounts: Vec::new(),
            patterns: None,
            secondary: ResultSet::new(),
        }
    }

    pub fn with_portals(
        mut self,
        account_portal: AccountPortal,
        modal_portal: ModalPortal,
    ) -> Self {
        self.account_portal = account_portal;
        self.modal_portal = modal_portal;
        self
    }

    fn total(&self) -> usize {
        self.short_accounts.len() + self.long_accounts.len()
    }
}

#[async_trait::async_trait]
impl PhasedJob for DetailJob {
    fn kind(&self) -> JobKind {
        JobKind::Details
    }

    fn label(&self) -> String {
        format!("details {}", detail_prefix(&self.params.input))
    }

    async fn prepare(&mut self, ctx: &mut JobContext<'_>) -> Result<(), JobError> {
        ctx.reporter
            .info(format!("reading {}", self.params.input.display()));
        let rows = load_input(&self.params.input)?;
        let accounts = accounts_from(&rows);
        if accounts.is_empty() {
            return Err(InputError::NoAccounts(self.params.input.clone()).into());
        }
        self.patterns = Some(ContactPatterns::new()?);
        self.policy = ctx.config.unmatched_secondary_policy;

        let (short, long): (Vec<_>, Vec<_>) = accounts
            .into_iter()
            .partition(|id| ctx.config.route_for(id) == AccountRoute::AccountPortal);
        ctx.reporter.info(format!(
            "{} rows, {} accounts: {} via account portal, {} via modal portal",
            rows.len(),
            short.len() + long.len(),
            short.len(),
            long.len()
        ));
        self.short_accounts = short;
        self.long_accounts = long;
        self.primary = Some(rows);
        Ok(())
    }

    async fn login(
        &mut self,
        session: &mut Session,
        ctx: &mut JobContext<'_>,
    ) -> Result<Flow, JobError> {
        if self.short_accounts.is_empty() {
            return Ok(Flow::Continue);
        }
        login_account_portal(
            session,
            ctx,
            &self.account_portal,
            &self.params.credentials.account_portal,
        )
        .await?;
        Ok(Flow::Continue)
    }

    async fn navigate(
        &mut self,
        _session: &mut Session,
        ctx: &mut JobContext<'_>,
    ) -> Result<Flow, JobError> {
        ctx.enter(Phase::Extracting)?;
        Ok(Flow::Continue)
    }

    async fn extract(
        &mut self,
        session: &mut Session,
        ctx: &mut JobContext<'_>,
    ) -> Result<Flow, JobError> {
        let total = self.total();
        let mut done = 0;
        let patterns = match &self.patterns {
            Some(patterns) => patterns.clone(),
            None => ContactPatterns::new()?,
        };

        for account in &self.short_accounts {
            if ctx.pause_point().await == Flow::Stop {
                return Ok(Flow::Stop);
            }
            if let Some(record) =
                extract_account(session, ctx, &self.account_portal, &patterns, account).await
            {
                self.secondary.push(record);
            }
            done += 1;
            ctx.reporter.emit(JobEvent::DetailProgress { done, total });
        }

        for account in &self.long_accounts {
            if ctx.pause_point().await == Flow::Stop {
                return Ok(Flow::Stop);
            }
            let operator_code = &self.params.credentials.operator_code;
            if let Some(record) =
                extract_modal(session, ctx, &self.modal_portal, operator_code, account).await
            {
                self.secondary.push(record);
            }
            done += 1;
            ctx.reporter.emit(JobEvent::DetailProgress { done, total });
        }

        ctx.reporter.info(format!(
            "details done: {} of {total} accounts found",
            self.secondary.len()
        ));
        Ok(Flow::Continue)
    }

    fn finalize(
        self: Box<Self>,
        outcome: &JobOutcome,
        reporter: Reporter<'_>,
    ) -> Result<Option<JobEvent>, ExportError> {
        let Some(primary) = &self.primary else {
            return Ok(None);
        };
        let prefix = detail_prefix(&self.params.input);
        let options = ReconcileOptions {
            unmatched_secondary: self.policy,
            ..ReconcileOptions::default()
        };

        let export = match reconcile(primary, &self.secondary, &options) {
            Ok(reconciliation) => {
                let export = export_details(&self.export, &prefix, &reconciliation)?;
                reporter.info(format!(
                    "{outcome}: {} of {} rows matched",
                    reconciliation.matched_count(),
                    reconciliation.rows.len()
                ));
                if let Some(path) = &export.missing_path {
                    reporter.warn(format!(
                        "{} rows still missing a phone -> {}",
                        reconciliation.missing.len(),
                        path.display()
                    ));
                }
                if let Some(path) = &export.unmatched_path {
                    reporter.warn(format!(
                        "{} accounts matched no listing row -> {}",
                        reconciliation.unmatched_secondary.len(),
                        path.display()
                    ));
                }
                export
            }
            Err(err) => {
                let message = format!("reconciliation failed: {err}");
                reporter.error(message.clone());
                reporter.emit(JobEvent::Error { message });
                export_details_unreconciled(&self.export, &prefix, primary, &self.secondary)?
            }
        };

        reporter.info(format!(
            "details written to {} (full data in {})",
            export.csv_path.display(),
            export.json_path.display()
        ));
        Ok(Some(JobEvent::DetailDone {
            output_path: export.csv_path,
            record_count: export.record_count,
        }))
    }
}
