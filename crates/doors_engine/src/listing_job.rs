use doors_core::{JobEvent, JobKind, JobOutcome, ListingParams, ResultSet};

use crate::export::{export_listing, Clock, ExportError, ExportSettings, ListingColumns};
use crate::filename::listing_prefix;
use crate::job::{Flow, JobContext, PhasedJob};
use crate::locators::ListingPortal;
use crate::navigation::{login, search_and_filter, traverse_listing};
use crate::session::Session;
use crate::sink::Reporter;
use crate::JobError;

/// Search the listing portal and collect one record per listed row.
pub struct ListingJob {
    params: ListingParams,
    portal: ListingPortal,
    export: ExportSettings,
    records: ResultSet,
}

impl ListingJob {
    pub fn new(params: ListingParams, clock: Clock) -> Self {
        let export = ExportSettings::new(params.dest_dir.clone()).with_clock(clock);
        Self {
            params,
            portal: ListingPortal::default(),
            export,
            records: ResultSet::new(),
        }
    }

    pub fn with_portal(mut self, portal: ListingPortal) -> Self {
        self.portal = portal;
        self
    }

    pub fn prefix(&self) -> String {
        listing_prefix(
            &self.params.city,
            self.params.street.as_deref(),
            self.params.rta.as_deref(),
        )
    }
}

#[async_trait::async_trait]
impl PhasedJob for ListingJob {
    fn kind(&self) -> JobKind {
        JobKind::Listing
    }

    fn label(&self) -> String {
        format!("listing {}", self.prefix())
    }

    async fn login(
        &mut self,
        session: &mut Session,
        ctx: &mut JobContext<'_>,
    ) -> Result<Flow, JobError> {
        login(session, ctx, &self.portal, &self.params.credentials).await
    }

    async fn navigate(
        &mut self,
        session: &mut Session,
        ctx: &mut JobContext<'_>,
    ) -> Result<Flow, JobError> {
        if ctx.stop_requested() {
            return Ok(Flow::Stop);
        }
        search_and_filter(session, ctx, &self.portal, &self.params).await?;
        Ok(Flow::Continue)
    }

    async fn extract(
        &mut self,
        session: &mut Session,
        ctx: &mut JobContext<'_>,
    ) -> Result<Flow, JobError> {
        traverse_listing(session, ctx, &self.portal, &mut self.records).await
    }

    fn finalize(
        self: Box<Self>,
        outcome: &JobOutcome,
        reporter: Reporter<'_>,
    ) -> Result<Option<JobEvent>, ExportError> {
        let columns = ListingColumns {
            city: self.params.city.clone(),
            street: self.params.street.clone().unwrap_or_default(),
            rta: self.params.rta.clone().unwrap_or_default(),
        };
        let export = export_listing(&self.export, &self.prefix(), &columns, &self.records)?;
        reporter.info(format!(
            "{outcome}: {} records written to {}",
            export.record_count,
            export.json_path.display()
        ));
        Ok(Some(JobEvent::Done {
            primary_path: export.json_path,
            secondary_path: export.csv_path,
            record_count: export.record_count,
        }))
    }
}
