use doors_core::{Record, FIELD_CLIENT};

use crate::job::JobContext;
use crate::locators::ListingPortal;
use crate::retry::attempt;
use crate::session::Session;
use crate::SessionError;

/// Opens one listing row in its own tab and parses its detail table.
///
/// The main tab is always restored and the listing re-confirmed before
/// returning. Parse failures and denylisted clients yield `None`.
pub async fn extract_row(
    session: &mut Session,
    ctx: &JobContext<'_>,
    portal: &ListingPortal,
    href: &str,
) -> Option<Record> {
    let main = match session.main_tab().cloned() {
        Some(tab) => tab,
        None => match session.current_tab().await {
            Ok(tab) => tab,
            Err(err) => {
                ctx.reporter.warn(format!("detail skipped, no main tab ({err})"));
                return None;
            }
        },
    };

    if let Err(err) = session.open_tab().await {
        ctx.reporter.warn(format!("detail skipped, cannot open tab ({err})"));
        return None;
    }
    let parsed = parse_detail(session, ctx, portal, href).await;

    if let Err(err) = session.close_tab().await {
        ctx.reporter.warn(format!("closing detail tab failed: {err}"));
    }
    if let Err(err) = session.switch_tab(&main).await {
        ctx.reporter.warn(format!("returning to the listing failed: {err}"));
    }
    if let Err(err) = session
        .wait_visible_for(&portal.list_row, portal.return_timeout)
        .await
    {
        ctx.reporter.warn(format!("listing not visible after detail: {err}"));
    }

    let record = match parsed {
        Ok(record) if record.is_empty() => {
            ctx.reporter.warn(format!("detail at {href} had no fields"));
            return None;
        }
        Ok(record) => record,
        Err(err) => {
            ctx.reporter.warn(format!("detail failed ({err})"));
            return None;
        }
    };

    let client = record.get(FIELD_CLIENT).unwrap_or("");
    if ctx.config.is_denied_client(client) {
        ctx.reporter.info(format!("skipping denied client: {client}"));
        return None;
    }
    ctx.reporter.info(format!("parsed {} fields", record.len()));
    Some(record)
}

async fn parse_detail(
    session: &mut Session,
    ctx: &JobContext<'_>,
    portal: &ListingPortal,
    href: &str,
) -> Result<Record, SessionError> {
    session.navigate(href).await?;
    let table_locator = portal.detail_table.clone();
    let table = attempt(
        "locate detail table",
        ctx.config.retry_policy(),
        ctx.reporter,
        session,
        move |s| {
            let locator = table_locator.clone();
            Box::pin(async move { s.find(&locator).await })
        },
    )
    .await?;

    let cells = session.find_all_in(&table, &portal.detail_cell).await?;
    let mut texts = Vec::with_capacity(cells.len());
    for cell in &cells {
        texts.push(session.read_text(cell).await?.trim().to_string());
    }
    Ok(label_value_pairs(&texts))
}

/// Pairs `[label, value, label, value, ..]`; a blank label drops its pair and
/// a trailing label without a value is ignored.
pub fn label_value_pairs<S: AsRef<str>>(cells: &[S]) -> Record {
    cells
        .chunks_exact(2)
        .filter(|pair| !pair[0].as_ref().is_empty())
        .map(|pair| (pair[0].as_ref(), pair[1].as_ref()))
        .collect()
}
