//! Login, search and paging on the listing portal.

use std::collections::HashSet;

use doors_core::{
    Credentials, JobEvent, ListingParams, NextControl, PageCursor, PageDecision, Phase, ResultSet,
};
use doors_logging::doors_debug;

use crate::control::wait_while_paused;
use crate::job::{Flow, JobContext};
use crate::listing_detail::extract_row;
use crate::locators::ListingPortal;
use crate::retry::attempt;
use crate::session::Session;
use crate::{ElementRef, JobError, Locator, SessionError, SessionErrorKind};

const UNKNOWN_RANGE: &str = "(?)";

fn login_err(err: SessionError) -> JobError {
    JobError::Login(err.to_string())
}

fn search_err(err: SessionError) -> JobError {
    JobError::Search(err.to_string())
}

/// Submits credentials and waits for the landmark. When it does not show up
/// in time, hands over to a human and waits for them.
pub async fn login(
    session: &mut Session,
    ctx: &mut JobContext<'_>,
    portal: &ListingPortal,
    credentials: &Credentials,
) -> Result<Flow, JobError> {
    ctx.enter(Phase::LoggingIn)?;
    ctx.reporter.info("opening login page");
    session.navigate(&portal.login_url).await.map_err(login_err)?;

    let user = session.wait_visible(&portal.username).await.map_err(login_err)?;
    session.fill(&user, &credentials.user).await.map_err(login_err)?;

    let password = match session
        .wait_visible_for(&portal.password, portal.password_timeout)
        .await
    {
        Ok(el) => el,
        Err(err) => {
            doors_debug!("primary password field missing ({err}), trying fallback");
            session
                .wait_visible(&portal.password_fallback)
                .await
                .map_err(login_err)?
        }
    };
    session
        .fill(&password, &credentials.password)
        .await
        .map_err(login_err)?;

    let button = session.wait_visible(&portal.login_button).await.map_err(login_err)?;
    session.click(&button).await.map_err(login_err)?;

    match session
        .wait_visible_for(&portal.landmark, ctx.config.verification_timeout())
        .await
    {
        Ok(_) => {
            session.mark_logged_in();
            session.pin_main_tab().await.map_err(login_err)?;
            ctx.reporter.info("login complete");
            Ok(Flow::Continue)
        }
        Err(err) if matches!(err.kind, SessionErrorKind::Timeout | SessionErrorKind::NotFound) => {
            await_verification(session, ctx, &portal.landmark).await
        }
        Err(err) => Err(login_err(err)),
    }
}

/// Pauses the job until the operator resumes or stops it, then checks the
/// session survived. A dead session after resuming is fatal; verification is
/// never retried on its own.
pub async fn await_verification(
    session: &mut Session,
    ctx: &mut JobContext<'_>,
    landmark: &Locator,
) -> Result<Flow, JobError> {
    ctx.enter(Phase::AwaitingVerification)?;
    ctx.reporter
        .warn("login landmark did not appear, manual verification required");
    ctx.reporter.emit(JobEvent::VerificationRequired);
    ctx.control.pause();

    if wait_while_paused(ctx.control, ctx.config.pause_poll()).await {
        ctx.reporter.info("stopped while awaiting verification");
        return Ok(Flow::Stop);
    }
    ctx.reporter.info("resuming after verification");

    session
        .probe_alive()
        .await
        .map_err(|err| JobError::Login(format!("session lost during verification: {err}")))?;
    session.wait_visible(landmark).await.map_err(login_err)?;
    session.mark_logged_in();
    session.pin_main_tab().await.map_err(login_err)?;
    ctx.reporter.info("login complete");
    Ok(Flow::Continue)
}

/// Runs the search and applies the filters. Optional filter steps only log
/// their failures; the phase fails when the filters cannot be applied or no
/// listing appears.
pub async fn search_and_filter(
    session: &mut Session,
    ctx: &mut JobContext<'_>,
    portal: &ListingPortal,
    params: &ListingParams,
) -> Result<(), JobError> {
    ctx.enter(Phase::Searching)?;
    let query = params.query();
    ctx.reporter.info(format!("search for {query}"));

    let input = session.wait_visible(&portal.search_input).await.map_err(search_err)?;
    session.fill(&input, &query).await.map_err(search_err)?;
    let button = session.find(&portal.search_button).await.map_err(search_err)?;
    session.click(&button).await.map_err(search_err)?;
    tokio::time::sleep(portal.after_search).await;

    match session
        .wait_visible_for(&portal.filters_toggle, portal.filters_timeout)
        .await
    {
        Ok(toggle) => match session.click(&toggle).await {
            Ok(()) => ctx.reporter.info("filter panel opened"),
            Err(err) => ctx.reporter.warn(format!("could not open filter panel: {err}")),
        },
        Err(_) => ctx.reporter.warn("no filter panel found"),
    }

    match select_option(session, ctx, &portal.active_select, &portal.active_option_text).await {
        Ok(()) => ctx
            .reporter
            .info(format!("active = {}", portal.active_option_text)),
        Err(err) => ctx
            .reporter
            .warn(format!("could not set the active filter: {err}")),
    }

    if let Some(rta) = params.rta.as_deref().filter(|v| !v.trim().is_empty()) {
        fill_filter(session, ctx, &portal.rta_input, "area code", rta).await;
    }
    fill_filter(session, ctx, &portal.city_input, "city", &params.city).await;
    if let Some(street) = params.street.as_deref().filter(|v| !v.trim().is_empty()) {
        fill_filter(session, ctx, &portal.street_input, "street", street).await;
    }

    apply_filters(session, ctx, portal).await?;
    tokio::time::sleep(portal.after_apply).await;

    let list = session.wait_visible(&portal.list).await.map_err(search_err)?;
    session.remember_list(list);
    ctx.reporter.info("listing visible");
    Ok(())
}

async fn locate(
    session: &mut Session,
    ctx: &JobContext<'_>,
    description: &str,
    locator: &Locator,
) -> Result<ElementRef, SessionError> {
    let locator = locator.clone();
    attempt(
        description,
        ctx.config.retry_policy(),
        ctx.reporter,
        session,
        move |s| {
            let locator = locator.clone();
            Box::pin(async move { s.find(&locator).await })
        },
    )
    .await
}

async fn select_option(
    session: &mut Session,
    ctx: &JobContext<'_>,
    select: &Locator,
    text: &str,
) -> Result<(), SessionError> {
    let element = locate(session, ctx, "locate active filter", select).await?;
    session.scroll_into_view(&element).await?;
    let option = Locator::xpath(format!(".//option[normalize-space(.)='{text}']"));
    let option = session.find_in(&element, &option).await?;
    session.click(&option).await
}

async fn fill_filter(
    session: &mut Session,
    ctx: &JobContext<'_>,
    locator: &Locator,
    name: &str,
    value: &str,
) {
    let result = async {
        let field = locate(session, ctx, &format!("locate {name} filter"), locator).await?;
        session.scroll_into_view(&field).await?;
        session.fill(&field, value).await
    }
    .await;
    match result {
        Ok(()) => ctx.reporter.info(format!("{name} = {value}")),
        Err(err) => ctx.reporter.warn(format!("could not set {name} filter: {err}")),
    }
}

async fn apply_filters(
    session: &mut Session,
    ctx: &JobContext<'_>,
    portal: &ListingPortal,
) -> Result<(), JobError> {
    let button = match session.wait_visible(&portal.apply_button).await {
        Ok(button) => button,
        Err(err) => {
            ctx.reporter
                .warn(format!("apply button not found ({err}), trying fallback"));
            session
                .wait_visible_for(&portal.apply_button_fallback, portal.apply_fallback_timeout)
                .await
                .map_err(|err| JobError::Search(format!("cannot apply filters: {err}")))?
        }
    };
    session.scroll_into_view(&button).await.map_err(search_err)?;
    session.click(&button).await.map_err(search_err)?;
    ctx.reporter.info("filters applied");
    Ok(())
}

/// Walks every listing page, extracting each row into `records`.
///
/// A stale list retries the page without advancing (rows already taken on
/// that page are skipped); any other paging failure ends the listing at the
/// current page.
pub async fn traverse_listing(
    session: &mut Session,
    ctx: &mut JobContext<'_>,
    portal: &ListingPortal,
    records: &mut ResultSet,
) -> Result<Flow, JobError> {
    let mut cursor = PageCursor::new();
    let mut processed: HashSet<String> = HashSet::new();

    loop {
        if ctx.stop_requested() {
            ctx.reporter.info("stop requested, leaving listing");
            return Ok(Flow::Stop);
        }
        let page = cursor.page();
        ctx.enter(Phase::Listing { page })?;

        let range_text = read_range(session, portal).await;
        ctx.reporter.info(format!("page {page} {range_text}"));

        let links = match page_links(session, portal, &mut cursor).await {
            Ok(links) => links,
            Err(err) if err.is_stale() => {
                ctx.reporter.warn(format!("stale listing on page {page}, retrying"));
                match cursor.observe(NextControl::Stale) {
                    PageDecision::Retry => continue,
                    _ => break,
                }
            }
            Err(err) => {
                ctx.reporter.warn(format!("cannot read page {page}: {err}"));
                cursor.observe(NextControl::Unavailable(err.to_string()));
                break;
            }
        };
        if links.is_empty() {
            ctx.reporter.info(format!("no rows on page {page}, ending listing"));
            cursor.finish_empty();
            break;
        }

        for href in links {
            if processed.contains(&href) {
                continue;
            }
            if ctx.pause_point().await == Flow::Stop {
                ctx.reporter.info("stop requested, leaving listing");
                return Ok(Flow::Stop);
            }
            processed.insert(href.clone());
            if let Some(record) = extract_row(session, ctx, portal, &href).await {
                records.push(record);
            }
        }

        let next = advance(session, ctx, portal, &cursor).await;
        let decision = cursor.observe(next);
        ctx.reporter.emit(JobEvent::Progress {
            page,
            range_text,
            record_count: records.len(),
            fraction: cursor.fraction(),
        });
        match decision {
            PageDecision::Continue => processed.clear(),
            PageDecision::Retry => {}
            PageDecision::Finish => break,
        }
    }

    ctx.reporter.info(format!(
        "listing done: {} records over {} pages",
        records.len(),
        cursor.total_pages().unwrap_or(cursor.page())
    ));
    Ok(Flow::Continue)
}

async fn read_range(session: &mut Session, portal: &ListingPortal) -> String {
    let indicator = match session
        .wait_visible_for(&portal.range_indicator, portal.range_timeout)
        .await
    {
        Ok(el) => el,
        Err(_) => return UNKNOWN_RANGE.to_string(),
    };
    match session.read_text(&indicator).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => UNKNOWN_RANGE.to_string(),
    }
}

async fn page_links(
    session: &mut Session,
    portal: &ListingPortal,
    cursor: &mut PageCursor,
) -> Result<Vec<String>, SessionError> {
    let list = session.find(&portal.list).await?;
    cursor.set_list_token(list.id());
    session.remember_list(list);

    let anchors = session.find_all(&portal.row_link).await?;
    let mut links = Vec::with_capacity(anchors.len());
    for anchor in &anchors {
        if let Some(href) = session.attribute(anchor, "href").await? {
            if !href.trim().is_empty() {
                links.push(href);
            }
        }
    }
    Ok(links)
}

async fn advance(
    session: &mut Session,
    ctx: &JobContext<'_>,
    portal: &ListingPortal,
    cursor: &PageCursor,
) -> NextControl {
    match try_advance(session, portal, cursor).await {
        Ok(NextControl::Disabled) => {
            ctx.reporter.info("last page reached");
            NextControl::Disabled
        }
        Ok(next) => next,
        Err(err) if err.is_stale() => {
            ctx.reporter.warn(format!("stale list while advancing ({err})"));
            NextControl::Stale
        }
        Err(err) => {
            ctx.reporter.warn(format!("no next page ({err})"));
            NextControl::Unavailable(err.to_string())
        }
    }
}

async fn try_advance(
    session: &mut Session,
    portal: &ListingPortal,
    cursor: &PageCursor,
) -> Result<NextControl, SessionError> {
    let old = session.find(&portal.list).await?;
    if cursor.list_token().is_some_and(|token| token != old.id()) {
        return Ok(NextControl::Stale);
    }
    session
        .execute_script("window.scrollTo(0, document.body.scrollHeight);", &[])
        .await?;
    let next = session
        .find_for(&portal.next_control, portal.next_timeout)
        .await?;
    let src = session.attribute(&next, "src").await?.unwrap_or_default();
    if src.contains(&portal.next_disabled_marker) {
        return Ok(NextControl::Disabled);
    }

    doors_debug!("clicking next page");
    session
        .execute_script("arguments[0].parentElement.click();", std::slice::from_ref(&next))
        .await?;
    session.wait_stale(&old, portal.stale_timeout).await?;
    session.wait_visible(&portal.list_row).await?;
    Ok(NextControl::Advanced)
}
