//! Modal-dialog portal: long identifiers.

use doors_core::{Identifier, Record, FIELD_ACCOUNT, FIELD_EMAIL, FIELD_PHONE, SENTINEL};

use crate::job::JobContext;
use crate::locators::ModalPortal;
use crate::retry::attempt;
use crate::session::{keys, Session};
use crate::{ElementRef, Locator, SessionError};

/// Looks one account up through the modal portal. Any failed step drops the
/// account.
pub async fn extract_modal(
    session: &mut Session,
    ctx: &JobContext<'_>,
    portal: &ModalPortal,
    operator_code: &str,
    account: &Identifier,
) -> Option<Record> {
    ctx.reporter.info(format!("account {account}: modal portal"));
    match drive_modal(session, ctx, portal, operator_code, account).await {
        Ok(record) => {
            ctx.reporter.info(format!(
                "account {account}: phone {}, email {}",
                record.get_or_sentinel(FIELD_PHONE),
                record.get_or_sentinel(FIELD_EMAIL)
            ));
            Some(record)
        }
        Err(err) => {
            ctx.reporter.warn(format!("account {account}: {err}"));
            None
        }
    }
}

async fn drive_modal(
    session: &mut Session,
    ctx: &JobContext<'_>,
    portal: &ModalPortal,
    operator_code: &str,
    account: &Identifier,
) -> Result<Record, SessionError> {
    session.navigate(&portal.dashboard_url).await?;
    let modal = session.wait_visible(&portal.modal).await?;

    let combo = locate_in(
        session,
        ctx,
        "locate postal-code combobox",
        &modal,
        &portal.postal_code,
    )
    .await?;
    retry_script_click(session, ctx, "click postal-code combobox", &combo).await?;
    let suggestion = format!("{}{}", keys::ARROW_DOWN, keys::ENTER);
    retry_type(session, ctx, "select postal-code suggestion", &combo, &suggestion).await?;

    let code = locate_in(
        session,
        ctx,
        "locate operator code input",
        &modal,
        &portal.operator_code,
    )
    .await?;
    retry_type(session, ctx, "fill operator code", &code, operator_code).await?;
    let submit = locate_in(session, ctx, "locate submit button", &modal, &portal.submit).await?;
    retry_script_click(session, ctx, "click submit", &submit).await?;

    let timeout = session.timeout();
    let icon = retry_visible(session, ctx, "locate user icon", &portal.user_icon, timeout).await?;
    session.click(&icon).await?;

    let customer =
        retry_visible(session, ctx, "locate customer field", &portal.customer_id, timeout).await?;
    let digits = account.last_digits(portal.customer_digits).to_string();
    retry_type(session, ctx, "fill customer field", &customer, &digits).await?;
    tokio::time::sleep(portal.keystroke_pause).await;
    retry_type(session, ctx, "submit customer field", &customer, keys::ENTER).await?;

    let panel = retry_visible(
        session,
        ctx,
        "wait for account panel",
        &portal.panel,
        portal.panel_timeout,
    )
    .await?;
    session
        .execute_script(
            "arguments[0].scrollIntoView(true); arguments[0].style.overflow = 'visible';",
            std::slice::from_ref(&panel),
        )
        .await?;

    let mut record = Record::new();
    let entries = session.find_all_in(&panel, &portal.entry).await?;
    for entry in &entries {
        let key = session.find_in(entry, &portal.entry_key).await?;
        let value = session.find_in(entry, &portal.entry_value).await?;
        let label = session.read_text(&key).await?.trim().to_string();
        let text = match session.attribute(&value, "title").await? {
            Some(title) if !title.trim().is_empty() => title,
            _ => session.read_text(&value).await?.trim().to_string(),
        };
        if !label.is_empty() {
            record.insert(label, text);
        }
    }
    ctx.reporter.info(format!("parsed {} fields", entries.len()));

    let phone = record
        .get(&portal.phone_label)
        .map(|v| v.replace(&portal.phone_prefix, "").trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string());
    let email = record
        .get(&portal.email_label)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(SENTINEL)
        .to_string();
    record.insert(FIELD_PHONE, phone);
    record.insert(FIELD_EMAIL, email);
    record.insert(FIELD_ACCOUNT, account.raw());
    Ok(record)
}

async fn locate_in(
    session: &mut Session,
    ctx: &JobContext<'_>,
    description: &str,
    parent: &ElementRef,
    locator: &Locator,
) -> Result<ElementRef, SessionError> {
    let (parent, locator) = (parent.clone(), locator.clone());
    attempt(description, ctx.config.retry_policy(), ctx.reporter, session, move |s| {
        let (parent, locator) = (parent.clone(), locator.clone());
        Box::pin(async move { s.find_in(&parent, &locator).await })
    })
    .await
}

async fn retry_visible(
    session: &mut Session,
    ctx: &JobContext<'_>,
    description: &str,
    locator: &Locator,
    timeout: std::time::Duration,
) -> Result<ElementRef, SessionError> {
    let locator = locator.clone();
    attempt(description, ctx.config.retry_policy(), ctx.reporter, session, move |s| {
        let locator = locator.clone();
        Box::pin(async move { s.wait_visible_for(&locator, timeout).await })
    })
    .await
}

async fn retry_script_click(
    session: &mut Session,
    ctx: &JobContext<'_>,
    description: &str,
    element: &ElementRef,
) -> Result<(), SessionError> {
    let element = element.clone();
    attempt(description, ctx.config.retry_policy(), ctx.reporter, session, move |s| {
        let element = element.clone();
        Box::pin(async move { s.js_click(&element).await })
    })
    .await
}

async fn retry_type(
    session: &mut Session,
    ctx: &JobContext<'_>,
    description: &str,
    element: &ElementRef,
    text: &str,
) -> Result<(), SessionError> {
    let (element, text) = (element.clone(), text.to_string());
    attempt(description, ctx.config.retry_policy(), ctx.reporter, session, move |s| {
        let (element, text) = (element.clone(), text.clone());
        Box::pin(async move { s.send_keys(&element, &text).await })
    })
    .await
}
