//! Search-panel account portal: short identifiers.

use doors_core::{
    Credentials, Identifier, Phase, Record, FIELD_ACCOUNT, FIELD_EMAIL, FIELD_PHONE, SENTINEL,
};
use regex::Regex;

use crate::job::JobContext;
use crate::locators::AccountPortal;
use crate::session::Session;
use crate::{ElementRef, JobError, Locator, SessionError};

const PHONE_PRESENT: &str = r"\d{3}\s*\d{3}-\d{4}";
const PHONE_LINE: &str = r"\d{3}[\s\-]?\d{3}[\s\-]?\d{4}";

/// Patterns used to read the contact block.
#[derive(Debug, Clone)]
pub struct ContactPatterns {
    present: Regex,
    line: Regex,
}

impl ContactPatterns {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            present: Regex::new(PHONE_PRESENT)?,
            line: Regex::new(PHONE_LINE)?,
        })
    }

    /// The block shows a fully rendered phone number.
    pub fn has_phone(&self, text: &str) -> bool {
        self.present.is_match(text)
    }

    /// First line holding an `@`, and the last phone-shaped line.
    pub fn contact_fields<'t>(&self, text: &'t str) -> (Option<&'t str>, Option<&'t str>) {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let email = lines.iter().copied().find(|line| line.contains('@'));
        let phone = lines.iter().rev().copied().find(|line| self.line.is_match(line));
        (email, phone)
    }
}

pub async fn login_account_portal(
    session: &mut Session,
    ctx: &mut JobContext<'_>,
    portal: &AccountPortal,
    credentials: &Credentials,
) -> Result<(), JobError> {
    ctx.enter(Phase::LoggingIn)?;
    let login_err = |err: SessionError| JobError::Login(format!("account portal: {err}"));

    ctx.reporter.info("opening account portal");
    session.navigate(&portal.url).await.map_err(login_err)?;
    let user = session.wait_visible(&portal.username).await.map_err(login_err)?;
    session.fill(&user, &credentials.user).await.map_err(login_err)?;
    let password = session.wait_visible(&portal.password).await.map_err(login_err)?;
    session
        .fill(&password, &credentials.password)
        .await
        .map_err(login_err)?;
    let submit = session.wait_visible(&portal.submit).await.map_err(login_err)?;
    session.click(&submit).await.map_err(login_err)?;
    ctx.reporter.info("account portal login submitted");

    let proceed = session
        .wait_visible_for(&portal.continue_button, portal.continue_timeout)
        .await
        .map_err(login_err)?;
    session.scroll_into_view(&proceed).await.map_err(login_err)?;
    session.js_click(&proceed).await.map_err(login_err)?;

    search_input(session, portal, &portal.search_toggle)
        .await
        .map_err(login_err)?;
    session.mark_logged_in();
    ctx.reporter.info("account search ready");
    Ok(())
}

/// The account input, reopening the search panel through `toggle` when it is collapsed.
async fn search_input(
    session: &mut Session,
    portal: &AccountPortal,
    toggle: &Locator,
) -> Result<ElementRef, SessionError> {
    match session.wait_visible(&portal.account_input).await {
        Ok(input) => Ok(input),
        Err(_) => {
            let toggle = session.wait_visible(toggle).await?;
            session.click(&toggle).await?;
            session.wait_visible(&portal.account_input).await
        }
    }
}

/// Looks one account up. `None` when the search fails, the header never
/// renders, or the contact block never shows a phone number.
pub async fn extract_account(
    session: &mut Session,
    ctx: &JobContext<'_>,
    portal: &AccountPortal,
    patterns: &ContactPatterns,
    account: &Identifier,
) -> Option<Record> {
    let reporter = ctx.reporter;
    reporter.info(format!("account {account}: searching"));

    let input = match search_input(session, portal, &portal.reopen).await {
        Ok(input) => input,
        Err(err) => {
            reporter.warn(format!("account {account}: search panel unavailable ({err})"));
            return None;
        }
    };
    if let Err(err) = session.fill(&input, account.raw()).await {
        reporter.warn(format!("account {account}: cannot enter identifier ({err})"));
        return None;
    }
    let submitted = match session.wait_visible(&portal.search_button).await {
        Ok(button) => session.click(&button).await,
        Err(err) => Err(err),
    };
    if let Err(err) = submitted {
        reporter.warn(format!("account {account}: cannot submit search ({err})"));
        return None;
    }

    let header = match wait_header(session, ctx, portal).await {
        Ok(header) => header,
        Err(err) => {
            reporter.warn(format!(
                "account {account}: header missing after {} attempts ({err})",
                portal.header_attempts
            ));
            return None;
        }
    };
    let header_text = match session.read_text(&header).await {
        Ok(text) => text,
        Err(err) => {
            reporter.warn(format!("account {account}: cannot read header ({err})"));
            return None;
        }
    };
    let mut record = interleaved_pairs(&header_text);

    let Some(contact) = wait_phone(session, ctx, portal, patterns).await else {
        reporter.warn(format!("account {account}: phone number never appeared"));
        return None;
    };
    let (email, phone) = patterns.contact_fields(&contact);
    record.insert(FIELD_EMAIL, email.unwrap_or(SENTINEL));
    record.insert(FIELD_PHONE, phone.unwrap_or(SENTINEL));
    record.insert(FIELD_ACCOUNT, account.raw());

    let reopened = match session.wait_visible(&portal.reopen).await {
        Ok(reopen) => session.js_click(&reopen).await,
        Err(err) => Err(err),
    };
    if let Err(err) = reopened {
        reporter.warn(format!("could not reopen the search panel: {err}"));
    }

    reporter.info(format!(
        "account {account}: phone {}, email {}",
        record.get_or_sentinel(FIELD_PHONE),
        record.get_or_sentinel(FIELD_EMAIL)
    ));
    Some(record)
}

async fn wait_header(
    session: &mut Session,
    ctx: &JobContext<'_>,
    portal: &AccountPortal,
) -> Result<ElementRef, SessionError> {
    let attempts = portal.header_attempts.max(1);
    let mut n = 1;
    loop {
        let result = match session.wait_visible(&portal.header).await {
            Ok(header) => session.wait_visible(&portal.requester).await.map(|_| header),
            Err(err) => Err(err),
        };
        match result {
            Ok(header) => return Ok(header),
            Err(err) if n >= attempts => return Err(err),
            Err(err) => {
                ctx.reporter
                    .warn(format!("header not ready ({err}), retry {n}/{attempts}"));
                tokio::time::sleep(portal.header_pause).await;
                n += 1;
            }
        }
    }
}

/// Polls the contact block until it shows a phone number; the wait after
/// check `n` is `phone_backoff * n`.
async fn wait_phone(
    session: &mut Session,
    ctx: &JobContext<'_>,
    portal: &AccountPortal,
    patterns: &ContactPatterns,
) -> Option<String> {
    let attempts = portal.phone_attempts.max(1);
    for n in 1..=attempts {
        let text = match session.find_all(&portal.contact).await {
            Ok(found) => match found.first() {
                Some(block) => session.read_text(block).await.ok(),
                None => None,
            },
            Err(_) => None,
        };
        if let Some(text) = text.filter(|t| patterns.has_phone(t)) {
            return Some(text);
        }
        let delay = portal.phone_backoff.saturating_mul(n);
        ctx.reporter.warn(format!(
            "phone not shown yet, waiting {}s (attempt {n}/{attempts})",
            delay.as_secs()
        ));
        tokio::time::sleep(delay).await;
    }
    None
}

/// Header text read as `label, value, label, value, ..` lines.
pub fn interleaved_pairs(text: &str) -> Record {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    crate::listing_detail::label_value_pairs(&lines)
}
