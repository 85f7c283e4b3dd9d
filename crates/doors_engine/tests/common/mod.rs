#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use doors_core::{Credentials, JobEvent, ListingParams, ScrapeConfig};
use doors_engine::{
    AccountPortal, Clock, ElementRef, EngineSettings, EventSink, ListingPortal, Locator,
    ModalPortal, RemoteSession, SessionError, SessionErrorKind, SessionFactory, TabHandle,
};
use serde_json::Value;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(doors_logging::initialize_for_tests);
}

pub fn fixed_clock() -> Clock {
    Arc::new(|| "20240102-030405".to_string())
}

pub fn fast_config() -> ScrapeConfig {
    ScrapeConfig {
        retry_backoff_millis: 0,
        pause_poll_millis: 1,
        ..ScrapeConfig::default()
    }
}

pub fn fast_listing_portal() -> ListingPortal {
    ListingPortal {
        after_search: Duration::ZERO,
        after_apply: Duration::ZERO,
        ..ListingPortal::default()
    }
}

pub fn fast_account_portal() -> AccountPortal {
    AccountPortal {
        header_pause: Duration::ZERO,
        phone_backoff: Duration::ZERO,
        ..AccountPortal::default()
    }
}

pub fn fast_modal_portal() -> ModalPortal {
    ModalPortal {
        keystroke_pause: Duration::ZERO,
        ..ModalPortal::default()
    }
}

/// Fixed clock, no settle delays, no retry backoff.
pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        clock: fixed_clock(),
        listing_portal: fast_listing_portal(),
        account_portal: fast_account_portal(),
        modal_portal: fast_modal_portal(),
        ..EngineSettings::new(fast_config())
    }
}

pub fn listing_params(dest: &Path) -> ListingParams {
    ListingParams {
        credentials: Credentials::new("agent", "secret"),
        city: "Laval".to_string(),
        street: None,
        rta: Some("H7N".to_string()),
        dest_dir: dest.to_path_buf(),
    }
}

/// Collects every event a job emits.
#[derive(Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<JobEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                JobEvent::Log { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: JobEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// What clicking (or pressing enter in) an element does.
#[derive(Debug, Clone)]
pub enum Action {
    /// The current tab shows another page.
    Goto(String),
    /// A hidden element becomes visible.
    Reveal(String),
    /// Goes to `prefix` followed by the text typed into element `from`,
    /// or into the element itself when `from` is `None`.
    GotoTyped { prefix: String, from: Option<String> },
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub id: String,
    pub page: String,
    pub locator: Locator,
    pub parent: Option<String>,
    pub text: String,
    pub attrs: HashMap<String, String>,
    pub visible: bool,
    pub value: String,
    pub on_click: Option<Action>,
    pub on_enter: Option<Action>,
}

impl FakeElement {
    pub fn new(locator: Locator) -> Self {
        Self {
            id: String::new(),
            page: String::new(),
            locator,
            parent: None,
            text: String::new(),
            attrs: HashMap::new(),
            visible: true,
            value: String::new(),
            on_click: None,
            on_enter: None,
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn on_click(mut self, action: Action) -> Self {
        self.on_click = Some(action);
        self
    }

    pub fn on_enter(mut self, action: Action) -> Self {
        self.on_enter = Some(action);
        self
    }
}

type Hook = Box<dyn FnMut() + Send>;

#[derive(Default)]
pub struct FakeWorld {
    tabs: Vec<(TabHandle, String)>,
    current: Option<usize>,
    elements: Vec<FakeElement>,
    next_id: u32,
    next_tab: u32,
    failures: HashMap<Locator, VecDeque<SessionError>>,
    navigate_hooks: Vec<(String, Hook)>,
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub typed: Vec<(String, String)>,
    pub scripts: Vec<String>,
    pub sessions_opened: u32,
    pub quit: bool,
    pub lose_window_on_pause: bool,
}

/// Scripted in-memory browser shared by the test and the session under test.
#[derive(Clone)]
pub struct FakeBrowser(Arc<Mutex<FakeWorld>>);

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBrowser {
    pub fn new() -> Self {
        let world = FakeWorld {
            tabs: vec![(TabHandle("tab-0".to_string()), "about:blank".to_string())],
            current: Some(0),
            next_tab: 1,
            ..FakeWorld::default()
        };
        Self(Arc::new(Mutex::new(world)))
    }

    pub fn world(&self) -> std::sync::MutexGuard<'_, FakeWorld> {
        self.0.lock().unwrap()
    }

    /// Places `element` on `page` and returns its id.
    pub fn add(&self, page: &str, mut element: FakeElement) -> String {
        let mut world = self.world();
        world.next_id += 1;
        element.id = format!("el-{}", world.next_id);
        element.page = page.to_string();
        let id = element.id.clone();
        world.elements.push(element);
        id
    }

    /// Places `element` inside `parent`, on the parent's page.
    pub fn add_child(&self, parent: &str, mut element: FakeElement) -> String {
        let page = self
            .world()
            .elements
            .iter()
            .find(|el| el.id == parent)
            .map(|el| el.page.clone())
            .unwrap();
        element.parent = Some(parent.to_string());
        self.add(&page, element)
    }

    pub fn set_visible(&self, id: &str, visible: bool) {
        let mut world = self.world();
        if let Some(el) = world.elements.iter_mut().find(|el| el.id == id) {
            el.visible = visible;
        }
    }

    /// The next lookups of `locator` fail with `errors`, in order.
    pub fn fail(&self, locator: Locator, errors: Vec<SessionError>) {
        self.world()
            .failures
            .entry(locator)
            .or_default()
            .extend(errors);
    }

    /// Runs `hook` each time the session navigates to `url`.
    pub fn on_navigate(&self, url: &str, hook: impl FnMut() + Send + 'static) {
        self.world()
            .navigate_hooks
            .push((url.to_string(), Box::new(hook)));
    }

    pub fn current_page(&self) -> Option<String> {
        let world = self.world();
        world.current.map(|idx| world.tabs[idx].1.clone())
    }

    pub fn open_tabs(&self) -> usize {
        self.world().tabs.len()
    }

    pub fn typed_into(&self, id: &str) -> Vec<String> {
        self.world()
            .typed
            .iter()
            .filter(|(el, _)| el == id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn value_of(&self, id: &str) -> String {
        self.world()
            .elements
            .iter()
            .find(|el| el.id == id)
            .map(|el| el.value.clone())
            .unwrap_or_default()
    }

    pub fn session(&self) -> FakeSession {
        FakeSession {
            browser: self.clone(),
        }
    }
}

pub struct FakeFactory {
    pub browser: FakeBrowser,
    pub fail_open: bool,
}

impl FakeFactory {
    pub fn new(browser: &FakeBrowser) -> Self {
        Self {
            browser: browser.clone(),
            fail_open: false,
        }
    }
}

#[async_trait::async_trait]
impl SessionFactory for FakeFactory {
    async fn open(&self) -> Result<Box<dyn RemoteSession>, SessionError> {
        if self.fail_open {
            return Err(SessionError::new(SessionErrorKind::Protocol, "driver unreachable"));
        }
        self.browser.world().sessions_opened += 1;
        Ok(Box::new(self.browser.session()))
    }
}

pub struct FakeSession {
    browser: FakeBrowser,
}

impl FakeWorld {
    fn page(&self) -> Result<String, SessionError> {
        match self.current.and_then(|idx| self.tabs.get(idx)) {
            Some((_, page)) => Ok(page.clone()),
            None => Err(SessionError::new(SessionErrorKind::NoSuchWindow, "no current window")),
        }
    }

    /// Shows `page` in the current tab. Loading a page resets its fields.
    fn set_page(&mut self, page: String) -> Result<(), SessionError> {
        let idx = self
            .current
            .ok_or_else(|| SessionError::new(SessionErrorKind::NoSuchWindow, "no current window"))?;
        for el in self.elements.iter_mut().filter(|el| el.page == page) {
            el.value.clear();
        }
        self.tabs[idx].1 = page;
        Ok(())
    }

    fn injected(&mut self, locator: &Locator) -> Result<(), SessionError> {
        match self.failures.get_mut(locator).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn matching(
        &self,
        locator: &Locator,
        visible_only: bool,
    ) -> Result<Vec<ElementRef>, SessionError> {
        let page = self.page()?;
        Ok(self
            .elements
            .iter()
            .filter(|el| el.page == page && &el.locator == locator)
            .filter(|el| !visible_only || el.visible)
            .map(|el| ElementRef(el.id.clone()))
            .collect())
    }

    /// The element, provided it belongs to the page the current tab shows.
    fn live(&mut self, element: &ElementRef) -> Result<&mut FakeElement, SessionError> {
        let page = self.page()?;
        let el = self
            .elements
            .iter_mut()
            .find(|el| el.id == element.0)
            .ok_or_else(|| SessionError::not_found(&element.0))?;
        if el.page != page {
            return Err(SessionError::new(
                SessionErrorKind::StaleReference,
                format!("{} is detached", element.0),
            ));
        }
        Ok(el)
    }

    fn perform(&mut self, action: Option<Action>, value: &str) -> Result<(), SessionError> {
        match action {
            Some(Action::Goto(page)) => self.set_page(page),
            Some(Action::GotoTyped { prefix, from }) => {
                let typed = match from {
                    Some(id) => self
                        .elements
                        .iter()
                        .find(|el| el.id == id)
                        .map(|el| el.value.clone())
                        .unwrap_or_default(),
                    None => value.to_string(),
                };
                self.set_page(format!("{prefix}{typed}"))
            }
            Some(Action::Reveal(id)) => {
                if let Some(el) = self.elements.iter_mut().find(|el| el.id == id) {
                    el.visible = true;
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), SessionError> {
        let (action, value) = {
            let el = self.live(element)?;
            (el.on_click.clone(), el.value.clone())
        };
        self.clicks.push(element.0.clone());
        self.perform(action, &value)
    }
}

fn is_key(c: char) -> bool {
    ('\u{E000}'..='\u{F8FF}').contains(&c)
}

#[async_trait::async_trait]
impl RemoteSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        let mut hooks = {
            let mut world = self.browser.world();
            world.set_page(url.to_string())?;
            world.navigations.push(url.to_string());
            std::mem::take(&mut world.navigate_hooks)
        };
        for (target, hook) in hooks.iter_mut() {
            if *target == url {
                hook();
            }
        }
        self.browser.world().navigate_hooks.extend(hooks);
        Ok(())
    }

    async fn find(
        &mut self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<ElementRef, SessionError> {
        let mut world = self.browser.world();
        world.injected(locator)?;
        world
            .matching(locator, false)?
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::timeout(format!("no element {locator}")))
    }

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError> {
        let mut world = self.browser.world();
        world.injected(locator)?;
        world.matching(locator, false)
    }

    async fn find_in(
        &mut self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<ElementRef, SessionError> {
        self.find_all_in(parent, locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::not_found(locator))
    }

    async fn find_all_in(
        &mut self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, SessionError> {
        let mut world = self.browser.world();
        world.live(parent)?;
        world.injected(locator)?;
        Ok(world
            .elements
            .iter()
            .filter(|el| el.parent.as_deref() == Some(parent.0.as_str()) && &el.locator == locator)
            .map(|el| ElementRef(el.id.clone()))
            .collect())
    }

    async fn wait_visible(
        &mut self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<ElementRef, SessionError> {
        let mut world = self.browser.world();
        world.injected(locator)?;
        world
            .matching(locator, true)?
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::timeout(format!("{locator} not visible")))
    }

    async fn wait_stale(
        &mut self,
        element: &ElementRef,
        _timeout: Duration,
    ) -> Result<(), SessionError> {
        let mut world = self.browser.world();
        match world.live(element) {
            Ok(_) => Err(SessionError::timeout(format!("{} still attached", element.0))),
            Err(_) => Ok(()),
        }
    }

    async fn click(&mut self, element: &ElementRef) -> Result<(), SessionError> {
        self.browser.world().click(element)
    }

    async fn clear(&mut self, element: &ElementRef) -> Result<(), SessionError> {
        let mut world = self.browser.world();
        world.live(element)?.value.clear();
        Ok(())
    }

    async fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<(), SessionError> {
        let mut world = self.browser.world();
        let (action, value) = {
            let el = world.live(element)?;
            el.value.extend(text.chars().filter(|c| !is_key(*c)));
            let enter = text.contains(doors_engine::keys::ENTER);
            (enter.then(|| el.on_enter.clone()).flatten(), el.value.clone())
        };
        world.typed.push((element.0.clone(), text.to_string()));
        world.perform(action, &value)
    }

    async fn read_text(&mut self, element: &ElementRef) -> Result<String, SessionError> {
        let mut world = self.browser.world();
        Ok(world.live(element)?.text.clone())
    }

    async fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let mut world = self.browser.world();
        Ok(world.live(element)?.attrs.get(name).cloned())
    }

    async fn open_tab(&mut self) -> Result<TabHandle, SessionError> {
        let mut world = self.browser.world();
        let handle = TabHandle(format!("tab-{}", world.next_tab));
        world.next_tab += 1;
        world.tabs.push((handle.clone(), "about:blank".to_string()));
        world.current = Some(world.tabs.len() - 1);
        Ok(handle)
    }

    async fn close_tab(&mut self) -> Result<(), SessionError> {
        let mut world = self.browser.world();
        let idx = world
            .current
            .take()
            .ok_or_else(|| SessionError::new(SessionErrorKind::NoSuchWindow, "no current window"))?;
        world.tabs.remove(idx);
        Ok(())
    }

    async fn switch_tab(&mut self, handle: &TabHandle) -> Result<(), SessionError> {
        let mut world = self.browser.world();
        let idx = world
            .tabs
            .iter()
            .position(|(h, _)| h == handle)
            .ok_or_else(|| SessionError::new(SessionErrorKind::NoSuchWindow, handle.0.clone()))?;
        world.current = Some(idx);
        Ok(())
    }

    async fn current_tab(&mut self) -> Result<TabHandle, SessionError> {
        let world = self.browser.world();
        world
            .current
            .and_then(|idx| world.tabs.get(idx))
            .map(|(handle, _)| handle.clone())
            .ok_or_else(|| SessionError::new(SessionErrorKind::NoSuchWindow, "no current window"))
    }

    async fn tab_handles(&mut self) -> Result<Vec<TabHandle>, SessionError> {
        Ok(self
            .browser
            .world()
            .tabs
            .iter()
            .map(|(handle, _)| handle.clone())
            .collect())
    }

    async fn title(&mut self) -> Result<String, SessionError> {
        self.browser.world().page()
    }

    async fn execute_script(
        &mut self,
        script: &str,
        args: &[ElementRef],
    ) -> Result<Value, SessionError> {
        let mut world = self.browser.world();
        world.scripts.push(script.to_string());
        if script.contains("click()") {
            if let Some(target) = args.first() {
                world.click(target)?;
            }
        } else if let Some(target) = args.first() {
            world.live(target)?;
        }
        Ok(Value::Null)
    }

    async fn quit(&mut self) -> Result<(), SessionError> {
        self.browser.world().quit = true;
        Ok(())
    }
}

/// One listed row: its link and the label/value pairs of its detail page.
pub struct Row {
    pub href: String,
    pub fields: Vec<(String, String)>,
}

impl Row {
    pub fn new(href: &str, fields: &[(&str, &str)]) -> Self {
        Self {
            href: href.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Ids of the interesting listing-portal elements.
pub struct ListingIds {
    pub landmark: String,
    pub city_input: String,
    pub rta_input: String,
}

/// Login, search, filters, then `pages` of rows. The landmark is hidden when
/// `verification` is set.
pub fn listing_site(
    browser: &FakeBrowser,
    portal: &ListingPortal,
    pages: &[Vec<Row>],
    verification: bool,
) -> ListingIds {
    let login = portal.login_url.as_str();
    browser.add(login, FakeElement::new(portal.username.clone()));
    browser.add(login, FakeElement::new(portal.password.clone()));
    browser.add(
        login,
        FakeElement::new(portal.login_button.clone()).on_click(Action::Goto("home".to_string())),
    );

    let mut landmark = FakeElement::new(portal.landmark.clone());
    if verification {
        landmark = landmark.hidden();
    }
    let landmark = browser.add("home", landmark);
    browser.add(
        "home",
        FakeElement::new(portal.search_button.clone())
            .on_click(Action::Goto("results".to_string())),
    );

    browser.add("results", FakeElement::new(portal.filters_toggle.clone()));
    let select = browser.add("results", FakeElement::new(portal.active_select.clone()));
    browser.add_child(
        &select,
        FakeElement::new(Locator::xpath(format!(
            ".//option[normalize-space(.)='{}']",
            portal.active_option_text
        ))),
    );
    let rta_input = browser.add("results", FakeElement::new(portal.rta_input.clone()));
    let city_input = browser.add("results", FakeElement::new(portal.city_input.clone()));
    browser.add("results", FakeElement::new(portal.street_input.clone()));
    browser.add(
        "results",
        FakeElement::new(portal.apply_button.clone()).on_click(Action::Goto("list-1".to_string())),
    );

    let mut first = 1;
    for (idx, rows) in pages.iter().enumerate() {
        let page = format!("list-{}", idx + 1);
        browser.add(&page, FakeElement::new(portal.list.clone()));
        let last = first + rows.len().max(1) - 1;
        browser.add(
            &page,
            FakeElement::new(portal.range_indicator.clone()).text(&format!("({first}-{last})")),
        );
        first = last + 1;
        for row in rows {
            browser.add(&page, FakeElement::new(portal.list_row.clone()));
            browser.add(&page, FakeElement::new(portal.row_link.clone()).attr("href", &row.href));
            detail_page(browser, portal, row);
        }
        let next = if idx + 1 == pages.len() {
            FakeElement::new(portal.next_control.clone())
                .attr("src", "/img/search_nextarrow_disabled.gif")
        } else {
            FakeElement::new(portal.next_control.clone())
                .attr("src", "/img/search_nextarrow.gif")
                .on_click(Action::Goto(format!("list-{}", idx + 2)))
        };
        browser.add(&page, next);
    }

    ListingIds {
        landmark,
        city_input,
        rta_input,
    }
}

fn detail_page(browser: &FakeBrowser, portal: &ListingPortal, row: &Row) {
    let table = browser.add(&row.href, FakeElement::new(portal.detail_table.clone()));
    for (label, value) in &row.fields {
        browser.add_child(&table, FakeElement::new(portal.detail_cell.clone()).text(label));
        browser.add_child(&table, FakeElement::new(portal.detail_cell.clone()).text(value));
    }
}

/// Account portal login plus one result page per `(account, header, contact)`.
pub fn account_site(
    browser: &FakeBrowser,
    portal: &AccountPortal,
    accounts: &[(&str, &str, &str)],
) {
    let url = portal.url.as_str();
    browser.add(url, FakeElement::new(portal.username.clone()));
    browser.add(url, FakeElement::new(portal.password.clone()));
    let proceed = browser.add(
        url,
        FakeElement::new(portal.continue_button.clone())
            .hidden()
            .on_click(Action::Goto("clic-search".to_string())),
    );
    browser.add(url, FakeElement::new(portal.submit.clone()).on_click(Action::Reveal(proceed)));

    let input = browser.add("clic-search", FakeElement::new(portal.account_input.clone()));
    browser.add(
        "clic-search",
        FakeElement::new(portal.search_button.clone()).on_click(Action::GotoTyped {
            prefix: "clic-result-".to_string(),
            from: Some(input),
        }),
    );

    for (account, header, contact) in accounts {
        let page = format!("clic-result-{account}");
        browser.add(&page, FakeElement::new(portal.header.clone()).text(header));
        browser.add(&page, FakeElement::new(portal.requester.clone()));
        browser.add(&page, FakeElement::new(portal.contact.clone()).text(contact));
        browser.add(
            &page,
            FakeElement::new(portal.reopen.clone())
                .on_click(Action::Goto("clic-search".to_string())),
        );
    }
}

/// Modal portal dashboard plus one panel per `(last digits, entries)`.
pub fn modal_site(
    browser: &FakeBrowser,
    portal: &ModalPortal,
    customers: &[(&str, Vec<(&str, &str)>)],
) {
    let dashboard = portal.dashboard_url.as_str();
    let modal = browser.add(dashboard, FakeElement::new(portal.modal.clone()));
    browser.add_child(&modal, FakeElement::new(portal.postal_code.clone()));
    browser.add_child(&modal, FakeElement::new(portal.operator_code.clone()));
    browser.add_child(
        &modal,
        FakeElement::new(portal.submit.clone()).on_click(Action::Goto("csr-home".to_string())),
    );
    browser.add(
        "csr-home",
        FakeElement::new(portal.user_icon.clone()).on_click(Action::Goto("csr-search".to_string())),
    );
    browser.add(
        "csr-search",
        FakeElement::new(portal.customer_id.clone()).on_enter(Action::GotoTyped {
            prefix: "csr-result-".to_string(),
            from: None,
        }),
    );

    for (digits, entries) in customers {
        let page = format!("csr-result-{digits}");
        let panel = browser.add(&page, FakeElement::new(portal.panel.clone()));
        for (key, value) in entries.iter() {
            let entry = browser.add_child(&panel, FakeElement::new(portal.entry.clone()));
            browser.add_child(&entry, FakeElement::new(portal.entry_key.clone()).text(key));
            browser.add_child(
                &entry,
                FakeElement::new(portal.entry_value.clone()).attr("title", value).text("…"),
            );
        }
    }
}
