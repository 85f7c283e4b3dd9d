use std::time::Duration;

use doors_logging::{doors_debug, doors_warn};
use serde_json::Value;

use crate::{ElementRef, Locator, SessionError, TabHandle};

/// Capability to drive one remote interactive document.
///
/// Implementations are owned by a single job and never shared between threads.
#[async_trait::async_trait]
pub trait RemoteSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Waits up to `timeout` for an element to be present.
    async fn find(&mut self, locator: &Locator, timeout: Duration)
        -> Result<ElementRef, SessionError>;

    /// Every element currently matching; never waits.
    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError>;

    async fn find_in(
        &mut self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<ElementRef, SessionError>;

    async fn find_all_in(
        &mut self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, SessionError>;

    /// Waits up to `timeout` for an element to be present and displayed.
    async fn wait_visible(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef, SessionError>;

    /// Waits up to `timeout` for `element` to be detached from the document.
    async fn wait_stale(&mut self, element: &ElementRef, timeout: Duration)
        -> Result<(), SessionError>;

    async fn click(&mut self, element: &ElementRef) -> Result<(), SessionError>;

    async fn clear(&mut self, element: &ElementRef) -> Result<(), SessionError>;

    async fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<(), SessionError>;

    async fn read_text(&mut self, element: &ElementRef) -> Result<String, SessionError>;

    async fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    /// Opens a blank tab and switches to it.
    async fn open_tab(&mut self) -> Result<TabHandle, SessionError>;

    /// Closes the current tab. The caller must switch to another one afterwards.
    async fn close_tab(&mut self) -> Result<(), SessionError>;

    async fn switch_tab(&mut self, handle: &TabHandle) -> Result<(), SessionError>;

    async fn current_tab(&mut self) -> Result<TabHandle, SessionError>;

    async fn tab_handles(&mut self) -> Result<Vec<TabHandle>, SessionError>;

    /// Title of the current document; also serves as a liveness probe.
    async fn title(&mut self) -> Result<String, SessionError>;

    async fn execute_script(
        &mut self,
        script: &str,
        args: &[ElementRef],
    ) -> Result<Value, SessionError>;

    /// Ends the remote session.
    async fn quit(&mut self) -> Result<(), SessionError>;
}

/// Opens sessions for jobs.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn RemoteSession>, SessionError>;
}

/// WebDriver key codes.
pub mod keys {
    pub const ENTER: &str = "\u{E007}";
    pub const ARROW_DOWN: &str = "\u{E015}";
}

/// A job's live session: the port plus the state derived while driving it.
pub struct Session {
    port: Box<dyn RemoteSession>,
    timeout: Duration,
    main_tab: Option<TabHandle>,
    logged_in: bool,
    list_ref: Option<ElementRef>,
    closed: bool,
}

impl Session {
    pub fn new(port: Box<dyn RemoteSession>, timeout: Duration) -> Self {
        Self {
            port,
            timeout,
            main_tab: None,
            logged_in: false,
            list_ref: None,
            closed: false,
        }
    }

    /// Bound applied to every wait that does not name its own.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn mark_logged_in(&mut self) {
        self.logged_in = true;
    }

    pub fn main_tab(&self) -> Option<&TabHandle> {
        self.main_tab.as_ref()
    }

    /// Records the current tab as the one listings live in.
    pub async fn pin_main_tab(&mut self) -> Result<TabHandle, SessionError> {
        let handle = self.port.current_tab().await?;
        self.main_tab = Some(handle.clone());
        Ok(handle)
    }

    pub fn remember_list(&mut self, list: ElementRef) {
        self.list_ref = Some(list);
    }

    pub fn last_list(&self) -> Option<&ElementRef> {
        self.list_ref.as_ref()
    }

    pub async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        doors_debug!("navigate {url}");
        self.port.navigate(url).await
    }

    pub async fn find(&mut self, locator: &Locator) -> Result<ElementRef, SessionError> {
        let timeout = self.timeout;
        self.port.find(locator, timeout).await
    }

    pub async fn find_for(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef, SessionError> {
        self.port.find(locator, timeout).await
    }

    pub async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError> {
        self.port.find_all(locator).await
    }

    pub async fn find_in(
        &mut self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<ElementRef, SessionError> {
        self.port.find_in(parent, locator).await
    }

    pub async fn find_all_in(
        &mut self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, SessionError> {
        self.port.find_all_in(parent, locator).await
    }

    pub async fn wait_visible(&mut self, locator: &Locator) -> Result<ElementRef, SessionError> {
        let timeout = self.timeout;
        self.port.wait_visible(locator, timeout).await
    }

    pub async fn wait_visible_for(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef, SessionError> {
        self.port.wait_visible(locator, timeout).await
    }

    pub async fn wait_stale(
        &mut self,
        element: &ElementRef,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        self.port.wait_stale(element, timeout).await
    }

    pub async fn click(&mut self, element: &ElementRef) -> Result<(), SessionError> {
        self.port.click(element).await
    }

    /// Clears a field and types `text` into it.
    pub async fn fill(&mut self, element: &ElementRef, text: &str) -> Result<(), SessionError> {
        self.port.clear(element).await?;
        self.port.send_keys(element, text).await
    }

    pub async fn send_keys(
        &mut self,
        element: &ElementRef,
        text: &str,
    ) -> Result<(), SessionError> {
        self.port.send_keys(element, text).await
    }

    pub async fn read_text(&mut self, element: &ElementRef) -> Result<String, SessionError> {
        self.port.read_text(element).await
    }

    pub async fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        self.port.attribute(element, name).await
    }

    pub async fn open_tab(&mut self) -> Result<TabHandle, SessionError> {
        self.port.open_tab().await
    }

    pub async fn close_tab(&mut self) -> Result<(), SessionError> {
        self.port.close_tab().await
    }

    pub async fn switch_tab(&mut self, handle: &TabHandle) -> Result<(), SessionError> {
        self.port.switch_tab(handle).await
    }

    pub async fn current_tab(&mut self) -> Result<TabHandle, SessionError> {
        self.port.current_tab().await
    }

    pub async fn scroll_into_view(&mut self, element: &ElementRef) -> Result<(), SessionError> {
        self.port
            .execute_script(
                "arguments[0].scrollIntoView({ block: 'center' });",
                std::slice::from_ref(element),
            )
            .await
            .map(|_| ())
    }

    /// Click dispatched from page script, for controls an overlay intercepts.
    pub async fn js_click(&mut self, element: &ElementRef) -> Result<(), SessionError> {
        self.port
            .execute_script("arguments[0].click();", std::slice::from_ref(element))
            .await
            .map(|_| ())
    }

    pub async fn execute_script(
        &mut self,
        script: &str,
        args: &[ElementRef],
    ) -> Result<Value, SessionError> {
        self.port.execute_script(script, args).await
    }

    /// Confirms the session still has a live window. When the current window
    /// is gone, re-attaches to the last surviving one and probes again.
    pub async fn probe_alive(&mut self) -> Result<(), SessionError> {
        match self.port.title().await {
            Ok(_) => Ok(()),
            Err(err) => {
                doors_warn!("session probe failed ({err}), looking for a surviving window");
                let handles = self.port.tab_handles().await?;
                let last = handles
                    .last()
                    .cloned()
                    .ok_or_else(|| SessionError::new(err.kind, "no window left"))?;
                self.port.switch_tab(&last).await?;
                self.port.title().await.map(|_| ())
            }
        }
    }

    /// Ends the remote session. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.logged_in = false;
        self.list_ref = None;
        self.port.quit().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
