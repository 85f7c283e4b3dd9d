use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use doors_core::ScrapeConfig;
use doors_logging::{doors_debug, doors_info};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::session::{RemoteSession, SessionFactory};
use crate::{ElementRef, Locator, SessionError, SessionErrorKind, TabHandle};

/// Key under which W3C WebDriver wraps element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug, Clone)]
pub struct WebDriverSettings {
    /// Driver endpoint, e.g. `http://localhost:9515`.
    pub url: String,
    pub headless: bool,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Interval between polls while waiting on an element.
    pub poll_interval: Duration,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".to_string(),
            headless: false,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl WebDriverSettings {
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self {
            url: config.webdriver_url.clone(),
            headless: config.headless,
            ..Self::default()
        }
    }
}

/// Opens a fresh browser session per job.
#[derive(Debug, Clone)]
pub struct WebDriverFactory {
    settings: WebDriverSettings,
}

impl WebDriverFactory {
    pub fn new(settings: WebDriverSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl SessionFactory for WebDriverFactory {
    async fn open(&self) -> Result<Box<dyn RemoteSession>, SessionError> {
        Ok(Box::new(WebDriverSession::connect(&self.settings).await?))
    }
}

/// A remote session spoken to over the W3C WebDriver protocol.
#[derive(Debug)]
pub struct WebDriverSession {
    client: reqwest::Client,
    base: String,
    poll: Duration,
}

impl WebDriverSession {
    pub async fn connect(settings: &WebDriverSettings) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(map_reqwest_error)?;

        let mut args = vec!["--no-sandbox", "--disable-dev-shm-usage", "--disable-gpu"];
        if settings.headless {
            args.push("--headless=new");
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let root = settings.url.trim_end_matches('/');
        let value =
            send(&client, Method::POST, &format!("{root}/session"), Some(capabilities)).await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::new(SessionErrorKind::Protocol, "no sessionId in reply"))?;
        doors_info!("webdriver session {id} opened");

        let session = Self {
            client,
            base: format!("{root}/session/{id}"),
            poll: settings.poll_interval,
        };
        if !settings.headless {
            if let Err(err) = session.post("/window/maximize", json!({})).await {
                doors_debug!("maximize failed: {err}");
            }
        }
        Ok(session)
    }

    async fn get(&self, path: &str) -> Result<Value, SessionError> {
        send(&self.client, Method::GET, &format!("{}{path}", self.base), None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, SessionError> {
        send(&self.client, Method::POST, &format!("{}{path}", self.base), Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value, SessionError> {
        send(&self.client, Method::DELETE, &format!("{}{path}", self.base), None).await
    }

    async fn find_once(
        &self,
        parent: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<ElementRef, SessionError> {
        let (using, value) = locator.strategy();
        let path = match parent {
            Some(parent) => format!("/element/{}/element", parent.id()),
            None => "/element".to_string(),
        };
        let reply = self.post(&path, json!({ "using": using, "value": value })).await?;
        element_from(&reply)
    }

    async fn find_many(
        &self,
        parent: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, SessionError> {
        let (using, value) = locator.strategy();
        let path = match parent {
            Some(parent) => format!("/element/{}/elements", parent.id()),
            None => "/elements".to_string(),
        };
        let reply = self.post(&path, json!({ "using": using, "value": value })).await?;
        reply
            .as_array()
            .ok_or_else(|| {
                SessionError::new(SessionErrorKind::Protocol, "elements reply is not a list")
            })?
            .iter()
            .map(element_from)
            .collect()
    }

    async fn visible_once(&self, locator: &Locator) -> Result<Option<ElementRef>, SessionError> {
        let element = match self.find_once(None, locator).await {
            Ok(element) => element,
            Err(err) if err.kind == SessionErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        match self.get(&format!("/element/{}/displayed", element.id())).await {
            Ok(Value::Bool(true)) => Ok(Some(element)),
            Ok(_) => Ok(None),
            Err(err) if err.is_stale() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Calls `probe` every poll interval until it yields a value or `timeout` elapses.
    async fn poll_until<T, F, Fut>(
        &self,
        timeout: Duration,
        what: impl Display,
        mut probe: F,
    ) -> Result<T, SessionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, SessionError>>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(value) = probe().await? {
                return Ok(value);
            }
            if Instant::now() >= deadline {
                return Err(SessionError::timeout(format!("{what} after {timeout:?}")));
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

#[async_trait::async_trait]
impl RemoteSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.post("/url", json!({ "url": url })).await.map(|_| ())
    }

    async fn find(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef, SessionError> {
        let this = &*self;
        this.poll_until(timeout, format!("no element {locator}"), || async move {
            match this.find_once(None, locator).await {
                Ok(element) => Ok(Some(element)),
                Err(err) if err.kind == SessionErrorKind::NotFound => Ok(None),
                Err(err) => Err(err),
            }
        })
        .await
    }

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError> {
        self.find_many(None, locator).await
    }

    async fn find_in(
        &mut self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<ElementRef, SessionError> {
        self.find_once(Some(parent), locator).await
    }

    async fn find_all_in(
        &mut self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, SessionError> {
        self.find_many(Some(parent), locator).await
    }

    async fn wait_visible(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef, SessionError> {
        let this = &*self;
        this.poll_until(timeout, format!("{locator} not visible"), || {
            this.visible_once(locator)
        })
        .await
    }

    async fn wait_stale(
        &mut self,
        element: &ElementRef,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let this = &*self;
        let path = format!("/element/{}/enabled", element.id());
        let path = path.as_str();
        this.poll_until(timeout, format!("element {} still attached", element.id()), || async move {
            match this.get(path).await {
                Ok(_) => Ok(None),
                Err(err) if err.is_stale() || err.kind == SessionErrorKind::NotFound => {
                    Ok(Some(()))
                }
                Err(err) => Err(err),
            }
        })
        .await
    }

    async fn click(&mut self, element: &ElementRef) -> Result<(), SessionError> {
        self.post(&format!("/element/{}/click", element.id()), json!({}))
            .await
            .map(|_| ())
    }

    async fn clear(&mut self, element: &ElementRef) -> Result<(), SessionError> {
        self.post(&format!("/element/{}/clear", element.id()), json!({}))
            .await
            .map(|_| ())
    }

    async fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<(), SessionError> {
        self.post(&format!("/element/{}/value", element.id()), json!({ "text": text }))
            .await
            .map(|_| ())
    }

    async fn read_text(&mut self, element: &ElementRef) -> Result<String, SessionError> {
        let value = self.get(&format!("/element/{}/text", element.id())).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let value = self
            .get(&format!("/element/{}/attribute/{name}", element.id()))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn open_tab(&mut self) -> Result<TabHandle, SessionError> {
        let reply = self.post("/window/new", json!({ "type": "tab" })).await?;
        let handle = reply
            .get("handle")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::new(SessionErrorKind::Protocol, "no handle for new tab"))?;
        let handle = TabHandle(handle.to_string());
        self.switch_tab(&handle).await?;
        Ok(handle)
    }

    async fn close_tab(&mut self) -> Result<(), SessionError> {
        self.delete("/window").await.map(|_| ())
    }

    async fn switch_tab(&mut self, handle: &TabHandle) -> Result<(), SessionError> {
        self.post("/window", json!({ "handle": handle.0 })).await.map(|_| ())
    }

    async fn current_tab(&mut self) -> Result<TabHandle, SessionError> {
        let value = self.get("/window").await?;
        value
            .as_str()
            .map(|handle| TabHandle(handle.to_string()))
            .ok_or_else(|| {
                SessionError::new(SessionErrorKind::Protocol, "window handle is not a string")
            })
    }

    async fn tab_handles(&mut self) -> Result<Vec<TabHandle>, SessionError> {
        let value = self.get("/window/handles").await?;
        Ok(value
            .as_array()
            .map(|handles| {
                handles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|handle| TabHandle(handle.to_string()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn title(&mut self) -> Result<String, SessionError> {
        let value = self.get("/title").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn execute_script(
        &mut self,
        script: &str,
        args: &[ElementRef],
    ) -> Result<Value, SessionError> {
        let args: Vec<Value> = args.iter().map(|el| json!({ ELEMENT_KEY: el.id() })).collect();
        self.post("/execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    async fn quit(&mut self) -> Result<(), SessionError> {
        let result = send(&self.client, Method::DELETE, &self.base, None).await;
        doors_info!("webdriver session closed");
        result.map(|_| ())
    }
}

/// Sends one command and unwraps the `value` member of the reply.
async fn send(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, SessionError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    let reply: Value = response.json().await.map_err(|err| {
        SessionError::new(SessionErrorKind::Protocol, format!("{status}: {err}"))
    })?;
    let value = reply.get("value").cloned().unwrap_or(Value::Null);
    if status.is_success() {
        Ok(value)
    } else {
        Err(map_driver_error(status.as_u16(), &value))
    }
}

fn element_from(value: &Value) -> Result<ElementRef, SessionError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementRef(id.to_string()))
        .ok_or_else(|| SessionError::new(SessionErrorKind::Protocol, "reply is not an element"))
}

fn map_driver_error(status: u16, value: &Value) -> SessionError {
    let code = value.get("error").and_then(Value::as_str).unwrap_or_default();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(code);
    let kind = match code {
        "no such element" => SessionErrorKind::NotFound,
        "stale element reference" => SessionErrorKind::StaleReference,
        "element click intercepted" => SessionErrorKind::ClickIntercepted,
        "element not interactable" => SessionErrorKind::NotInteractable,
        "no such window" | "invalid session id" => SessionErrorKind::NoSuchWindow,
        "timeout" | "script timeout" => SessionErrorKind::Timeout,
        _ => SessionErrorKind::Protocol,
    };
    SessionError::new(kind, format!("{message} (http {status})"))
}

fn map_reqwest_error(err: reqwest::Error) -> SessionError {
    if err.is_timeout() {
        return SessionError::new(SessionErrorKind::Timeout, err.to_string());
    }
    SessionError::new(SessionErrorKind::Protocol, err.to_string())
}
