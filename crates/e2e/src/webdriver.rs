//! W3C WebDriver backend
//!
//! Talks the WebDriver wire protocol to a driver such as chromedriver or
//! geckodriver over plain HTTP. Every spec gets its own session.

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::runner::SpecExecutor;
use crate::spec::{StepResult, TestSpec, TestStep, Viewport, WaitState};

/// Key under which the protocol returns element references
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WebDriverBrowser {
    #[default]
    Chrome,
    Firefox,
}

impl std::str::FromStr for WebDriverBrowser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chrome" | "chromium" => Ok(WebDriverBrowser::Chrome),
            "firefox" => Ok(WebDriverBrowser::Firefox),
            other => Err(E2eError::WebDriverUnavailable(format!("unsupported browser: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// Driver endpoint, e.g. a running chromedriver
    pub endpoint: String,
    pub base_url: String,
    pub browser: WebDriverBrowser,
    pub headless: bool,
    pub screenshot_dir: PathBuf,
    pub poll_interval: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9515".to_string(),
            base_url: "http://127.0.0.1:3000".to_string(),
            browser: WebDriverBrowser::Chrome,
            headless: true,
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl WebDriverConfig {
    /// Session capabilities for the configured browser
    pub fn capabilities(&self, viewport: Viewport) -> Value {
        let window = format!("--window-size={},{}", viewport.width, viewport.height);
        let always_match = match self.browser {
            WebDriverBrowser::Chrome => {
                let mut args = vec![window, "--no-sandbox".to_string()];
                if self.headless {
                    args.push("--headless=new".to_string());
                }
                json!({
                    "browserName": "chrome",
                    "unhandledPromptBehavior": "ignore",
                    "goog:chromeOptions": { "args": args }
                })
            }
            WebDriverBrowser::Firefox => {
                let args: Vec<&str> = if self.headless { vec!["-headless"] } else { vec![] };
                json!({
                    "browserName": "firefox",
                    "unhandledPromptBehavior": "ignore",
                    "moz:firefoxOptions": { "args": args }
                })
            }
        };
        json!({ "capabilities": { "alwaysMatch": always_match } })
    }
}

/// How an element is located
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    /// `xpath=` prefixed selectors are XPath, everything else is CSS
    pub fn parse(selector: &str) -> Self {
        match selector.strip_prefix("xpath=") {
            Some(xpath) => Locator::XPath(xpath.to_string()),
            None => Locator::Css(selector.to_string()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Locator::Css(value) => json!({ "using": "css selector", "value": value }),
            Locator::XPath(value) => json!({ "using": "xpath", "value": value }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    Post,
    Delete,
}

async fn send(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> E2eResult<Value> {
    let request = match method {
        Method::Get => http.get(url),
        Method::Post => http.post(url).json(&body.unwrap_or_else(|| json!({}))),
        Method::Delete => http.delete(url),
    };

    let response = request.send().await?;
    let status = response.status();
    let mut payload: Value = response.json().await?;
    let value = payload.get_mut("value").map(Value::take).unwrap_or(Value::Null);

    if !status.is_success() {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        return Err(E2eError::WebDriver {
            error: field("error"),
            message: field("message"),
        });
    }

    Ok(value)
}

/// Connection to a WebDriver endpoint
#[derive(Clone)]
pub struct WebDriverClient {
    http: reqwest::Client,
    endpoint: String,
}

impl WebDriverClient {
    pub fn new(endpoint: &str) -> E2eResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the driver is up and accepting new sessions
    pub async fn status(&self) -> E2eResult<bool> {
        let url = format!("{}/status", self.endpoint);
        let value = send(&self.http, Method::Get, &url, None)
            .await
            .map_err(|e| match e {
                E2eError::Http(_) => E2eError::WebDriverUnavailable(self.endpoint.clone()),
                other => other,
            })?;
        Ok(value.get("ready").and_then(Value::as_bool).unwrap_or(false))
    }

    pub async fn new_session(&self, capabilities: Value) -> E2eResult<Session> {
        let url = format!("{}/session", self.endpoint);
        let value = send(&self.http, Method::Post, &url, Some(capabilities)).await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| E2eError::WebDriver {
                error: "session not created".to_string(),
                message: "response carried no sessionId".to_string(),
            })?;

        debug!("WebDriver session {} created", id);
        Ok(Session {
            http: self.http.clone(),
            base: format!("{}/session/{}", self.endpoint, id),
            id: id.to_string(),
        })
    }
}

/// An element reference returned by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

/// A live browser session
pub struct Session {
    http: reqwest::Client,
    base: String,
    id: String,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> E2eResult<Value> {
        let url = format!("{}{}", self.base, path);
        send(&self.http, method, &url, body).await
    }

    pub async fn navigate(&self, url: &str) -> E2eResult<()> {
        self.command(Method::Post, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    pub async fn current_url(&self) -> E2eResult<String> {
        let value = self.command(Method::Get, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn find_elements(&self, locator: &Locator) -> E2eResult<Vec<ElementRef>> {
        let value = self
            .command(Method::Post, "/elements", Some(locator.to_json()))
            .await?;
        Ok(value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get(ELEMENT_KEY).and_then(Value::as_str))
                    .map(|id| ElementRef(id.to_string()))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn clear(&self, element: &ElementRef) -> E2eResult<()> {
        self.command(Method::Post, &format!("/element/{}/clear", element.0), None)
            .await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &ElementRef, text: &str) -> E2eResult<()> {
        self.command(
            Method::Post,
            &format!("/element/{}/value", element.0),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    pub async fn click(&self, element: &ElementRef) -> E2eResult<()> {
        self.command(Method::Post, &format!("/element/{}/click", element.0), None)
            .await?;
        Ok(())
    }

    pub async fn text(&self, element: &ElementRef) -> E2eResult<String> {
        let value = self
            .command(Method::Get, &format!("/element/{}/text", element.0), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn displayed(&self, element: &ElementRef) -> E2eResult<bool> {
        let value = self
            .command(Method::Get, &format!("/element/{}/displayed", element.0), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Text of the open alert, `None` if no alert is showing
    pub async fn alert_text(&self) -> E2eResult<Option<String>> {
        match self.command(Method::Get, "/alert/text", None).await {
            Ok(value) => Ok(Some(value.as_str().unwrap_or_default().to_string())),
            Err(e) if e.webdriver_code() == Some("no such alert") => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn accept_alert(&self) -> E2eResult<()> {
        self.command(Method::Post, "/alert/accept", None).await?;
        Ok(())
    }

    pub async fn execute(&self, script: &str) -> E2eResult<Value> {
        self.command(
            Method::Post,
            "/execute/sync",
            Some(json!({ "script": script, "args": [] })),
        )
        .await
    }

    /// PNG bytes of the current viewport
    pub async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        let value = self.command(Method::Get, "/screenshot", None).await?;
        let encoded = value.as_str().unwrap_or_default();
        Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?)
    }

    pub async fn set_window_rect(&self, viewport: Viewport) -> E2eResult<()> {
        self.command(
            Method::Post,
            "/window/rect",
            Some(json!({ "width": viewport.width, "height": viewport.height })),
        )
        .await?;
        Ok(())
    }

    pub async fn delete(self) -> E2eResult<()> {
        self.command(Method::Delete, "", None).await?;
        debug!("WebDriver session {} deleted", self.id);
        Ok(())
    }
}

/// Path component of a URL, or the input if it does not parse
fn url_path(url: &str) -> String {
    reqwest::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

/// Resource paths the page has fetched so far
const REQUESTED_PATHS_SCRIPT: &str =
    "return performance.getEntriesByType('resource').map(e => new URL(e.name).pathname);";

/// Runs specs through a WebDriver endpoint
pub struct WebDriverExecutor {
    client: WebDriverClient,
    config: WebDriverConfig,
}

impl WebDriverExecutor {
    pub fn new(config: WebDriverConfig) -> E2eResult<Self> {
        let client = WebDriverClient::new(&config.endpoint)?;
        std::fs::create_dir_all(&config.screenshot_dir)?;
        Ok(Self { client, config })
    }

    /// Fail fast when no driver is listening
    pub async fn ensure_available(&self) -> E2eResult<()> {
        if self.client.status().await? {
            Ok(())
        } else {
            Err(E2eError::WebDriverUnavailable(self.client.endpoint().to_string()))
        }
    }

    /// Re-run `check` until it yields a value or the timeout passes
    async fn wait_until<T, F, Fut>(&self, what: &str, timeout_ms: u64, mut check: F) -> E2eResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<Option<T>>>,
    {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if let Some(value) = check().await? {
                return Ok(value);
            }
            if Instant::now() >= deadline {
                return Err(E2eError::Timeout(what.to_string()));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn first_element(
        &self,
        session: &Session,
        selector: &str,
        timeout_ms: u64,
    ) -> E2eResult<ElementRef> {
        let locator = Locator::parse(selector);
        let locator = &locator;
        self.wait_until(selector, timeout_ms, || async move {
            Ok::<_, E2eError>(session.find_elements(locator).await?.into_iter().next())
        })
        .await
    }

    async fn wait_for_state(
        &self,
        session: &Session,
        selector: &str,
        state: WaitState,
        timeout_ms: u64,
    ) -> E2eResult<()> {
        let locator = Locator::parse(selector);
        let locator = &locator;
        let what = format!("{} to be {}", selector, state.as_str());
        self.wait_until(&what, timeout_ms, || async move {
            let first = session.find_elements(locator).await?.into_iter().next();
            let reached = match (state, first) {
                (WaitState::Attached, found) => found.is_some(),
                (WaitState::Detached, found) => found.is_none(),
                (WaitState::Visible, Some(el)) => session.displayed(&el).await?,
                (WaitState::Visible, None) => false,
                (WaitState::Hidden, Some(el)) => !session.displayed(&el).await?,
                (WaitState::Hidden, None) => true,
            };
            Ok::<_, E2eError>(reached.then_some(()))
        })
        .await
    }

    /// Check every condition of an assert step once; `Err` describes the first miss
    async fn check_assertion(
        session: &Session,
        locator: &Locator,
        visible: Option<bool>,
        text: Option<&str>,
        text_contains: Option<&str>,
        count: Option<usize>,
    ) -> E2eResult<Result<(), String>> {
        let elements = session.find_elements(locator).await?;

        if let Some(expected) = count {
            if elements.len() != expected {
                return Ok(Err(format!("expected {} element(s), found {}", expected, elements.len())));
            }
        }

        let first = elements.first();

        if let Some(expected) = visible {
            let shown = match first {
                Some(el) => session.displayed(el).await?,
                None => false,
            };
            if shown != expected {
                return Ok(Err(format!("expected visible={}, was {}", expected, shown)));
            }
        }

        if text.is_some() || text_contains.is_some() {
            let Some(el) = first else {
                return Ok(Err("element not found".to_string()));
            };
            let actual = session.text(el).await?;
            if let Some(expected) = text {
                if actual.trim() != expected {
                    return Ok(Err(format!("expected text {:?}, got {:?}", expected, actual)));
                }
            }
            if let Some(expected) = text_contains {
                if !actual.contains(expected) {
                    return Ok(Err(format!("expected text containing {:?}, got {:?}", expected, actual)));
                }
            }
        }

        Ok(Ok(()))
    }

    async fn execute_step(&self, session: &Session, step: &TestStep) -> E2eResult<Option<PathBuf>> {
        match step {
            TestStep::Navigate { url, wait_for_selector } => {
                session
                    .navigate(&format!("{}{}", self.config.base_url, url))
                    .await?;
                if let Some(selector) = wait_for_selector {
                    self.wait_for_state(session, selector, WaitState::Visible, 5000)
                        .await?;
                }
            }
            TestStep::Click { selector, timeout_ms } => {
                let element = self
                    .first_element(session, selector, timeout_ms.unwrap_or(5000))
                    .await?;
                session.click(&element).await?;
            }
            TestStep::Fill { selector, value } => {
                let element = self.first_element(session, selector, 5000).await?;
                session.clear(&element).await?;
                session.send_keys(&element, value).await?;
            }
            TestStep::Wait { selector, timeout_ms, state } => {
                self.wait_for_state(session, selector, *state, *timeout_ms)
                    .await?;
            }
            TestStep::Sleep { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            TestStep::Assert { selector, visible, text, text_contains, count, timeout_ms } => {
                let locator = Locator::parse(selector);
                let deadline = Instant::now() + Duration::from_millis(*timeout_ms);
                loop {
                    let outcome = Self::check_assertion(
                        session,
                        &locator,
                        *visible,
                        text.as_deref(),
                        text_contains.as_deref(),
                        *count,
                    )
                    .await?;
                    match outcome {
                        Ok(()) => break,
                        Err(reason) if Instant::now() >= deadline => {
                            return Err(E2eError::AssertionFailed(format!("{}: {}", selector, reason)));
                        }
                        Err(_) => tokio::time::sleep(self.config.poll_interval).await,
                    }
                }
            }
            TestStep::ExpectUrl { path, timeout_ms } => {
                let deadline = Instant::now() + Duration::from_millis(*timeout_ms);
                loop {
                    let current = url_path(&session.current_url().await?);
                    if &current == path {
                        break;
                    }
                    if Instant::now() >= deadline {
                        return Err(E2eError::AssertionFailed(format!(
                            "expected path {}, still on {}",
                            path, current
                        )));
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
            TestStep::ExpectDialog { message, timeout_ms } => {
                let actual = self
                    .wait_until("alert", *timeout_ms, || session.alert_text())
                    .await?;
                session.accept_alert().await?;
                if &actual != message {
                    return Err(E2eError::AssertionFailed(format!(
                        "expected alert {:?}, got {:?}",
                        message, actual
                    )));
                }
            }
            TestStep::ExpectNoRequest { path, settle_ms } => {
                tokio::time::sleep(Duration::from_millis(*settle_ms)).await;
                let requested = session.execute(REQUESTED_PATHS_SCRIPT).await?;
                let hit = requested
                    .as_array()
                    .map(|paths| paths.iter().any(|p| p.as_str() == Some(path.as_str())))
                    .unwrap_or(false);
                if hit {
                    return Err(E2eError::AssertionFailed(format!("unexpected request to {}", path)));
                }
            }
            TestStep::Screenshot { name, full_page } => {
                if *full_page {
                    debug!("full-page screenshots are not part of WebDriver; capturing viewport");
                }
                let png = session.screenshot().await?;
                let path = self.config.screenshot_dir.join(format!("{}.png", name));
                std::fs::write(&path, png)?;
                return Ok(Some(path));
            }
            TestStep::Log { message } => {
                info!("[TEST] {}", message);
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl SpecExecutor for WebDriverExecutor {
    fn name(&self) -> &'static str {
        "webdriver"
    }

    async fn execute(&self, spec: &TestSpec) -> E2eResult<Vec<StepResult>> {
        info!("[webdriver] {}", spec.name);
        let session = self
            .client
            .new_session(self.config.capabilities(spec.viewport))
            .await?;

        if let Err(e) = session.set_window_rect(spec.viewport).await {
            debug!("could not resize window: {}", e);
        }

        let mut results = Vec::new();
        for step in &spec.steps {
            let start = Instant::now();
            let outcome = self.execute_step(&session, step).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let failed = outcome.is_err();
            results.push(match outcome {
                Ok(screenshot_path) => StepResult {
                    success: true,
                    step_name: step.name(),
                    duration_ms,
                    error: None,
                    screenshot_path,
                },
                Err(e) => StepResult {
                    success: false,
                    step_name: step.name(),
                    duration_ms,
                    error: Some(e.to_string()),
                    screenshot_path: None,
                },
            });
            if failed {
                break;
            }
        }

        if let Err(e) = session.delete().await {
            warn!("failed to delete WebDriver session: {}", e);
        }

        Ok(results)
    }
}
