//! W3C WebDriver session
//!
//! Speaks the WebDriver wire protocol (JSON over HTTP) to a driver such as
//! `chromedriver`. Every command is a request against
//! `/session/{id}/...`; successful replies carry their payload under
//! `value`, failures carry `value.error` and `value.message`.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::browser::{Browser, By, ElementRef};
use crate::error::{E2eError, E2eResult};

/// Environment variable that turns off the headless argument set when present
pub const NO_OPTIONS_ENV: &str = "NO_OPTIONS";

/// Key under which W3C drivers return element references
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Chrome arguments for unattended runs
const HEADLESS_ARGS: [&str; 7] = [
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-extensions",
    "--log-level=3",
    "--silent",
    "--headless",
];

/// Options for the browser a session launches
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Launch with the headless argument set; turn off to watch a run
    pub headless: bool,

    /// Initial window size
    pub window_size: Option<(u32, u32)>,

    /// Chrome binary to launch instead of the driver's default
    pub binary: Option<PathBuf>,

    /// Additional command line arguments for Chrome
    pub extra_args: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: Some((1280, 800)),
            binary: None,
            extra_args: Vec::new(),
        }
    }
}

/// Whether to launch headless given the value of [`NO_OPTIONS_ENV`].
///
/// Presence alone decides: `NO_OPTIONS=1`, `NO_OPTIONS=` and
/// `NO_OPTIONS=false` all launch a visible browser.
pub fn headless_for(no_options: Option<&OsStr>) -> bool {
    no_options.is_none()
}

impl BrowserOptions {
    /// Defaults, with headless decided by the process environment
    pub fn from_env() -> Self {
        Self {
            headless: headless_for(std::env::var_os(NO_OPTIONS_ENV).as_deref()),
            ..Default::default()
        }
    }

    pub fn chrome_args(&self) -> Vec<String> {
        let mut args: Vec<String> = if self.headless {
            HEADLESS_ARGS.iter().map(|a| a.to_string()).collect()
        } else {
            Vec::new()
        };
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// New-session request body
    pub fn capabilities(&self) -> Value {
        let mut chrome = json!({ "args": self.chrome_args() });
        if let Some(binary) = &self.binary {
            chrome["binary"] = json!(binary.to_string_lossy());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": chrome,
                }
            }
        })
    }
}

/// A live browser session
pub struct WebDriverSession {
    client: Client,
    driver_url: String,
    session_id: String,
}

impl WebDriverSession {
    /// Start a new browser session on the driver at `driver_url`
    pub async fn start(driver_url: &str, options: &BrowserOptions) -> E2eResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        let driver_url = driver_url.trim_end_matches('/').to_string();

        let value = send(
            client
                .post(format!("{}/session", driver_url))
                .json(&options.capabilities()),
        )
        .await?;
        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| invalid_response("new session", &value))?
            .to_string();

        info!("Started browser session {}", session_id);

        let session = Self {
            client,
            driver_url,
            session_id,
        };
        if let Some((width, height)) = options.window_size {
            session.set_window_size(width, height).await?;
        }
        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// End the session, closing every window it opened
    pub async fn quit(self) -> E2eResult<()> {
        debug!("Ending browser session {}", self.session_id);
        send(self.client.delete(self.url(""))).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.driver_url, self.session_id, path)
    }

    async fn get(&self, path: &str) -> E2eResult<Value> {
        send(self.client.get(self.url(path))).await
    }

    async fn post(&self, path: &str, body: Value) -> E2eResult<Value> {
        send(self.client.post(self.url(path)).json(&body)).await
    }

    async fn delete(&self, path: &str) -> E2eResult<Value> {
        send(self.client.delete(self.url(path))).await
    }

    async fn get_string(&self, path: &str) -> E2eResult<String> {
        let value = self.get(path).await?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| invalid_response(path, &value))
    }

    async fn get_bool(&self, path: &str) -> E2eResult<bool> {
        let value = self.get(path).await?;
        value.as_bool().ok_or_else(|| invalid_response(path, &value))
    }

    async fn locate(&self, path: &str, by: &By) -> E2eResult<ElementRef> {
        let (using, value) = by.to_locator();
        let reply = self
            .post(path, json!({ "using": using, "value": value }))
            .await
            .map_err(|e| match e {
                E2eError::ElementNotFound(_) => E2eError::ElementNotFound(by.to_string()),
                other => other,
            })?;
        element_from_value(&reply)
    }

    async fn locate_all(&self, path: &str, by: &By) -> E2eResult<Vec<ElementRef>> {
        let (using, value) = by.to_locator();
        let reply = self
            .post(path, json!({ "using": using, "value": value }))
            .await?;
        reply
            .as_array()
            .ok_or_else(|| invalid_response(path, &reply))?
            .iter()
            .map(element_from_value)
            .collect()
    }
}

/// Send a command and unwrap the `value` of its reply
async fn send(request: RequestBuilder) -> E2eResult<Value> {
    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() || value.get("error").map_or(false, Value::is_string) {
        return Err(protocol_error(&value));
    }
    Ok(value)
}

/// Map a WebDriver error payload onto the crate's errors
pub fn protocol_error(value: &Value) -> E2eError {
    let error = value["error"].as_str().unwrap_or("unknown error");
    let message = value["message"].as_str().unwrap_or_default().to_string();
    match error {
        "no such element" => E2eError::ElementNotFound(message),
        "no such alert" => E2eError::NoAlert,
        _ => E2eError::WebDriver {
            error: error.to_string(),
            message,
        },
    }
}

/// Extract an element reference from a find reply
pub fn element_from_value(value: &Value) -> E2eResult<ElementRef> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(ElementRef::new)
        .ok_or_else(|| invalid_response("element reference", value))
}

fn invalid_response(what: &str, value: &Value) -> E2eError {
    E2eError::WebDriver {
        error: "invalid response".to_string(),
        message: format!("unexpected reply to {}: {}", what, value),
    }
}

#[async_trait]
impl Browser for WebDriverSession {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("Navigating to {}", url);
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()> {
        self.post("/window/rect", json!({ "width": width, "height": height }))
            .await?;
        Ok(())
    }

    async fn find(&self, by: &By) -> E2eResult<ElementRef> {
        self.locate("/element", by).await
    }

    async fn find_all(&self, by: &By) -> E2eResult<Vec<ElementRef>> {
        self.locate_all("/elements", by).await
    }

    async fn find_in(&self, root: &ElementRef, by: &By) -> E2eResult<ElementRef> {
        self.locate(&format!("/element/{}/element", root.id()), by).await
    }

    async fn find_all_in(&self, root: &ElementRef, by: &By) -> E2eResult<Vec<ElementRef>> {
        self.locate_all(&format!("/element/{}/elements", root.id()), by)
            .await
    }

    async fn click(&self, element: &ElementRef) -> E2eResult<()> {
        self.post(&format!("/element/{}/click", element.id()), json!({}))
            .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> E2eResult<()> {
        self.post(
            &format!("/element/{}/value", element.id()),
            json!({ "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> E2eResult<String> {
        self.get_string(&format!("/element/{}/text", element.id()))
            .await
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> E2eResult<Option<String>> {
        let value = self
            .get(&format!("/element/{}/attribute/{}", element.id(), name))
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn property(&self, element: &ElementRef, name: &str) -> E2eResult<Value> {
        self.get(&format!("/element/{}/property/{}", element.id(), name))
            .await
    }

    async fn is_displayed(&self, element: &ElementRef) -> E2eResult<bool> {
        self.get_bool(&format!("/element/{}/displayed", element.id()))
            .await
    }

    async fn is_enabled(&self, element: &ElementRef) -> E2eResult<bool> {
        self.get_bool(&format!("/element/{}/enabled", element.id()))
            .await
    }

    async fn tag_name(&self, element: &ElementRef) -> E2eResult<String> {
        let name = self
            .get_string(&format!("/element/{}/name", element.id()))
            .await?;
        Ok(name.to_ascii_lowercase())
    }

    async fn window_handle(&self) -> E2eResult<String> {
        self.get_string("/window").await
    }

    async fn window_handles(&self) -> E2eResult<Vec<String>> {
        let value = self.get("/window/handles").await?;
        value
            .as_array()
            .map(|handles| {
                handles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .ok_or_else(|| invalid_response("window handles", &value))
    }

    async fn switch_to_window(&self, handle: &str) -> E2eResult<()> {
        self.post("/window", json!({ "handle": handle })).await?;
        Ok(())
    }

    async fn close_window(&self) -> E2eResult<()> {
        self.delete("/window").await?;
        Ok(())
    }

    async fn alert_text(&self) -> E2eResult<String> {
        self.get_string("/alert/text").await
    }

    async fn accept_alert(&self) -> E2eResult<()> {
        self.post("/alert/accept", json!({})).await?;
        Ok(())
    }
}
