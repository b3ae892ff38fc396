use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::errors::PageError;
use crate::page::{PageDriver, TabLocation};
use crate::scripts::PageScript;
use crate::types::ViewportSize;

/// Browser instance driven over WebDriver
pub struct Browser {
    client: Client,
    browser_type: BrowserType,
    tab_id: String,
    // Removed on drop
    _user_data_dir: Option<TempDir>,
}

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

impl BrowserType {
    /// Standard port of this browser's WebDriver
    pub fn default_webdriver_url(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "http://localhost:4444",
            BrowserType::Chrome => "http://localhost:9515",
        }
    }

    fn driver_name(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }
}

impl Browser {
    /// Open a new browser session
    ///
    /// # Arguments
    /// * `browser_type` - Firefox or Chrome
    /// * `webdriver_url` - Endpoint of an already running WebDriver
    /// * `viewport` - Optional window dimensions
    /// * `headless` - Whether to run in headless mode
    pub async fn connect(
        browser_type: BrowserType,
        webdriver_url: &str,
        viewport: Option<ViewportSize>,
        headless: bool,
    ) -> Result<Self> {
        info!("Connecting to {:?} WebDriver at {}", browser_type, webdriver_url);

        if !Self::is_webdriver_running(webdriver_url).await {
            let driver_name = browser_type.driver_name();
            anyhow::bail!(
                "Cannot connect to {} WebDriver at {}.\n\
                Please ensure {} is running:\n\
                  For Firefox: geckodriver --port 4444\n\
                  For Chrome: chromedriver --port 9515",
                driver_name,
                webdriver_url,
                driver_name
            );
        }

        let mut caps = serde_json::Map::new();
        let mut user_data_dir = None;

        match &browser_type {
            BrowserType::Firefox => {
                let mut args = Vec::new();
                if headless {
                    args.push("--headless".to_string());
                }
                if let Some(vp) = &viewport {
                    args.push(format!("--width={}", vp.width));
                    args.push(format!("--height={}", vp.height));
                }
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                if let Some(vp) = &viewport {
                    args.push(format!("--window-size={},{}", vp.width, vp.height));
                }

                // Chrome refuses to share a profile directory between sessions
                let dir = tempfile::Builder::new()
                    .prefix("dompilot-chrome-")
                    .tempdir()?;
                args.push(format!("--user-data-dir={}", dir.path().display()));
                user_data_dir = Some(dir);

                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }

        let client = ClientBuilder::rustls()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .context("Failed to connect to WebDriver")?;

        if let Some(vp) = viewport {
            debug!("Setting viewport to {}", vp);
            if let Err(e) = client.set_window_size(vp.width, vp.height).await {
                debug!("Note: Could not set window size: {}", e);
            }
        }

        Ok(Browser {
            client,
            browser_type,
            tab_id: uuid::Uuid::new_v4().to_string(),
            _user_data_dir: user_data_dir,
        })
    }

    async fn is_webdriver_running(url: &str) -> bool {
        let status_url = format!("{}/status", url.trim_end_matches('/'));

        match reqwest::get(&status_url).await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    pub fn browser_type(&self) -> BrowserType {
        self.browser_type
    }

    async fn execute(&self, source: &str, args: Vec<Value>) -> Result<Value, PageError> {
        self.client
            .execute(source, args)
            .await
            .map_err(|e| PageError::Driver(e.to_string()))
    }

    /// Page load limit enforced by the driver itself; later commands queue
    /// behind an unfinished load until it expires
    pub async fn set_page_load_timeout(&self, timeout: std::time::Duration) -> Result<()> {
        let timeouts = fantoccini::wd::TimeoutConfiguration::new(None, Some(timeout), None);
        self.client
            .update_timeouts(timeouts)
            .await
            .context("Failed to set the page load timeout")?;
        Ok(())
    }

    /// End the WebDriver session
    pub async fn close(&self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for Browser {
    fn tab_id(&self) -> &str {
        &self.tab_id
    }

    async fn evaluate(&self, script: PageScript, args: Value) -> Result<Value, PageError> {
        debug!("Evaluating page script {}", script.name());
        self.client
            .execute(script.source(), vec![args])
            .await
            .map_err(|e| PageError::Script {
                script: script.name(),
                message: e.to_string(),
            })
    }

    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        info!("Navigating to {}", url);
        self.client
            .goto(url)
            .await
            .map_err(|e| PageError::Driver(e.to_string()))?;

        // goto returns once the load event fired; give late documents a moment
        for _ in 0..20 {
            let ready = self
                .execute("return document.readyState === 'complete';", vec![])
                .await;
            match ready {
                Ok(val) if val.as_bool().unwrap_or(false) => break,
                _ => tokio::time::sleep(std::time::Duration::from_millis(100)).await,
            }
        }

        Ok(())
    }

    async fn location(&self) -> Result<TabLocation, PageError> {
        let value = self
            .execute(
                "return { url: location.href, ready_state: document.readyState };",
                vec![],
            )
            .await?;
        serde_json::from_value(value).map_err(|e| PageError::Decode {
            script: "location",
            message: e.to_string(),
        })
    }

    async fn user_agent(&self) -> Result<String, PageError> {
        let value = self.execute("return navigator.userAgent;", vec![]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}
