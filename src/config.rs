use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::retry::RetryPolicy;
use crate::types::ViewportSize;
use crate::webdriver::BrowserType;

/// Runtime configuration. Every field has a default, so a config file only
/// needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WebDriver endpoint; defaults to the standard port for `browser`
    pub webdriver_url: Option<String>,
    pub browser: BrowserType,
    pub headless: bool,
    /// Window size as WIDTHxHEIGHT
    pub viewport: Option<String>,
    /// Show the on-page cursor indicator before interactions
    pub cursor_enabled: bool,
    pub typing: TypingConfig,
    pub coordinates: RetryPolicy,
    pub scroll: RetryPolicy,
    pub stability: StabilityConfig,
    pub navigation: NavigationConfig,
    /// Upper bound for the waiting action
    pub max_wait_secs: f64,
    pub agent: AgentConfig,
    /// Finished actions kept by the tracker for diagnostics
    pub tracker_history: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webdriver_url: None,
            browser: BrowserType::Firefox,
            headless: true,
            viewport: None,
            cursor_enabled: true,
            typing: TypingConfig::default(),
            coordinates: RetryPolicy::new(3, 100, 2.0),
            scroll: RetryPolicy::new(3, 100, 1.2),
            stability: StabilityConfig::default(),
            navigation: NavigationConfig::default(),
            max_wait_secs: 300.0,
            agent: AgentConfig::default(),
            tracker_history: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    /// Pause after each simulated keystroke
    pub char_delay_ms: u64,
    /// Extra settle time after the last keystroke
    pub completion_buffer_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            char_delay_ms: 50,
            completion_buffer_ms: 150,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Consecutive calm polls needed before declaring the page stable
    pub required_stable_polls: u32,
    /// Minimum spacing between two polls that count toward stability
    pub min_stable_ms: u64,
    /// How long a stability verdict is reused
    pub cache_ms: u64,
    /// Significant mutations tolerated inside the observation window
    pub mutation_threshold: u32,
    /// Observation window for mutations and timers
    pub mutation_window_ms: u64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            poll_interval_ms: 100,
            required_stable_polls: 2,
            min_stable_ms: 100,
            cache_ms: 500,
            mutation_threshold: 5,
            mutation_window_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub timeout_secs: u64,
    /// Pause after load so post-load scripts can initialize
    pub settle_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            settle_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_consecutive_failures: u32,
    pub max_steps: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            max_steps: 50,
        }
    }
}

impl Config {
    /// Default location: `<config_dir>/dompilot/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dompilot").join("config.json"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parsed viewport, if one is configured
    pub fn viewport_size(&self) -> Result<Option<ViewportSize>> {
        self.viewport.as_deref().map(ViewportSize::parse).transpose()
    }

    pub fn webdriver_url(&self) -> String {
        self.webdriver_url
            .clone()
            .unwrap_or_else(|| self.browser.default_webdriver_url().to_string())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
