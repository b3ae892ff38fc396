use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::errors::ActionError;
use crate::executors::{self, ExecutionEngines};
use crate::page::PageDriver;
use crate::session::{GLOBAL_SESSIONS, PageSession};
use crate::tracker::{ActionStateTracker, GLOBAL_ACTION_TRACKER};
use crate::types::{ActionRequest, ActionResult};

/// Tab facts captured before an action runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabContext {
    pub url: Option<String>,
    pub user_agent: Option<String>,
}

impl TabContext {
    pub fn domain(&self) -> Option<String> {
        let url = Url::parse(self.url.as_deref()?).ok()?;
        url.host_str().map(str::to_string)
    }
}

/// Entry point for every page-mutating action.
///
/// Serializes actions through the tracker, times them, and turns failures
/// into one self-contained message.
pub struct ActionGateway {
    page: Arc<dyn PageDriver>,
    session: Arc<PageSession>,
    tracker: Arc<ActionStateTracker>,
    engines: ExecutionEngines,
    config: Config,
}

impl ActionGateway {
    /// Gateway on the process-wide tracker and the tab's shared session
    pub fn new(page: Arc<dyn PageDriver>, config: Config) -> Self {
        let session = GLOBAL_SESSIONS.open(page.tab_id());
        Self {
            page,
            session,
            tracker: Arc::clone(&GLOBAL_ACTION_TRACKER),
            engines: ExecutionEngines::from_config(&config),
            config,
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<ActionStateTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_engines(mut self, engines: ExecutionEngines) -> Self {
        self.engines = engines;
        self
    }

    pub fn page(&self) -> &Arc<dyn PageDriver> {
        &self.page
    }

    pub fn session(&self) -> &Arc<PageSession> {
        &self.session
    }

    pub fn tracker(&self) -> &Arc<ActionStateTracker> {
        &self.tracker
    }

    /// Run one action to completion. Never panics or returns early: every
    /// failure is folded into the result.
    pub async fn perform(&self, request: ActionRequest) -> ActionResult {
        let started = Instant::now();
        let kind = request.kind();
        let context = self.capture_context().await;

        let action_id = match self.tracker.start_when_idle(kind).await {
            Ok(id) => id,
            Err(e) => {
                let elapsed = started.elapsed();
                return ActionResult {
                    success: false,
                    action_id: String::new(),
                    duration: elapsed.as_millis() as u64,
                    error: Some(describe_failure(&request, elapsed, &context, &e)),
                    details: None,
                };
            }
        };
        self.tracker.set_in_progress(&action_id);
        info!(action_id = %action_id, "Action started: {}", request.describe_parameters());

        if let Some(element_id) = request.element_id() {
            // Never fails: a busy page is logged and acted on anyway
            let report = self
                .engines
                .stability
                .wait_until_stable(self.page.as_ref(), &self.session)
                .await;
            if !report.stable {
                debug!(
                    action_id = %action_id,
                    element_id = %element_id,
                    "Acting on a busy page: {}",
                    report.reasons.join("; ")
                );
            }
        }

        let outcome = self.dispatch(&request).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(details) => {
                self.tracker.complete_action(&action_id);
                info!(action_id = %action_id, "Action completed in {}ms", elapsed.as_millis());
                ActionResult {
                    success: true,
                    action_id,
                    duration: elapsed.as_millis() as u64,
                    error: None,
                    details: Some(details),
                }
            }
            Err(e) => {
                let message = describe_failure(&request, elapsed, &context, &e);
                self.tracker.fail_action(&action_id, &message);
                warn!(action_id = %action_id, "Action failed: {}", message);
                ActionResult {
                    success: false,
                    action_id,
                    duration: elapsed.as_millis() as u64,
                    error: Some(message),
                    details: None,
                }
            }
        }
    }

    async fn dispatch(&self, request: &ActionRequest) -> Result<Value, ActionError> {
        let page = self.page.as_ref();
        match request {
            ActionRequest::Click { element_id } => {
                executors::click::click(&self.engines, page, &self.session, *element_id)
                    .await
                    .map(to_details)
            }
            ActionRequest::SetValue { element_id, value } => executors::set_value::set_value(
                &self.engines,
                &self.config.typing,
                page,
                *element_id,
                value,
            )
            .await
            .map(to_details),
            ActionRequest::Navigate { url } => {
                executors::navigate::navigate(&self.config.navigation, page, &self.session, url)
                    .await
                    .map(to_details)
            }
            ActionRequest::Waiting { seconds } => {
                executors::wait::wait(*seconds, self.config.max_wait_secs)
                    .await
                    .map(to_details)
            }
        }
    }

    async fn capture_context(&self) -> TabContext {
        let url = match self.page.location().await {
            Ok(location) => Some(location.url),
            Err(e) => {
                debug!("Tab location unavailable: {}", e);
                None
            }
        };
        let user_agent = match self.page.user_agent().await {
            Ok(ua) if !ua.is_empty() => Some(ua),
            Ok(_) => None,
            Err(e) => {
                debug!("User agent unavailable: {}", e);
                None
            }
        };
        TabContext { url, user_agent }
    }
}

fn to_details<T: Serialize>(outcome: T) -> Value {
    serde_json::to_value(outcome).unwrap_or(Value::Null)
}

/// Single failure string for the planner.
///
/// Messages that already narrate their steps only get the tab context
/// appended; everything else is framed with the action, its parameters and
/// the browser.
pub fn describe_failure(
    request: &ActionRequest,
    elapsed: Duration,
    context: &TabContext,
    error: &ActionError,
) -> String {
    let domain = context
        .domain()
        .unwrap_or_else(|| "an unknown domain".to_string());
    let url = context.url.as_deref().unwrap_or("unknown URL");
    let browser = context
        .user_agent
        .as_deref()
        .map(browser_label)
        .unwrap_or_else(|| "unknown browser".to_string());
    let seconds = elapsed.as_secs_f64();

    if error.is_structured() {
        format!(
            "{error}. Context: {} after {seconds:.1}s on {domain} ({url}), browser {browser}",
            request.kind()
        )
    } else {
        format!(
            "Action '{}' failed after {seconds:.1}s on {domain} ({url}). Parameters: {}. Browser: {browser}. Error: {error}",
            request.kind(),
            request.describe_parameters()
        )
    }
}

/// Short browser name and major version from a user agent string
pub fn browser_label(user_agent: &str) -> String {
    // Order matters: Edge and Opera also claim Chrome, Chrome claims Safari
    const MARKERS: [(&str, &str); 5] = [
        ("Edg/", "Edge"),
        ("OPR/", "Opera"),
        ("Firefox/", "Firefox"),
        ("Chrome/", "Chrome"),
        ("Safari/", "Safari"),
    ];
    for (marker, name) in MARKERS {
        if let Some(pos) = user_agent.find(marker) {
            let version = user_agent[pos + marker.len()..]
                .split(|c: char| c == '.' || c.is_whitespace())
                .next()
                .unwrap_or_default();
            return if version.is_empty() {
                name.to_string()
            } else {
                format!("{name} {version}")
            };
        }
    }
    if user_agent.is_empty() {
        "unknown browser".to_string()
    } else {
        user_agent.to_string()
    }
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod gateway_test;
