use std::fmt;
use thiserror::Error;

use crate::types::{ELEMENT_ID_ATTRIBUTE, ElementHandle, Rect, ViewportSize};

/// Failures at the page RPC boundary
#[derive(Debug, Clone, Error)]
pub enum PageError {
    /// The injected script threw or returned an error
    #[error("page script '{script}' failed: {message}")]
    Script {
        script: &'static str,
        message: String,
    },
    /// The script ran but its result had an unexpected shape
    #[error("could not decode result of page script '{script}': {message}")]
    Decode {
        script: &'static str,
        message: String,
    },
    /// The WebDriver session rejected the command
    #[error("WebDriver error: {0}")]
    Driver(String),
    /// No page is attached (closed tab, dropped session)
    #[error("page unavailable: {0}")]
    Unavailable(String),
}

/// Live-page facts captured when an element cannot be found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotFoundDiagnostics {
    /// Elements currently carrying the identity attribute
    pub attribute_count: u64,
    pub ready_state: String,
    pub body_child_count: u64,
}

impl fmt::Display for NotFoundDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} element(s) carry {}, document.readyState is '{}', body has {} child element(s)",
            self.attribute_count, ELEMENT_ID_ATTRIBUTE, self.ready_state, self.body_child_count
        )
    }
}

/// Every way an action can fail. Each variant renders a complete,
/// human-readable diagnostic because the consumer is a planner reading text.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Element {element_id} not found: {reason} ({diagnostics})")]
    ElementNotFound {
        element_id: ElementHandle,
        reason: String,
        diagnostics: NotFoundDiagnostics,
    },

    #[error(
        "Could not resolve click coordinates for element {element_id} after {attempts} attempt(s): {reason} (last rect: {}, viewport: {})",
        describe_rect(.last_rect),
        describe_viewport(.viewport)
    )]
    CoordinateResolution {
        element_id: ElementHandle,
        attempts: u32,
        reason: String,
        last_rect: Option<Rect>,
        viewport: Option<ViewportSize>,
    },

    #[error("Could not scroll element {element_id} into view: {reason}")]
    ScrollFailure {
        element_id: ElementHandle,
        reason: String,
    },

    #[error("{narrative}")]
    ClickExecution { narrative: String },

    #[error("{narrative}")]
    SetValueExecution { narrative: String },

    #[error(
        "Navigation to {url} timed out after {timeout_secs}s (tab is at {}, readyState {})",
        .current_url.as_deref().unwrap_or("an unknown URL"),
        .ready_state.as_deref().unwrap_or("unknown")
    )]
    NavigationTimeout {
        url: String,
        timeout_secs: u64,
        current_url: Option<String>,
        ready_state: Option<String>,
    },

    #[error("Navigation to {url} failed: {message}")]
    NavigationApi { url: String, message: String },

    #[error("Invalid waiting duration {seconds}: seconds must be a finite, non-negative number")]
    WaitingInvalidDuration { seconds: f64 },

    #[error("Action {active} is still running; wait for it before starting another")]
    ActionInFlight { active: String },

    #[error("Invalid action request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Page(#[from] PageError),
}

impl ActionError {
    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            ActionError::ElementNotFound { .. } => 2,
            ActionError::CoordinateResolution { .. } | ActionError::ScrollFailure { .. } => 3,
            ActionError::Page(PageError::Driver(_)) | ActionError::NavigationApi { .. } => 4,
            ActionError::NavigationTimeout { .. } => 5,
            _ => 1,
        }
    }

    /// Whether the message already carries a full step-by-step narrative
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            ActionError::ClickExecution { .. } | ActionError::SetValueExecution { .. }
        )
    }
}

fn describe_rect(rect: &Option<Rect>) -> String {
    rect.map(|r| r.to_string())
        .unwrap_or_else(|| "never measured".to_string())
}

fn describe_viewport(viewport: &Option<ViewportSize>) -> String {
    viewport
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;
