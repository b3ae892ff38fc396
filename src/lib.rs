//! # dompilot
#![allow(clippy::uninlined_format_args)]
//!
//! Action-execution core for an LLM-driven browser agent.
//!
//! A planner looks at an annotated snapshot of the page and answers with one
//! action such as `click(12)` or `setValue(4, "hello\n")`. This crate turns
//! that action into reliable page interaction: it resolves the numeric handle
//! to a live element, waits for the page to settle, scrolls the element into
//! view, computes a click point, and falls back through alternative methods
//! before reporting a failure that explains every step it tried.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Print the annotated snapshot of a page
//! dompilot snapshot "https://example.com"
//!
//! # Perform a single action against a handle from the snapshot
//! dompilot act "https://example.com" 'click(3)'
//! dompilot act "https://example.com" 'setValue(5, "rust\n")'
//!
//! # Run the full loop with canned planner replies
//! dompilot run "https://example.com" "Search for rust" --responses replies.txt
//!
//! # Use Chrome in visible mode
//! dompilot snapshot "https://example.com" --browser chrome --no-headless
//! ```
//!
//! A WebDriver (geckodriver on port 4444 or chromedriver on 9515) must already
//! be running. Results are printed as JSON on stdout; logs go to stderr and are
//! filtered with `RUST_LOG` (default `dompilot=info`).
//!
//! ## Library Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use dompilot::{ActionGateway, ActionRequest, Browser, BrowserType, Config, ElementHandle};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let browser = Browser::connect(BrowserType::Firefox, "http://localhost:4444", None, true).await?;
//! let gateway = ActionGateway::new(Arc::new(browser), Config::default());
//!
//! gateway
//!     .perform(ActionRequest::Navigate { url: "example.com".into() })
//!     .await;
//! dompilot::snapshot::annotate(gateway.page().as_ref()).await?;
//!
//! let result = gateway
//!     .perform(ActionRequest::Click { element_id: ElementHandle(0) })
//!     .await;
//! println!("{}", serde_json::to_string(&result)?);
//! # Ok(())
//! # }
//! ```

/// Planner-driven run loop
pub mod agent;

/// Runtime configuration
pub mod config;

/// Click point computation with scroll-and-retry
pub mod coordinates;

/// Visible cursor indicator
pub mod cursor;

/// Error taxonomy for actions and the page boundary
pub mod errors;

/// Per-action executors
pub mod executors;

/// Single entry point for page-mutating actions
pub mod gateway;

/// The page RPC boundary
pub mod page;

/// Planner reply parsing and the planner trait
pub mod planner;

/// Element handle resolution
pub mod resolver;

/// Exponential backoff
pub mod retry;

/// Injected page scripts
pub mod scripts;

/// Scrolling elements into view
pub mod scroll;

/// Per-tab state shared across actions
pub mod session;

/// Page annotation
pub mod snapshot;

/// Waiting for a quiet page
pub mod stability;

/// Single-flight action tracking
pub mod tracker;

/// Shared value types
pub mod types;

/// WebDriver-backed page driver
pub mod webdriver;

pub use agent::{Agent, AgentRun, AgentStatus, StopHandle};
pub use config::Config;
pub use errors::{ActionError, PageError};
pub use gateway::ActionGateway;
pub use page::PageDriver;
pub use planner::{Planner, ScriptedPlanner, parse_response};
pub use tracker::ActionStateTracker;
pub use types::{
    ActionKind, ActionRequest, ActionResult, ElementCoordinates, ElementHandle, Rect,
    UniqueElementId, ViewportSize,
};
pub use webdriver::{Browser, BrowserType};
