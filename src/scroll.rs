use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::coordinates::measure_element;
use crate::errors::ActionError;
use crate::page::{PageDriver, evaluate_as};
use crate::resolver::{ElementResolver, ResolvedElement};
use crate::retry::RetryPolicy;
use crate::scripts::PageScript;
use crate::types::{ElementHandle, Rect, ViewportSize};

/// Slack around the viewport when judging whether a center is on screen
pub const VISIBILITY_TOLERANCE_PX: f64 = 20.0;

/// Share of the element area that counts as visible enough
pub const MIN_VISIBLE_FRACTION: f64 = 0.10;

const SMOOTH_SCROLL_SETTLE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollMethod {
    AlreadyVisible,
    NestedContainer,
    NativeCenter,
    NativeNearest,
    WindowCenter,
    ForcedSmooth,
}

impl ScrollMethod {
    /// Strategies in the order they are tried
    pub const STRATEGIES: [ScrollMethod; 5] = [
        ScrollMethod::NestedContainer,
        ScrollMethod::NativeCenter,
        ScrollMethod::NativeNearest,
        ScrollMethod::WindowCenter,
        ScrollMethod::ForcedSmooth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollMethod::AlreadyVisible => "already-visible",
            ScrollMethod::NestedContainer => "nested-container",
            ScrollMethod::NativeCenter => "native-center",
            ScrollMethod::NativeNearest => "native-nearest",
            ScrollMethod::WindowCenter => "window-center",
            ScrollMethod::ForcedSmooth => "forced-smooth",
        }
    }
}

impl fmt::Display for ScrollMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a scroll request ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum ScrollOutcome {
    /// The element ended up acceptably visible
    Visible { method: ScrollMethod, attempts: u32 },
    /// The element moved toward the viewport but not far enough
    Partial { method: ScrollMethod, reason: String },
    Failed { reason: String },
}

impl ScrollOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ScrollOutcome::Visible { .. })
    }

    pub fn partial_success(&self) -> bool {
        matches!(self, ScrollOutcome::Partial { .. })
    }

    /// Good enough for a caller that only needs a clickable point
    pub fn can_proceed(&self) -> bool {
        !matches!(self, ScrollOutcome::Failed { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ScrollOutcome::Visible { .. } => None,
            ScrollOutcome::Partial { reason, .. } | ScrollOutcome::Failed { reason } => {
                Some(reason.as_str())
            }
        }
    }
}

impl fmt::Display for ScrollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrollOutcome::Visible { method, attempts } => {
                write!(f, "visible via {method} (attempt {attempts})")
            }
            ScrollOutcome::Partial { method, reason } => {
                write!(f, "partially visible via {method}: {reason}")
            }
            ScrollOutcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visibility {
    Acceptable,
    Insufficient { visible_fraction: f64 },
    NoArea,
}

/// Judge a rect against the viewport.
///
/// Acceptable means the center sits inside the viewport grown by
/// `tolerance`, or at least [`MIN_VISIBLE_FRACTION`] of the area shows.
/// A rect without area is never acceptable.
pub fn assess_visibility(rect: &Rect, viewport: &ViewportSize, tolerance: f64) -> Visibility {
    if !rect.has_area() {
        return Visibility::NoArea;
    }
    let visible_fraction = rect.visible_fraction(viewport);
    if viewport.contains(&rect.center(), tolerance) || visible_fraction >= MIN_VISIBLE_FRACTION {
        Visibility::Acceptable
    } else {
        Visibility::Insufficient { visible_fraction }
    }
}

/// Whether a scroll moved the element measurably closer to the viewport
pub fn made_progress(before: &Rect, after: &Rect, viewport: &ViewportSize) -> bool {
    let target = viewport.center();
    let closer = before.center().distance_to(&target) - after.center().distance_to(&target);
    closer >= 1.0 || after.visible_fraction(viewport) > before.visible_fraction(viewport)
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
enum ScrollStepReport {
    Scrolled {
        before: Rect,
        after: Rect,
        viewport: ViewportSize,
    },
    NotApplicable,
    Missing,
    Error {
        reason: String,
    },
}

/// Brings elements into view through a ladder of scroll strategies
#[derive(Debug, Clone)]
pub struct ScrollEngine {
    policy: RetryPolicy,
    resolver: ElementResolver,
}

impl ScrollEngine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            resolver: ElementResolver::new(),
        }
    }

    pub async fn scroll_into_view(
        &self,
        page: &dyn PageDriver,
        handle: ElementHandle,
    ) -> Result<ScrollOutcome, ActionError> {
        let element = self.resolver.resolve(page, handle).await?;
        self.scroll_resolved(page, &element).await
    }

    /// Scroll an element that was already resolved
    pub async fn scroll_resolved(
        &self,
        page: &dyn PageDriver,
        element: &ResolvedElement,
    ) -> Result<ScrollOutcome, ActionError> {
        let Some(initial) = measure_element(page, &element.uid).await? else {
            return Ok(ScrollOutcome::Failed {
                reason: "element is no longer in the document".to_string(),
            });
        };
        match assess_visibility(&initial.rect, &initial.viewport, VISIBILITY_TOLERANCE_PX) {
            Visibility::Acceptable => {
                return Ok(ScrollOutcome::Visible {
                    method: ScrollMethod::AlreadyVisible,
                    attempts: 0,
                });
            }
            Visibility::NoArea => {
                return Ok(ScrollOutcome::Failed {
                    reason: format!("element has no size ({})", initial.rect),
                });
            }
            Visibility::Insufficient { .. } => {}
        }

        let mut progressed: Option<ScrollMethod> = None;
        let mut reason = String::new();

        for attempt in self.policy.attempts() {
            for method in ScrollMethod::STRATEGIES {
                let report: Result<ScrollStepReport, _> = evaluate_as(
                    page,
                    PageScript::ScrollStep,
                    json!({ "uid": element.uid.as_str(), "strategy": method.as_str() }),
                )
                .await;

                let (before, mut after, mut viewport) = match report {
                    Ok(ScrollStepReport::Scrolled {
                        before,
                        after,
                        viewport,
                    }) => (before, after, viewport),
                    Ok(ScrollStepReport::NotApplicable) => continue,
                    Ok(ScrollStepReport::Missing) => {
                        return Ok(ScrollOutcome::Failed {
                            reason: "element left the document while scrolling".to_string(),
                        });
                    }
                    Ok(ScrollStepReport::Error { reason: message }) => {
                        debug!("Scroll strategy {} errored: {}", method, message);
                        reason = format!("{method} errored: {message}");
                        continue;
                    }
                    Err(e) => {
                        debug!("Scroll strategy {} failed: {}", method, e);
                        reason = format!("{method} failed: {e}");
                        continue;
                    }
                };

                if method == ScrollMethod::ForcedSmooth {
                    tokio::time::sleep(SMOOTH_SCROLL_SETTLE).await;
                    if let Ok(Some(settled)) = measure_element(page, &element.uid).await {
                        after = settled.rect;
                        viewport = settled.viewport;
                    }
                }

                match assess_visibility(&after, &viewport, VISIBILITY_TOLERANCE_PX) {
                    Visibility::Acceptable => {
                        info!(
                            "Element {} scrolled into view via {} on attempt {}",
                            element.handle, method, attempt
                        );
                        return Ok(ScrollOutcome::Visible { method, attempts: attempt });
                    }
                    Visibility::NoArea => {
                        reason = format!("element collapsed to {} after {method}", after);
                    }
                    Visibility::Insufficient { visible_fraction } => {
                        if made_progress(&before, &after, &viewport) {
                            progressed = Some(method);
                        }
                        reason = format!(
                            "{method} left {:.0}% of the element visible at {}",
                            visible_fraction * 100.0,
                            after
                        );
                    }
                }
            }

            if !self.policy.is_last(attempt) {
                self.policy.backoff(attempt).await;
            }
        }

        if reason.is_empty() {
            reason = "no scroll strategy applied".to_string();
        }
        Ok(match progressed {
            Some(method) => {
                debug!("Scroll made progress but not enough: {}", reason);
                ScrollOutcome::Partial { method, reason }
            }
            None => {
                warn!("Could not scroll element {}: {}", element.handle, reason);
                ScrollOutcome::Failed { reason }
            }
        })
    }
}

#[cfg(test)]
#[path = "scroll_test.rs"]
mod scroll_test;
