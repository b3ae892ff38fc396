use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tracing::{debug, info};

use crate::errors::{ActionError, PageError};
use crate::page::{PageDriver, evaluate_as};
use crate::resolver::ElementResolver;
use crate::retry::RetryPolicy;
use crate::scripts::PageScript;
use crate::scroll::ScrollEngine;
use crate::types::{ElementCoordinates, ElementHandle, Rect, UniqueElementId, ViewportSize};

/// Distance an element center may sit outside the viewport before a scroll
/// is triggered
pub const VIEWPORT_MARGIN_PX: f64 = 50.0;

/// Computed style fields that explain why an element has no box
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: String,
    pub position: String,
}

impl fmt::Display for ComputedStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "display: {}, visibility: {}, opacity: {}, position: {}",
            self.display, self.visibility, self.opacity, self.position
        )
    }
}

/// Bounding box and viewport read in the same page turn
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElementGeometry {
    pub rect: Rect,
    pub viewport: ViewportSize,
    pub style: ComputedStyle,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
enum GeometryReport {
    Measured(ElementGeometry),
    Missing,
}

/// Measure an element by identity. `None` when it is no longer in the document.
pub async fn measure_element(
    page: &dyn PageDriver,
    uid: &UniqueElementId,
) -> Result<Option<ElementGeometry>, PageError> {
    let report: GeometryReport =
        evaluate_as(page, PageScript::Geometry, json!({ "uid": uid.as_str() })).await?;
    Ok(match report {
        GeometryReport::Measured(geometry) => Some(geometry),
        GeometryReport::Missing => None,
    })
}

/// Turns element handles into validated click points
#[derive(Debug, Clone)]
pub struct CoordinateEngine {
    policy: RetryPolicy,
    margin: f64,
    resolver: ElementResolver,
    scroll: ScrollEngine,
}

impl CoordinateEngine {
    pub fn new(policy: RetryPolicy, scroll: ScrollEngine) -> Self {
        Self {
            policy,
            margin: VIEWPORT_MARGIN_PX,
            resolver: ElementResolver::new(),
            scroll,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Center point of the element, or of its visible part when the center is
    /// clipped. Missing elements fail at once; everything else is retried.
    pub async fn center_coordinates(
        &self,
        page: &dyn PageDriver,
        handle: ElementHandle,
    ) -> Result<ElementCoordinates, ActionError> {
        let mut last_rect = None;
        let mut last_viewport = None;
        let mut reason = String::from("no attempt was made");
        let mut attempts = 0;

        for attempt in self.policy.attempts() {
            attempts = attempt;
            let element = self.resolver.resolve(page, handle).await?;

            match measure_element(page, &element.uid).await {
                Ok(Some(geometry)) => {
                    last_rect = Some(geometry.rect);
                    last_viewport = Some(geometry.viewport);

                    if !geometry.rect.has_area() {
                        reason = format!(
                            "element has no size ({}; {})",
                            geometry.rect, geometry.style
                        );
                        debug!("Attempt {}: {}", attempt, reason);
                    } else {
                        let center = geometry.rect.center();
                        let point = if geometry.viewport.contains(&center, self.margin) {
                            geometry.rect.clickable_point(&geometry.viewport)
                        } else {
                            None
                        };
                        match point {
                            Some(point)
                                if point.is_valid() && geometry.viewport.contains(&point, 0.0) =>
                            {
                                debug!("Element {} resolves to {}", handle, point);
                                return Ok(point);
                            }
                            Some(point) => {
                                reason = format!("computed point {point} is not a valid coordinate");
                            }
                            None => {
                                reason = format!(
                                    "element {} is outside the {} viewport",
                                    geometry.rect, geometry.viewport
                                );
                                info!("Element {} is off screen, scrolling it into view", handle);
                                match self.scroll.scroll_resolved(page, &element).await {
                                    Ok(outcome) => debug!("Scroll before retry: {:?}", outcome),
                                    Err(e) => reason = format!("{reason}; scrolling failed: {e}"),
                                }
                            }
                        }
                    }
                }
                Ok(None) => {
                    reason = "element left the document while being measured".to_string();
                }
                Err(e) => reason = e.to_string(),
            }

            if !self.policy.is_last(attempt) {
                self.policy.backoff(attempt).await;
            }
        }

        Err(ActionError::CoordinateResolution {
            element_id: handle,
            attempts,
            reason,
            last_rect,
            viewport: last_viewport,
        })
    }
}
