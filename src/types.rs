use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest coordinate value accepted as a click point
pub const MAX_COORDINATE_VALUE: f64 = 10_000.0;

/// Attribute written onto elements so they can be re-queried across calls
pub const ELEMENT_ID_ATTRIBUTE: &str = "data-dompilot-uid";

/// Numeric handle assigned to an element by the last annotation pass.
///
/// Only valid until the page is annotated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub u32);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable identity token stored in [`ELEMENT_ID_ATTRIBUTE`].
///
/// Valid until the element is removed or the page navigates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueElementId(pub String);

impl UniqueElementId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Viewport-relative click point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementCoordinates {
    pub x: f64,
    pub y: f64,
}

impl ElementCoordinates {
    /// Whether both axes are finite and inside `[0, MAX_COORDINATE_VALUE]`
    pub fn is_valid(&self) -> bool {
        [self.x, self.y]
            .iter()
            .all(|v| v.is_finite() && (0.0..=MAX_COORDINATE_VALUE).contains(v))
    }

    pub fn distance_to(&self, other: &ElementCoordinates) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl fmt::Display for ElementCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Bounding client rect as reported by the page
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn center(&self) -> ElementCoordinates {
        ElementCoordinates {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// Part of this rect that overlaps the viewport, if any
    pub fn intersect_viewport(&self, viewport: &ViewportSize) -> Option<Rect> {
        let left = self.x.max(0.0);
        let top = self.y.max(0.0);
        let right = self.right().min(viewport.width as f64);
        let bottom = self.bottom().min(viewport.height as f64);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }

    /// Fraction of the element area inside the viewport (0 for zero-area rects)
    pub fn visible_fraction(&self, viewport: &ViewportSize) -> f64 {
        if !self.has_area() {
            return 0.0;
        }
        self.intersect_viewport(viewport)
            .map(|visible| visible.area() / self.area())
            .unwrap_or(0.0)
    }

    /// Clickable point: the center when it is on screen, otherwise the
    /// center of the visible part. `None` when no part is on screen.
    pub fn clickable_point(&self, viewport: &ViewportSize) -> Option<ElementCoordinates> {
        let visible = self.intersect_viewport(viewport)?;
        let center = self.center();
        if viewport.contains(&center, 0.0) {
            return Some(center);
        }
        Some(visible.center())
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.0}x{:.0} at ({:.0}, {:.0})",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Browser viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
}

impl ViewportSize {
    /// Parse viewport size from "WIDTHxHEIGHT" format (e.g., "1920x1080")
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('x').collect();
        if parts.len() != 2 {
            anyhow::bail!("Invalid viewport format. Use WIDTHxHEIGHT (e.g., 1920x1080)");
        }

        let width = parts[0]
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid width in viewport size"))?;
        let height = parts[1]
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid height in viewport size"))?;

        Ok(ViewportSize { width, height })
    }

    /// Whether a point lies inside the viewport grown by `margin` on every side
    pub fn contains(&self, point: &ElementCoordinates, margin: f64) -> bool {
        point.x >= -margin
            && point.y >= -margin
            && point.x <= self.width as f64 + margin
            && point.y <= self.height as f64 + margin
    }

    pub fn center(&self) -> ElementCoordinates {
        ElementCoordinates {
            x: self.width as f64 / 2.0,
            y: self.height as f64 / 2.0,
        }
    }
}

impl fmt::Display for ViewportSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The four page-mutating action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Click,
    SetValue,
    Navigate,
    Waiting,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Click => "click",
            ActionKind::SetValue => "setValue",
            ActionKind::Navigate => "navigate",
            ActionKind::Waiting => "waiting",
        };
        f.write_str(name)
    }
}

/// An action accepted by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ActionRequest {
    #[serde(rename_all = "camelCase")]
    Click { element_id: ElementHandle },
    #[serde(rename_all = "camelCase")]
    SetValue {
        element_id: ElementHandle,
        value: String,
    },
    Navigate { url: String },
    Waiting { seconds: f64 },
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::Click { .. } => ActionKind::Click,
            ActionRequest::SetValue { .. } => ActionKind::SetValue,
            ActionRequest::Navigate { .. } => ActionKind::Navigate,
            ActionRequest::Waiting { .. } => ActionKind::Waiting,
        }
    }

    /// Element the action operates on, for element-level actions
    pub fn element_id(&self) -> Option<ElementHandle> {
        match self {
            ActionRequest::Click { element_id } | ActionRequest::SetValue { element_id, .. } => {
                Some(*element_id)
            }
            ActionRequest::Navigate { .. } | ActionRequest::Waiting { .. } => None,
        }
    }

    /// Action-specific parameters rendered for failure messages
    pub fn describe_parameters(&self) -> String {
        match self {
            ActionRequest::Click { element_id } => format!("elementId={}", element_id),
            ActionRequest::SetValue { element_id, value } => format!(
                "elementId={}, valueLength={}, valuePreview=\"{}\"",
                element_id,
                value.chars().count(),
                preview(value, 30)
            ),
            ActionRequest::Navigate { url } => format!("url={}", url),
            ActionRequest::Waiting { seconds } => format!("seconds={}", seconds),
        }
    }
}

/// Shorten text to `max` characters, escaping newlines
pub fn preview(text: &str, max: usize) -> String {
    let escaped = text.replace('\n', "\\n");
    if escaped.chars().count() <= max {
        escaped
    } else {
        let head: String = escaped.chars().take(max).collect();
        format!("{head}…")
    }
}

/// Result returned by the gateway for every performed action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub action_id: String,
    /// Wall-clock duration in milliseconds
    pub duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
