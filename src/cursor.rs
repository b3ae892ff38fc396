use serde_json::json;
use tokio::time::Duration;
use tracing::debug;

use crate::errors::PageError;
use crate::page::PageDriver;
use crate::scripts::PageScript;
use crate::session::PageSession;
use crate::types::ElementCoordinates;

const MIN_MOVE_MS: u64 = 100;
const MAX_MOVE_MS: u64 = 400;

/// Draws a visible pointer on the page and animates it to each click point.
/// Purely cosmetic: callers record failures and carry on.
#[derive(Debug, Clone, Copy)]
pub struct CursorSimulator {
    enabled: bool,
}

impl CursorSimulator {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Animation time for a move, longer for longer distances
    pub fn move_duration(from: Option<ElementCoordinates>, to: ElementCoordinates) -> Duration {
        let distance = from.map(|f| f.distance_to(&to)).unwrap_or(0.0);
        let ms = (MIN_MOVE_MS as f64 + distance / 4.0).round() as u64;
        Duration::from_millis(ms.clamp(MIN_MOVE_MS, MAX_MOVE_MS))
    }

    /// Animate to `point` and wait for the animation to finish
    pub async fn move_to(
        &self,
        page: &dyn PageDriver,
        session: &PageSession,
        point: ElementCoordinates,
    ) -> Result<(), PageError> {
        if !self.enabled {
            return Ok(());
        }
        let from = session.cursor_position().await;
        let duration = Self::move_duration(from, point);
        let start = from.unwrap_or(point);
        page.evaluate(
            PageScript::CursorMove,
            json!({
                "from_x": start.x,
                "from_y": start.y,
                "x": point.x,
                "y": point.y,
                "duration_ms": duration.as_millis() as u64,
            }),
        )
        .await?;
        session.set_cursor_position(Some(point)).await;
        tokio::time::sleep(duration).await;
        Ok(())
    }

    pub async fn hide(&self, page: &dyn PageDriver) {
        if !self.enabled {
            return;
        }
        if let Err(e) = page.evaluate(PageScript::CursorHide, json!({})).await {
            debug!("Could not hide cursor: {}", e);
        }
    }
}
