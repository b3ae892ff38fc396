use serde::Serialize;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::errors::ActionError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaitOutcome {
    pub requested: f64,
    pub waited: f64,
    pub capped: bool,
}

/// Seconds actually waited for a request: `None` when invalid
pub fn effective_seconds(seconds: f64, max_seconds: f64) -> Option<f64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(seconds.min(max_seconds))
}

/// Sleep for `seconds`, capped at `max_seconds`
pub async fn wait(seconds: f64, max_seconds: f64) -> Result<WaitOutcome, ActionError> {
    let waited = effective_seconds(seconds, max_seconds)
        .ok_or(ActionError::WaitingInvalidDuration { seconds })?;
    let capped = waited < seconds;
    if capped {
        warn!(
            "Requested wait of {}s exceeds the {}s limit, capping",
            seconds, max_seconds
        );
    }
    info!("Waiting {}s", waited);
    tokio::time::sleep(Duration::from_secs_f64(waited)).await;
    Ok(WaitOutcome {
        requested: seconds,
        waited,
        capped,
    })
}
