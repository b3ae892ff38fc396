use serde::Serialize;
use tokio::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::config::NavigationConfig;
use crate::errors::{ActionError, PageError};
use crate::page::PageDriver;
use crate::session::PageSession;

/// Bound on the location lookup after a timed-out load. The driver may still
/// be busy with the abandoned load.
const LOCATION_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigateOutcome {
    /// URL that was requested after normalization
    pub requested: String,
    /// Where the tab ended up
    pub landed: Option<String>,
}

/// Parse `raw`, assuming `https://` when no scheme is given
pub fn normalize_url(raw: &str) -> Result<Url, ActionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ActionError::InvalidRequest("navigation URL is empty".to_string()));
    }
    let parsed = match Url::parse(trimmed) {
        Ok(url) if url.has_host() || matches!(url.scheme(), "about" | "data" | "file") => url,
        // "localhost:3000" parses with scheme "localhost"
        _ => Url::parse(&format!("https://{trimmed}")).map_err(|e| {
            ActionError::InvalidRequest(format!("'{trimmed}' is not a valid URL: {e}"))
        })?,
    };
    Ok(parsed)
}

/// Navigate the tab, racing the load against `config.timeout_secs`.
///
/// A timeout captures where the tab actually is before failing. After a
/// successful load the session is reset and a short settle delay lets
/// post-load scripts run.
pub async fn navigate(
    config: &NavigationConfig,
    page: &dyn PageDriver,
    session: &PageSession,
    raw_url: &str,
) -> Result<NavigateOutcome, ActionError> {
    let url = normalize_url(raw_url)?;
    let target = url.as_str().to_string();
    info!("Navigating tab {} to {}", page.tab_id(), target);

    let limit = Duration::from_secs(config.timeout_secs);
    match tokio::time::timeout(limit, page.navigate(&target)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            let message = match e {
                PageError::Driver(message) | PageError::Unavailable(message) => message,
                other => other.to_string(),
            };
            return Err(ActionError::NavigationApi {
                url: target,
                message,
            });
        }
        Err(_) => {
            let probe = tokio::time::timeout(LOCATION_PROBE_TIMEOUT, page.location());
            let location = match probe.await {
                Ok(Ok(location)) => Some(location),
                Ok(Err(e)) => {
                    warn!("Could not read tab location after timeout: {}", e);
                    None
                }
                Err(_) => {
                    warn!("Tab did not report its location within {:?}", LOCATION_PROBE_TIMEOUT);
                    None
                }
            };
            warn!(
                "Navigation to {} timed out after {}s (tab at {:?})",
                target, config.timeout_secs, location
            );
            return Err(ActionError::NavigationTimeout {
                url: target,
                timeout_secs: config.timeout_secs,
                current_url: location.as_ref().map(|l| l.url.clone()),
                ready_state: location.map(|l| l.ready_state),
            });
        }
    }

    session.begin_page_load(&target).await;
    tokio::time::sleep(Duration::from_millis(config.settle_ms)).await;

    let landed = page.location().await.ok().map(|l| l.url);
    Ok(NavigateOutcome {
        requested: target,
        landed,
    })
}

#[cfg(test)]
#[path = "navigate_test.rs"]
mod navigate_test;
