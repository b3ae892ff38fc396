use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::StabilityConfig;
use crate::errors::PageError;
use crate::page::{PageDriver, evaluate_as};
use crate::scripts::PageScript;
use crate::session::PageSession;

/// One observation of the page's loading activity
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StabilitySignals {
    pub ready_state: String,
    pub pending_requests: u32,
    pub loading_images: u32,
    pub loading_stylesheets: u32,
    pub loading_indicators: u32,
    /// Significant mutations inside the observation window
    pub recent_mutations: u32,
    /// Short timers scheduled recently. Reported, never blocking.
    pub timer_activity: bool,
    pub framework_loading: bool,
    /// Whether the page-side observers were found
    pub instrumented: bool,
}

impl StabilitySignals {
    /// Why the page is not calm yet; empty when it is
    pub fn instability_reasons(&self, mutation_threshold: u32) -> Vec<String> {
        let mut reasons = Vec::new();
        if self.ready_state != "complete" {
            reasons.push(format!("document is still '{}'", self.ready_state));
        }
        if self.pending_requests > 0 {
            reasons.push(format!(
                "{} network request(s) pending",
                self.pending_requests
            ));
        }
        if self.loading_images > 0 {
            reasons.push(format!("{} image(s) loading", self.loading_images));
        }
        if self.loading_stylesheets > 0 {
            reasons.push(format!(
                "{} stylesheet(s) loading",
                self.loading_stylesheets
            ));
        }
        if self.loading_indicators > 0 {
            reasons.push(format!(
                "{} loading indicator(s) visible",
                self.loading_indicators
            ));
        }
        if self.recent_mutations > mutation_threshold {
            reasons.push(format!(
                "{} DOM mutation(s) in the observation window",
                self.recent_mutations
            ));
        }
        if self.framework_loading {
            reasons.push("framework reports a pending render".to_string());
        }
        reasons
    }
}

/// Verdict of one stability wait
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityReport {
    pub stable: bool,
    pub polls: u32,
    pub elapsed_ms: u64,
    /// What kept the page busy on the last unstable poll
    pub reasons: Vec<String>,
    pub from_cache: bool,
}

/// Something that can wait for a page to settle.
///
/// Waiting never fails: a page that stays busy yields an unstable report
/// and the caller proceeds anyway.
#[async_trait]
pub trait StabilityWaiter: Send + Sync {
    async fn wait_until_stable(&self, page: &dyn PageDriver, session: &PageSession)
    -> StabilityReport;
}

/// Polls page-side signals until enough consecutive calm observations
#[derive(Debug, Clone)]
pub struct StabilityMonitor {
    config: StabilityConfig,
}

impl StabilityMonitor {
    pub fn new(config: StabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    async fn ensure_instrumented(&self, page: &dyn PageDriver, session: &PageSession) {
        if !session.needs_instrumentation().await {
            return;
        }
        match page
            .evaluate(PageScript::InstallInstrumentation, json!({}))
            .await
        {
            Ok(_) => session.mark_instrumented(true).await,
            Err(e) => debug!("Could not install stability observers: {}", e),
        }
    }

    async fn poll(&self, page: &dyn PageDriver) -> Result<StabilitySignals, PageError> {
        evaluate_as(
            page,
            PageScript::StabilitySignals,
            json!({ "window_ms": self.config.mutation_window_ms }),
        )
        .await
    }
}

#[async_trait]
impl StabilityWaiter for StabilityMonitor {
    async fn wait_until_stable(
        &self,
        page: &dyn PageDriver,
        session: &PageSession,
    ) -> StabilityReport {
        if let Some(mut cached) = session
            .cached_stability(Duration::from_millis(self.config.cache_ms))
            .await
        {
            cached.from_cache = true;
            return cached;
        }

        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.config.timeout_ms);
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let min_gap = Duration::from_millis(self.config.min_stable_ms);
        let required = self.config.required_stable_polls.max(1);

        self.ensure_instrumented(page, session).await;

        let mut polls = 0;
        let mut calm_streak = 0;
        let mut last_counted: Option<Instant> = None;
        let mut reasons = Vec::new();

        loop {
            polls += 1;
            match self.poll(page).await {
                Ok(signals) => {
                    if !signals.instrumented {
                        // Observers vanish on client-side document swaps
                        session.mark_instrumented(false).await;
                        self.ensure_instrumented(page, session).await;
                    }
                    let current = signals.instability_reasons(self.config.mutation_threshold);
                    if current.is_empty() {
                        let now = Instant::now();
                        match last_counted {
                            Some(at) if now.duration_since(at) < min_gap => {}
                            _ => {
                                calm_streak += 1;
                                last_counted = Some(now);
                            }
                        }
                    } else {
                        calm_streak = 0;
                        last_counted = None;
                        reasons = current;
                    }
                }
                Err(e) => {
                    calm_streak = 0;
                    last_counted = None;
                    reasons = vec![format!("stability signals unavailable: {e}")];
                }
            }

            if calm_streak >= required {
                let report = StabilityReport {
                    stable: true,
                    polls,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    reasons: Vec::new(),
                    from_cache: false,
                };
                debug!("Page stable after {} poll(s)", polls);
                session.store_stability(&report).await;
                return report;
            }

            if Instant::now() + interval > deadline {
                break;
            }
            tokio::time::sleep(interval).await;
        }

        warn!(
            "Page did not settle within {}ms, proceeding anyway: {}",
            self.config.timeout_ms,
            reasons.join("; ")
        );
        let report = StabilityReport {
            stable: false,
            polls,
            elapsed_ms: started.elapsed().as_millis() as u64,
            reasons,
            from_cache: false,
        };
        session.store_stability(&report).await;
        report
    }
}

#[cfg(test)]
#[path = "stability_test.rs"]
mod stability_test;
