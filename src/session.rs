use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::stability::StabilityReport;
use crate::types::ElementCoordinates;

/// Per-tab state that survives between actions but not across navigations
#[derive(Debug)]
pub struct PageSession {
    tab_id: String,
    state: Mutex<SessionState>,
}

#[derive(Debug, Default)]
struct SessionState {
    /// Incremented on every top-level navigation
    generation: u64,
    instrumented: bool,
    stability: Option<(Instant, StabilityReport)>,
    cursor: Option<ElementCoordinates>,
    last_url: Option<String>,
}

impl PageSession {
    pub fn new(tab_id: impl Into<String>) -> Self {
        Self {
            tab_id: tab_id.into(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    /// Forget everything tied to the previous document
    pub async fn begin_page_load(&self, url: &str) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.instrumented = false;
        state.stability = None;
        state.cursor = None;
        state.last_url = Some(url.to_string());
        debug!(
            "Tab {} loaded {} (generation {})",
            self.tab_id, url, state.generation
        );
    }

    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    pub async fn last_url(&self) -> Option<String> {
        self.state.lock().await.last_url.clone()
    }

    pub async fn needs_instrumentation(&self) -> bool {
        !self.state.lock().await.instrumented
    }

    pub async fn mark_instrumented(&self, instrumented: bool) {
        self.state.lock().await.instrumented = instrumented;
    }

    /// The last verdict, stable or not, if younger than `max_age`
    pub async fn cached_stability(&self, max_age: Duration) -> Option<StabilityReport> {
        let state = self.state.lock().await;
        match &state.stability {
            Some((at, report)) if at.elapsed() <= max_age => Some(report.clone()),
            _ => None,
        }
    }

    pub async fn store_stability(&self, report: &StabilityReport) {
        self.state.lock().await.stability = Some((Instant::now(), report.clone()));
    }

    pub async fn invalidate_stability(&self) {
        self.state.lock().await.stability = None;
    }

    pub async fn cursor_position(&self) -> Option<ElementCoordinates> {
        self.state.lock().await.cursor
    }

    pub async fn set_cursor_position(&self, point: Option<ElementCoordinates>) {
        self.state.lock().await.cursor = point;
    }
}

/// Sessions keyed by tab id
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<PageSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Session for `tab_id`, created on first use
    pub fn open(&self, tab_id: &str) -> Arc<PageSession> {
        self.sessions
            .entry(tab_id.to_string())
            .or_insert_with(|| Arc::new(PageSession::new(tab_id)))
            .clone()
    }

    pub fn get(&self, tab_id: &str) -> Option<Arc<PageSession>> {
        self.sessions.get(tab_id).map(|s| Arc::clone(s.value()))
    }

    pub fn close(&self, tab_id: &str) -> bool {
        self.sessions.remove(tab_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    pub static ref GLOBAL_SESSIONS: SessionRegistry = SessionRegistry::new();
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
