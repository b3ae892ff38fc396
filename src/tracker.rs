use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::errors::ActionError;
use crate::types::ActionKind;

/// Finished actions kept for diagnostics by default
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ActionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ActionStatus::Pending | ActionStatus::InProgress)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionState {
    pub id: String,
    pub kind: ActionKind,
    pub status: ActionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Called once when an action completes or fails
pub type SettledCallback = Box<dyn FnOnce(&ActionState) + Send>;

#[derive(Default)]
struct TrackerInner {
    actions: HashMap<String, ActionState>,
    /// Ids in start order
    order: VecDeque<String>,
    callbacks: HashMap<String, Vec<SettledCallback>>,
}

impl TrackerInner {
    fn active(&self) -> Option<&ActionState> {
        self.order
            .iter()
            .filter_map(|id| self.actions.get(id))
            .find(|a| a.status.is_active())
    }

    fn trim(&mut self, limit: usize) {
        let finished = self
            .actions
            .values()
            .filter(|a| !a.status.is_active())
            .count();
        let mut excess = finished.saturating_sub(limit);
        while excess > 0 {
            let oldest = self
                .order
                .iter()
                .position(|id| self.actions.get(id).is_some_and(|a| !a.status.is_active()));
            let Some(index) = oldest else { break };
            if let Some(id) = self.order.remove(index) {
                self.actions.remove(&id);
                self.callbacks.remove(&id);
            }
            excess -= 1;
        }
    }
}

/// Single-flight registry of page-mutating actions.
///
/// At most one action is pending or in progress at a time; starting a second
/// one fails until the first settles.
pub struct ActionStateTracker {
    inner: Mutex<TrackerInner>,
    /// Held from the idle check until the next action is registered
    admission: tokio::sync::Mutex<()>,
    history_limit: usize,
}

impl ActionStateTracker {
    pub fn new(history_limit: usize) -> Self {
        Self {
            inner: Mutex::new(TrackerInner::default()),
            admission: tokio::sync::Mutex::new(()),
            history_limit,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        // Callbacks run outside the lock, so a poisoned guard still holds
        // consistent data
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new pending action and return its id
    pub fn start_action(&self, kind: ActionKind) -> Result<String, ActionError> {
        let mut inner = self.lock();
        if let Some(active) = inner.active() {
            return Err(ActionError::ActionInFlight {
                active: format!("{} ({})", active.id, active.kind),
            });
        }
        let id = format!("{}-{}", kind, uuid::Uuid::new_v4().simple());
        inner.actions.insert(
            id.clone(),
            ActionState {
                id: id.clone(),
                kind,
                status: ActionStatus::Pending,
                start_time: Utc::now(),
                end_time: None,
                error: None,
            },
        );
        inner.order.push_back(id.clone());
        debug!("Started action {}", id);
        Ok(id)
    }

    pub fn set_in_progress(&self, id: &str) -> bool {
        let mut inner = self.lock();
        match inner.actions.get_mut(id) {
            Some(state) if state.status == ActionStatus::Pending => {
                state.status = ActionStatus::InProgress;
                true
            }
            _ => false,
        }
    }

    pub fn complete_action(&self, id: &str) -> bool {
        self.settle(id, ActionStatus::Completed, None)
    }

    pub fn fail_action(&self, id: &str, error: impl Into<String>) -> bool {
        self.settle(id, ActionStatus::Failed, Some(error.into()))
    }

    fn settle(&self, id: &str, status: ActionStatus, error: Option<String>) -> bool {
        let (state, callbacks) = {
            let mut inner = self.lock();
            let Some(state) = inner.actions.get_mut(id) else {
                warn!("Tried to settle unknown action {}", id);
                return false;
            };
            if !state.status.is_active() {
                return false;
            }
            state.status = status;
            state.end_time = Some(Utc::now());
            state.error = error;
            let snapshot = state.clone();
            let callbacks = inner.callbacks.remove(id).unwrap_or_default();
            inner.trim(self.history_limit);
            (snapshot, callbacks)
        };
        debug!("Action {} settled as {:?}", id, status);
        for callback in callbacks {
            callback(&state);
        }
        true
    }

    /// Run `callback` once when `id` settles, or immediately if it already
    /// has. Returns false for unknown ids.
    pub fn on_settled(&self, id: &str, callback: SettledCallback) -> bool {
        let mut inner = self.lock();
        let settled = match inner.actions.get(id) {
            None => return false,
            Some(state) if !state.status.is_active() => Some(state.clone()),
            Some(_) => None,
        };
        match settled {
            Some(state) => {
                drop(inner);
                callback(&state);
            }
            None => inner
                .callbacks
                .entry(id.to_string())
                .or_default()
                .push(callback),
        }
        true
    }

    /// Final state of `id`, once it settles. `None` for unknown ids.
    pub async fn wait_for_action(&self, id: &str) -> Option<ActionState> {
        let (tx, rx) = oneshot::channel();
        let registered = self.on_settled(
            id,
            Box::new(move |state| {
                let _ = tx.send(state.clone());
            }),
        );
        if !registered {
            return None;
        }
        rx.await.ok()
    }

    pub fn has_active_action(&self) -> bool {
        self.lock().active().is_some()
    }

    pub fn active_action(&self) -> Option<ActionState> {
        self.lock().active().cloned()
    }

    /// Resolve once no action is pending or in progress
    pub async fn wait_for_all_actions(&self) {
        while let Some(active) = self.active_action() {
            debug!("Waiting for action {} to settle", active.id);
            if self.wait_for_action(&active.id).await.is_none() {
                break;
            }
        }
    }

    /// Wait until idle, then register a new action. Concurrent callers are
    /// admitted one at a time, so none of them sees `ActionInFlight` unless
    /// someone else called [`start_action`](Self::start_action) directly.
    pub async fn start_when_idle(&self, kind: ActionKind) -> Result<String, ActionError> {
        let _admission = self.admission.lock().await;
        self.wait_for_all_actions().await;
        self.start_action(kind)
    }

    pub fn get(&self, id: &str) -> Option<ActionState> {
        self.lock().actions.get(id).cloned()
    }

    /// Retained actions, oldest first
    pub fn history(&self) -> Vec<ActionState> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.actions.get(id).cloned())
            .collect()
    }
}

impl Default for ActionStateTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

// Process-wide tracker shared by every gateway
lazy_static::lazy_static! {
    pub static ref GLOBAL_ACTION_TRACKER: Arc<ActionStateTracker> =
        Arc::new(ActionStateTracker::new(DEFAULT_HISTORY_LIMIT));
}

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tracker_test;
