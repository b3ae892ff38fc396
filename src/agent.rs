//! The agent loop: annotate, ask the planner, perform, repeat.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::gateway::ActionGateway;
use crate::planner::{ActionRecord, ParsedAction, Planner, PlannerRequest, parse_response};
use crate::snapshot;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum AgentStatus {
    /// The planner called `finish()`
    Completed,
    /// The planner called `fail(message)`
    Failed { message: String },
    /// The planner answered the user with `respond(message)`
    Responded { message: String },
    /// Too many consecutive failures, or the planner itself broke
    Halted { last_error: String },
    /// The stop flag was raised
    Stopped,
    StepLimit { steps: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    #[serde(flatten)]
    pub status: AgentStatus,
    pub steps: Vec<ActionRecord>,
    pub memory: Vec<String>,
}

/// Cloneable flag that asks a running agent to stop
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Agent {
    gateway: ActionGateway,
    planner: Arc<dyn Planner>,
    config: AgentConfig,
    stop: StopHandle,
}

#[derive(Default)]
struct RunState {
    history: Vec<ActionRecord>,
    memory: Vec<String>,
    consecutive_failures: u32,
    last_error: Option<String>,
}

impl RunState {
    fn succeeded(&mut self, action: String) {
        self.history.push(ActionRecord {
            action,
            success: true,
            error: None,
        });
        self.consecutive_failures = 0;
    }

    fn failed(&mut self, action: String, error: String) {
        self.history.push(ActionRecord {
            action,
            success: false,
            error: Some(error.clone()),
        });
        self.consecutive_failures += 1;
        self.last_error = Some(error);
    }

    fn finish(self, status: AgentStatus) -> AgentRun {
        AgentRun {
            status,
            steps: self.history,
            memory: self.memory,
        }
    }
}

impl Agent {
    pub fn new(gateway: ActionGateway, planner: Arc<dyn Planner>, config: AgentConfig) -> Self {
        Self {
            gateway,
            planner,
            config,
            stop: StopHandle::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn gateway(&self) -> &ActionGateway {
        &self.gateway
    }

    /// Drive the page toward `task` until the planner ends the run or a
    /// limit is hit
    pub async fn run(&self, task: &str) -> AgentRun {
        let mut state = RunState::default();
        info!(task, "Agent run started");

        for step in 1..=self.config.max_steps {
            if self.stop.is_stopped() {
                return state.finish(AgentStatus::Stopped);
            }

            let snapshot = match snapshot::annotate(self.gateway.page().as_ref()).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(step, "Snapshot failed: {}", e);
                    state.failed("snapshot".to_string(), e.to_string());
                    if let Some(halted) = self.check_failure_cap(&state) {
                        return state.finish(halted);
                    }
                    continue;
                }
            };

            let request = PlannerRequest {
                task: task.to_string(),
                url: Some(snapshot.url.clone()),
                snapshot: snapshot.text,
                previous_actions: state.history.clone(),
                memory: state.memory.clone(),
            };
            let reply = match self.planner.plan(&request).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(step, "Planner failed: {:#}", e);
                    return state.finish(AgentStatus::Halted {
                        last_error: format!("Planner failed: {e:#}"),
                    });
                }
            };

            if self.stop.is_stopped() {
                return state.finish(AgentStatus::Stopped);
            }

            let response = match parse_response(&reply) {
                Ok(response) => response,
                Err(e) => {
                    warn!(step, "Unparseable planner reply: {}", e);
                    state.failed("unparseable reply".to_string(), e.to_string());
                    if let Some(halted) = self.check_failure_cap(&state) {
                        return state.finish(halted);
                    }
                    continue;
                }
            };
            debug!(step, action = %response.action_text, "Planner chose action");

            let action_text = response.action_text;
            match response.action {
                ParsedAction::Finish => {
                    state.succeeded(action_text);
                    return state.finish(AgentStatus::Completed);
                }
                ParsedAction::Fail { message } => {
                    state.succeeded(action_text);
                    return state.finish(AgentStatus::Failed { message });
                }
                ParsedAction::Respond { message } => {
                    state.succeeded(action_text);
                    return state.finish(AgentStatus::Responded { message });
                }
                ParsedAction::Memory { message } => {
                    state.memory.push(message);
                    state.succeeded(action_text);
                }
                executable => {
                    let Some(request) = executable.into_request() else {
                        continue;
                    };
                    self.gateway.tracker().wait_for_all_actions().await;
                    let result = self.gateway.perform(request).await;

                    if self.stop.is_stopped() {
                        debug!(action_id = %result.action_id, "Discarding result after stop");
                        return state.finish(AgentStatus::Stopped);
                    }

                    if result.success {
                        state.succeeded(action_text);
                    } else {
                        let error = result
                            .error
                            .unwrap_or_else(|| "action failed without a message".to_string());
                        state.failed(action_text, error);
                        if let Some(halted) = self.check_failure_cap(&state) {
                            return state.finish(halted);
                        }
                    }
                }
            }
        }

        warn!(steps = self.config.max_steps, "Agent hit the step limit");
        state.finish(AgentStatus::StepLimit {
            steps: self.config.max_steps,
        })
    }

    fn check_failure_cap(&self, state: &RunState) -> Option<AgentStatus> {
        if state.consecutive_failures < self.config.max_consecutive_failures {
            return None;
        }
        warn!(
            failures = state.consecutive_failures,
            "Halting after consecutive failures"
        );
        Some(AgentStatus::Halted {
            last_error: state.last_error.clone().unwrap_or_default(),
        })
    }
}
