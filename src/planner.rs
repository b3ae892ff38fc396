//! Planner contract: what is sent to the planner and how its reply is parsed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::types::{ActionRequest, ElementHandle};

#[derive(Debug, Error, PartialEq)]
pub enum PlanParseError {
    #[error("Response has no <{0}> section")]
    MissingTag(&'static str),

    #[error("Malformed action '{text}': {reason}")]
    Syntax { text: String, reason: String },

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Action '{name}' takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Argument {index} of '{name}' must be {expected}")]
    ArgumentType {
        name: String,
        index: usize,
        expected: &'static str,
    },
}

/// A literal argument of an action call
#[derive(Debug, Clone, PartialEq)]
pub enum ActionArg {
    Number(f64),
    Text(String),
}

/// An action from the fixed planner vocabulary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum ParsedAction {
    #[serde(rename_all = "camelCase")]
    Click { element_id: ElementHandle },
    #[serde(rename_all = "camelCase")]
    SetValue {
        element_id: ElementHandle,
        value: String,
    },
    Navigate { url: String },
    Waiting { seconds: f64 },
    Finish,
    Fail { message: String },
    Respond { message: String },
    Memory { message: String },
}

impl ParsedAction {
    pub fn name(&self) -> &'static str {
        match self {
            ParsedAction::Click { .. } => "click",
            ParsedAction::SetValue { .. } => "setValue",
            ParsedAction::Navigate { .. } => "navigate",
            ParsedAction::Waiting { .. } => "waiting",
            ParsedAction::Finish => "finish",
            ParsedAction::Fail { .. } => "fail",
            ParsedAction::Respond { .. } => "respond",
            ParsedAction::Memory { .. } => "memory",
        }
    }

    /// Gateway request for executable actions; `None` for the ones the
    /// orchestrator handles itself
    pub fn into_request(self) -> Option<ActionRequest> {
        match self {
            ParsedAction::Click { element_id } => Some(ActionRequest::Click { element_id }),
            ParsedAction::SetValue { element_id, value } => {
                Some(ActionRequest::SetValue { element_id, value })
            }
            ParsedAction::Navigate { url } => Some(ActionRequest::Navigate { url }),
            ParsedAction::Waiting { seconds } => Some(ActionRequest::Waiting { seconds }),
            ParsedAction::Finish
            | ParsedAction::Fail { .. }
            | ParsedAction::Respond { .. }
            | ParsedAction::Memory { .. } => None,
        }
    }
}

/// One planner reply, split into its tagged sections
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerResponse {
    pub steps: Option<String>,
    pub thought: String,
    /// Raw text inside `<Action>`
    pub action_text: String,
    pub action: ParsedAction,
    pub validator: Option<String>,
}

/// Text between `<tag>` and `</tag>`, matched case-insensitively
fn extract_tag(text: &str, tag: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with `text`
    let lower = text.to_ascii_lowercase();
    let open = format!("<{}>", tag.to_ascii_lowercase());
    let close = format!("</{}>", tag.to_ascii_lowercase());
    let start = lower.find(&open)? + open.len();
    let end = start + lower[start..].find(&close)?;
    Some(text[start..end].trim().to_string())
}

pub fn parse_response(text: &str) -> Result<PlannerResponse, PlanParseError> {
    let action_text = extract_tag(text, "Action").ok_or(PlanParseError::MissingTag("Action"))?;
    let action = parse_action(&action_text)?;
    Ok(PlannerResponse {
        steps: extract_tag(text, "Steps"),
        thought: extract_tag(text, "Thought").unwrap_or_default(),
        action_text,
        action,
        validator: extract_tag(text, "Validator"),
    })
}

/// Parse a call expression such as `setValue(12, "hello\n")`
pub fn parse_action(expr: &str) -> Result<ParsedAction, PlanParseError> {
    let expr = expr.trim();
    let syntax = |reason: &str| PlanParseError::Syntax {
        text: expr.to_string(),
        reason: reason.to_string(),
    };

    let open = expr.find('(').ok_or_else(|| syntax("missing '('"))?;
    let name = expr[..open].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(syntax("action name must be an identifier"));
    }
    if !expr.ends_with(')') {
        return Err(syntax("missing closing ')'"));
    }
    let args = split_args(&expr[open + 1..expr.len() - 1]).map_err(|reason| syntax(&reason))?;

    build_action(name, args)
}

fn split_args(inner: &str) -> Result<Vec<ActionArg>, String> {
    let mut args = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else { break };

        if first == '"' || first == '\'' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('r') => text.push('\r'),
                        Some(escaped @ ('"' | '\'' | '\\')) => text.push(escaped),
                        Some(other) => {
                            text.push('\\');
                            text.push(other);
                        }
                        None => return Err("dangling escape at end of input".to_string()),
                    },
                    c if c == first => {
                        closed = true;
                        break;
                    }
                    c => text.push(c),
                }
            }
            if !closed {
                return Err("unterminated string".to_string());
            }
            args.push(ActionArg::Text(text));
        } else if first == ',' {
            return Err("empty argument".to_string());
        } else {
            let mut bare = String::new();
            while let Some(c) = chars.next_if(|c| *c != ',') {
                bare.push(c);
            }
            let bare = bare.trim();
            args.push(match bare.parse::<f64>() {
                Ok(n) => ActionArg::Number(n),
                Err(_) => ActionArg::Text(bare.to_string()),
            });
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => {
                while chars.next_if(|c| c.is_whitespace()).is_some() {}
                if chars.peek().is_none() {
                    return Err("trailing ','".to_string());
                }
            }
            Some(c) => return Err(format!("unexpected '{c}' after argument")),
        }
    }

    Ok(args)
}

fn build_action(name: &str, args: Vec<ActionArg>) -> Result<ParsedAction, PlanParseError> {
    let expect = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(PlanParseError::Arity {
                name: name.to_string(),
                expected,
                found: args.len(),
            })
        }
    };
    let type_error = |index: usize, expected: &'static str| PlanParseError::ArgumentType {
        name: name.to_string(),
        index,
        expected,
    };

    let element_id = |arg: &ActionArg| -> Result<ElementHandle, PlanParseError> {
        let value = match arg {
            ActionArg::Number(n) => *n,
            ActionArg::Text(t) => t.trim().parse::<f64>().map_err(|_| type_error(1, "an element id"))?,
        };
        if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
            return Err(type_error(1, "an element id"));
        }
        Ok(ElementHandle(value as u32))
    };
    let text = |arg: &ActionArg| match arg {
        ActionArg::Text(t) => t.clone(),
        ActionArg::Number(n) => n.to_string(),
    };

    match name {
        "click" => {
            expect(1)?;
            Ok(ParsedAction::Click {
                element_id: element_id(&args[0])?,
            })
        }
        "setValue" => {
            expect(2)?;
            Ok(ParsedAction::SetValue {
                element_id: element_id(&args[0])?,
                value: text(&args[1]),
            })
        }
        "navigate" => {
            expect(1)?;
            Ok(ParsedAction::Navigate {
                url: text(&args[0]),
            })
        }
        "waiting" => {
            expect(1)?;
            let seconds = match &args[0] {
                ActionArg::Number(n) => *n,
                ActionArg::Text(t) => t
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| type_error(1, "a number of seconds"))?,
            };
            Ok(ParsedAction::Waiting { seconds })
        }
        "finish" => {
            expect(0)?;
            Ok(ParsedAction::Finish)
        }
        "fail" => {
            expect(1)?;
            Ok(ParsedAction::Fail {
                message: text(&args[0]),
            })
        }
        "respond" => {
            expect(1)?;
            Ok(ParsedAction::Respond {
                message: text(&args[0]),
            })
        }
        "memory" => {
            expect(1)?;
            Ok(ParsedAction::Memory {
                message: text(&args[0]),
            })
        }
        other => Err(PlanParseError::UnknownAction(other.to_string())),
    }
}

/// Outcome of an earlier step, fed back to the planner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    pub action: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the planner sees for one step
#[derive(Debug, Clone, Serialize)]
pub struct PlannerRequest {
    pub task: String,
    pub url: Option<String>,
    pub snapshot: String,
    pub previous_actions: Vec<ActionRecord>,
    pub memory: Vec<String>,
}

/// The language model behind the loop, as a black box
#[async_trait]
pub trait Planner: Send + Sync {
    /// Raw reply text for one step
    async fn plan(&self, request: &PlannerRequest) -> Result<String>;
}

/// Replays canned replies in order
pub struct ScriptedPlanner {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedPlanner {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    /// Replies separated by lines containing only `---`
    pub fn parse_script(text: &str) -> Self {
        let mut responses = Vec::new();
        let mut current = String::new();
        for line in text.lines() {
            if line.trim() == "---" {
                responses.push(std::mem::take(&mut current));
            } else {
                current.push_str(line);
                current.push('\n');
            }
        }
        responses.push(current);
        Self::new(responses.into_iter().filter(|r| !r.trim().is_empty()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read responses from {}", path.display()))?;
        Ok(Self::parse_script(&text))
    }

    pub async fn remaining(&self) -> usize {
        self.responses.lock().await.len()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, _request: &PlannerRequest) -> Result<String> {
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("Scripted planner has no responses left"))
    }
}

#[cfg(test)]
#[path = "planner_test.rs"]
mod planner_test;
