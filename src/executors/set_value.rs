use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::ExecutionEngines;
use super::click::primary_click;
use super::context::{OperationContext, Step};
use crate::config::TypingConfig;
use crate::errors::ActionError;
use crate::page::{PageDriver, evaluate_as};
use crate::resolver::ResolvedElement;
use crate::scripts::{PageScript, StepReport};
use crate::types::{ElementHandle, preview};

const SET_VALUE_STEPS: [Step; 5] = [
    Step::Scroll,
    Step::CoordinateResolution,
    Step::Focus,
    Step::PrimaryMethod,
    Step::BackupMethod,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SetValueMethod {
    /// Per-character keyboard and input events
    KeystrokeSimulation,
    /// Value or text assigned at once, then input and change fired
    DirectAssignment,
}

/// What a newline did in the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NewlineEffect {
    LineBreak,
    EnterKey,
    FormSubmitted,
    SubmitButtonClicked,
}

impl NewlineEffect {
    pub fn submitted(&self) -> bool {
        matches!(
            self,
            NewlineEffect::FormSubmitted | NewlineEffect::SubmitButtonClicked
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetValueOutcome {
    pub method: SetValueMethod,
    /// Characters delivered as keystrokes
    pub characters: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub newline_effects: Vec<NewlineEffect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum InputKind {
    Input,
    Textarea,
    ContentEditable,
    RichEditor,
    Unsupported { reason: String },
    Missing,
}

impl InputKind {
    fn as_str(&self) -> &'static str {
        match self {
            InputKind::Input => "input",
            InputKind::Textarea => "textarea",
            InputKind::ContentEditable => "content-editable",
            InputKind::RichEditor => "rich-editor",
            InputKind::Unsupported { .. } => "unsupported",
            InputKind::Missing => "missing",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
enum NewlineReport {
    Inserted { effect: NewlineEffect },
    Failed { reason: String },
}

/// Type `value` into the element behind `handle`.
///
/// Resolves only after the whole typing animation has played out: one
/// `char_delay_ms` pause per character plus `completion_buffer_ms`. Falls
/// back to direct assignment when the page rejects keystroke simulation.
pub async fn set_value(
    engines: &ExecutionEngines,
    typing: &TypingConfig,
    page: &dyn PageDriver,
    handle: ElementHandle,
    value: &str,
) -> Result<SetValueOutcome, ActionError> {
    let element = engines.resolver.resolve(page, handle).await?;
    let mut ctx = OperationContext::new();

    match engines.scroll.scroll_resolved(page, &element).await {
        Ok(outcome) if outcome.success() => ctx.succeeded(Step::Scroll, outcome.to_string()),
        Ok(outcome) if outcome.partial_success() => {
            ctx.partial(Step::Scroll, outcome.reason().unwrap_or_default())
        }
        Ok(outcome) => ctx.failed(Step::Scroll, outcome.reason().unwrap_or_default()),
        Err(e) => ctx.failed(Step::Scroll, e.to_string()),
    }

    focus(engines, page, &element, &mut ctx).await;

    let kind = match evaluate_as::<InputKind>(
        page,
        PageScript::ClassifyInput,
        json!({ "uid": element.uid.as_str() }),
    )
    .await
    {
        Ok(InputKind::Missing) => {
            engines.resolver.resolve(page, handle).await?;
            None
        }
        Ok(InputKind::Unsupported { reason }) => {
            ctx.skipped(Step::PrimaryMethod, reason);
            None
        }
        Ok(kind) => Some(kind),
        Err(e) => {
            ctx.failed(Step::PrimaryMethod, e.to_string());
            None
        }
    };

    if let Some(kind) = kind {
        match type_text(page, &element, &kind, value, typing).await {
            Ok(newline_effects) => {
                tokio::time::sleep(Duration::from_millis(typing.completion_buffer_ms)).await;
                let characters = value.chars().filter(|c| *c != '\r').count();
                ctx.succeeded(Step::PrimaryMethod, format!("{characters} keystroke(s)"));
                info!(
                    "Typed {} character(s) into {} element {}",
                    characters,
                    kind.as_str(),
                    handle
                );
                return Ok(SetValueOutcome {
                    method: SetValueMethod::KeystrokeSimulation,
                    characters,
                    newline_effects,
                });
            }
            Err(reason) => {
                debug!("Keystroke simulation on {} failed: {}", handle, reason);
                ctx.failed(Step::PrimaryMethod, reason);
            }
        }
    }

    let report = evaluate_as::<StepReport>(
        page,
        PageScript::AssignValue,
        json!({ "uid": element.uid.as_str(), "value": value }),
    )
    .await;
    match report {
        Ok(StepReport::Done { .. }) => {
            ctx.succeeded(Step::BackupMethod, "value assigned directly");
            info!("Assigned value to element {} directly", handle);
            Ok(SetValueOutcome {
                method: SetValueMethod::DirectAssignment,
                characters: 0,
                newline_effects: Vec::new(),
            })
        }
        Ok(StepReport::Failed { reason }) => {
            ctx.failed(Step::BackupMethod, reason);
            Err(exhausted(handle, value, &ctx))
        }
        Err(e) => {
            ctx.failed(Step::BackupMethod, e.to_string());
            Err(exhausted(handle, value, &ctx))
        }
    }
}

/// Click into the field, falling back to `focus()`
async fn focus(
    engines: &ExecutionEngines,
    page: &dyn PageDriver,
    element: &ResolvedElement,
    ctx: &mut OperationContext,
) {
    let click_error = match engines
        .coordinates
        .center_coordinates(page, element.handle)
        .await
    {
        Ok(point) => {
            ctx.succeeded(Step::CoordinateResolution, point.to_string());
            match primary_click(page, element, point).await {
                Ok(()) => {
                    ctx.succeeded(Step::Focus, format!("clicked at {point}"));
                    return;
                }
                Err(reason) => reason,
            }
        }
        Err(e) => {
            ctx.failed(Step::CoordinateResolution, e.to_string());
            "no click point".to_string()
        }
    };

    let report = evaluate_as::<StepReport>(
        page,
        PageScript::FocusElement,
        json!({ "uid": element.uid.as_str() }),
    )
    .await;
    match report {
        Ok(StepReport::Done { .. }) => ctx.succeeded(
            Step::Focus,
            format!("focus() after click failed ({click_error})"),
        ),
        Ok(StepReport::Failed { reason }) => {
            ctx.failed(Step::Focus, format!("click: {click_error}; focus(): {reason}"))
        }
        Err(e) => ctx.failed(Step::Focus, format!("click: {click_error}; focus(): {e}")),
    }
}

async fn type_text(
    page: &dyn PageDriver,
    element: &ResolvedElement,
    kind: &InputKind,
    value: &str,
    typing: &TypingConfig,
) -> Result<Vec<NewlineEffect>, String> {
    let uid = element.uid.as_str();
    let kind_name = kind.as_str();
    let char_delay = Duration::from_millis(typing.char_delay_ms);

    let cleared: StepReport = evaluate_as(
        page,
        PageScript::ClearField,
        json!({ "uid": uid, "kind": kind_name }),
    )
    .await
    .map_err(|e| e.to_string())?;
    if let StepReport::Failed { reason } = cleared {
        return Err(format!("could not clear the field: {reason}"));
    }

    let mut effects = Vec::new();
    for (index, ch) in value.chars().enumerate() {
        match ch {
            '\r' => continue,
            '\n' => {
                let report: NewlineReport = evaluate_as(
                    page,
                    PageScript::InsertNewline,
                    json!({ "uid": uid, "kind": kind_name }),
                )
                .await
                .map_err(|e| e.to_string())?;
                match report {
                    NewlineReport::Inserted { effect } => {
                        debug!("Newline at {} in {}: {:?}", index, kind_name, effect);
                        effects.push(effect);
                        if effect.submitted() {
                            // The document is about to change under us
                            tokio::time::sleep(char_delay).await;
                            return Ok(effects);
                        }
                    }
                    NewlineReport::Failed { reason } => {
                        return Err(format!("newline at position {index} failed: {reason}"));
                    }
                }
            }
            _ => {
                let report: StepReport = evaluate_as(
                    page,
                    PageScript::TypeCharacter,
                    json!({ "uid": uid, "kind": kind_name, "ch": ch.to_string() }),
                )
                .await
                .map_err(|e| e.to_string())?;
                if let StepReport::Failed { reason } = report {
                    return Err(format!("character {index} failed: {reason}"));
                }
            }
        }
        tokio::time::sleep(char_delay).await;
    }

    let finished: StepReport = evaluate_as(page, PageScript::FinishTyping, json!({ "uid": uid }))
        .await
        .map_err(|e| e.to_string())?;
    match finished {
        StepReport::Done { value: typed } => {
            if let Some(typed) = typed {
                debug!("Field now reads \"{}\"", preview(&typed, 40));
            }
            Ok(effects)
        }
        StepReport::Failed { reason } => Err(format!("change event failed: {reason}")),
    }
}

fn exhausted(handle: ElementHandle, value: &str, ctx: &OperationContext) -> ActionError {
    let err = ActionError::SetValueExecution {
        narrative: ctx.narrative(
            &format!(
                "Setting value \"{}\" on element {handle} failed after every method was exhausted",
                preview(value, 30)
            ),
            &SET_VALUE_STEPS,
        ),
    };
    warn!("{}", err);
    err
}
