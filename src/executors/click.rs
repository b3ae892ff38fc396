use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::ExecutionEngines;
use super::context::{OperationContext, Step};
use crate::errors::ActionError;
use crate::page::{PageDriver, evaluate_as};
use crate::resolver::ResolvedElement;
use crate::scripts::{PageScript, StepReport};
use crate::session::PageSession;
use crate::types::{ElementCoordinates, ElementHandle};

/// Pause after opening a dropdown so its items can render
const DROPDOWN_OPEN_DELAY: Duration = Duration::from_millis(200);

const CLICK_STEPS: [Step; 5] = [
    Step::Scroll,
    Step::CoordinateResolution,
    Step::CursorMovement,
    Step::PrimaryMethod,
    Step::BackupMethod,
];

/// How the click was finally delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClickMethod {
    /// Pointer and mouse events dispatched at the resolved point
    PointerEvents,
    NativeClick,
    ClickEvent,
    MouseDownUp,
    JqueryTrigger,
    OnclickHandler,
    NativeSelectOption,
    AriaOption,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickOutcome {
    pub method: ClickMethod,
    pub used_backup: bool,
    pub opened_dropdown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<ElementCoordinates>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum ClickTarget {
    NativeOption,
    AriaOption,
    CollapsedDropdownItem { trigger_uid: String },
    Generic,
    Missing,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
enum HitReport {
    Hit,
    Obscured { by: String },
    Miss { reason: String },
    Missing,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
enum BackupReport {
    Clicked {
        method: ClickMethod,
        #[serde(default)]
        tried: Vec<String>,
    },
    Failed {
        reason: String,
        #[serde(default)]
        tried: Vec<String>,
    },
}

/// Click the element behind `handle`.
///
/// Scrolls, re-checks stability, resolves a point and dispatches events
/// there; any failure on that path falls through to the in-page backup
/// methods. The on-page cursor is hidden on every exit.
pub async fn click(
    engines: &ExecutionEngines,
    page: &dyn PageDriver,
    session: &PageSession,
    handle: ElementHandle,
) -> Result<ClickOutcome, ActionError> {
    let result = match engines.resolver.resolve(page, handle).await {
        Ok(element) => {
            let mut ctx = OperationContext::new();
            run(engines, page, session, &element, &mut ctx).await
        }
        Err(e) => Err(e),
    };
    engines.cursor.hide(page).await;
    if let Err(e) = &result {
        warn!("{}", e);
    }
    result
}

async fn run(
    engines: &ExecutionEngines,
    page: &dyn PageDriver,
    session: &PageSession,
    element: &ResolvedElement,
    ctx: &mut OperationContext,
) -> Result<ClickOutcome, ActionError> {
    let handle = element.handle;
    let uid = json!({ "uid": element.uid.as_str() });

    let target = match evaluate_as::<ClickTarget>(page, PageScript::ClassifyClickTarget, uid.clone())
        .await
    {
        Ok(target) => target,
        Err(e) => {
            debug!("Could not classify click target {}: {}", handle, e);
            ClickTarget::Generic
        }
    };

    let mut opened_dropdown = false;
    match target {
        ClickTarget::NativeOption => {
            return select_native_option(page, element, ctx).await;
        }
        ClickTarget::AriaOption => {
            match evaluate_as::<StepReport>(page, PageScript::SelectAriaOption, uid.clone()).await
            {
                Ok(StepReport::Done { value }) => {
                    info!("Selected ARIA option {} ({:?})", handle, value);
                    return Ok(ClickOutcome {
                        method: ClickMethod::AriaOption,
                        used_backup: false,
                        opened_dropdown: false,
                        point: None,
                    });
                }
                Ok(StepReport::Failed { reason }) => {
                    debug!("ARIA selection failed, clicking instead: {}", reason);
                }
                Err(e) => debug!("ARIA selection failed, clicking instead: {}", e),
            }
        }
        ClickTarget::CollapsedDropdownItem { trigger_uid } => {
            info!("Element {} sits in a closed dropdown, opening it first", handle);
            match evaluate_as::<BackupReport>(
                page,
                PageScript::BackupClick,
                json!({ "uid": trigger_uid }),
            )
            .await
            {
                Ok(BackupReport::Clicked { .. }) => opened_dropdown = true,
                Ok(BackupReport::Failed { reason, .. }) => {
                    debug!("Dropdown trigger click failed: {}", reason)
                }
                Err(e) => debug!("Dropdown trigger click failed: {}", e),
            }
            tokio::time::sleep(DROPDOWN_OPEN_DELAY).await;
            session.invalidate_stability().await;
        }
        ClickTarget::Missing => {
            // Re-resolve to report the disappearance with diagnostics
            engines.resolver.resolve(page, handle).await?;
        }
        ClickTarget::Generic => {}
    }

    match engines.scroll.scroll_resolved(page, element).await {
        Ok(outcome) if outcome.success() => ctx.succeeded(Step::Scroll, outcome.to_string()),
        Ok(outcome) if outcome.partial_success() => {
            ctx.partial(Step::Scroll, outcome.reason().unwrap_or_default())
        }
        Ok(outcome) => ctx.failed(Step::Scroll, outcome.reason().unwrap_or_default()),
        Err(e) => ctx.failed(Step::Scroll, e.to_string()),
    }

    let stability = engines.stability.wait_until_stable(page, session).await;
    if !stability.stable {
        debug!(
            "Clicking on a busy page: {}",
            stability.reasons.join("; ")
        );
    }

    let point = match engines.coordinates.center_coordinates(page, handle).await {
        Ok(point) => {
            ctx.succeeded(Step::CoordinateResolution, point.to_string());
            Some(point)
        }
        Err(e) => {
            ctx.failed(Step::CoordinateResolution, e.to_string());
            None
        }
    };

    if let Some(point) = point {
        if !engines.cursor.enabled() {
            ctx.skipped(Step::CursorMovement, "cursor disabled");
        } else {
            match engines.cursor.move_to(page, session, point).await {
                Ok(()) => ctx.succeeded(Step::CursorMovement, ""),
                Err(e) => ctx.failed(Step::CursorMovement, e.to_string()),
            }
        }

        match primary_click(page, element, point).await {
            Ok(()) => {
                ctx.succeeded(Step::PrimaryMethod, format!("events dispatched at {point}"));
                info!(element_id = %handle, method = "pointer-events", "Clicked at {}", point);
                return Ok(ClickOutcome {
                    method: ClickMethod::PointerEvents,
                    used_backup: false,
                    opened_dropdown,
                    point: Some(point),
                });
            }
            Err(reason) => {
                debug!("Primary click on {} failed: {}", handle, reason);
                ctx.failed(Step::PrimaryMethod, reason);
            }
        }
    } else {
        ctx.skipped(Step::CursorMovement, "no click point");
        ctx.skipped(Step::PrimaryMethod, "no click point");
    }

    match evaluate_as::<BackupReport>(page, PageScript::BackupClick, uid).await {
        Ok(BackupReport::Clicked { method, tried }) => {
            ctx.succeeded(Step::BackupMethod, format!("tried {}", tried.join(", ")));
            info!(element_id = %handle, method = ?method, "Clicked through backup");
            Ok(ClickOutcome {
                method,
                used_backup: true,
                opened_dropdown,
                point,
            })
        }
        Ok(BackupReport::Failed { reason, tried }) => {
            let detail = if tried.is_empty() {
                reason
            } else {
                format!("{reason}; tried {}", tried.join(", "))
            };
            ctx.failed(Step::BackupMethod, detail);
            Err(exhausted(handle, ctx))
        }
        Err(e) => {
            ctx.failed(Step::BackupMethod, e.to_string());
            Err(exhausted(handle, ctx))
        }
    }
}

/// Hit-test the point, then dispatch the event sequence there
pub(super) async fn primary_click(
    page: &dyn PageDriver,
    element: &ResolvedElement,
    point: ElementCoordinates,
) -> Result<(), String> {
    let hit: HitReport = evaluate_as(
        page,
        PageScript::HitTest,
        json!({ "uid": element.uid.as_str(), "x": point.x, "y": point.y }),
    )
    .await
    .map_err(|e| e.to_string())?;

    match hit {
        HitReport::Hit => {}
        HitReport::Obscured { by } => return Err(format!("point {point} is covered by {by}")),
        HitReport::Miss { reason } => return Err(format!("nothing to hit at {point}: {reason}")),
        HitReport::Missing => return Err("element left the document".to_string()),
    }

    let report: StepReport = evaluate_as(
        page,
        PageScript::DispatchClickAtPoint,
        json!({ "x": point.x, "y": point.y }),
    )
    .await
    .map_err(|e| e.to_string())?;

    match report {
        StepReport::Done { .. } => Ok(()),
        StepReport::Failed { reason } => Err(reason),
    }
}

async fn select_native_option(
    page: &dyn PageDriver,
    element: &ResolvedElement,
    ctx: &mut OperationContext,
) -> Result<ClickOutcome, ActionError> {
    let reason = "options are selected through their <select>";
    ctx.skipped(Step::Scroll, reason);
    ctx.skipped(Step::CoordinateResolution, reason);
    ctx.skipped(Step::CursorMovement, reason);
    ctx.skipped(Step::BackupMethod, reason);

    let report = evaluate_as::<StepReport>(
        page,
        PageScript::SelectNativeOption,
        json!({ "uid": element.uid.as_str() }),
    )
    .await;

    match report {
        Ok(StepReport::Done { value }) => {
            info!(
                "Selected option {} (value {:?})",
                element.handle,
                value.unwrap_or_default()
            );
            Ok(ClickOutcome {
                method: ClickMethod::NativeSelectOption,
                used_backup: false,
                opened_dropdown: false,
                point: None,
            })
        }
        Ok(StepReport::Failed { reason }) => {
            ctx.failed(Step::PrimaryMethod, reason);
            Err(exhausted(element.handle, ctx))
        }
        Err(e) => {
            ctx.failed(Step::PrimaryMethod, e.to_string());
            Err(exhausted(element.handle, ctx))
        }
    }
}

fn exhausted(handle: ElementHandle, ctx: &OperationContext) -> ActionError {
    ActionError::ClickExecution {
        narrative: ctx.narrative(
            &format!("Click on element {handle} failed after every method was exhausted"),
            &CLICK_STEPS,
        ),
    }
}
