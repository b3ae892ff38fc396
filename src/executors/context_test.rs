use super::*;

#[test]
fn test_narrative_lists_every_step_in_order() {
    let mut ctx = OperationContext::new();
    ctx.partial(Step::Scroll, "left 5% visible");
    ctx.succeeded(Step::CoordinateResolution, "(10.0, 20.0)");
    ctx.failed(Step::PrimaryMethod, "point is covered by div#overlay");

    let text = ctx.narrative(
        "Click on element 7 failed",
        &[
            Step::Scroll,
            Step::CoordinateResolution,
            Step::CursorMovement,
            Step::PrimaryMethod,
            Step::BackupMethod,
        ],
    );

    assert_eq!(
        text,
        "Click on element 7 failed. Steps: scroll: partial (left 5% visible); \
         coordinate resolution: succeeded ((10.0, 20.0)); cursor movement: not attempted; \
         primary method: failed (point is covered by div#overlay); backup method: not attempted"
    );
}

#[test]
fn test_later_record_replaces_earlier_one() {
    let mut ctx = OperationContext::new();
    ctx.failed(Step::Focus, "click did not land");
    ctx.succeeded(Step::Focus, "");
    assert_eq!(ctx.status(Step::Focus), StepStatus::Succeeded(String::new()));
    assert_eq!(ctx.status(Step::Focus).to_string(), "succeeded");
}

#[test]
fn test_skipped_step_renders_reason() {
    let mut ctx = OperationContext::new();
    ctx.skipped(Step::CursorMovement, "cursor disabled");
    assert_eq!(
        ctx.status(Step::CursorMovement).to_string(),
        "skipped (cursor disabled)"
    );
}
