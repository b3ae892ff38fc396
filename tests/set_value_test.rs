// Typing executor: keystroke timing, newlines and the assignment fallback

mod common;

use common::{FakeElement, FakePage};
use dompilot::config::{Config, TypingConfig};
use dompilot::errors::ActionError;
use dompilot::executors::set_value::{NewlineEffect, set_value};
use dompilot::executors::{ExecutionEngines, SetValueMethod};
use dompilot::scripts::PageScript;
use dompilot::types::ElementHandle;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::{Duration, Instant};

fn engines() -> ExecutionEngines {
    ExecutionEngines::from_config(&Config::default())
}

#[tokio::test(start_paused = true)]
async fn test_typing_takes_per_character_delay_plus_buffer() {
    let page = FakePage::new().with(FakeElement::input("Search")).annotated();
    let started = Instant::now();

    let outcome = set_value(
        &engines(),
        &TypingConfig::default(),
        &page,
        ElementHandle(0),
        "hello",
    )
    .await
    .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.method, SetValueMethod::KeystrokeSimulation);
    assert_eq!(outcome.characters, 5);
    assert_eq!(page.element(0).typed, "hello");
    // 5 x 50ms + 150ms, nothing else sleeps on this path
    assert!(elapsed >= Duration::from_millis(400), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(500), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_newlines_in_textarea_become_line_breaks() {
    let page = FakePage::new()
        .with(
            FakeElement::input("Notes")
                .with_input_kind(json!({ "kind": "textarea" }))
                .with_newline_effect("line-break"),
        )
        .annotated();
    let started = Instant::now();

    let outcome = set_value(
        &engines(),
        &TypingConfig::default(),
        &page,
        ElementHandle(0),
        "one\ntwo",
    )
    .await
    .unwrap();

    assert_eq!(page.element(0).typed, "one\ntwo");
    assert_eq!(outcome.newline_effects, vec![NewlineEffect::LineBreak]);
    assert!(started.elapsed() >= Duration::from_millis(7 * 50 + 150));
    assert_eq!(page.count(PageScript::TypeCharacter), 6);
}

#[tokio::test(start_paused = true)]
async fn test_submitting_newline_stops_typing() {
    let page = FakePage::new()
        .with(FakeElement::input("Search").with_newline_effect("form-submitted"))
        .annotated();

    let outcome = set_value(
        &engines(),
        &TypingConfig::default(),
        &page,
        ElementHandle(0),
        "ab\ncd",
    )
    .await
    .unwrap();

    assert_eq!(outcome.newline_effects, vec![NewlineEffect::FormSubmitted]);
    assert_eq!(page.element(0).typed, "ab\n");
    assert_eq!(page.count(PageScript::FinishTyping), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_target_uses_direct_assignment() {
    let page = FakePage::new()
        .with(FakeElement::button("Custom widget").with_assign(json!({ "status": "done" })))
        .annotated();
    let started = Instant::now();

    let outcome = set_value(
        &engines(),
        &TypingConfig::default(),
        &page,
        ElementHandle(0),
        "42",
    )
    .await
    .unwrap();

    assert_eq!(outcome.method, SetValueMethod::DirectAssignment);
    assert_eq!(page.element(0).typed, "42");
    assert_eq!(page.count(PageScript::TypeCharacter), 0);
    // No per-character delay on the fallback path
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_set_value_narrates_every_step() {
    let page = FakePage::new()
        .with(FakeElement::button("Buy"))
        .annotated();

    let err = set_value(
        &engines(),
        &TypingConfig::default(),
        &page,
        ElementHandle(0),
        "hi",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ActionError::SetValueExecution { .. }));
    let message = err.to_string();
    assert!(
        message.starts_with("Setting value \"hi\" on element 0 failed"),
        "{message}"
    );
    assert!(message.contains("focus: succeeded"), "{message}");
    assert!(
        message.contains("primary method: skipped (buttons do not take text)"),
        "{message}"
    );
    assert!(
        message.contains("backup method: failed (not a form field)"),
        "{message}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_set_value_on_unknown_handle() {
    let page = FakePage::new().with(FakeElement::input("Search")).annotated();
    let err = set_value(
        &engines(),
        &TypingConfig::default(),
        &page,
        ElementHandle(3),
        "x",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ActionError::ElementNotFound { .. }));
}
