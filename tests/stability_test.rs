// Stability waits and their per-session cache

mod common;

use common::{FakeElement, FakePage};
use dompilot::config::StabilityConfig;
use dompilot::page::PageDriver;
use dompilot::scripts::PageScript;
use dompilot::session::PageSession;
use dompilot::stability::{StabilityMonitor, StabilityWaiter};

fn setup() -> (FakePage, PageSession, StabilityMonitor) {
    let page = FakePage::new().with(FakeElement::button("Buy")).annotated();
    let session = PageSession::new(page.tab_id());
    (page, session, StabilityMonitor::new(StabilityConfig::default()))
}

#[tokio::test(start_paused = true)]
async fn test_calm_page_needs_two_spaced_polls() {
    let (page, session, monitor) = setup();
    let report = monitor.wait_until_stable(&page, &session).await;

    assert!(report.stable);
    assert_eq!(report.polls, 2);
    assert!(report.elapsed_ms >= 100);
    assert!(!report.from_cache);
    assert_eq!(page.count(PageScript::InstallInstrumentation), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stable_verdict_is_reused_briefly() {
    let (page, session, monitor) = setup();
    monitor.wait_until_stable(&page, &session).await;
    let polls = page.count(PageScript::StabilitySignals);

    let cached = monitor.wait_until_stable(&page, &session).await;
    assert!(cached.from_cache);
    assert_eq!(page.count(PageScript::StabilitySignals), polls);

    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    let fresh = monitor.wait_until_stable(&page, &session).await;
    assert!(!fresh.from_cache);
    assert!(page.count(PageScript::StabilitySignals) > polls);
}

#[tokio::test(start_paused = true)]
async fn test_busy_page_times_out_without_failing() {
    let (page, session, monitor) = setup();
    page.set_pending_requests(2);

    let report = monitor.wait_until_stable(&page, &session).await;
    assert!(!report.stable);
    assert!(report.polls > 2);
    assert!(report.elapsed_ms <= 2000, "{}", report.elapsed_ms);
    assert_eq!(report.reasons, vec!["2 network request(s) pending".to_string()]);

    // A busy verdict is reused briefly instead of waiting out the timeout again
    let polls = page.count(PageScript::StabilitySignals);
    let started = tokio::time::Instant::now();
    let again = monitor.wait_until_stable(&page, &session).await;
    assert!(again.from_cache);
    assert!(!again.stable);
    assert_eq!(page.count(PageScript::StabilitySignals), polls);
    assert!(started.elapsed() < std::time::Duration::from_millis(10));

    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    let fresh = monitor.wait_until_stable(&page, &session).await;
    assert!(!fresh.from_cache);
}

#[tokio::test(start_paused = true)]
async fn test_page_load_resets_instrumentation() {
    let (page, session, monitor) = setup();
    monitor.wait_until_stable(&page, &session).await;

    session.begin_page_load("https://shop.example.com/next").await;
    let report = monitor.wait_until_stable(&page, &session).await;

    assert!(!report.from_cache);
    assert_eq!(page.count(PageScript::InstallInstrumentation), 2);
}
