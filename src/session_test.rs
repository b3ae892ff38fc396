// Unit tests for per-tab session state

use super::*;

fn report(stable: bool) -> StabilityReport {
    StabilityReport {
        stable,
        polls: 2,
        elapsed_ms: 100,
        reasons: Vec::new(),
        from_cache: false,
    }
}

#[tokio::test(start_paused = true)]
async fn test_stable_verdict_is_cached_until_it_expires() {
    let session = PageSession::new("tab-1");
    session.store_stability(&report(true)).await;

    assert!(
        session
            .cached_stability(Duration::from_millis(500))
            .await
            .is_some()
    );

    tokio::time::advance(Duration::from_millis(600)).await;
    assert!(
        session
            .cached_stability(Duration::from_millis(500))
            .await
            .is_none()
    );
}

#[tokio::test(start_paused = true)]
async fn test_unstable_verdict_is_reused_within_the_window() {
    let session = PageSession::new("tab-1");
    session.store_stability(&report(false)).await;

    let cached = session
        .cached_stability(Duration::from_millis(500))
        .await
        .unwrap();
    assert!(!cached.stable);

    tokio::time::advance(Duration::from_millis(600)).await;
    assert!(
        session
            .cached_stability(Duration::from_millis(500))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_page_load_resets_document_state() {
    let session = PageSession::new("tab-1");
    session.mark_instrumented(true).await;
    session.store_stability(&report(true)).await;
    session
        .set_cursor_position(Some(ElementCoordinates { x: 5.0, y: 5.0 }))
        .await;

    session.begin_page_load("https://example.com/").await;

    assert_eq!(session.generation().await, 1);
    assert!(session.needs_instrumentation().await);
    assert!(session.cursor_position().await.is_none());
    assert!(
        session
            .cached_stability(Duration::from_secs(10))
            .await
            .is_none()
    );
    assert_eq!(
        session.last_url().await.as_deref(),
        Some("https://example.com/")
    );
}

#[test]
fn test_registry_reuses_sessions_per_tab() {
    let registry = SessionRegistry::new();
    let a = registry.open("tab-a");
    let again = registry.open("tab-a");
    assert!(Arc::ptr_eq(&a, &again));

    registry.open("tab-b");
    assert_eq!(registry.len(), 2);

    assert!(registry.close("tab-a"));
    assert!(!registry.close("tab-a"));
    assert!(registry.get("tab-a").is_none());
    assert!(registry.get("tab-b").is_some());
}
