// Unit tests for configuration loading

use super::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn test_defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.typing.char_delay_ms, 50);
    assert_eq!(config.coordinates.max_attempts, 3);
    assert_eq!(config.scroll.multiplier, 1.2);
    assert_eq!(config.stability.timeout_ms, 2000);
    assert_eq!(config.stability.required_stable_polls, 2);
    assert_eq!(config.stability.cache_ms, 500);
    assert_eq!(config.navigation.timeout_secs, 20);
    assert_eq!(config.max_wait_secs, 300.0);
    assert_eq!(config.agent.max_consecutive_failures, 3);
    assert_eq!(config.tracker_history, 10);
}

#[test]
fn test_partial_file_overrides_only_named_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "browser": "chrome",
            "viewport": "1280x720",
            "typing": { "char_delay_ms": 10 },
            "stability": { "timeout_ms": 500 }
        }"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.browser, BrowserType::Chrome);
    assert_eq!(config.typing.char_delay_ms, 10);
    assert_eq!(config.typing.completion_buffer_ms, 150);
    assert_eq!(config.stability.timeout_ms, 500);
    assert_eq!(config.stability.poll_interval_ms, 100);
    assert_eq!(
        config.viewport_size().unwrap(),
        Some(ViewportSize {
            width: 1280,
            height: 720
        })
    );
    assert_eq!(config.webdriver_url(), "http://localhost:9515");
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");
    assert!(Config::load(Some(&path)).is_err());
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Invalid config file"));
}

#[test]
fn test_bad_viewport_is_reported() {
    let config = Config {
        viewport: Some("wide".to_string()),
        ..Config::default()
    };
    assert!(config.viewport_size().is_err());
}
