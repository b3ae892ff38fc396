// Unit tests for URL normalization

use super::*;

#[test]
fn test_bare_host_gets_https() {
    let url = normalize_url("example.com/path?q=1").unwrap();
    assert_eq!(url.as_str(), "https://example.com/path?q=1");
}

#[test]
fn test_host_with_port_gets_https() {
    let url = normalize_url("localhost:3000").unwrap();
    assert_eq!(url.as_str(), "https://localhost:3000/");
}

#[test]
fn test_explicit_schemes_are_kept() {
    assert_eq!(
        normalize_url("http://example.com").unwrap().as_str(),
        "http://example.com/"
    );
    assert_eq!(
        normalize_url("  https://example.com/a  ").unwrap().as_str(),
        "https://example.com/a"
    );
    assert_eq!(
        normalize_url("about:blank").unwrap().as_str(),
        "about:blank"
    );
}

#[test]
fn test_empty_url_is_rejected() {
    let err = normalize_url("   ").unwrap_err();
    assert!(err.to_string().contains("empty"));
}
