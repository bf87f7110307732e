//! Integration tests for the fetcher
//!
//! These tests use wiremock to check retry, timeout and identity behavior
//! against a real HTTP server.

use article_harvester::config::FetchConfig;
use article_harvester::harvester::{FetchResult, Fetcher};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fetch settings with short timings for testing
fn create_test_config(max_attempts: u32) -> FetchConfig {
    FetchConfig {
        max_attempts,
        attempt_timeout_ms: 2_000,
        backoff_base_ms: 10,
        status_pause_ms: 10,
        jitter_min_ms: 0,
        jitter_max_ms: 0,
        ..FetchConfig::default()
    }
}

#[tokio::test]
async fn test_not_found_is_attempted_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news/404/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&create_test_config(5)).unwrap();
    let result = fetcher.fetch(&format!("{}/news/404/", server.uri())).await;

    assert!(matches!(result, FetchResult::NotFound));
}

#[tokio::test]
async fn test_timeouts_exhaust_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let config = FetchConfig {
        attempt_timeout_ms: 50,
        ..create_test_config(3)
    };
    let fetcher = Fetcher::new(&config).unwrap();
    let result = fetcher.fetch(&format!("{}/slow/", server.uri())).await;

    match result {
        FetchResult::Exhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(!last_error.is_empty());
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_server_error_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&create_test_config(5)).unwrap();
    let url = format!("{}/flaky/", server.uri());

    match fetcher.fetch(&url).await {
        FetchResult::Success { final_url, body } => {
            assert_eq!(final_url, url);
            assert_eq!(body, "<html>ok</html>");
        }
        other => panic!("expected Success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_persistent_status_error_is_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&create_test_config(2)).unwrap();
    let result = fetcher.fetch(&format!("{}/busy/", server.uri())).await;

    match result {
        FetchResult::Exhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(last_error, "HTTP 503");
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_user_agent_comes_from_identity_pool() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "HarvesterTest/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&server)
        .await;

    let config = FetchConfig {
        identities: vec!["HarvesterTest/1.0".to_string()],
        ..create_test_config(1)
    };
    let fetcher = Fetcher::new(&config).unwrap();

    assert!(matches!(
        fetcher.fetch(&format!("{}/any/", server.uri())).await,
        FetchResult::Success { .. }
    ));
}

#[tokio::test]
async fn test_invalid_utf8_is_decoded_lossily() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'o', b'k', 0xff, b'!']))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&create_test_config(1)).unwrap();

    match fetcher.fetch(&format!("{}/bytes/", server.uri())).await {
        FetchResult::Success { body, .. } => assert_eq!(body, "ok\u{fffd}!"),
        other => panic!("expected Success, got {:?}", other),
    }
}
