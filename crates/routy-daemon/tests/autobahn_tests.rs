//! Live traffic feed tests against a mock Autobahn server
//!
//! The client is blocking, so every call runs on the blocking pool of a
//! multi-threaded runtime while wiremock serves on the async side.

#![allow(clippy::float_cmp)]

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use routy_core::{CongestionSource, NEUTRAL_DELAY};
use routy_daemon::autobahn::AutobahnClient;
use routy_daemon::config::TrafficConfig;

fn feed_config(server: &MockServer) -> TrafficConfig {
    TrafficConfig {
        enabled: true,
        url: format!("{}/o/autobahn/A1/services/roadworks", server.uri()),
        timeout_seconds: 2,
    }
}

async fn delay_from(config: TrafficConfig) -> f64 {
    tokio::task::spawn_blocking(move || {
        let client = AutobahnClient::new(&config).unwrap();
        client.current_delay()
    })
    .await
    .unwrap()
}

fn entries(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({"identifier": format!("entry-{i}")}))
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delay_scales_with_event_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/o/autobahn/A1/services/roadworks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "roadworks": entries(10),
            "warning": entries(4),
            "closure": entries(1)
        })))
        .mount(&server)
        .await;

    let delay = delay_from(feed_config(&server)).await;

    // 15 of 50
    assert!((delay - 0.3).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delay_saturates_at_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "roadworks": entries(80)
        })))
        .mount(&server)
        .await;

    assert_eq!(delay_from(feed_config(&server)).await, 1.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_feed_is_free_flow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"roadworks": []})))
        .mount(&server)
        .await;

    assert_eq!(delay_from(feed_config(&server)).await, 0.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_error_falls_back_to_neutral() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert_eq!(delay_from(feed_config(&server)).await, NEUTRAL_DELAY);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_body_falls_back_to_neutral() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    assert_eq!(delay_from(feed_config(&server)).await, NEUTRAL_DELAY);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_feed_times_out_to_neutral() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"roadworks": entries(5)}))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = feed_config(&server);
    config.timeout_seconds = 1;

    assert_eq!(delay_from(config).await, NEUTRAL_DELAY);
}
