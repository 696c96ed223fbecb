#![allow(clippy::unwrap_used)]
// Integration tests for `GatewayClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use envsim_api::{Error, FanStatus, GatewayClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, GatewayClient) {
    let server = MockServer::start().await;
    let client = GatewayClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

// ── Sensors ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_read_sensor() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sensor/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("19.25"))
        .mount(&server)
        .await;

    let temp = client.read_sensor(2).await.unwrap();
    assert!((temp - 19.25).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_read_sensor_garbage_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sensor/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("n/a"))
        .mount(&server)
        .await;

    let result = client.read_sensor(1).await;
    assert!(
        matches!(result, Err(Error::Deserialization { ref body, .. }) if body == "n/a"),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_api_key_header_is_sent() {
    let server = MockServer::start().await;
    let key = SecretString::from("API_KEY_CLIENT_3".to_string());
    let client =
        GatewayClient::from_api_key(&server.uri(), &key, &TransportConfig::default()).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/sensor/1"))
        .and(header("X-Api-Key", "API_KEY_CLIENT_3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("18.0"))
        .expect(1)
        .mount(&server)
        .await;

    let temp = client.read_sensor(1).await.unwrap();
    assert!((temp - 18.0).abs() < f64::EPSILON);
}

// ── Fans ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fan_state_accepts_either_casing() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/fans/1/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "isOn": true })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/fans/2/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Id": 2, "IsOn": false })))
        .mount(&server)
        .await;

    assert_eq!(
        client.fan_state(1).await.unwrap(),
        FanStatus { id: 1, is_on: true }
    );
    assert_eq!(
        client.fan_state(2).await.unwrap(),
        FanStatus { id: 2, is_on: false }
    );
}

#[tokio::test]
async fn test_fan_state_garbage_multibyte_body() {
    let (server, client) = setup().await;
    let body = "€".repeat(100);

    Mock::given(method("GET"))
        .and(path("/api/fans/1/state"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&server)
        .await;

    let result = client.fan_state(1).await;
    match result {
        Err(Error::Deserialization {
            message,
            body: returned,
        }) => {
            assert_eq!(returned, body);
            assert!(message.contains('€'), "preview missing: {message}");
        }
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_set_fan_state_posts_bool_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/fans/3"))
        .and(header("content-type", "application/json"))
        .and(body_string("true"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.set_fan_state(3, true).await.unwrap();
}

// ── Heaters ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_heater_level_passes_raw_value_through() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/heat/1/level"))
        .respond_with(ResponseTemplate::new(200).set_body_string("9"))
        .mount(&server)
        .await;

    assert_eq!(client.heater_level(1).await.unwrap(), 9);
}

#[tokio::test]
async fn test_set_heater_level_posts_integer_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/heat/2"))
        .and(body_string("3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.set_heater_level(2, 3).await.unwrap();
}

// ── Simulation ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_reset() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Envo/reset"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.reset().await.unwrap();
}

// ── Error handling ──────────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_maps_to_gateway_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/heat/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("simulation crashed"))
        .mount(&server)
        .await;

    let result = client.set_heater_level(1, 2).await;
    match result {
        Err(Error::Gateway { status, ref message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "simulation crashed");
        }
        ref other => panic!("expected Gateway error, got: {other:?}"),
    }
    assert!(result.unwrap_err().is_transient());
}

#[tokio::test]
async fn test_not_found_uses_reason_phrase() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sensor/9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.read_sensor(9).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Not Found"), "got: {err}");
}

#[tokio::test]
async fn test_unauthorized_maps_to_invalid_api_key() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/fans/1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.set_fan_state(1, false).await;
    assert!(
        matches!(result, Err(Error::InvalidApiKey)),
        "expected InvalidApiKey, got: {result:?}"
    );
}
