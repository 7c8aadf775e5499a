//! Daily REST contract exercised against a mock HTTP server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agent_duet::config::RoomConfig;
use agent_duet::provider::daily::DailyProvider;
use agent_duet::provider::provision;
use agent_duet::AppError;

fn room_config(server: &MockServer) -> RoomConfig {
    RoomConfig {
        api_base: server.uri(),
        api_key: "test-key".into(),
        request_timeout_seconds: 5,
        ..RoomConfig::default()
    }
}

async fn mount_room(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rooms"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "0f6c",
            "name": "duet-room",
            "url": "https://example.daily.co/duet-room",
            "privacy": "public"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn provisions_room_and_three_tokens() {
    let server = MockServer::start().await;
    mount_room(&server).await;
    Mock::given(method("POST"))
        .and(path("/meeting-tokens"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"properties": {"room_name": "duet-room"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "eyJ.tok"})))
        .expect(3)
        .mount(&server)
        .await;

    let provider = DailyProvider::new(&room_config(&server)).expect("provider builds");
    let credentials = provision(&provider, "sales", 180, 420)
        .await
        .expect("provisioning succeeds");

    assert_eq!(credentials.room.url, "https://example.daily.co/duet-room");
    assert_eq!(credentials.room.name, "duet-room");
    assert_eq!(credentials.viewer.expose(), "eyJ.tok");
}

#[tokio::test]
async fn room_request_carries_expiry() {
    let server = MockServer::start().await;
    mount_room(&server).await;
    Mock::given(method("POST"))
        .and(path("/meeting-tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
        .mount(&server)
        .await;

    let provider = DailyProvider::new(&room_config(&server)).expect("provider builds");
    let before = chrono::Utc::now().timestamp();
    let credentials = provision(&provider, "sales", 180, 420)
        .await
        .expect("provisioning succeeds");

    let requests = server.received_requests().await.expect("recording enabled");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let exp = body["properties"]["exp"].as_i64().expect("exp present");
    assert_eq!(exp, credentials.room.expires_at);
    assert!(exp >= before + 600);

    let token_body: serde_json::Value =
        serde_json::from_slice(&requests[1].body).expect("json body");
    assert_eq!(token_body["properties"]["exp"].as_i64(), Some(exp));
}

#[tokio::test]
async fn non_success_room_response_is_provisioning_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rooms"))
        .respond_with(ResponseTemplate::new(401).set_body_string("authentication-error"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/meeting-tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
        .expect(0)
        .mount(&server)
        .await;

    let provider = DailyProvider::new(&room_config(&server)).expect("provider builds");
    let err = provision(&provider, "sales", 180, 420)
        .await
        .expect_err("room rejected");

    assert!(matches!(err, AppError::Provisioning(_)));
    assert!(err.to_string().contains("401"));
    assert!(err.to_string().contains("authentication-error"));
}

#[tokio::test]
async fn failing_token_endpoint_fails_provisioning() {
    let server = MockServer::start().await;
    mount_room(&server).await;
    Mock::given(method("POST"))
        .and(path("/meeting-tokens"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let provider = DailyProvider::new(&room_config(&server)).expect("provider builds");
    let err = provision(&provider, "sales", 180, 420)
        .await
        .expect_err("token rejected");

    assert!(matches!(err, AppError::Provisioning(_)));
    assert!(err.to_string().contains("first agent"));
}

#[tokio::test]
async fn malformed_room_response_is_provisioning_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let provider = DailyProvider::new(&room_config(&server)).expect("provider builds");
    let err = provision(&provider, "sales", 180, 420)
        .await
        .expect_err("malformed response");
    assert!(err.to_string().contains("malformed response"));
}

#[tokio::test]
async fn unreachable_provider_is_provisioning_error() {
    let config = RoomConfig {
        api_base: "http://127.0.0.1:9".into(),
        api_key: "test-key".into(),
        request_timeout_seconds: 2,
        ..RoomConfig::default()
    };
    let provider = DailyProvider::new(&config).expect("provider builds");

    let err = provision(&provider, "sales", 180, 420)
        .await
        .expect_err("unreachable");
    assert!(matches!(err, AppError::Provisioning(_)));
    assert!(err.to_string().contains("unreachable"));
}
