use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{body_partial_json, header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{evaluation_router, EvaluationRelay, Outcome, RelayError, SIMULATED_TOKEN_PREFIX};
use crate::config::{
    AppConfig, AppEnvironment, EvaluationMode, ServerConfig, TelemetryConfig, UpstreamConfig,
};

fn config(mode: EvaluationMode, base_url: &str, timeout: Duration) -> Arc<AppConfig> {
    Arc::new(AppConfig {
        environment: AppEnvironment::Test,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        telemetry: TelemetryConfig {
            log_level: "debug".to_string(),
        },
        mode,
        upstream: UpstreamConfig {
            base_url: Url::parse(base_url).expect("valid base url"),
            token: "tok".to_string(),
            secret: "sec".to_string(),
            timeout,
        },
    })
}

fn simulated_router() -> axum::Router {
    let relay = EvaluationRelay::new(config(
        EvaluationMode::Simulated,
        "http://127.0.0.1:1",
        Duration::from_secs(1),
    ))
    .expect("relay builds");
    evaluation_router(Arc::new(relay))
}

fn live_router(server: &MockServer, timeout: Duration) -> axum::Router {
    let relay = EvaluationRelay::new(config(EvaluationMode::Live, &server.uri(), timeout))
        .expect("relay builds");
    evaluation_router(Arc::new(relay))
}

fn payload() -> Value {
    json!({
        "name_first": "Grace",
        "name_last": "Hopper",
        "address_line_1": "1 Navy Way",
        "address_city": "Arlington",
        "address_state": "va",
        "address_postal_code": "22202-4321",
        "address_country_code": "US",
        "document_ssn": "123456789",
        "email_address": "grace@example.com",
        "birth_date": "1906-12-09"
    })
}

fn with_last_name(name: &str) -> Value {
    let mut payload = payload();
    payload["name_last"] = json!(name);
    payload
}

async fn post_json(router: axum::Router, body: String) -> Response {
    router
        .oneshot(
            Request::post("/api/evaluations")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .expect("request builds"),
        )
        .await
        .expect("route executes")
}

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn simulated_mode_maps_last_name_to_outcome() {
    let cases = [
        ("Review", "Manual Review"),
        ("rEvIeW", "Manual Review"),
        ("Deny", "Denied"),
        ("DENIED", "Denied"),
        ("Hopper", "Approved"),
    ];

    for (name, expected) in cases {
        let response = post_json(simulated_router(), with_last_name(name).to_string()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["status"], json!("ok"));
        assert_eq!(body["outcome"], json!(expected), "last name {name}");
        assert_eq!(body["summary"], json!({ "outcome": expected }));
        let token = body["evaluation_token"].as_str().expect("token present");
        assert!(token.starts_with(SIMULATED_TOKEN_PREFIX));
    }
}

#[tokio::test]
async fn validation_failure_never_reaches_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut body = payload();
    body["document_ssn"] = json!("123-45-6789");
    let response = post_json(live_router(&server, Duration::from_secs(2)), body.to_string()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({
            "error": "validation_error",
            "details": ["document_ssn: SSN must be 9 digits"],
        })
    );
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let response = post_json(simulated_router(), "{\"name_first\": ".to_string()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("validation_error"));
    let details = body["details"].as_array().expect("details list");
    assert_eq!(details.len(), 1);
    assert!(details[0].as_str().unwrap_or_default().starts_with("payload: "));
}

#[tokio::test]
async fn live_mode_forwards_normalized_application_with_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/evaluations"))
        .and(header_is("authorization", "Basic dG9rOnNlYw=="))
        .and(body_partial_json(json!({
            "address_state": "VA",
            "address_line_2": "",
            "document_ssn": "123456789"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "evaluation_token": "L-7f3a",
            "summary": { "outcome": "Denied", "score": 0.12 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response =
        post_json(live_router(&server, Duration::from_secs(2)), payload().to_string()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({
            "status": "ok",
            "outcome": "Denied",
            "evaluation_token": "L-7f3a",
            "summary": { "outcome": "Denied", "score": 0.12 }
        })
    );
}

#[tokio::test]
async fn live_mode_defaults_missing_outcome_to_approved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/evaluations"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "evaluation_token": "L-1" })),
        )
        .mount(&server)
        .await;

    let response =
        post_json(live_router(&server, Duration::from_secs(2)), payload().to_string()).await;

    let body = read_json_body(response).await;
    assert_eq!(body["outcome"], json!("Approved"));
    assert_eq!(body["summary"], json!({}));
}

#[tokio::test]
async fn upstream_rejection_is_surfaced_with_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/evaluations"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "error": "duplicate SSN" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response =
        post_json(live_router(&server, Duration::from_secs(2)), payload().to_string()).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({
            "error": "upstream_error",
            "status": 422,
            "message": "duplicate SSN",
            "details": { "error": "duplicate SSN" }
        })
    );
}

#[tokio::test]
async fn upstream_text_error_keeps_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let response =
        post_json(live_router(&server, Duration::from_secs(2)), payload().to_string()).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("upstream_error"));
    assert_eq!(body["message"], json!("Upstream evaluation service error"));
    assert_eq!(body["details"], json!("maintenance"));
}

#[tokio::test]
async fn upstream_timeout_is_gateway_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "evaluation_token": "late" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let response =
        post_json(live_router(&server, Duration::from_millis(200)), payload().to_string()).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("timeout_or_network"));
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn unreachable_upstream_is_gateway_timeout() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let uri = format!("http://{}", closed.local_addr().expect("local addr"));
    drop(closed);

    let relay = EvaluationRelay::new(config(EvaluationMode::Live, &uri, Duration::from_secs(2)))
        .expect("relay builds");
    let err = relay
        .evaluate(&payload())
        .await
        .expect_err("nothing is listening");

    assert_eq!(err.kind(), "timeout_or_network");
    assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn server_error_carries_its_message() {
    let response = RelayError::Server("request could not be built".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({ "error": "server_error", "message": "request could not be built" })
    );
}

#[test]
fn non_error_upstream_status_falls_back_to_bad_gateway() {
    let err = RelayError::Upstream {
        status: 304,
        message: "not modified".to_string(),
        details: Value::Null,
    };
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(err.body()["status"], json!(304));
}

#[test]
fn outcome_round_trips_through_strings() {
    let outcome: Outcome = serde_json::from_value(json!("Manual Review")).expect("parses");
    assert_eq!(outcome, Outcome::ManualReview);
    assert_eq!(
        serde_json::to_value(Outcome::Other("Escalated".to_string())).expect("serializes"),
        json!("Escalated")
    );
}
