//! Tests for the HTTP backend client against a local mock backend.

use std::net::SocketAddr;

use axum::{Json, Router, http::StatusCode, routing::post};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use citytwin::client::{BackendClient, BackendError, HttpBackend};
use citytwin::model::{ChatRequest, Sentiment};

/// Start a mock backend on an ephemeral port and return its base URL.
async fn spawn_backend(app: Router) -> String {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

async fn analyze(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "city_center": [19.07, 72.87],
        "gov_data": {"aqi": {"value": 120, "pollutant": "PM2.5", "station": body["city"]}},
        "citizen_stats": {"total_reports": 1, "category_breakdown": {"flood": 1}},
        "map_markers": [
            {"lat": 19.0, "lng": 72.8, "category": "flood", "sentiment": "positive", "location_name": "Dadar"}
        ],
        "recent_issues": []
    }))
}

async fn chat(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "reply": format!(
            "{} asked '{}' with AQI {}",
            body["city"].as_str().unwrap_or_default(),
            body["message"].as_str().unwrap_or_default(),
            body["gov_data"]["aqi"]["value"]
        )
    }))
}

fn chat_request(gov_data: Value) -> ChatRequest {
    ChatRequest {
        city: "Mumbai".to_string(),
        message: "Is it flooding?".to_string(),
        gov_data,
        citizen_stats: json!({}),
    }
}

#[tokio::test]
async fn test_analyze_city() {
    let app = Router::new().route("/analyze-city", post(analyze));
    let client = HttpBackend::with_base_url(&spawn_backend(app).await);

    let payload = tokio_test::assert_ok!(client.analyze_city("Mumbai").await);

    let aqi = payload.gov_data.unwrap().aqi.unwrap();
    assert_eq!(aqi.station.as_deref(), Some("Mumbai"));
    assert_eq!(payload.map_markers.len(), 1);
    assert_eq!(payload.map_markers[0].sentiment, Sentiment::Positive);
    assert_eq!(payload.citizen_stats.unwrap().total_reports, 1);
}

#[tokio::test]
async fn test_chat() {
    let app = Router::new().route("/chat", post(chat));
    let client = HttpBackend::with_base_url(&spawn_backend(app).await);

    let reply = tokio_test::assert_ok!(
        client
            .chat(&chat_request(json!({"aqi": {"value": 120}})))
            .await
    );

    assert_eq!(reply.reply, "Mumbai asked 'Is it flooding?' with AQI 120");
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let app = Router::new().route(
        "/analyze-city",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let client = HttpBackend::with_base_url(&spawn_backend(app).await);

    let err = client.analyze_city("Mumbai").await.unwrap_err();

    assert!(matches!(
        err,
        BackendError::Status(status) if status == StatusCode::INTERNAL_SERVER_ERROR
    ));
}

#[tokio::test]
async fn test_malformed_body_is_an_error() {
    let app = Router::new().route("/chat", post(|| async { Json(json!({"answer": "42"})) }));
    let client = HttpBackend::with_base_url(&spawn_backend(app).await);

    let err = client.chat(&chat_request(json!({}))).await.unwrap_err();

    assert!(matches!(err, BackendError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_backend_is_an_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = HttpBackend::with_base_url(&format!("http://{addr}"));

    let err = client.analyze_city("Mumbai").await.unwrap_err();

    assert!(matches!(err, BackendError::Transport(_)));
}
