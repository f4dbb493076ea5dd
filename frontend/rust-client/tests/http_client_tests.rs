use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use quizlit_client::{
    metrics,
    models::Quiz,
    services::http_client::ApiClient,
    ClientError,
};

mod common;

#[tokio::test]
async fn test_plain_text_error_body_is_the_message() {
    let (base, _backend) = common::spawn_backend().await;
    let api = ApiClient::anonymous(Url::parse(&base).unwrap());

    let err = api.get::<Value>("/broken", &[]).await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.to_string(), "no such thing");
}

#[tokio::test]
async fn test_empty_error_body_falls_back_to_status() {
    let (base, _backend) = common::spawn_backend().await;
    let api = ApiClient::anonymous(Url::parse(&base).unwrap());

    let err = api.get::<Value>("nothing/here", &[]).await.unwrap_err();

    assert_eq!(err.to_string(), "HTTP error! status: 404");
}

#[tokio::test]
async fn test_unexpected_shape_is_a_decode_error() {
    let (base, _backend) = common::spawn_backend().await;
    let api = ApiClient::anonymous(Url::parse(&base).unwrap());

    // Health JSON is not a quiz
    let err = api.get::<Quiz>("api/health", &[]).await.unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    common::init_tracing();
    let api = ApiClient::anonymous(Url::parse("http://127.0.0.1:9").unwrap());

    let err = api.get::<Value>("api/health", &[]).await.unwrap_err();

    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_requests_are_counted_by_route() {
    let (base, _backend) = common::spawn_backend().await;
    let api = ApiClient::anonymous(Url::parse(&base).unwrap());

    let _ = api.get::<Value>("api/health", &[]).await.unwrap();

    let rendered = metrics::render_metrics().unwrap();
    assert!(rendered.contains("quizlit_http_requests_total"));
    assert!(rendered.contains("api/health"));
}
