//! API integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use motion_api::{create_router, ApiConfig, AppState};
use motion_genai::{FrameRequest, GenAiError, GenAiResult, ImageModel, UpscaleRequest};
use motion_models::InlineImage;
use motion_studio::{Studio, StudioConfig};

/// Model that must never be reached by these tests.
struct UnreachableModel;

#[async_trait]
impl ImageModel for UnreachableModel {
    async fn generate_frame(&self, _request: &FrameRequest) -> GenAiResult<InlineImage> {
        Err(GenAiError::invalid_response("generation not expected"))
    }

    async fn upscale_frame(&self, _request: &UpscaleRequest) -> GenAiResult<InlineImage> {
        Err(GenAiError::invalid_response("upscale not expected"))
    }

    fn supports_upscale(&self) -> bool {
        false
    }
}

fn create_test_router(config: ApiConfig) -> Router {
    let studio = Studio::new(StudioConfig::default(), Arc::new(UnreachableModel));
    create_router(AppState::with_studio(config, studio), None)
}

/// Test health endpoint.
#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router(ApiConfig::default());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-Request-ID"));
}

/// Metrics are only routed when a recorder handle is supplied.
#[tokio::test]
async fn test_metrics_endpoint_absent_without_recorder() {
    let app = create_test_router(ApiConfig::default());

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test rate limiting on model routes.
#[tokio::test]
async fn test_rate_limiting() {
    let app = create_test_router(ApiConfig {
        rate_limit_rps: 1,
        ..ApiConfig::default()
    });

    let upload = || {
        Request::post("/api/seed")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("hello"))
            .unwrap()
    };

    let first = app.clone().oneshot(upload()).await.unwrap();
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    let second = app.clone().oneshot(upload()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.headers()["Retry-After"], "1");

    // Read-only routes are not limited
    let status = app
        .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
}

/// Oversized bodies are refused before reaching the studio.
#[tokio::test]
async fn test_body_limit() {
    let app = create_test_router(ApiConfig {
        max_body_size: 16,
        ..ApiConfig::default()
    });

    let response = app
        .oneshot(
            Request::post("/api/seed")
                .header(header::CONTENT_TYPE, "image/png")
                .body(Body::from(vec![0u8; 64]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

/// Error bodies carry a `detail` field.
#[tokio::test]
async fn test_error_body_shape() {
    let app = create_test_router(ApiConfig::default());

    let response = app
        .oneshot(
            Request::post("/api/generate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"description":"rain","direction":"Left"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["detail"], "No seed image has been provided");
    assert_eq!(body["code"], "no_seed");
}
