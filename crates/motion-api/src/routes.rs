//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    export_archive, export_video, generate, get_frame, get_playback, get_seed, get_sequence,
    get_status, health, next, pause, play, previous, ready, select, set_rate, toggle, upload_seed,
    upscale,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, create_rate_limiter, rate_limit_middleware, request_id, request_logging,
    security_headers,
};
use crate::state::AppState;
use crate::ws::ws_playback;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Routes that reach the image model
    let model_routes = Router::new()
        .route("/seed", post(upload_seed))
        .route("/generate", post(generate))
        .route("/upscale", post(upscale))
        .layer(middleware::from_fn_with_state(
            create_rate_limiter(state.config.rate_limit_rps),
            rate_limit_middleware,
        ));

    let sequence_routes = Router::new()
        .route("/seed", get(get_seed))
        .route("/status", get(get_status))
        .route("/sequence", get(get_sequence))
        .route("/frames/:index", get(get_frame))
        .route("/export/video", get(export_video))
        .route("/export/archive", get(export_archive));

    let playback_routes = Router::new()
        .route("/playback", get(get_playback))
        .route("/playback/play", post(play))
        .route("/playback/pause", post(pause))
        .route("/playback/toggle", post(toggle))
        .route("/playback/next", post(next))
        .route("/playback/previous", post(previous))
        .route("/playback/select/:index", post(select))
        .route("/playback/rate", put(set_rate));

    let api_routes = Router::new()
        .merge(model_routes)
        .merge(sequence_routes)
        .merge(playback_routes);

    let ws_routes = Router::new().route("/ws/playback", get(ws_playback));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Seed uploads exceed axum's default limit; this layer is the only cap
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
