//! API routes.

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    billing_webhook, get_asset_status, get_job_status, health, start_processing,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        // Processing trigger (called by the upload collaborator)
        .route("/process", post(start_processing))
        // Polling endpoints
        .route("/jobs/:job_id", get(get_job_status))
        .route("/assets/:asset_id", get(get_asset_status))
        // Billing boundary
        .route("/billing/webhook", post(billing_webhook));

    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes);

    if let Some(handle) = metrics_handle {
        router = router.route("/metrics", get(move || async move { handle.render() }));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
