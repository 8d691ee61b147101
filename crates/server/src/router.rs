//! HTTP router construction.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route(
            "/api/subscriptions",
            get(api::subscriptions_list).post(api::subscriptions_create),
        )
        .route(
            "/api/subscriptions/{id}",
            get(api::subscriptions_get)
                .put(api::subscriptions_update)
                .delete(api::subscriptions_delete),
        )
        .route("/api/subscriptions/{id}/upcoming", get(api::subscriptions_upcoming))
        .route(
            "/api/notification-settings",
            get(api::notification_settings_get).post(api::notification_settings_set),
        )
        .route(
            "/api/user-configuration",
            get(api::user_configuration_get).post(api::user_configuration_set),
        )
        .route("/api/dispatch/run", post(api::dispatch_run))
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!(origin, "Invalid CORS_ORIGIN, allowing any origin");
            layer.allow_origin(Any)
        }
    }
}
