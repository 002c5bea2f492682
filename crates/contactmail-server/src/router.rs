//! Router configuration.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::cors::create_cors_layer;
use crate::handlers::{health_check, send_email, AppState};

/// Create the application router.
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let api_routes = Router::new().route("/send-email", post(send_email));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(state)
}
