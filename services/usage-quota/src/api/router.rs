use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let prefix = state.config.service_prefix.clone();

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.request_timeout()));

    let routes = Router::new()
        .route("/usage", get(handlers::get_usage))
        .route("/health", get(handlers::health_check));

    let routes = if prefix == "/" {
        routes
    } else {
        Router::new().nest(prefix.trim_end_matches('/'), routes)
    };

    routes.with_state(state).layer(middleware)
}
