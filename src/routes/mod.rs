//! HTTP route handlers.
//!
//! Only two routes exist: the health probe and a root redirect to it. The
//! health route is never cached by intermediaries since each response reflects
//! a probe run at request time.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod health;
pub mod home;

use axum::{middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::CACHE_CONTROL_HEALTH;
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Creates the Axum router with the health and root routes.
pub fn create_router(state: AppState) -> Router {
    // Health check - no caching, every response is a fresh probe
    let health_routes = Router::new()
        .route(&state.config.http.health_path, get(health::health))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_HEALTH),
        ));

    let home_routes = Router::new().route("/", get(home::index));

    Router::new()
        .merge(health_routes)
        .merge(home_routes)
        .with_state(state)
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
