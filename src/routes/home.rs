//! Root handler.

use axum::{extract::State, response::Redirect};

use crate::state::AppState;

/// Redirect `/` to the health endpoint with 303 See Other.
pub async fn index(State(state): State<AppState>) -> Redirect {
    tracing::info!("request to root");
    Redirect::to(&state.config.http.health_path)
}
