//! Health check endpoint.
//!
//! Every request runs a full datastore probe: connect, create a scratch
//! table, write, read back, delete and drop. The JSON report is returned with
//! 200 when every step passed and 500 otherwise.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::Instrument;

use crate::probe::HealthReport;
use crate::state::AppState;

/// Health check handler.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    // Detached so a dropped request cannot stop the probe before it drops its table
    let probe = state.probe.clone();
    let task = tokio::spawn(async move { probe.run().await }.in_current_span());

    let report = match task.await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(error = %err, "Probe task failed");
            HealthReport {
                error_message: Some(format!("probe task failed: {err}")),
                ..Default::default()
            }
        }
    };
    report.log();

    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    tracing::info!(status = status.as_u16(), "health");

    (status, Json(report))
}
