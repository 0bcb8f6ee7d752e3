use axum::extract::State;
use serde_json::{json, Value};

use crate::config::AppState;
use crate::interceptors::{ApiSuccess, AppError};
use crate::services::{PUSH_NOTIFICATION_JOB, RESERVE_SEAT_JOB};

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<ApiSuccess<Value>, AppError> {
    let data = json!({
        "status": "ok",
        "version": state.config.app_version,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "reservations_enabled": state.reservations.is_enabled(),
        "workers": {
            RESERVE_SEAT_JOB: state.queue.is_registered(RESERVE_SEAT_JOB).await,
            PUSH_NOTIFICATION_JOB: state.queue.is_registered(PUSH_NOTIFICATION_JOB).await,
        },
    });

    Ok(ApiSuccess::new("Service is healthy", data))
}
