use axum::{extract::State, Json};

use crate::config::AppState;
use crate::dto::{NotificationJobData, QueuedJobResponse};
use crate::interceptors::{ApiSuccess, AppError};

/// Queue a push notification
pub async fn create_notification(
    State(state): State<AppState>,
    Json(request): Json<NotificationJobData>,
) -> Result<ApiSuccess<QueuedJobResponse>, AppError> {
    let job = state.notifications.send_notification(request).await?;

    Ok(ApiSuccess::new("Notification job created", QueuedJobResponse::from(&job)))
}
