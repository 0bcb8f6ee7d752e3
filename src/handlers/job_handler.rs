use axum::extract::{Path, State};

use crate::config::AppState;
use crate::interceptors::{ApiSuccess, AppError};
use crate::queue::{Job, JobId};

/// Look up a job record, including its state and progress
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> Result<ApiSuccess<Job>, AppError> {
    let job = state
        .queue
        .get(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

    Ok(ApiSuccess::new("Job retrieved successfully", job))
}
