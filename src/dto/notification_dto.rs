use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::queue::{Job, JobId, JobState};

/// Payload of a `push_notification` job, also accepted as the request body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotificationJobData {
    #[validate(length(min = 1, max = 32, message = "Phone number must be between 1 and 32 characters"))]
    pub phone_number: String,

    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

/// Summary of a job returned right after it was queued
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJobResponse {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: String,
    pub state: JobState,
}

impl From<&Job> for QueuedJobResponse {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            job_type: job.job_type.clone(),
            state: job.state,
        }
    }
}
