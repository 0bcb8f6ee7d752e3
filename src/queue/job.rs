use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use chrono::{DateTime, Utc};

use crate::interceptors::AppError;

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Created,
    Active,
    Complete,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed)
    }

    /// Lifecycle only moves forward: created -> active -> complete | failed
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Created, JobState::Active)
                | (JobState::Created, JobState::Failed)
                | (JobState::Active, JobState::Complete)
                | (JobState::Active, JobState::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::Active => "active",
            JobState::Complete => "complete",
            JobState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: String,
    pub data: serde_json::Value,
    pub state: JobState,
    pub progress: u8,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, job_type: impl Into<String>, data: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            job_type: job_type.into(),
            data,
            state: JobState::Created,
            progress: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Decode the payload into the producer's type
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| AppError::QueueError(format!("Invalid payload for job {}: {}", self.id, e)))
    }

    pub fn mark_active(&mut self) -> Result<(), AppError> {
        self.transition(JobState::Active)
    }

    pub fn mark_complete(&mut self) -> Result<(), AppError> {
        self.transition(JobState::Complete)
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), AppError> {
        self.transition(JobState::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Record progress as a percentage of `total`, capped at 100
    pub fn set_progress(&mut self, num: u64, total: u64) -> Result<u8, AppError> {
        if total == 0 {
            return Err(AppError::BadRequest(format!(
                "Progress total for job {} must be positive",
                self.id
            )));
        }
        let percent = num.saturating_mul(100) / total;
        self.progress = percent.min(100) as u8;
        self.updated_at = Utc::now();
        Ok(self.progress)
    }

    fn transition(&mut self, next: JobState) -> Result<(), AppError> {
        if !self.state.can_transition_to(next) {
            return Err(AppError::InvalidTransition(format!(
                "job {} cannot move from {} to {}",
                self.id,
                self.state.as_str(),
                next.as_str()
            )));
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// What a worker reports back to the engine once it is done with a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Complete,
    Failed(String),
}

impl JobOutcome {
    pub fn failed(reason: impl ToString) -> Self {
        JobOutcome::Failed(reason.to_string())
    }
}

impl<E: std::fmt::Display> From<Result<(), E>> for JobOutcome {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => JobOutcome::Complete,
            Err(e) => JobOutcome::failed(e),
        }
    }
}

/// Lifecycle notifications published by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    Enqueued { job_id: JobId, job_type: String },
    Started { job_id: JobId, job_type: String },
    Progress { job_id: JobId, job_type: String, progress: u8 },
    Completed { job_id: JobId, job_type: String },
    Failed { job_id: JobId, job_type: String, error: String },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Enqueued { job_id, .. }
            | JobEvent::Started { job_id, .. }
            | JobEvent::Progress { job_id, .. }
            | JobEvent::Completed { job_id, .. }
            | JobEvent::Failed { job_id, .. } => *job_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Completed { .. } | JobEvent::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job() -> Job {
        Job::new(1, "reserve_seat", json!({}))
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        let mut job = job();
        assert!(job.mark_complete().is_err());

        job.mark_active().unwrap();
        job.mark_complete().unwrap();
        assert_eq!(job.state, JobState::Complete);

        assert!(job.mark_active().is_err());
        assert!(job.mark_failed("late").is_err());
        assert_eq!(job.error, None);
    }

    #[test]
    fn failure_keeps_the_error() {
        let mut job = job();
        job.mark_active().unwrap();
        job.mark_failed("Not enough seats available").unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.as_deref(), Some("Not enough seats available"));
    }

    #[test]
    fn unstarted_job_can_fail_but_not_complete() {
        let mut job = job();
        assert!(job.mark_complete().is_err());
        job.mark_failed("Failed to enqueue job").unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert!(job.mark_active().is_err());
    }

    #[test]
    fn progress_is_a_capped_percentage() {
        let mut job = job();
        assert_eq!(job.set_progress(50, 100).unwrap(), 50);
        assert_eq!(job.set_progress(1, 3).unwrap(), 33);
        assert_eq!(job.set_progress(250, 100).unwrap(), 100);
        assert!(job.set_progress(1, 0).is_err());
    }

    #[test]
    fn serialized_job_uses_type_key() {
        let value = serde_json::to_value(job()).unwrap();
        assert_eq!(value["type"], "reserve_seat");
        assert_eq!(value["state"], "created");
    }

    #[test]
    fn outcome_from_result() {
        assert_eq!(JobOutcome::from(Ok::<(), AppError>(())), JobOutcome::Complete);
        assert_eq!(
            JobOutcome::from(Err::<(), _>(AppError::NoSeatsAvailable)),
            JobOutcome::Failed("Not enough seats available".to_string())
        );
    }
}
