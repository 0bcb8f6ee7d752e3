mod queue_service;
mod job;
mod repository;

pub use queue_service::{QueueEngine, JobContext};
pub use job::{Job, JobEvent, JobId, JobOutcome, JobState};
pub use repository::{JobRepository, MemoryJobRepository, RedisJobRepository};

#[cfg(test)]
pub use repository::MockJobRepository;
