use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use deadpool_redis::redis::AsyncCommands;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::config::QueueConfig;
use crate::interceptors::AppError;
use super::job::{Job, JobId};

/// Storage behind the queue engine: id allocation, job records and one
/// FIFO pending list per job type.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn next_id(&self) -> Result<JobId, AppError>;

    async fn save(&self, job: &Job) -> Result<(), AppError>;

    async fn get(&self, id: JobId) -> Result<Option<Job>, AppError>;

    async fn push_pending(&self, job_type: &str, id: JobId) -> Result<(), AppError>;

    async fn pop_pending(&self, job_type: &str) -> Result<Option<JobId>, AppError>;
}

/// Redis-backed repository; job records expire after `job_ttl_secs`
#[derive(Clone)]
pub struct RedisJobRepository {
    pool: Pool,
    prefix: String,
    job_ttl_secs: u64,
}

impl RedisJobRepository {
    pub fn new(pool: Pool, config: &QueueConfig) -> Self {
        Self {
            pool,
            prefix: config.prefix.clone(),
            job_ttl_secs: config.job_ttl_secs,
        }
    }

    async fn get_connection(&self) -> Result<Connection, AppError> {
        self.pool.get().await.map_err(|e| AppError::RedisError(e.to_string()))
    }

    fn job_key(&self, id: JobId) -> String {
        format!("{}:job:{}", self.prefix, id)
    }

    fn pending_key(&self, job_type: &str) -> String {
        format!("{}:{}:pending", self.prefix, job_type)
    }
}

#[async_trait]
impl JobRepository for RedisJobRepository {
    async fn next_id(&self) -> Result<JobId, AppError> {
        let mut conn = self.get_connection().await?;
        let id: u64 = conn.incr(format!("{}:ids", self.prefix), 1)
            .await
            .map_err(|e| AppError::QueueError(format!("Failed to allocate job id: {}", e)))?;
        Ok(id)
    }

    async fn save(&self, job: &Job) -> Result<(), AppError> {
        let job_json = serde_json::to_string(job)?;

        let mut conn = self.get_connection().await?;
        conn.set_ex::<_, _, ()>(self.job_key(job.id), &job_json, self.job_ttl_secs)
            .await
            .map_err(|e| AppError::RedisError(e.to_string()))
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, AppError> {
        let mut conn = self.get_connection().await?;
        let job_data: Option<String> = conn.get(self.job_key(id))
            .await
            .map_err(|e| AppError::RedisError(e.to_string()))?;

        match job_data {
            Some(job_json) => Ok(Some(serde_json::from_str(&job_json)?)),
            None => Ok(None),
        }
    }

    async fn push_pending(&self, job_type: &str, id: JobId) -> Result<(), AppError> {
        let mut conn = self.get_connection().await?;
        conn.rpush::<_, _, ()>(self.pending_key(job_type), id)
            .await
            .map_err(|e| AppError::QueueError(format!("Failed to enqueue job {}: {}", id, e)))
    }

    async fn pop_pending(&self, job_type: &str) -> Result<Option<JobId>, AppError> {
        let mut conn = self.get_connection().await?;
        conn.lpop(self.pending_key(job_type), None)
            .await
            .map_err(|e| AppError::RedisError(e.to_string()))
    }
}

/// In-process repository for tests and single-node runs without Redis
#[derive(Default)]
pub struct MemoryJobRepository {
    next_id: AtomicU64,
    jobs: RwLock<HashMap<JobId, Job>>,
    pending: RwLock<HashMap<String, VecDeque<JobId>>>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn next_id(&self) -> Result<JobId, AppError> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn save(&self, job: &Job) -> Result<(), AppError> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, AppError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn push_pending(&self, job_type: &str, id: JobId) -> Result<(), AppError> {
        self.pending
            .write()
            .await
            .entry(job_type.to_string())
            .or_default()
            .push_back(id);
        Ok(())
    }

    async fn pop_pending(&self, job_type: &str) -> Result<Option<JobId>, AppError> {
        Ok(self
            .pending
            .write()
            .await
            .get_mut(job_type)
            .and_then(|queue| queue.pop_front()))
    }
}
