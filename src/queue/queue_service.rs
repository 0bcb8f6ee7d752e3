use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{Notify, OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::time::{sleep, Duration};

use crate::config::QueueConfig;
use crate::interceptors::AppError;
use super::job::{Job, JobEvent, JobId, JobOutcome};
use super::repository::JobRepository;

type JobHandler = Arc<dyn Fn(Job, JobContext) -> Pin<Box<dyn Future<Output = JobOutcome> + Send>> + Send + Sync>;

const EVENT_CAPACITY: usize = 1024;

/// Queue engine: named job types, one handler per type, bounded concurrency
#[derive(Clone)]
pub struct QueueEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    repository: Arc<dyn JobRepository>,
    events: broadcast::Sender<JobEvent>,
    workers: RwLock<HashMap<String, Arc<Notify>>>,
    poll_interval: Duration,
}

/// Handle given to a running handler for reporting progress
#[derive(Clone)]
pub struct JobContext {
    job_id: JobId,
    job_type: String,
    inner: Arc<EngineInner>,
}

impl QueueEngine {
    /// Create a new engine on top of a job repository
    pub fn new(repository: Arc<dyn JobRepository>, config: &QueueConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(EngineInner {
                repository,
                events,
                workers: RwLock::new(HashMap::new()),
                poll_interval: config.poll_interval(),
            }),
        }
    }

    /// Persist a new job and put it on its type's pending list
    pub async fn create<T: Serialize>(&self, job_type: &str, data: &T) -> Result<Job, AppError> {
        let data = serde_json::to_value(data)?;
        let repository = &self.inner.repository;

        let job = Job::new(repository.next_id().await?, job_type, data);
        repository.save(&job).await?;

        // Announced before the id is visible to a polling dispatcher
        self.inner.emit(JobEvent::Enqueued {
            job_id: job.id,
            job_type: job_type.to_string(),
        });

        if let Err(e) = repository.push_pending(job_type, job.id).await {
            self.inner
                .fail_unstarted(job.clone(), format!("Failed to enqueue job: {}", e))
                .await;
            return Err(e);
        }
        tracing::debug!("Job {} added to queue '{}'", job.id, job_type);

        if let Some(notify) = self.inner.workers.read().await.get(job_type) {
            notify.notify_one();
        }

        Ok(job)
    }

    /// Register the handler for a job type. At most `concurrency` jobs of
    /// that type run at once; a type accepts a single registration.
    pub async fn process<F, Fut>(&self, job_type: &str, concurrency: usize, handler: F) -> Result<(), AppError>
    where
        F: Fn(Job, JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobOutcome> + Send + 'static,
    {
        if concurrency == 0 {
            return Err(AppError::BadRequest(format!(
                "Concurrency for '{}' must be at least 1",
                job_type
            )));
        }

        let notify = {
            let mut workers = self.inner.workers.write().await;
            if workers.contains_key(job_type) {
                return Err(AppError::HandlerAlreadyRegistered(job_type.to_string()));
            }
            let notify = Arc::new(Notify::new());
            workers.insert(job_type.to_string(), notify.clone());
            notify
        };

        let handler: JobHandler = Arc::new(move |job, ctx| Box::pin(handler(job, ctx)));
        let inner = self.inner.clone();
        let queue_name = job_type.to_string();

        tokio::spawn(async move {
            inner.dispatch(queue_name, concurrency, handler, notify).await;
        });

        tracing::info!("Worker started for queue '{}' (concurrency {})", job_type, concurrency);
        Ok(())
    }

    pub async fn is_registered(&self, job_type: &str) -> bool {
        self.inner.workers.read().await.contains_key(job_type)
    }

    pub async fn get(&self, job_id: JobId) -> Result<Option<Job>, AppError> {
        self.inner.repository.get(job_id).await
    }

    /// Stream of lifecycle events for every job in this engine
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Wait until a job is complete or failed and return its final record
    pub async fn wait_for(&self, job_id: JobId) -> Result<Job, AppError> {
        let mut events = self.subscribe();
        let mut finished = false;

        loop {
            let job = self
                .get(job_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

            if job.state.is_terminal() {
                return Ok(job);
            }
            if finished {
                return Err(AppError::QueueError(format!(
                    "Job {} finished but its final state was not stored",
                    job_id
                )));
            }

            loop {
                match events.recv().await {
                    Ok(event) if event.job_id() == job_id && event.is_terminal() => {
                        finished = true;
                        break;
                    }
                    Ok(_) => continue,
                    // Missed events; re-read the record
                    Err(RecvError::Lagged(_)) => break,
                    Err(RecvError::Closed) => {
                        return Err(AppError::QueueError("Job event stream closed".to_string()));
                    }
                }
            }
        }
    }
}

impl EngineInner {
    fn emit(&self, event: JobEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn dispatch(self: Arc<Self>, job_type: String, concurrency: usize, handler: JobHandler, notify: Arc<Notify>) {
        let semaphore = Arc::new(Semaphore::new(concurrency));

        loop {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            match self.repository.pop_pending(&job_type).await {
                Ok(Some(job_id)) => {
                    let inner = self.clone();
                    let handler = handler.clone();
                    let job_type = job_type.clone();
                    tokio::spawn(async move {
                        inner.run_job(job_id, job_type, handler, permit).await;
                    });
                }
                Ok(None) => {
                    drop(permit);
                    // Woken by `create`, or poll for jobs pushed by other processes
                    tokio::select! {
                        _ = notify.notified() => {}
                        _ = sleep(self.poll_interval) => {}
                    }
                }
                Err(e) => {
                    drop(permit);
                    tracing::error!("Error fetching job from queue '{}': {}", job_type, e);
                    sleep(self.poll_interval * 2).await;
                }
            }
        }
    }

    /// Runs one job while holding its concurrency permit. The terminal event
    /// is emitted before the permit is released, and only after the terminal
    /// state has been written.
    async fn run_job(
        self: Arc<Self>,
        job_id: JobId,
        job_type: String,
        handler: JobHandler,
        _permit: OwnedSemaphorePermit,
    ) {
        let mut job = match self.repository.get(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!("Job {} expired before it could run", job_id);
                self.emit(JobEvent::Failed {
                    job_id,
                    job_type,
                    error: "Job record expired before it could run".to_string(),
                });
                return;
            }
            Err(e) => {
                tracing::error!("Failed to load job {}: {}", job_id, e);
                self.requeue(job_id, job_type).await;
                return;
            }
        };

        if let Err(e) = job.mark_active() {
            tracing::warn!("Skipping job {}: {}", job_id, e);
            return;
        }
        if let Err(e) = self.repository.save(&job).await {
            tracing::error!("Failed to persist job {} as active: {}", job_id, e);
        }

        tracing::debug!("Processing job {} from queue '{}'", job_id, job_type);
        self.emit(JobEvent::Started {
            job_id,
            job_type: job_type.clone(),
        });

        let ctx = JobContext {
            job_id,
            job_type: job_type.clone(),
            inner: self.clone(),
        };

        let outcome = match tokio::spawn(handler(job.clone(), ctx)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Job {} handler panicked: {}", job_id, e);
                JobOutcome::failed("Job handler panicked")
            }
        };

        // Keep progress written by the handler
        if let Ok(Some(latest)) = self.repository.get(job_id).await {
            job = latest;
        }

        let mut finished = job.clone();
        let transition = match &outcome {
            JobOutcome::Complete => finished.mark_complete(),
            JobOutcome::Failed(error) => finished.mark_failed(error.clone()),
        };
        if let Err(e) = transition {
            tracing::error!("Job {} could not finish: {}", job_id, e);
            return;
        }

        let event = match self.repository.save(&finished).await {
            Ok(()) => match outcome {
                JobOutcome::Complete => {
                    tracing::info!("Job {} completed successfully", job_id);
                    JobEvent::Completed { job_id, job_type }
                }
                JobOutcome::Failed(error) => {
                    tracing::warn!("Job {} failed: {}", job_id, error);
                    JobEvent::Failed { job_id, job_type, error }
                }
            },
            Err(e) => {
                tracing::error!("Failed to persist final state of job {}: {}", job_id, e);
                let error = format!("Failed to persist job result: {}", e);
                if job.mark_failed(error.clone()).is_ok() {
                    if let Err(e) = self.repository.save(&job).await {
                        tracing::error!("Job {} left without a final state: {}", job_id, e);
                    }
                }
                JobEvent::Failed { job_id, job_type, error }
            }
        };

        self.emit(event);
    }

    /// Put a job that could not be loaded back on its list after a pause
    async fn requeue(&self, job_id: JobId, job_type: String) {
        sleep(self.poll_interval).await;

        match self.repository.push_pending(&job_type, job_id).await {
            Ok(()) => tracing::info!("Job {} returned to queue '{}'", job_id, job_type),
            Err(e) => {
                tracing::error!("Failed to requeue job {}: {}", job_id, e);
                self.emit(JobEvent::Failed {
                    job_id,
                    job_type,
                    error: format!("Failed to requeue job: {}", e),
                });
            }
        }
    }

    /// Fail a job that never reached a worker
    async fn fail_unstarted(&self, mut job: Job, error: String) {
        tracing::error!("Job {} failed before it started: {}", job.id, error);

        if job.mark_failed(error.clone()).is_ok() {
            if let Err(e) = self.repository.save(&job).await {
                tracing::error!("Failed to persist failure of job {}: {}", job.id, e);
            }
        }
        self.emit(JobEvent::Failed {
            job_id: job.id,
            job_type: job.job_type,
            error,
        });
    }
}

impl JobContext {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Report `num` out of `total` done; stored as a percentage
    pub async fn progress(&self, num: u64, total: u64) -> Result<u8, AppError> {
        let repository = &self.inner.repository;

        let mut job = repository
            .get(self.job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", self.job_id)))?;

        let progress = job.set_progress(num, total)?;
        repository.save(&job).await?;

        self.inner.emit(JobEvent::Progress {
            job_id: self.job_id,
            job_type: self.job_type.clone(),
            progress,
        });

        Ok(progress)
    }
}
