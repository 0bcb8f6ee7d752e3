use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::WorkerConfig;
use crate::dto::NotificationJobData;
use crate::interceptors::AppError;
use crate::queue::{Job, JobContext, QueueEngine};
use crate::utils::validate_request;

pub const PUSH_NOTIFICATION_JOB: &str = "push_notification";

const NOTIFICATION_CONCURRENCY: usize = 2;

/// Push notification dispatcher with recipient filtering
#[derive(Clone)]
pub struct NotificationService {
    engine: QueueEngine,
    blacklist: Arc<HashSet<String>>,
    dispatch_delay: Duration,
}

impl NotificationService {
    pub fn new(engine: QueueEngine, config: &WorkerConfig) -> Self {
        Self {
            engine,
            blacklist: Arc::new(config.blacklist.clone()),
            dispatch_delay: config.notification_delay(),
        }
    }

    /// Validate and queue a notification
    pub async fn send_notification(&self, data: NotificationJobData) -> Result<Job, AppError> {
        validate_request(&data)?;

        let job = self.engine.create(PUSH_NOTIFICATION_JOB, &data).await?;
        info!("🔔 Notification job created: {}", job.id);
        Ok(job)
    }

    /// Register the notification workers; later calls are no-ops
    pub async fn start_processing(&self) -> Result<(), AppError> {
        let service = self.clone();
        let registered = self
            .engine
            .process(PUSH_NOTIFICATION_JOB, NOTIFICATION_CONCURRENCY, move |job, ctx| {
                let service = service.clone();
                async move { service.process_notification(job, ctx).await.into() }
            })
            .await;

        match registered {
            Err(AppError::HandlerAlreadyRegistered(_)) => {
                debug!("Notification workers already running");
                Ok(())
            }
            other => other,
        }
    }

    async fn process_notification(&self, job: Job, ctx: JobContext) -> Result<(), AppError> {
        let data: NotificationJobData = job.payload()?;

        ctx.progress(0, 100).await?;

        if self.blacklist.contains(&data.phone_number) {
            return Err(AppError::BlacklistedRecipient(data.phone_number));
        }

        ctx.progress(50, 100).await?;
        info!(
            "Sending notification to {}, with message: {}",
            data.phone_number, data.message
        );

        tokio::time::sleep(self.dispatch_delay).await;

        ctx.progress(100, 100).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::queue::{JobEvent, JobState, MemoryJobRepository};

    fn setup(delay_ms: u64) -> (NotificationService, QueueEngine) {
        let engine = QueueEngine::new(
            Arc::new(MemoryJobRepository::new()),
            &QueueConfig {
                poll_interval_ms: 20,
                ..QueueConfig::default()
            },
        );
        let config = WorkerConfig {
            notification_delay_ms: delay_ms,
            ..WorkerConfig::default()
        };
        (NotificationService::new(engine.clone(), &config), engine)
    }

    fn notification(phone: &str) -> NotificationJobData {
        NotificationJobData {
            phone_number: phone.to_string(),
            message: "This is the code 1234 to verify your account".to_string(),
        }
    }

    async fn settle(engine: &QueueEngine, job: &Job) -> Job {
        tokio::time::timeout(Duration::from_secs(5), engine.wait_for(job.id))
            .await
            .expect("notification did not settle")
            .unwrap()
    }

    fn drain(events: &mut tokio::sync::broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        seen
    }

    fn progress_of(events: &[JobEvent], id: u64) -> Vec<u8> {
        events
            .iter()
            .filter_map(|event| match event {
                JobEvent::Progress { job_id, progress, .. } if *job_id == id => Some(*progress),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn delivers_to_allowed_recipient() {
        let (service, engine) = setup(10);
        let mut events = engine.subscribe();
        service.start_processing().await.unwrap();

        let job = service.send_notification(notification("4153518743")).await.unwrap();
        let done = settle(&engine, &job).await;

        assert_eq!(done.state, JobState::Complete);
        assert_eq!(done.progress, 100);
        assert_eq!(progress_of(&drain(&mut events), job.id), vec![0, 50, 100]);
    }

    #[tokio::test]
    async fn blacklisted_recipient_fails_at_zero() {
        let (service, engine) = setup(10);
        let mut events = engine.subscribe();
        service.start_processing().await.unwrap();

        for phone in ["4153518780", "4153518781"] {
            let job = service.send_notification(notification(phone)).await.unwrap();
            let done = settle(&engine, &job).await;

            assert_eq!(done.state, JobState::Failed);
            assert_eq!(done.error, Some(format!("Phone number {} is blacklisted", phone)));
            assert_eq!(done.progress, 0);
            assert_eq!(progress_of(&drain(&mut events), job.id), vec![0]);
        }
    }

    #[tokio::test]
    async fn blacklist_is_exact_match() {
        let (service, engine) = setup(1);
        service.start_processing().await.unwrap();

        let job = service.send_notification(notification("41535187800")).await.unwrap();
        assert_eq!(settle(&engine, &job).await.state, JobState::Complete);
    }

    #[tokio::test]
    async fn at_most_two_notifications_run_at_once() {
        let (service, engine) = setup(30);
        let mut events = engine.subscribe();
        service.start_processing().await.unwrap();

        let mut jobs = Vec::new();
        for n in 0..5 {
            let phone = format!("41535187{:02}", n);
            jobs.push(service.send_notification(notification(&phone)).await.unwrap());
        }
        for job in &jobs {
            settle(&engine, job).await;
        }

        let mut running = 0_i32;
        let mut peak = 0_i32;
        for event in drain(&mut events) {
            match event {
                JobEvent::Started { .. } => running += 1,
                JobEvent::Completed { .. } | JobEvent::Failed { .. } => running -= 1,
                _ => {}
            }
            peak = peak.max(running);
        }
        assert_eq!(running, 0);
        assert_eq!(peak, 2);
    }

    #[tokio::test]
    async fn invalid_request_is_not_queued() {
        let (service, engine) = setup(1);
        let err = service.send_notification(notification("")).await.unwrap_err();

        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(engine.get(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn registration_happens_once() {
        let (service, engine) = setup(1);
        service.start_processing().await.unwrap();
        service.start_processing().await.unwrap();
        assert!(engine.is_registered(PUSH_NOTIFICATION_JOB).await);
    }
}
