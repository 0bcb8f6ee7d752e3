use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::interceptors::AppError;
use crate::queue::{Job, JobEvent, JobOutcome, QueueEngine};
use super::state_store::StateStore;

pub const RESERVE_SEAT_JOB: &str = "reserve_seat";
pub const SEATS_KEY: &str = "available_seats";

/// Immediate answer to a reservation request; never the eventual outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    InProcess,
    Blocked,
    Failed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::InProcess => "Reservation in process",
            ReservationStatus::Blocked => "Reservation are blocked",
            ReservationStatus::Failed => "Reservation failed",
        }
    }
}

impl Serialize for ReservationStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Switch that stops new reservations once seats run out
#[derive(Debug)]
pub struct ReservationGate {
    enabled: AtomicBool,
}

impl ReservationGate {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Returns true if this call closed the gate
    pub fn disable(&self) -> bool {
        self.enabled.swap(false, Ordering::SeqCst)
    }
}

impl Default for ReservationGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Seat counter, reservation gate and the queue that serializes reservations
#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn StateStore>,
    gate: Arc<ReservationGate>,
    engine: QueueEngine,
}

impl ReservationService {
    pub fn new(store: Arc<dyn StateStore>, engine: QueueEngine) -> Self {
        Self {
            store,
            gate: Arc::new(ReservationGate::new()),
            engine,
        }
    }

    /// Write the starting seat count
    pub async fn seed(&self, seats: i64) -> Result<(), AppError> {
        if seats < 0 {
            return Err(AppError::BadRequest(format!("Seat count cannot be negative: {}", seats)));
        }
        self.store.set(SEATS_KEY, &seats.to_string()).await?;
        info!("🎟️  Available seats set to {}", seats);
        Ok(())
    }

    /// Current counter value; a missing key reads as zero
    pub async fn available_seats(&self) -> Result<i64, AppError> {
        match self.store.get(SEATS_KEY).await? {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| AppError::InternalError(format!("Seat counter holds a non-integer value: {}", raw))),
            None => Ok(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    /// Queue a reservation unless the gate is closed. `None` means blocked.
    pub async fn submit(&self) -> Result<Option<Job>, AppError> {
        if !self.gate.is_enabled() {
            return Ok(None);
        }

        let job = self.engine.create(RESERVE_SEAT_JOB, &json!({})).await?;
        debug!("Seat reservation job {} queued", job.id);
        Ok(Some(job))
    }

    /// Submit a reservation and acknowledge without waiting for the result
    pub async fn reserve_seat(&self) -> ReservationStatus {
        match self.submit().await {
            Ok(Some(_)) => ReservationStatus::InProcess,
            Ok(None) => ReservationStatus::Blocked,
            Err(e) => {
                error!("Failed to create reservation job: {}", e);
                ReservationStatus::Failed
            }
        }
    }

    /// Register the reservation worker. Safe to call more than once; only the
    /// first call registers.
    pub async fn start_processing(&self) -> Result<(), AppError> {
        let service = self.clone();
        let registered = self
            .engine
            .process(RESERVE_SEAT_JOB, 1, move |job, _ctx| {
                let service = service.clone();
                async move { service.reserve(job).await }
            })
            .await;

        match registered {
            Ok(()) => {
                self.spawn_job_logger();
                Ok(())
            }
            Err(AppError::HandlerAlreadyRegistered(_)) => {
                debug!("Reservation worker already running");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn reserve(&self, job: Job) -> JobOutcome {
        match self.store.decrement_if_positive(SEATS_KEY).await {
            Ok(Some(remaining)) => {
                debug!("Job {} reserved a seat, {} left", job.id, remaining);
                if remaining == 0 && self.gate.disable() {
                    info!("🚫 No seats left, reservations are now blocked");
                }
                JobOutcome::Complete
            }
            Ok(None) => {
                if self.gate.disable() {
                    info!("🚫 No seats left, reservations are now blocked");
                }
                JobOutcome::failed(AppError::NoSeatsAvailable)
            }
            Err(e) => JobOutcome::failed(e),
        }
    }

    fn spawn_job_logger(&self) {
        let mut events = self.engine.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(JobEvent::Completed { job_id, job_type }) if job_type == RESERVE_SEAT_JOB => {
                        info!("Seat reservation job {} completed", job_id);
                    }
                    Ok(JobEvent::Failed { job_id, job_type, error }) if job_type == RESERVE_SEAT_JOB => {
                        info!("Seat reservation job {} failed: {}", job_id, error);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Reservation job logger skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::queue::{JobState, MemoryJobRepository, MockJobRepository};
    use crate::services::state_store::MemoryStore;
    use std::time::Duration;

    fn queue_config() -> QueueConfig {
        QueueConfig {
            poll_interval_ms: 20,
            ..QueueConfig::default()
        }
    }

    async fn service_with_seats(seats: i64) -> (ReservationService, QueueEngine) {
        let engine = QueueEngine::new(Arc::new(MemoryJobRepository::new()), &queue_config());
        let service = ReservationService::new(Arc::new(MemoryStore::new()), engine.clone());
        service.seed(seats).await.unwrap();
        (service, engine)
    }

    async fn settle(engine: &QueueEngine, job: &Job) -> Job {
        tokio::time::timeout(Duration::from_secs(5), engine.wait_for(job.id))
            .await
            .expect("reservation did not settle")
            .unwrap()
    }

    #[tokio::test]
    async fn one_reservation_from_fifty() {
        let (service, engine) = service_with_seats(50).await;
        service.start_processing().await.unwrap();

        let job = service.submit().await.unwrap().unwrap();
        assert_eq!(settle(&engine, &job).await.state, JobState::Complete);

        assert_eq!(service.available_seats().await.unwrap(), 49);
        assert!(service.is_enabled());
    }

    #[tokio::test]
    async fn last_seat_closes_the_gate() {
        let (service, engine) = service_with_seats(1).await;
        service.start_processing().await.unwrap();

        let job = service.submit().await.unwrap().unwrap();
        let done = settle(&engine, &job).await;

        assert_eq!(done.state, JobState::Complete);
        assert_eq!(done.error, None);
        assert_eq!(service.available_seats().await.unwrap(), 0);
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn empty_counter_fails_the_job() {
        let (service, engine) = service_with_seats(0).await;
        service.start_processing().await.unwrap();

        let job = service.submit().await.unwrap().unwrap();
        let done = settle(&engine, &job).await;

        assert_eq!(done.state, JobState::Failed);
        assert_eq!(done.error.as_deref(), Some("Not enough seats available"));
        assert_eq!(service.available_seats().await.unwrap(), 0);
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn settled_counter_never_goes_below_zero() {
        for (seats, requests) in [(3_i64, 5_usize), (5, 3), (4, 4)] {
            let (service, engine) = service_with_seats(seats).await;

            // Queue everything before the worker starts so every request is accepted
            let mut jobs = Vec::new();
            for _ in 0..requests {
                jobs.push(service.submit().await.unwrap().unwrap());
            }
            service.start_processing().await.unwrap();

            let mut completed = 0;
            for job in &jobs {
                if settle(&engine, job).await.state == JobState::Complete {
                    completed += 1;
                }
            }

            let expected = (seats - requests as i64).max(0);
            assert_eq!(service.available_seats().await.unwrap(), expected);
            assert_eq!(completed, requests.min(seats as usize));
            assert_eq!(service.is_enabled(), (requests as i64) < seats);
        }
    }

    #[tokio::test]
    async fn closed_gate_blocks_without_creating_jobs() {
        let (service, engine) = service_with_seats(1).await;
        service.start_processing().await.unwrap();

        let job = service.submit().await.unwrap().unwrap();
        settle(&engine, &job).await;

        assert_eq!(service.reserve_seat().await, ReservationStatus::Blocked);
        assert!(service.submit().await.unwrap().is_none());
        assert!(engine.get(job.id + 1).await.unwrap().is_none());
        assert_eq!(service.available_seats().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reserve_seat_acknowledges_immediately() {
        let (service, _engine) = service_with_seats(10).await;
        // No worker yet: the job just waits in the queue
        assert_eq!(service.reserve_seat().await, ReservationStatus::InProcess);
        assert_eq!(service.available_seats().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn reads_are_stable_without_jobs() {
        let (service, _engine) = service_with_seats(7).await;
        let first = service.available_seats().await.unwrap();
        let second = service.available_seats().await.unwrap();
        assert_eq!(first, 7);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn start_processing_is_idempotent() {
        let (service, engine) = service_with_seats(2).await;
        service.start_processing().await.unwrap();
        service.start_processing().await.unwrap();

        let job = service.submit().await.unwrap().unwrap();
        settle(&engine, &job).await;
        assert_eq!(service.available_seats().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn enqueue_failure_reports_reservation_failed() {
        let mut repo = MockJobRepository::new();
        repo.expect_next_id()
            .returning(|| Err(AppError::QueueError("Failed to allocate job id".into())));

        let engine = QueueEngine::new(Arc::new(repo), &queue_config());
        let service = ReservationService::new(Arc::new(MemoryStore::new()), engine);

        assert_eq!(service.reserve_seat().await, ReservationStatus::Failed);
        assert!(service.is_enabled());
    }

    #[test]
    fn status_wire_text() {
        assert_eq!(
            serde_json::to_value(ReservationStatus::InProcess).unwrap(),
            "Reservation in process"
        );
        assert_eq!(ReservationStatus::Blocked.as_str(), "Reservation are blocked");
        assert_eq!(ReservationStatus::Failed.as_str(), "Reservation failed");
    }

    #[test]
    fn gate_closes_once() {
        let gate = ReservationGate::new();
        assert!(gate.is_enabled());
        assert!(gate.disable());
        assert!(!gate.disable());
        assert!(!gate.is_enabled());
    }
}
