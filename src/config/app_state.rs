use std::sync::Arc;

use crate::config::AppConfig;
use crate::queue::QueueEngine;
use crate::services::{NotificationService, ReservationService};

/// Application state shared across all handlers and services
#[derive(Clone)]
pub struct AppState {
    /// Seat counter, reservation gate and reservation worker
    pub reservations: ReservationService,
    /// Notification producer and worker pool
    pub notifications: NotificationService,
    /// Queue engine handle for job lookups
    pub queue: QueueEngine,
    /// Application configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Create new AppState
    pub fn new(
        reservations: ReservationService,
        notifications: NotificationService,
        queue: QueueEngine,
        config: AppConfig,
    ) -> Self {
        Self {
            reservations,
            notifications,
            queue,
            config: Arc::new(config),
        }
    }
}
