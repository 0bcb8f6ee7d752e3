use axum::{
    routing::{get, post},
    Router,
};

use crate::config::AppState;
use crate::handlers::{available_seats, create_notification, get_job, health_check, process_queue, reserve_seat};

/// Create API router
pub fn create_router(state: AppState) -> Router {
    let reservation_routes = Router::new()
        .route("/available_seats", get(available_seats))
        .route("/reserve_seat", get(reserve_seat))
        .route("/process", get(process_queue));

    let queue_routes = Router::new()
        .route("/notifications", post(create_notification))
        .route("/jobs/:id", get(get_job));

    Router::new()
        .route("/health", get(health_check))
        .merge(reservation_routes)
        .merge(queue_routes)
        .with_state(state)
}
