use axum::{extract::State, Json};

use crate::config::AppState;
use crate::dto::{AvailableSeatsResponse, ProcessResponse, ReservationResponse};
use crate::interceptors::AppError;

/// Current value of the seat counter
pub async fn available_seats(
    State(state): State<AppState>,
) -> Result<Json<AvailableSeatsResponse>, AppError> {
    let seats = state.reservations.available_seats().await?;

    Ok(Json(AvailableSeatsResponse {
        number_of_available_seats: seats,
    }))
}

/// Queue a reservation; the answer is only an acknowledgment
pub async fn reserve_seat(State(state): State<AppState>) -> Json<ReservationResponse> {
    let status = state.reservations.reserve_seat().await;

    Json(ReservationResponse { status })
}

/// Make sure the reservation worker is running
pub async fn process_queue(State(state): State<AppState>) -> Result<Json<ProcessResponse>, AppError> {
    state.reservations.start_processing().await?;

    Ok(Json(ProcessResponse::processing()))
}
