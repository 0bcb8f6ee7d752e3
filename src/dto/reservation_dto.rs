use serde::Serialize;

use crate::services::ReservationStatus;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSeatsResponse {
    pub number_of_available_seats: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationResponse {
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    pub status: &'static str,
}

impl ProcessResponse {
    pub fn processing() -> Self {
        Self { status: "Queue processing" }
    }
}
