pub mod notification_dto;
pub mod reservation_dto;

pub use notification_dto::{NotificationJobData, QueuedJobResponse};
pub use reservation_dto::{AvailableSeatsResponse, ProcessResponse, ReservationResponse};
