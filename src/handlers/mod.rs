pub mod health_handler;
pub mod job_handler;
pub mod notification_handler;
pub mod reservation_handler;

pub use health_handler::health_check;
pub use job_handler::get_job;
pub use notification_handler::create_notification;
pub use reservation_handler::{available_seats, process_queue, reserve_seat};
