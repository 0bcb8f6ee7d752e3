pub mod response;
pub mod error;

pub use response::{ApiResponse, ApiSuccess, ApiError};
pub use error::{AppError, ErrorCode};
