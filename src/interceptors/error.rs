use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use thiserror::Error;
use serde_json::json;

use super::response::ApiError;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Redis error: {0}")]
    RedisError(String),

    #[error("Queue error: {0}")]
    QueueError(String),

    #[error("Not enough seats available")]
    NoSeatsAvailable,

    #[error("Phone number {0} is blacklisted")]
    BlacklistedRecipient(String),

    #[error("A handler is already registered for job type '{0}'")]
    HandlerAlreadyRegistered(String),

    #[error("Invalid job transition: {0}")]
    InvalidTransition(String),

    #[error("MQTT error: {0}")]
    MqttError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error codes for API responses
#[derive(Debug)]
pub enum ErrorCode {
    RedisError,
    QueueError,
    NoSeatsAvailable,
    BlacklistedRecipient,
    HandlerAlreadyRegistered,
    InvalidTransition,
    MqttError,
    ValidationError,
    NotFound,
    BadRequest,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RedisError => "REDIS_ERROR",
            ErrorCode::QueueError => "QUEUE_ERROR",
            ErrorCode::NoSeatsAvailable => "NO_SEATS_AVAILABLE",
            ErrorCode::BlacklistedRecipient => "BLACKLISTED_RECIPIENT",
            ErrorCode::HandlerAlreadyRegistered => "HANDLER_ALREADY_REGISTERED",
            ErrorCode::InvalidTransition => "INVALID_TRANSITION",
            ErrorCode::MqttError => "MQTT_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl AppError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::RedisError(_) => ErrorCode::RedisError,
            AppError::QueueError(_) => ErrorCode::QueueError,
            AppError::NoSeatsAvailable => ErrorCode::NoSeatsAvailable,
            AppError::BlacklistedRecipient(_) => ErrorCode::BlacklistedRecipient,
            AppError::HandlerAlreadyRegistered(_) => ErrorCode::HandlerAlreadyRegistered,
            AppError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            AppError::MqttError(_) => ErrorCode::MqttError,
            AppError::ValidationError(_) => ErrorCode::ValidationError,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::BadRequest(_) => ErrorCode::BadRequest,
            AppError::InternalError(_) => ErrorCode::InternalError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RedisError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::QueueError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NoSeatsAvailable => StatusCode::CONFLICT,
            AppError::BlacklistedRecipient(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::HandlerAlreadyRegistered(_) => StatusCode::CONFLICT,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::MqttError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        let error_code = self.error_code().as_str();
        let message = self.to_string();

        match self {
            AppError::ValidationError(msg) => {
                ApiError::with_details(
                    message,
                    error_code,
                    json!({ "validation_errors": msg }),
                )
            }
            _ => ApiError::new(message, error_code),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Application error: {:?}", self);

        let status = self.status_code();
        let api_error = self.to_api_error();
        api_error.into_response_with_status(status)
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::RedisError(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for AppError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        AppError::RedisError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::QueueError(format!("Failed to (de)serialize job: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_failure_messages_match_the_wire_text() {
        assert_eq!(AppError::NoSeatsAvailable.to_string(), "Not enough seats available");
        assert_eq!(
            AppError::BlacklistedRecipient("4153518780".into()).to_string(),
            "Phone number 4153518780 is blacklisted"
        );
    }

    #[test]
    fn store_errors_map_to_server_errors() {
        let err = AppError::RedisError("connection refused".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code().as_str(), "REDIS_ERROR");
    }

    #[test]
    fn validation_errors_carry_details() {
        let api_error = AppError::ValidationError("phoneNumber: required".into()).to_api_error();
        let detail = api_error.error.expect("error detail");
        assert_eq!(detail.code, "VALIDATION_ERROR");
        assert!(detail.details.is_some());
    }

    #[test]
    fn errors_render_through_the_envelope() {
        let response = AppError::NotFound("Job 7 not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::NoSeatsAvailable.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
