//! Unified error handling for Innkeep
//!
//! This module provides a comprehensive error type that covers all possible
//! failure scenarios in the application, with automatic HTTP response mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
///
/// The taxonomy distinguishes caller mistakes (validation), business-rule
/// conflicts (availability, capacity, duplicates), missing resources, and
/// infrastructure failures so callers can choose between fix-and-resubmit
/// and retry behavior.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Business Logic Errors ====================
    #[error("Room {0} is not available for the requested dates")]
    RoomUnavailable(String),

    #[error("Capacity exceeded for {selection}: required {required}, available {available}")]
    CapacityExceeded {
        selection: String,
        required: i32,
        available: i32,
    },

    #[error("Invalid capacity configuration for {0}: capacity must be positive")]
    CapacityMisconfigured(String),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Guest not found: {0}")]
    GuestNotFound(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Room type not found: {0}")]
    RoomTypeNotFound(String),

    #[error("Rate plan not found: {0}")]
    RatePlanNotFound(String),

    #[error("Article not found: {0}")]
    ArticleNotFound(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Invalid reservation status: {0}")]
    InvalidStatus(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_)
            | AppError::InvalidInput(_)
            | AppError::MissingField(_)
            | AppError::InvalidStatus(_) => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::ReservationNotFound(_)
            | AppError::GuestNotFound(_)
            | AppError::RoomNotFound(_)
            | AppError::RoomTypeNotFound(_)
            | AppError::RatePlanNotFound(_)
            | AppError::ArticleNotFound(_)
            | AppError::InvoiceNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::RoomUnavailable(_)
            | AppError::CapacityExceeded { .. }
            | AppError::Conflict(_)
            | AppError::AlreadyExists(_) => StatusCode::CONFLICT,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::RoomUnavailable(_) => "room_unavailable",
            AppError::CapacityExceeded { .. } => "capacity_exceeded",
            AppError::CapacityMisconfigured(_) => "capacity_misconfigured",
            AppError::ReservationNotFound(_) => "reservation_not_found",
            AppError::GuestNotFound(_) => "guest_not_found",
            AppError::RoomNotFound(_) => "room_not_found",
            AppError::RoomTypeNotFound(_) => "room_type_not_found",
            AppError::RatePlanNotFound(_) => "rate_plan_not_found",
            AppError::ArticleNotFound(_) => "article_not_found",
            AppError::InvoiceNotFound(_) => "invoice_not_found",
            AppError::InvalidStatus(_) => "invalid_status",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::MissingField(_) => "missing_field",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::AlreadyExists(_) => "already_exists",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }

    /// Check whether the error is the caller's fault (fix-and-resubmit)
    /// rather than an infrastructure failure (retry).
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                AppError::AlreadyExists(e.to_string())
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::RoomUnavailable("101".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ReservationNotFound("abc".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::CapacityExceeded {
                selection: "room 101".to_string(),
                required: 4,
                available: 2,
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InvalidStatus("bogus".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::CapacityMisconfigured("room type Double".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::RoomUnavailable("5".to_string()).error_code(),
            "room_unavailable"
        );
        assert_eq!(
            AppError::CapacityExceeded {
                selection: "request".to_string(),
                required: 3,
                available: 2,
            }
            .error_code(),
            "capacity_exceeded"
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(AppError::Validation("bad dates".to_string()).is_client_error());
        assert!(AppError::RoomUnavailable("5".to_string()).is_client_error());
        assert!(!AppError::Database("down".to_string()).is_client_error());
    }
}
