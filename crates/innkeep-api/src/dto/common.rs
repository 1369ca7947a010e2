//! Common DTOs used across the API

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a success response with data
    pub fn success(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    /// Create a success response with data and message
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: Some(message.into()),
        }
    }
}

/// Inclusive date range query, e.g. for calendar resolution
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DateRangeQuery {
    /// First day (inclusive)
    pub start: NaiveDate,

    /// Last day (inclusive)
    pub end: NaiveDate,
}
