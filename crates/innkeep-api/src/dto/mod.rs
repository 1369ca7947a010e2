//! Request and response DTOs

pub mod common;
pub mod invoice;
pub mod reservation;

pub use common::ApiResponse;
