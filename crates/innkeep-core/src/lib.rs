//! Innkeep Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the Innkeep property-management backend. It includes:
//!
//! - Domain models (Room, RatePlan, Reservation, Invoice, etc.)
//! - Pure domain algorithms (rate calendar resolution, capacity checks,
//!   article pricing, invoice totals)
//! - Common traits for repositories and the sequence store
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
