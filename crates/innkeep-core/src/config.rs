//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub billing: BillingConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

/// Billing-specific configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    /// Default currency when neither room, plan, nor reservation carries one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Fallback nightly rate for invoicing when no rate can be resolved
    #[serde(default = "default_fallback_rate")]
    pub fallback_nightly_rate: f64,

    /// Reduced VAT percentage applied to room nights
    #[serde(default = "default_room_vat")]
    pub room_vat_percent: f64,

    /// Starting value for the confirmation number sequence
    #[serde(default = "default_confirmation_floor")]
    pub confirmation_sequence_floor: i64,

    /// Starting value for the invoice number sequence
    #[serde(default = "default_invoice_floor")]
    pub invoice_sequence_floor: i64,

    /// Starting value for the correction number sequence
    #[serde(default = "default_correction_floor")]
    pub correction_sequence_floor: i64,
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_fallback_rate() -> f64 {
    80.00
}

fn default_room_vat() -> f64 {
    7.0
}

fn default_confirmation_floor() -> i64 {
    1000
}

fn default_invoice_floor() -> i64 {
    1000
}

fn default_correction_floor() -> i64 {
    1000
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("billing.default_currency", "EUR")?
            .set_default("billing.fallback_nightly_rate", 80.00)?
            .set_default("billing.room_vat_percent", 7.0)?
            .set_default("billing.confirmation_sequence_floor", 1000)?
            .set_default("billing.invoice_sequence_floor", 1000)?
            .set_default("billing.correction_sequence_floor", 1000)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with INNKEEP_ prefix
            .add_source(
                Environment::with_prefix("INNKEEP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("INNKEEP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_currency: "EUR".to_string(),
            fallback_nightly_rate: 80.00,
            room_vat_percent: 7.0,
            confirmation_sequence_floor: 1000,
            invoice_sequence_floor: 1000,
            correction_sequence_floor: 1000,
        }
    }
}
