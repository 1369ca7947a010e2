//! Innkeep server
//!
//! HTTP backend for the reservation lifecycle and billing: rooms, rate
//! calendars, reservations, invoices, and payments.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use innkeep_api::{
    configure_invoices, configure_rate_plans, configure_reservations, health_check,
    PgBillingService, PgRateCalendarService, PgReservationManager,
};
use innkeep_core::config::AppConfig;
use innkeep_db::{
    create_pool, PgCatalogRepository, PgInvoiceRepository, PgReservationRepository,
    PgSequenceStore,
};
use innkeep_services::SequenceGenerator;
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Configure API routes
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            // Health check
            .route("/health", web::get().to(health_check))
            // Reservation lifecycle
            .configure(configure_reservations)
            // Invoices and payments
            .configure(configure_invoices)
            // Rate calendar resolution
            .configure(configure_rate_plans),
    );
}

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "innkeep={},innkeep_api={},innkeep_services={},innkeep_db={},actix_web=info,sqlx=warn",
            log_level, log_level, log_level, log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting Innkeep v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().expect("Failed to load configuration (is DATABASE URL set?)");

    info!("Connecting to database...");
    let pool = create_pool(&config.database.url, Some(config.database.max_connections))
        .await
        .expect("Failed to create database pool");
    info!(
        "Database connection established with {} max connections",
        config.database.max_connections
    );

    // Repositories
    let catalog = Arc::new(PgCatalogRepository::new(pool.clone()));
    let reservations = Arc::new(PgReservationRepository::new(pool.clone()));
    let invoices = Arc::new(PgInvoiceRepository::new(pool.clone()));
    let sequence_store = Arc::new(PgSequenceStore::new(pool.clone()));

    // Services
    let sequences = Arc::new(SequenceGenerator::new(
        sequence_store,
        config.billing.clone(),
    ));
    let manager = web::Data::new(PgReservationManager::new(
        catalog.clone(),
        reservations.clone(),
        sequences.clone(),
        pool.clone(),
        config.billing.clone(),
    ));
    let billing = web::Data::new(PgBillingService::new(
        catalog.clone(),
        reservations,
        invoices,
        sequences,
        pool.clone(),
        config.billing.clone(),
    ));
    let calendar = web::Data::new(PgRateCalendarService::new(catalog));

    // CORS configuration
    let cors_origins = env::var("CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let bind_addr = config.server_addr();
    let workers = config.server.workers;
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, workers
    );

    HttpServer::new(move || {
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origins: Vec<&str> = cors_origins_inner.split(',').collect();
                if let Ok(origin_str) = origin.to_str() {
                    origins.iter().any(|o| o.trim() == origin_str)
                } else {
                    false
                }
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(manager.clone())
            .app_data(billing.clone())
            .app_data(calendar.clone())
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_query",
                        "message": error_message
                    })),
                )
                .into()
            }))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_routes)
            // Root redirect to health
            .route(
                "/",
                web::get().to(|| async {
                    HttpResponse::Found()
                        .append_header(("Location", "/api/v1/health"))
                        .finish()
                }),
            )
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await
}
