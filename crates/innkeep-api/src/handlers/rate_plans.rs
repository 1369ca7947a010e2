//! Rate plan handlers
//!
//! Calendar resolution: per-day prices and restrictions for a rate plan
//! over an inclusive date range.

use actix_web::{web, HttpResponse};
use innkeep_core::AppError;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::dto::common::DateRangeQuery;
use crate::dto::ApiResponse;
use crate::PgRateCalendarService;

/// Resolve a rate plan's calendar over `[start, end]`
///
/// GET /api/v1/rate-plans/{id}/calendar?start=2024-06-01&end=2024-06-30
#[instrument(skip(calendar))]
pub async fn resolve_calendar(
    calendar: web::Data<PgRateCalendarService>,
    path: web::Path<Uuid>,
    query: web::Query<DateRangeQuery>,
) -> Result<HttpResponse, AppError> {
    let rate_plan_id = path.into_inner();
    debug!(
        "Resolving calendar for plan {}: {} to {}",
        rate_plan_id, query.start, query.end
    );

    let resolved = calendar
        .resolve(rate_plan_id, query.start, query.end)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(resolved)))
}

/// Configure rate plan routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/rate-plans/{id}/calendar",
        web::get().to(resolve_calendar),
    );
}
