//! Rate calendar resolution service
//!
//! Answers "what does each day cost, and which restrictions apply" for a
//! rate plan over a date range. The per-day resolution logic lives in the
//! core crate; this service loads the plan and its calendar rules and
//! shapes the response.

use chrono::NaiveDate;
use innkeep_core::{
    models::{resolve_rate_days, ResolvedRateDay},
    traits::CatalogRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Resolved calendar for a rate plan over an inclusive date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedCalendar {
    /// Rate plan the days were resolved against
    pub rate_plan_id: Uuid,

    /// Plan base nightly price the days fall back to
    pub base_price: Decimal,

    /// Plan currency
    pub currency: String,

    /// One entry per day, in date order
    pub days: Vec<ResolvedRateDay>,
}

/// Service resolving per-day rates and restrictions
pub struct RateCalendarService<C: CatalogRepository> {
    catalog: Arc<C>,
}

impl<C: CatalogRepository> RateCalendarService<C> {
    /// Create a new rate calendar service
    pub fn new(catalog: Arc<C>) -> Self {
        Self { catalog }
    }

    /// Resolve per-day prices and restrictions for `[start, end]`.
    ///
    /// Rejects inverted ranges and unknown rate plans; an empty rule set
    /// yields the base price for every day.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        rate_plan_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<ResolvedCalendar> {
        if start > end {
            return Err(AppError::Validation(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }

        let plan = self
            .catalog
            .find_rate_plan(rate_plan_id)
            .await?
            .ok_or_else(|| AppError::RatePlanNotFound(rate_plan_id.to_string()))?;

        let rules = self.catalog.calendar_rules_for_plan(rate_plan_id).await?;
        debug!(
            "Resolving calendar for plan {} over {}..={} with {} rules",
            rate_plan_id,
            start,
            end,
            rules.len()
        );

        let days = resolve_rate_days(start, end, plan.base_price, &rules);

        Ok(ResolvedCalendar {
            rate_plan_id,
            base_price: plan.base_price,
            currency: plan.currency,
            days,
        })
    }
}
