//! Rate plan and rate calendar models
//!
//! A rate plan carries a base nightly price; rate calendars attach
//! date-range rules (optionally weekday-filtered) that override the price
//! or impose arrival/departure restrictions. Overlapping rules resolve
//! deterministically: weekday-specific rules beat unfiltered ones, newer
//! rules beat older ones, and the first rule to claim a day keeps it.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Cancellation penalty type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyType {
    /// Percentage of the stay total
    #[default]
    Percent,
    /// Fixed amount
    Fixed,
    /// Number of nights charged
    Nights,
}

impl fmt::Display for PenaltyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PenaltyType::Percent => write!(f, "percent"),
            PenaltyType::Fixed => write!(f, "fixed"),
            PenaltyType::Nights => write!(f, "nights"),
        }
    }
}

impl PenaltyType {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "percent" => Some(PenaltyType::Percent),
            "fixed" => Some(PenaltyType::Fixed),
            "nights" => Some(PenaltyType::Nights),
            _ => None,
        }
    }
}

/// Cancellation policy entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationPolicy {
    /// Unique identifier
    pub id: Uuid,

    /// Policy name
    pub name: String,

    /// Days before arrival until which cancellation is free
    pub free_until_days: i32,

    /// How the penalty is computed
    pub penalty_type: PenaltyType,

    /// Penalty value (percent, amount, or nights; >= 0)
    pub penalty_value: Decimal,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Rate plan entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatePlan {
    /// Unique identifier
    pub id: Uuid,

    /// Plan name (e.g., "Flexible", "Non-refundable")
    pub name: String,

    /// Base nightly price
    pub base_price: Decimal,

    /// Currency (ISO 4217)
    pub currency: String,

    /// Default cancellation policy
    pub cancellation_policy_id: Option<Uuid>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// A dated pricing/restriction rule inside a rate calendar
///
/// `weekdays` uses chrono's days-from-Sunday numbering (0 = Sunday ..
/// 6 = Saturday). An empty set means the rule applies to every weekday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateCalendarRule {
    /// Unique identifier
    pub id: Uuid,

    /// Owning rate calendar
    pub calendar_id: Uuid,

    /// First day the rule covers (inclusive)
    pub start_date: NaiveDate,

    /// Last day the rule covers (inclusive)
    pub end_date: NaiveDate,

    /// Weekday filter; empty = all weekdays
    pub weekdays: Vec<u8>,

    /// Price override; None keeps the base price
    pub price: Option<Decimal>,

    /// Cancellation policy override
    pub cancellation_policy_id: Option<Uuid>,

    /// Arrivals not permitted on matched days
    pub closed_for_arrival: bool,

    /// Departures not permitted on matched days
    pub closed_for_departure: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl RateCalendarRule {
    /// Whether the rule covers the given calendar day
    pub fn matches(&self, date: NaiveDate) -> bool {
        if date < self.start_date || date > self.end_date {
            return false;
        }
        if self.weekdays.is_empty() {
            return true;
        }
        let dow = date.weekday().num_days_from_sunday() as u8;
        self.weekdays.contains(&dow)
    }
}

/// Resolved pricing/restrictions for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRateDay {
    /// Calendar day
    pub date: NaiveDate,

    /// Resolved nightly price (rule override or base)
    pub price: Decimal,

    /// Saturday or Sunday
    pub is_weekend: bool,

    /// Arrivals blocked on this day
    pub closed_for_arrival: bool,

    /// Departures blocked on this day
    pub closed_for_departure: bool,

    /// Applicable cancellation policy, if any
    pub cancellation_policy_id: Option<Uuid>,

    /// Rule that claimed this day, if any
    pub rule_id: Option<Uuid>,
}

/// Resolve per-day prices and restrictions for `[start, end]` (inclusive).
///
/// Every day starts at the base price with no restrictions. Rules are
/// applied in priority order (weekday-filtered rules first, then most
/// recently updated, then most recently created) and the first rule to
/// match a day claims it; lower-priority rules never override a claimed
/// day. A matching rule without a price override keeps the base price but
/// still applies its policy and closure flags.
pub fn resolve_rate_days(
    start: NaiveDate,
    end: NaiveDate,
    base_price: Decimal,
    rules: &[RateCalendarRule],
) -> Vec<ResolvedRateDay> {
    let mut sorted: Vec<&RateCalendarRule> = rules.iter().collect();
    sorted.sort_by(|a, b| {
        let spec_a = !a.weekdays.is_empty();
        let spec_b = !b.weekdays.is_empty();
        spec_b
            .cmp(&spec_a)
            .then(b.updated_at.cmp(&a.updated_at))
            .then(b.created_at.cmp(&a.created_at))
    });

    let mut days = Vec::new();
    let mut date = start;
    while date <= end {
        let weekday = date.weekday();
        let mut day = ResolvedRateDay {
            date,
            price: base_price,
            is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
            closed_for_arrival: false,
            closed_for_departure: false,
            cancellation_policy_id: None,
            rule_id: None,
        };

        for rule in &sorted {
            if !rule.matches(date) {
                continue;
            }
            if let Some(price) = rule.price {
                day.price = price;
            }
            day.cancellation_policy_id = rule.cancellation_policy_id;
            day.closed_for_arrival = rule.closed_for_arrival;
            day.closed_for_departure = rule.closed_for_departure;
            day.rule_id = Some(rule.id);
            break; // first assignment wins
        }

        days.push(day);
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    days
}
