// src/quota.rs
//! Fetch-quota governor: a counter keyed by calendar day and month,
//! consulted before any upstream call is attempted. Pure decision logic;
//! the caller loads and persists the state around it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Max upstream API calls per day (free-tier budget).
pub const DAILY_FETCH_LIMIT: u32 = 5;
/// Hard monthly ceiling; once reached, all fetches are refused for the
/// rest of the month regardless of the daily count.
pub const MAX_MONTHLY_FETCHES: u32 = 150;

/// Per-month usage bookkeeping, kept across day rollovers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthStats {
    pub fetches: u32,
    pub store_writes: u32,
}

/// Persisted counter document. `date` and `count` track today's usage;
/// `monthly_stats` maps `YYYY-MM` keys to cumulative usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub date: String,
    pub count: u32,
    #[serde(default)]
    pub monthly_stats: BTreeMap<String, MonthStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_time: Option<DateTime<Utc>>,
}

impl QuotaState {
    /// Safe default when the store is unreadable: accounting restarts at
    /// zero rather than halting news delivery (best-effort quota under
    /// storage outage).
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            date: day_key(today),
            ..Self::default()
        }
    }
}

pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaRefusal {
    DailyCapReached,
    MonthlyCapReached,
}

impl fmt::Display for QuotaRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DailyCapReached => {
                write!(f, "Daily limit of {DAILY_FETCH_LIMIT} fetches reached")
            }
            Self::MonthlyCapReached => {
                write!(f, "Monthly limit of {MAX_MONTHLY_FETCHES} fetches reached")
            }
        }
    }
}

/// Outcome of a reservation attempt. `state` must be persisted by the
/// caller whether or not the fetch was allowed, so a refusal is itself
/// durably recorded.
#[derive(Debug, Clone)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub refusal: Option<QuotaRefusal>,
    pub state: QuotaState,
}

/// Decide whether a fetch may proceed today and reserve the slot.
///
/// Rollover resets the daily count when the stored date differs from
/// `today`; monthly stats survive rollovers. The monthly cap is checked
/// before the daily cap. On approval both counters are incremented,
/// together with the store-write tally for the month.
pub fn evaluate_and_reserve(today: NaiveDate, prior: QuotaState) -> QuotaDecision {
    let mut state = prior;

    let day = day_key(today);
    if state.date != day {
        state.date = day;
        state.count = 0;
    }

    let month = month_key(today);
    let month_fetches = state.monthly_stats.entry(month.clone()).or_default().fetches;

    if month_fetches >= MAX_MONTHLY_FETCHES {
        return QuotaDecision {
            allowed: false,
            refusal: Some(QuotaRefusal::MonthlyCapReached),
            state,
        };
    }

    if state.count >= DAILY_FETCH_LIMIT {
        return QuotaDecision {
            allowed: false,
            refusal: Some(QuotaRefusal::DailyCapReached),
            state,
        };
    }

    state.count += 1;
    let stats = state.monthly_stats.entry(month).or_default();
    stats.fetches += 1;
    stats.store_writes += 1;

    QuotaDecision {
        allowed: true,
        refusal: None,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fresh_state_allows_and_counts() {
        let today = date(2025, 7, 21);
        let d = evaluate_and_reserve(today, QuotaState::empty(today));
        assert!(d.allowed);
        assert_eq!(d.refusal, None);
        assert_eq!(d.state.count, 1);
        let stats = d.state.monthly_stats.get("2025-07").unwrap();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.store_writes, 1);
    }

    #[test]
    fn new_day_rollover_resets_daily_count() {
        let prior = QuotaState {
            date: "2025-07-20".into(),
            count: DAILY_FETCH_LIMIT,
            ..QuotaState::default()
        };
        let d = evaluate_and_reserve(date(2025, 7, 21), prior);
        assert!(d.allowed, "exhausted yesterday must not block today");
        assert_eq!(d.state.date, "2025-07-21");
        assert_eq!(d.state.count, 1);
    }

    #[test]
    fn rollover_keeps_monthly_stats() {
        let mut prior = QuotaState {
            date: "2025-07-20".into(),
            count: 3,
            ..QuotaState::default()
        };
        prior.monthly_stats.insert(
            "2025-07".into(),
            MonthStats {
                fetches: 40,
                store_writes: 40,
            },
        );
        let d = evaluate_and_reserve(date(2025, 7, 21), prior);
        assert!(d.allowed);
        assert_eq!(d.state.monthly_stats.get("2025-07").unwrap().fetches, 41);
    }

    #[test]
    fn daily_cap_refuses_and_leaves_count() {
        let today = date(2025, 7, 21);
        let prior = QuotaState {
            date: day_key(today),
            count: DAILY_FETCH_LIMIT,
            ..QuotaState::default()
        };
        let d = evaluate_and_reserve(today, prior);
        assert!(!d.allowed);
        assert_eq!(d.refusal, Some(QuotaRefusal::DailyCapReached));
        assert_eq!(d.state.count, DAILY_FETCH_LIMIT, "count stays put");
    }

    #[test]
    fn monthly_cap_wins_over_fresh_day() {
        let today = date(2025, 7, 21);
        let mut prior = QuotaState::empty(today);
        prior.monthly_stats.insert(
            month_key(today),
            MonthStats {
                fetches: MAX_MONTHLY_FETCHES,
                store_writes: MAX_MONTHLY_FETCHES,
            },
        );
        let d = evaluate_and_reserve(today, prior);
        assert!(!d.allowed);
        assert_eq!(d.refusal, Some(QuotaRefusal::MonthlyCapReached));
        assert_eq!(d.state.count, 0, "daily count untouched");
        assert_eq!(
            d.state.monthly_stats.get("2025-07").unwrap().fetches,
            MAX_MONTHLY_FETCHES
        );
    }

    #[test]
    fn five_reservations_then_refusal() {
        let today = date(2025, 7, 21);
        let mut state = QuotaState::empty(today);
        for i in 1..=DAILY_FETCH_LIMIT {
            let d = evaluate_and_reserve(today, state);
            assert!(d.allowed, "reservation {i} should pass");
            state = d.state;
        }
        let d = evaluate_and_reserve(today, state);
        assert!(!d.allowed);
        assert_eq!(d.refusal, Some(QuotaRefusal::DailyCapReached));
    }

    #[test]
    fn state_round_trips_through_json_with_camel_case_keys() {
        let today = date(2025, 7, 21);
        let d = evaluate_and_reserve(today, QuotaState::empty(today));
        let v = serde_json::to_value(&d.state).unwrap();
        assert!(v.get("monthlyStats").is_some());
        assert!(v["monthlyStats"]["2025-07"].get("storeWrites").is_some());
        assert!(v.get("lastError").is_none(), "absent diagnostics omitted");
        let back: QuotaState = serde_json::from_value(v).unwrap();
        assert_eq!(back, d.state);
    }
}
