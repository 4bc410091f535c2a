//! Calendar-month billing periods.
//!
//! Periods are computed in UTC and are half-open: an instant belongs to a
//! period when `start <= instant < next_start`. The inclusive end shown to
//! users is the last millisecond of the month.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    start: DateTime<Utc>,
    next_start: DateTime<Utc>,
}

impl BillingPeriod {
    pub fn month_containing(instant: DateTime<Utc>) -> Self {
        let first_day = first_day_of_month(instant.date_naive());
        // Day 32 of any month falls inside the following one.
        let next_first_day = first_day_of_month(first_day + Duration::days(32));
        Self {
            start: first_day.and_time(NaiveTime::MIN).and_utc(),
            next_start: next_first_day.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// The calendar month immediately before this one.
    pub fn previous(&self) -> Self {
        Self::month_containing(self.start - Duration::milliseconds(1))
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive upper bound, used for range queries.
    pub fn next_start(&self) -> DateTime<Utc> {
        self.next_start
    }

    /// Inclusive end for presentation.
    pub fn last_instant(&self) -> DateTime<Utc> {
        self.next_start - Duration::milliseconds(1)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.next_start
    }

    /// `YYYY-MM`
    pub fn label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }

    pub fn summary(&self) -> PeriodSummary {
        PeriodSummary {
            label: self.label(),
            start: self.start,
            end: self.last_instant(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}
