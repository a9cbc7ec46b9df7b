//! Time windows and interval validation for calendar events.
//!
//! This module provides [`EventWindow`] for expressing listing query ranges,
//! and [`validate_interval`] for the time rules every event must satisfy
//! before it is sent to a provider.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum duration of a single calendar event, in hours.
pub const MAX_EVENT_DURATION_HOURS: i64 = 24;

/// Validates the time rules for an event interval.
///
/// The end must be strictly after the start, and the total duration must not
/// exceed [`MAX_EVENT_DURATION_HOURS`]. Callers run this before any provider
/// call, so a violating request never reaches the network.
pub fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ValidationError> {
    if end <= start {
        return Err(ValidationError::EndNotAfterStart);
    }
    if end - start > Duration::hours(MAX_EVENT_DURATION_HOURS) {
        return Err(ValidationError::DurationTooLong(MAX_EVENT_DURATION_HOURS));
    }
    Ok(())
}

/// The UTC range an event listing covers, half-open as `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound.
    pub end: DateTime<Utc>,
}

impl EventWindow {
    /// # Panics
    ///
    /// Panics when `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "EventWindow start must be <= end");
        Self { start, end }
    }

    /// Creates the default listing window: start of the current UTC day
    /// through the end of the day `days` out.
    pub fn lookahead(now: DateTime<Utc>, days: i64) -> Self {
        let today = now.date_naive();
        let start = today.and_time(NaiveTime::MIN).and_utc();
        let end = (today + Duration::days(days + 1))
            .and_time(NaiveTime::MIN)
            .and_utc();
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether `dt` falls inside the window. The end bound is excluded.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }
}
