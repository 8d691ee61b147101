//! Bounded lookahead windows over occurrence sequences.
//!
//! Two windows are used:
//! - listing: `[now, now + 30 days]`, for "upcoming" displays
//! - dispatch: `[now, now + 24 hours)`, for one notification cycle
//!
//! The window end is passed to the calculator as its horizon so iteration
//! stops there; the filter itself re-checks the lower bound and the
//! end-inclusivity.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::error::RecurrenceError;
use crate::recurrence::{MonthRollover, Occurrences};
use crate::subscription::Subscription;

pub const LISTING_WINDOW_DAYS: i64 = 30;
pub const DISPATCH_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowEnd {
    Inclusive,
    Exclusive,
}

/// A time range with an inclusive start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub end_bound: WindowEnd,
}

impl Window {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, end_bound: WindowEnd) -> Self {
        Self {
            start,
            end,
            end_bound,
        }
    }

    /// `[now, now + 30 days]`.
    pub fn listing(now: NaiveDateTime) -> Self {
        Self::new(now, now + Duration::days(LISTING_WINDOW_DAYS), WindowEnd::Inclusive)
    }

    /// `[now, now + 24h)`.
    pub fn dispatch(now: NaiveDateTime) -> Self {
        Self::new(now, now + Duration::hours(DISPATCH_WINDOW_HOURS), WindowEnd::Exclusive)
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        if t < self.start {
            return false;
        }
        match self.end_bound {
            WindowEnd::Inclusive => t <= self.end,
            WindowEnd::Exclusive => t < self.end,
        }
    }

    /// Occurrence sequence for `subscription`, bounded by this window's end.
    pub fn schedule(&self, subscription: &Subscription, rollover: MonthRollover) -> Occurrences {
        Occurrences::new(subscription.due_date, subscription.interval(), self.end)
            .with_rollover(rollover)
    }

    /// Keep the occurrences that fall inside the window, in input order.
    ///
    /// Stops at the first error; occurrences collected before it are lost.
    pub fn filter<I>(&self, occurrences: I) -> Result<Vec<NaiveDateTime>, RecurrenceError>
    where
        I: IntoIterator<Item = Result<NaiveDateTime, RecurrenceError>>,
    {
        let mut kept = Vec::new();
        for occurrence in occurrences {
            let t = occurrence?;
            if self.contains(t) {
                kept.push(t);
            }
        }
        Ok(kept)
    }

    /// Like [`filter`](Self::filter), but keeps what was collected before an
    /// error and reports the error alongside.
    pub fn filter_partial<I>(&self, occurrences: I) -> Upcoming
    where
        I: IntoIterator<Item = Result<NaiveDateTime, RecurrenceError>>,
    {
        let mut upcoming = Upcoming::default();
        for occurrence in occurrences {
            match occurrence {
                Ok(t) if self.contains(t) => upcoming.occurrences.push(t),
                Ok(_) => {}
                Err(e) => {
                    upcoming.error = Some(e);
                    break;
                }
            }
        }
        upcoming
    }
}

/// Listing-window result: occurrences plus the failure that cut them short.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Upcoming {
    pub occurrences: Vec<NaiveDateTime>,
    pub error: Option<RecurrenceError>,
}

/// Listing-window occurrences of `subscription` as seen at `now`.
pub fn list_upcoming_occurrences(
    subscription: &Subscription,
    now: NaiveDateTime,
    rollover: MonthRollover,
) -> Upcoming {
    let window = Window::listing(now);
    let upcoming = window.filter_partial(window.schedule(subscription, rollover));
    if let Some(e) = &upcoming.error {
        tracing::warn!(
            subscription_id = subscription.id,
            error = %e,
            "upcoming occurrence listing cut short"
        );
    }
    upcoming
}
