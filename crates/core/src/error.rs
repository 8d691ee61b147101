use chrono::NaiveDateTime;
use thiserror::Error;

use crate::subscription::IntervalUnit;

/// Failures while generating occurrences for a single subscription.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    /// The interval unit is not one of days/weeks/months/years.
    #[error("Unknown interval unit: {0}")]
    InvalidInterval(String),

    /// Advancing produced a date that does not exist (e.g. Feb 31).
    #[error("Advancing {from} by {amount} {unit} does not produce a valid calendar date")]
    InvalidCalendarDate {
        from: NaiveDateTime,
        amount: u32,
        unit: IntervalUnit,
    },
}

/// Rejections of malformed subscription input at the request boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("amount must be a positive number, got {0}")]
    InvalidAmount(String),

    #[error("intervalValue must be at least 1")]
    ZeroInterval,

    #[error("intervalUnit must be one of days, weeks, months, years (got '{0}')")]
    UnknownIntervalUnit(String),

    #[error("notifications are enabled but no notify topic is configured")]
    MissingNotifyTopic,

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
}
