//! Occurrence generation: anchor + repeat interval → lazy sequence of dates.
//!
//! [`Occurrences`] starts at the anchor, advances by one interval per step and
//! stops as soon as the next candidate lies past the horizon. It holds no
//! state beyond its cursor, so two sequences built from the same inputs yield
//! the same values; clone one to restart it.
//!
//! Month steps follow the modulo rollover used by existing data
//! ([`MonthRollover::Wrap`]): the target month is
//! `((month - 1 + n) mod 12) + 1` and the year is kept as is. Because such a
//! step can land earlier in the year than the current occurrence, the
//! sequence ends at the first step that does not move forward in time.

use std::fmt;
use std::iter::FusedIterator;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::RecurrenceError;
use crate::subscription::IntervalUnit;

// ── Month rollover ──────────────────────────────────────────────────

/// How month steps that pass December are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthRollover {
    /// Wrap the month number and keep the year.
    #[default]
    Wrap,
    /// Calendar month addition, carrying into the following year(s).
    Carry,
}

impl FromStr for MonthRollover {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wrap" => Ok(MonthRollover::Wrap),
            "carry" => Ok(MonthRollover::Carry),
            other => Err(format!("unknown month rollover '{other}' (expected wrap|carry)")),
        }
    }
}

impl fmt::Display for MonthRollover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthRollover::Wrap => f.write_str("wrap"),
            MonthRollover::Carry => f.write_str("carry"),
        }
    }
}

// ── Interval ────────────────────────────────────────────────────────

/// A repeat interval: `value` whole `unit`s.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub value: u32,
    pub unit: IntervalUnit,
}

impl Interval {
    pub fn new(value: u32, unit: IntervalUnit) -> Self {
        Self { value, unit }
    }

    pub fn days(value: u32) -> Self {
        Self::new(value, IntervalUnit::Days)
    }

    pub fn weeks(value: u32) -> Self {
        Self::new(value, IntervalUnit::Weeks)
    }

    pub fn months(value: u32) -> Self {
        Self::new(value, IntervalUnit::Months)
    }

    pub fn years(value: u32) -> Self {
        Self::new(value, IntervalUnit::Years)
    }

    /// Advance `from` by exactly one interval.
    ///
    /// Time of day is always preserved. Month and year steps keep the
    /// day-of-month and fail with [`RecurrenceError::InvalidCalendarDate`]
    /// when that day does not exist in the target month (Jan 31 → Feb 31,
    /// Feb 29 → a non-leap year).
    pub fn advance(
        &self,
        from: NaiveDateTime,
        rollover: MonthRollover,
    ) -> Result<NaiveDateTime, RecurrenceError> {
        let invalid = || RecurrenceError::InvalidCalendarDate {
            from,
            amount: self.value,
            unit: self.unit.clone(),
        };

        match &self.unit {
            IntervalUnit::Days => from
                .checked_add_signed(Duration::days(i64::from(self.value)))
                .ok_or_else(invalid),
            IntervalUnit::Weeks => from
                .checked_add_signed(Duration::weeks(i64::from(self.value)))
                .ok_or_else(invalid),
            IntervalUnit::Months => {
                let (year, month) = match rollover {
                    MonthRollover::Wrap => (from.year(), wrapped_month(from.month(), self.value)),
                    MonthRollover::Carry => carried_month(from.year(), from.month(), self.value)
                        .ok_or_else(invalid)?,
                };
                NaiveDate::from_ymd_opt(year, month, from.day())
                    .map(|date| date.and_time(from.time()))
                    .ok_or_else(invalid)
            }
            IntervalUnit::Years => {
                let year = i32::try_from(self.value)
                    .ok()
                    .and_then(|n| from.year().checked_add(n))
                    .ok_or_else(invalid)?;
                from.with_year(year).ok_or_else(invalid)
            }
            IntervalUnit::Unknown(raw) => Err(RecurrenceError::InvalidInterval(raw.clone())),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// `((month - 1 + n) mod 12) + 1`, year untouched.
fn wrapped_month(month: u32, n: u32) -> u32 {
    ((month - 1 + n % 12) % 12) + 1
}

fn carried_month(year: i32, month: u32, n: u32) -> Option<(i32, u32)> {
    let zero_based = i64::from(month - 1) + i64::from(n);
    let year = i64::from(year) + zero_based / 12;
    let month = (zero_based % 12) as u32 + 1;
    i32::try_from(year).ok().map(|y| (y, month))
}

// ── Occurrence sequence ─────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Cursor {
    At(NaiveDateTime),
    Failed(RecurrenceError),
    Done,
}

/// Lazy, finite sequence of occurrences from an anchor up to a horizon.
///
/// Yields `Ok(date)` for every occurrence not after the horizon, in
/// ascending order. If advancing fails, the failure is yielded once as
/// `Err` and the sequence ends. An unknown interval unit produces an empty
/// sequence.
#[derive(Debug, Clone)]
pub struct Occurrences {
    cursor: Cursor,
    interval: Interval,
    horizon: NaiveDateTime,
    rollover: MonthRollover,
}

/// Occurrences of `interval` starting at `anchor`, bounded by `horizon`.
pub fn occurrences(anchor: NaiveDateTime, interval: Interval, horizon: NaiveDateTime) -> Occurrences {
    Occurrences::new(anchor, interval, horizon)
}

impl Occurrences {
    pub fn new(anchor: NaiveDateTime, interval: Interval, horizon: NaiveDateTime) -> Self {
        let cursor = if interval.unit.is_known() && interval.value > 0 {
            Cursor::At(anchor)
        } else {
            debug!(
                interval = %interval,
                "interval cannot be advanced, occurrence sequence is empty"
            );
            Cursor::Done
        };
        Self {
            cursor,
            interval,
            horizon,
            rollover: MonthRollover::default(),
        }
    }

    pub fn with_rollover(mut self, rollover: MonthRollover) -> Self {
        self.rollover = rollover;
        self
    }
}

impl Iterator for Occurrences {
    type Item = Result<NaiveDateTime, RecurrenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::At(current) => {
                if current > self.horizon {
                    return None;
                }
                self.cursor = match self.interval.advance(current, self.rollover) {
                    Ok(candidate) if candidate > current => Cursor::At(candidate),
                    Ok(candidate) => {
                        debug!(
                            %current,
                            %candidate,
                            interval = %self.interval,
                            "month step wrapped backwards, ending occurrence sequence"
                        );
                        Cursor::Done
                    }
                    Err(e) => Cursor::Failed(e),
                };
                Some(Ok(current))
            }
            Cursor::Failed(e) => Some(Err(e)),
            Cursor::Done => None,
        }
    }
}

impl FusedIterator for Occurrences {}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn collect_ok(seq: Occurrences) -> Vec<NaiveDateTime> {
        seq.map(|r| r.expect("occurrence")).collect()
    }

    #[test]
    fn biweekly_stops_before_a_horizon_it_would_pass() {
        let anchor = date(2024, 3, 1);
        let got = collect_ok(occurrences(anchor, Interval::weeks(2), anchor + Duration::days(40)));
        assert_eq!(got, vec![date(2024, 3, 1), date(2024, 3, 15), date(2024, 3, 29)]);
    }

    #[test]
    fn biweekly_includes_occurrence_on_the_horizon() {
        let anchor = date(2024, 3, 1);
        let got = collect_ok(occurrences(anchor, Interval::weeks(2), anchor + Duration::days(42)));
        assert_eq!(
            got,
            vec![
                date(2024, 3, 1),
                date(2024, 3, 15),
                date(2024, 3, 29),
                date(2024, 4, 12),
            ]
        );
    }

    #[test]
    fn fixed_steps_are_exact_and_bounded() {
        let anchor = NaiveDate::from_ymd_opt(2023, 12, 30)
            .unwrap()
            .and_hms_opt(7, 45, 0)
            .unwrap();
        let cases = [
            (Interval::days(3), Duration::days(3)),
            (Interval::days(1), Duration::days(1)),
            (Interval::weeks(1), Duration::days(7)),
            (Interval::weeks(5), Duration::days(35)),
        ];
        let horizon = anchor + Duration::days(400);

        for (interval, step) in cases {
            let got = collect_ok(occurrences(anchor, interval.clone(), horizon));
            assert_eq!(got[0], anchor, "{interval}");
            for pair in got.windows(2) {
                assert_eq!(pair[1] - pair[0], step, "{interval}");
            }
            assert!(got.iter().all(|t| *t <= horizon), "{interval}");
            let last = *got.last().unwrap();
            assert!(last + step > horizon, "{interval} stopped early");
        }
    }

    #[test]
    fn yearly_steps_keep_month_and_day() {
        let got = collect_ok(occurrences(
            date(2020, 6, 15),
            Interval::years(2),
            date(2027, 1, 1),
        ));
        assert_eq!(
            got,
            vec![date(2020, 6, 15), date(2022, 6, 15), date(2024, 6, 15), date(2026, 6, 15)]
        );
    }

    #[test]
    fn month_step_wraps_without_year_carry() {
        let from = date(2024, 11, 10);
        let next = Interval::months(3).advance(from, MonthRollover::Wrap).unwrap();
        assert_eq!(next, date(2024, 2, 10));
    }

    #[test]
    fn month_step_formula_holds_for_all_months() {
        for month in 1..=12u32 {
            for n in [1u32, 2, 5, 11, 12, 13, 25] {
                let from = date(2023, month, 5);
                let next = Interval::months(n).advance(from, MonthRollover::Wrap).unwrap();
                assert_eq!(next.month(), ((month - 1 + n) % 12) + 1, "month {month} + {n}");
                assert_eq!(next.year(), 2023);
                assert_eq!(next.day(), 5);
            }
        }
    }

    #[test]
    fn monthly_sequence_stops_when_step_wraps_backwards() {
        let got = collect_ok(occurrences(
            date(2024, 10, 5),
            Interval::months(1),
            date(2030, 1, 1),
        ));
        assert_eq!(got, vec![date(2024, 10, 5), date(2024, 11, 5), date(2024, 12, 5)]);
    }

    #[test]
    fn carry_rollover_crosses_year_boundary() {
        let got = collect_ok(
            occurrences(date(2024, 11, 10), Interval::months(3), date(2025, 12, 31))
                .with_rollover(MonthRollover::Carry),
        );
        assert_eq!(
            got,
            vec![date(2024, 11, 10), date(2025, 2, 10), date(2025, 5, 10), date(2025, 8, 10), date(2025, 11, 10)]
        );
    }

    #[test]
    fn jan_31_monthly_fails_on_second_occurrence() {
        let mut seq = occurrences(date(2024, 1, 31), Interval::months(1), date(2024, 12, 31));
        assert_eq!(seq.next(), Some(Ok(date(2024, 1, 31))));
        match seq.next() {
            Some(Err(RecurrenceError::InvalidCalendarDate { from, amount, unit })) => {
                assert_eq!(from, date(2024, 1, 31));
                assert_eq!(amount, 1);
                assert_eq!(unit, IntervalUnit::Months);
            }
            other => panic!("expected calendar error, got {other:?}"),
        }
        assert_eq!(seq.next(), None);
    }

    #[test]
    fn leap_day_yearly_fails_on_non_leap_year() {
        let mut seq = occurrences(date(2024, 2, 29), Interval::years(1), date(2030, 1, 1));
        assert_eq!(seq.next(), Some(Ok(date(2024, 2, 29))));
        assert!(matches!(
            seq.next(),
            Some(Err(RecurrenceError::InvalidCalendarDate { .. }))
        ));
        assert_eq!(seq.next(), None);
    }

    #[test]
    fn unknown_unit_is_empty_not_an_error() {
        let interval = Interval::new(1, IntervalUnit::Unknown("hours".to_string()));
        let mut seq = occurrences(date(2024, 1, 1), interval.clone(), date(2024, 12, 31));
        assert_eq!(seq.next(), None);
        assert_eq!(
            interval.advance(date(2024, 1, 1), MonthRollover::Wrap),
            Err(RecurrenceError::InvalidInterval("hours".to_string()))
        );
    }

    #[test]
    fn anchor_after_horizon_is_empty() {
        let mut seq = occurrences(date(2025, 1, 1), Interval::days(1), date(2024, 12, 31));
        assert_eq!(seq.next(), None);
    }

    #[test]
    fn anchor_on_horizon_is_included() {
        let got = collect_ok(occurrences(date(2024, 5, 1), Interval::days(1), date(2024, 5, 1)));
        assert_eq!(got, vec![date(2024, 5, 1)]);
    }

    #[test]
    fn identical_inputs_yield_identical_sequences() {
        let build = || occurrences(date(2022, 1, 9), Interval::weeks(3), date(2023, 1, 1));
        let first: Vec<_> = build().collect();
        let second: Vec<_> = build().collect();
        assert_eq!(first, second);

        let seq = build();
        let restarted: Vec<_> = seq.clone().collect();
        assert_eq!(seq.collect::<Vec<_>>(), restarted);
    }

    #[test]
    fn rollover_parses_from_config_strings() {
        assert_eq!("wrap".parse::<MonthRollover>(), Ok(MonthRollover::Wrap));
        assert_eq!(" CARRY ".parse::<MonthRollover>(), Ok(MonthRollover::Carry));
        assert!("calendar".parse::<MonthRollover>().is_err());
    }
}
