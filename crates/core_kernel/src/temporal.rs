//! Date-interval math for enrollment timelines
//!
//! Every coverage date in the system is a whole calendar day with
//! inclusive bounds on both ends. The overlap and gap arithmetic lives
//! here so that span resolution, status derivation, and premium
//! reconciliation all share one boundary contract instead of computing
//! it ad hoc.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Date arithmetic out of range at {0}")]
    OutOfRange(NaiveDate),
}

/// Returns true iff the two inclusive day-ranges overlap.
///
/// The contract is `a_end > b_start && a_start < b_end`: ranges that
/// merely touch at a shared boundary day do not overlap, and adjacent
/// ranges (one ending the day before the next starts) never overlap.
pub fn overlaps(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_end > b_start && a_start < b_end
}

/// Days from a prior range's end to the next range's start.
///
/// 1 means adjacent (no gap), greater than 1 means a coverage gap,
/// zero or negative means the ranges overlap.
pub fn gap_days(prior_end: NaiveDate, next_start: NaiveDate) -> i64 {
    (next_start - prior_end).num_days()
}

/// December 31 of the given year.
pub fn year_end(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// December 31 of the year containing `date`.
pub fn year_end_of(date: NaiveDate) -> NaiveDate {
    year_end(date.year())
}

/// The calendar day before `date`.
pub fn day_before(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(NaiveDate::MIN)
}

/// The calendar day after `date`.
pub fn day_after(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(NaiveDate::MAX)
}

/// An inclusive range of calendar days
///
/// Used for coverage periods and their financial sub-periods. Both
/// bounds are part of the range: `[2023-01-01, 2023-12-31]` covers the
/// whole year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering `start` through December 31 of the same year.
    pub fn through_year_end(start: NaiveDate) -> Self {
        Self {
            start,
            end: year_end_of(start),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    /// Number of days covered, counting both bounds.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Gap between this range and a later one. See [`gap_days`].
    pub fn gap_to(&self, next: &DateRange) -> i64 {
        gap_days(self.end, next.start)
    }
}
