//! Overlap resolution for newly-arriving coverage periods
//!
//! When an ADD transaction lands on a timeline that already has coverage
//! in the same year/coverage-type partition, the existing spans must
//! yield before the new span is created. The span straddling the new
//! start date is shortened (or canceled outright when the starts
//! coincide); every other overlapping span is superseded entirely and
//! canceled. Resolution is planned against the current timeline first,
//! then applied, so the two-pass validation flow can hold the plan
//! across an external round trip.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use core_kernel::{day_before, EnrollmentSpanId};

use crate::changes::ChangeSet;
use crate::error::EnrollmentError;
use crate::span::CoverageType;
use crate::timeline::AccountTimeline;

/// A planned disposition for one existing span displaced by a new period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanResolution {
    /// The span straddles the new start from before it: pull its end in
    /// to the day before the new start.
    Shorten {
        span_id: EnrollmentSpanId,
        new_end: NaiveDate,
    },
    /// The span is fully superseded (or starts exactly on the new
    /// start): void it.
    Cancel {
        span_id: EnrollmentSpanId,
        new_end: NaiveDate,
    },
}

impl SpanResolution {
    pub fn span_id(&self) -> EnrollmentSpanId {
        match self {
            SpanResolution::Shorten { span_id, .. } | SpanResolution::Cancel { span_id, .. } => {
                *span_id
            }
        }
    }
}

/// Resolves temporal overlaps between a new coverage period and the
/// account's existing spans
pub struct OverlapResolver;

impl OverlapResolver {
    /// Plans the resolution for a new `[new_start, new_end]` period.
    ///
    /// The candidate set is every span in the same start-year and
    /// coverage-type partition that is not canceled, ends after the new
    /// start, and starts before the new end. Within it, at most one
    /// span may straddle the new start; finding more is an unresolved
    /// timeline state and rejects the transaction.
    ///
    /// # Errors
    ///
    /// `AmbiguousOverlap` when more than one candidate straddles the
    /// new start date.
    pub fn plan(
        timeline: &AccountTimeline,
        new_start: NaiveDate,
        new_end: NaiveDate,
        coverage_type: CoverageType,
    ) -> Result<Vec<SpanResolution>, EnrollmentError> {
        let candidates: Vec<_> = timeline
            .spans()
            .filter(|s| {
                s.start_date.year() == new_start.year()
                    && s.coverage_type == coverage_type
                    && !s.is_canceled()
                    && s.end_date > new_start
                    && s.start_date < new_end
            })
            .collect();

        let straddling: Vec<_> = candidates
            .iter()
            .filter(|s| s.straddles(new_start))
            .collect();

        if straddling.len() > 1 {
            let span_ids: Vec<EnrollmentSpanId> = straddling.iter().map(|s| s.id).collect();
            error!(
                new_start = %new_start,
                count = span_ids.len(),
                "multiple spans straddle the new start date; timeline is in an unresolved state"
            );
            return Err(EnrollmentError::AmbiguousOverlap {
                start: new_start,
                span_ids,
            });
        }

        let straddler_id = straddling.first().map(|s| s.id);
        let mut plan = Vec::with_capacity(candidates.len());

        if let Some(straddler) = straddling.first() {
            if straddler.start_date < new_start {
                plan.push(SpanResolution::Shorten {
                    span_id: straddler.id,
                    new_end: day_before(new_start),
                });
            } else {
                // starts exactly on the new start: void it in place
                plan.push(SpanResolution::Cancel {
                    span_id: straddler.id,
                    new_end: straddler.start_date,
                });
            }
        }

        // every other overlapping span is fully superseded
        let mut superseded: Vec<_> = candidates
            .iter()
            .filter(|s| Some(s.id) != straddler_id)
            .collect();
        superseded.sort_by_key(|s| s.start_date);
        for span in superseded {
            plan.push(SpanResolution::Cancel {
                span_id: span.id,
                new_end: span.start_date,
            });
        }

        debug!(
            new_start = %new_start,
            new_end = %new_end,
            resolutions = plan.len(),
            "planned overlap resolution"
        );
        Ok(plan)
    }

    /// Applies one planned resolution to the timeline, recording the
    /// mutations in `changes`.
    pub fn apply(
        timeline: &mut AccountTimeline,
        resolution: &SpanResolution,
        changes: &mut ChangeSet,
    ) -> Result<(), EnrollmentError> {
        match resolution {
            SpanResolution::Shorten { span_id, new_end } => {
                changes.extend(timeline.shorten_span(*span_id, *new_end)?);
            }
            SpanResolution::Cancel { span_id, new_end } => {
                changes.extend(timeline.cancel_span(*span_id, *new_end)?);
            }
        }
        Ok(())
    }
}
