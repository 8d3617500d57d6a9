//! The per-account timeline arena
//!
//! All enrollment spans and premium spans for one account live in flat
//! collections keyed by identifier, with parent-id fields instead of
//! mutual object references. Lookups that care about order sort by
//! start date explicitly.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use core_kernel::{AccountId, EnrollmentSpanId, PremiumSpanId};

use crate::changes::TimelineChange;
use crate::error::EnrollmentError;
use crate::span::{CoverageType, EnrollmentSpan, PremiumSpan, PremiumStatus, SpanStatus};

/// In-memory record arena for one account
#[derive(Debug, Clone, Default)]
pub struct AccountTimeline {
    account_id: AccountId,
    spans: BTreeMap<EnrollmentSpanId, EnrollmentSpan>,
    premiums: BTreeMap<PremiumSpanId, PremiumSpan>,
}

impl AccountTimeline {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            spans: BTreeMap::new(),
            premiums: BTreeMap::new(),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    // ------------------------------------------------------------------
    // Record access
    // ------------------------------------------------------------------

    pub fn insert_span(&mut self, span: EnrollmentSpan) {
        self.spans.insert(span.id, span);
    }

    pub fn insert_premium(&mut self, premium: PremiumSpan) {
        self.premiums.insert(premium.id, premium);
    }

    pub fn span(&self, id: EnrollmentSpanId) -> Option<&EnrollmentSpan> {
        self.spans.get(&id)
    }

    pub fn span_mut(&mut self, id: EnrollmentSpanId) -> Option<&mut EnrollmentSpan> {
        self.spans.get_mut(&id)
    }

    pub fn premium(&self, id: PremiumSpanId) -> Option<&PremiumSpan> {
        self.premiums.get(&id)
    }

    pub fn premium_mut(&mut self, id: PremiumSpanId) -> Option<&mut PremiumSpan> {
        self.premiums.get_mut(&id)
    }

    pub fn spans(&self) -> impl Iterator<Item = &EnrollmentSpan> {
        self.spans.values()
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    pub fn premium_count(&self) -> usize {
        self.premiums.len()
    }

    // ------------------------------------------------------------------
    // Domain lookups
    // ------------------------------------------------------------------

    /// All spans in the given year/coverage-type partition, sorted by
    /// start date. The non-overlap invariant is scoped to one partition.
    pub fn partition(&self, year: i32, coverage_type: CoverageType) -> Vec<&EnrollmentSpan> {
        let mut spans: Vec<&EnrollmentSpan> = self
            .spans
            .values()
            .filter(|s| s.start_date.year() == year && s.coverage_type == coverage_type)
            .collect();
        spans.sort_by_key(|s| s.start_date);
        spans
    }

    /// The non-canceled span matched by group policy id. When several
    /// coverage years share a group policy, the latest span wins.
    pub fn find_active_by_group_policy(&self, group_policy_id: &str) -> Option<&EnrollmentSpan> {
        self.spans
            .values()
            .filter(|s| s.group_policy_id == group_policy_id && !s.is_canceled())
            .max_by_key(|s| s.start_date)
    }

    /// The latest span matched by group policy id regardless of status.
    /// Reinstatement targets spans that are currently canceled/termed.
    pub fn find_by_group_policy(&self, group_policy_id: &str) -> Option<&EnrollmentSpan> {
        self.spans
            .values()
            .filter(|s| s.group_policy_id == group_policy_id)
            .max_by_key(|s| s.start_date)
    }

    /// Chronological predecessors of a span starting at `start`, sorted
    /// by start date ascending.
    pub fn spans_before(&self, start: NaiveDate) -> Vec<&EnrollmentSpan> {
        let mut spans: Vec<&EnrollmentSpan> = self
            .spans
            .values()
            .filter(|s| s.start_date < start)
            .collect();
        spans.sort_by_key(|s| s.start_date);
        spans
    }

    /// Premium spans owned by a span, sorted by start date.
    pub fn premiums_of(&self, span_id: EnrollmentSpanId) -> Vec<&PremiumSpan> {
        let mut premiums: Vec<&PremiumSpan> = self
            .premiums
            .values()
            .filter(|p| p.enrollment_span_id == span_id)
            .collect();
        premiums.sort_by_key(|p| p.start_date);
        premiums
    }

    /// Active premium spans owned by a span, sorted by start date.
    pub fn active_premiums_of(&self, span_id: EnrollmentSpanId) -> Vec<&PremiumSpan> {
        self.premiums_of(span_id)
            .into_iter()
            .filter(|p| p.is_active())
            .collect()
    }

    fn active_premium_ids_of(&self, span_id: EnrollmentSpanId) -> Vec<PremiumSpanId> {
        self.active_premiums_of(span_id)
            .into_iter()
            .map(|p| p.id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Mutation operations
    //
    // Each returns the change instructions mirroring what it did, in a
    // deterministic order (premium spans by start date).
    // ------------------------------------------------------------------

    /// Pulls a span's end date in to `new_end` and truncates its premium
    /// spans: spans straddling the new end are shortened to it, spans
    /// starting after it are canceled.
    pub fn shorten_span(
        &mut self,
        span_id: EnrollmentSpanId,
        new_end: NaiveDate,
    ) -> Result<Vec<TimelineChange>, EnrollmentError> {
        let span = self
            .spans
            .get_mut(&span_id)
            .ok_or(EnrollmentError::SpanMissing(span_id))?;
        span.end_date = new_end;

        let mut changes = vec![TimelineChange::SpanShortened { span_id, new_end }];
        changes.extend(self.truncate_premiums(span_id, new_end));
        Ok(changes)
    }

    /// Voids a span: sets its end date to `new_end`, marks it canceled,
    /// and cancels every active premium span it owns.
    pub fn cancel_span(
        &mut self,
        span_id: EnrollmentSpanId,
        new_end: NaiveDate,
    ) -> Result<Vec<TimelineChange>, EnrollmentError> {
        let span = self
            .spans
            .get_mut(&span_id)
            .ok_or(EnrollmentError::SpanMissing(span_id))?;
        span.end_date = new_end;
        span.status = SpanStatus::Canceled;

        let mut changes = vec![TimelineChange::SpanCanceled { span_id }];
        for premium_id in self.active_premium_ids_of(span_id) {
            if let Some(premium) = self.premiums.get_mut(&premium_id) {
                premium.status = PremiumStatus::Canceled;
                premium.changed = true;
                changes.push(TimelineChange::PremiumCanceled {
                    premium_span_id: premium_id,
                });
            }
        }
        Ok(changes)
    }

    /// Truncates a span's active premium spans at `new_end` without
    /// touching the span itself.
    pub fn truncate_premiums(
        &mut self,
        span_id: EnrollmentSpanId,
        new_end: NaiveDate,
    ) -> Vec<TimelineChange> {
        let mut changes = Vec::new();
        for premium_id in self.active_premium_ids_of(span_id) {
            let Some(premium) = self.premiums.get_mut(&premium_id) else {
                continue;
            };
            if premium.end_date <= new_end {
                continue;
            }
            if premium.start_date <= new_end {
                premium.end_date = new_end;
                premium.changed = true;
                changes.push(TimelineChange::PremiumShortened {
                    premium_span_id: premium_id,
                    new_end,
                });
            } else {
                premium.status = PremiumStatus::Canceled;
                premium.changed = true;
                changes.push(TimelineChange::PremiumCanceled {
                    premium_span_id: premium_id,
                });
            }
        }
        changes
    }
}
