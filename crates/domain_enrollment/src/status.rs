//! Lifecycle status determination
//!
//! Stateless classification of an enrollment span given its own
//! attributes and its chronological predecessors. First match wins:
//!
//! 1. Effectuated + delinquent + valid dates: suspended/delinquent
//!    resolution via the claim-paid-through date and the predecessor's
//!    delinquency.
//! 2. End before start: canceled.
//! 3. Effectuated: enrolled.
//! 4. Not effectuated: pre-member.
//! 5. Anything left is inconsistent input and maps to
//!    [`SpanStatus::NoValidStatus`], logged as a data-quality error.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::error;

use core_kernel::gap_days;

use crate::span::{EnrollmentSpan, SpanStatus};

/// Stateless status classifier
pub struct StatusDeterminer;

impl StatusDeterminer {
    /// Classifies `span` against its chronological predecessors.
    ///
    /// `prior` must hold the account's spans starting before this one;
    /// `today` is supplied by the caller so the engine stays clock-free.
    pub fn determine(
        span: &EnrollmentSpan,
        prior: &[&EnrollmentSpan],
        today: NaiveDate,
    ) -> SpanStatus {
        if span.effectuation_date.is_some() && span.delinquent && span.has_valid_dates() {
            return Self::delinquency_status(span, prior, today);
        }

        if span.end_date < span.start_date {
            return SpanStatus::Canceled;
        }

        if !span.delinquent {
            return if span.effectuation_date.is_some() {
                SpanStatus::Enrolled
            } else {
                SpanStatus::PreMember
            };
        }

        error!(
            span_id = %span.id,
            delinquent = span.delinquent,
            effectuated = span.effectuation_date.is_some(),
            "span attributes do not map to any lifecycle status"
        );
        SpanStatus::NoValidStatus
    }

    /// Delinquent vs suspended resolution for an effectuated span with
    /// the delinquency indicator set.
    fn delinquency_status(
        span: &EnrollmentSpan,
        prior: &[&EnrollmentSpan],
        today: NaiveDate,
    ) -> SpanStatus {
        let Some(paid_through) = span.paid_through_date else {
            return SpanStatus::Suspended;
        };

        if today <= paid_through {
            return SpanStatus::Delinquent;
        }

        // Grace period exhausted: still delinquent only while riding a
        // delinquent predecessor on the same plan with no coverage gap.
        let continues_delinquency = prior.iter().any(|p| {
            p.plan_id == span.plan_id
                && p.status == SpanStatus::Delinquent
                && gap_days(p.end_date, span.start_date) <= 1
        });
        if continues_delinquency {
            SpanStatus::Delinquent
        } else {
            SpanStatus::Suspended
        }
    }

    /// Derives the effectuation date for a newly-created span.
    ///
    /// Coverage effectuates immediately when the subscriber owes nothing
    /// (total responsible amount of exactly zero), or when it continues
    /// an already-enrolled span on the same plan with no coverage gap.
    /// Otherwise effectuation is pending.
    pub fn derive_effectuation_date(
        total_responsible: Option<Decimal>,
        plan_id: &str,
        start_date: NaiveDate,
        prior: &[&EnrollmentSpan],
        today: NaiveDate,
    ) -> Option<NaiveDate> {
        if total_responsible.is_some_and(|amount| amount.is_zero()) {
            return Some(today);
        }

        let continues_enrollment = prior.iter().any(|p| {
            p.plan_id == plan_id
                && p.status == SpanStatus::Enrolled
                && gap_days(p.end_date, start_date) <= 1
        });
        if continues_enrollment {
            Some(today)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{AccountId, EnrollmentSpanId};
    use rust_decimal_macros::dec;

    use crate::span::CoverageType;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn span(start: NaiveDate, end: NaiveDate) -> EnrollmentSpan {
        EnrollmentSpan {
            id: EnrollmentSpanId::new(),
            account_id: AccountId::new(),
            state_code: "NY".into(),
            marketplace_type: "FFM".into(),
            business_unit: "IND".into(),
            coverage_type: CoverageType::Family,
            start_date: start,
            end_date: end,
            exchange_subscriber_id: "SUB001".into(),
            effectuation_date: None,
            delinquent: false,
            paid_through_date: None,
            plan_id: "PLAN-A".into(),
            group_policy_id: "GP-1".into(),
            status: SpanStatus::PreMember,
        }
    }

    #[test]
    fn test_effectuated_span_is_enrolled() {
        let mut s = span(d(2023, 1, 1), d(2023, 12, 31));
        s.effectuation_date = Some(d(2023, 1, 1));
        assert_eq!(
            StatusDeterminer::determine(&s, &[], d(2023, 2, 1)),
            SpanStatus::Enrolled
        );
    }

    #[test]
    fn test_pending_span_is_pre_member() {
        let s = span(d(2023, 1, 1), d(2023, 12, 31));
        assert_eq!(
            StatusDeterminer::determine(&s, &[], d(2023, 2, 1)),
            SpanStatus::PreMember
        );
    }

    #[test]
    fn test_inverted_dates_are_canceled_regardless() {
        let mut s = span(d(2023, 6, 1), d(2023, 5, 31));
        s.effectuation_date = Some(d(2023, 6, 1));
        s.delinquent = true;
        assert_eq!(
            StatusDeterminer::determine(&s, &[], d(2023, 7, 1)),
            SpanStatus::Canceled
        );
    }

    #[test]
    fn test_delinquent_without_paid_through_is_suspended() {
        let mut s = span(d(2023, 1, 1), d(2023, 12, 31));
        s.effectuation_date = Some(d(2023, 1, 1));
        s.delinquent = true;
        assert_eq!(
            StatusDeterminer::determine(&s, &[], d(2023, 7, 1)),
            SpanStatus::Suspended
        );
    }

    #[test]
    fn test_inside_grace_period_is_delinquent() {
        let mut s = span(d(2023, 1, 1), d(2023, 12, 31));
        s.effectuation_date = Some(d(2023, 1, 1));
        s.delinquent = true;
        s.paid_through_date = Some(d(2023, 8, 31));
        assert_eq!(
            StatusDeterminer::determine(&s, &[], d(2023, 8, 31)),
            SpanStatus::Delinquent
        );
    }

    #[test]
    fn test_exhausted_grace_follows_predecessor() {
        let mut prior = span(d(2022, 1, 1), d(2022, 12, 31));
        prior.status = SpanStatus::Delinquent;

        let mut s = span(d(2023, 1, 1), d(2023, 12, 31));
        s.effectuation_date = Some(d(2023, 1, 1));
        s.delinquent = true;
        s.paid_through_date = Some(d(2023, 3, 31));

        // adjacent delinquent predecessor on the same plan keeps it delinquent
        assert_eq!(
            StatusDeterminer::determine(&s, &[&prior], d(2023, 7, 1)),
            SpanStatus::Delinquent
        );

        // gap in coverage breaks the chain
        let mut gapped = prior.clone();
        gapped.end_date = d(2022, 11, 30);
        assert_eq!(
            StatusDeterminer::determine(&s, &[&gapped], d(2023, 7, 1)),
            SpanStatus::Suspended
        );

        // different plan breaks the chain
        let mut other_plan = prior.clone();
        other_plan.plan_id = "PLAN-B".into();
        assert_eq!(
            StatusDeterminer::determine(&s, &[&other_plan], d(2023, 7, 1)),
            SpanStatus::Suspended
        );
    }

    #[test]
    fn test_delinquent_but_never_effectuated_is_invalid() {
        let mut s = span(d(2023, 1, 1), d(2023, 12, 31));
        s.delinquent = true;
        assert_eq!(
            StatusDeterminer::determine(&s, &[], d(2023, 7, 1)),
            SpanStatus::NoValidStatus
        );
    }

    #[test]
    fn test_effectuation_from_zero_responsibility() {
        let today = d(2023, 5, 15);
        assert_eq!(
            StatusDeterminer::derive_effectuation_date(
                Some(dec!(0)),
                "PLAN-A",
                d(2023, 6, 1),
                &[],
                today
            ),
            Some(today)
        );
    }

    #[test]
    fn test_effectuation_from_continuous_enrollment() {
        let today = d(2023, 5, 15);
        let mut prior = span(d(2023, 1, 1), d(2023, 5, 31));
        prior.status = SpanStatus::Enrolled;

        assert_eq!(
            StatusDeterminer::derive_effectuation_date(
                Some(dec!(120)),
                "PLAN-A",
                d(2023, 6, 1),
                &[&prior],
                today
            ),
            Some(today)
        );

        // no predecessor: effectuation stays pending
        assert_eq!(
            StatusDeterminer::derive_effectuation_date(
                Some(dec!(120)),
                "PLAN-A",
                d(2023, 6, 1),
                &[],
                today
            ),
            None
        );
    }
}
