//! Premium span reconciliation
//!
//! Transaction rate line-items arrive as a flat list of dated amounts.
//! Reconciliation slices them into dated sub-periods (one per
//! total-premium item, each ending the day before the next begins, the
//! last at the enrollment span's end) and either builds premium spans
//! from scratch (ADD) or diffs the slices against the span's existing
//! premium spans (financial CHANGE), emitting one [`PremiumUpdate`]
//! instruction per matched span.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{day_before, PremiumSpanId};

use crate::changes::{ChangeSet, TimelineChange};
use crate::error::EnrollmentError;
use crate::span::{EnrollmentSpan, PremiumAmounts, PremiumSpan, PremiumStatus};
use crate::timeline::AccountTimeline;
use crate::transaction::{EnrollmentTransaction, RateCode, RateLineItem};

/// A dated slice of a transaction's rate line-items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSlice {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub csr_variant: String,
    pub amounts: PremiumAmounts,
}

/// The reconciliation decision for one matched premium span
///
/// Replaces the legacy 0/1/2/3 decision codes with an explicit sum
/// type: 0 = `NoChange`, 1 = `Recreate`, 2 = `ShortenTo`,
/// 3 = `AlreadyHandled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PremiumUpdate {
    /// Amounts, variant, and dates all match: leave the span alone
    NoChange,
    /// Only the end date moved in: pull the span's end to the new date
    ShortenTo(NaiveDate),
    /// Financial content changed (or the period grew): cancel the
    /// existing span and create a replacement with these values
    Recreate {
        start: NaiveDate,
        end: NaiveDate,
        csr_variant: String,
        amounts: PremiumAmounts,
    },
    /// An earlier line-item in the same transaction already resolved
    /// this span
    AlreadyHandled,
}

impl PremiumUpdate {
    /// True for decisions that mutate the timeline
    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            PremiumUpdate::ShortenTo(_) | PremiumUpdate::Recreate { .. }
        )
    }
}

/// A reconciliation decision bound to its matched premium span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumSpanUpdateInfo {
    pub premium_span_id: PremiumSpanId,
    pub update: PremiumUpdate,
}

/// Slices rate line-items into dated sub-periods and reconciles them
/// against existing premium spans
pub struct PremiumSpanReconciler;

impl PremiumSpanReconciler {
    /// Slices the transaction's line-items by effective date.
    ///
    /// Each total-premium item anchors a slice; the slice ends the day
    /// before the next item's date, the last one at `span_end`. The
    /// other rate codes contribute the amounts effective on the slice's
    /// start date, with the two other-payment sources summed.
    pub fn slice(txn: &EnrollmentTransaction, span_end: NaiveDate) -> Vec<RateSlice> {
        let anchors = txn.total_premium_items();
        let mut slices = Vec::with_capacity(anchors.len());
        for (idx, anchor) in anchors.iter().enumerate() {
            let end = anchors
                .get(idx + 1)
                .map(|next| day_before(next.effective_date))
                .unwrap_or(span_end);
            slices.push(RateSlice {
                start: anchor.effective_date,
                end,
                csr_variant: txn.csr_variant.clone(),
                amounts: Self::amounts_at(&txn.rate_items, anchor.effective_date),
            });
        }
        slices
    }

    /// Aggregates the line-items effective on `date` into one amount set
    fn amounts_at(items: &[RateLineItem], date: NaiveDate) -> PremiumAmounts {
        let mut amounts = PremiumAmounts::default();
        for item in items.iter().filter(|i| i.effective_date == date) {
            match item.code {
                RateCode::TotalPremium => amounts.total_premium = item.amount,
                RateCode::TotalResponsibleAmount => amounts.total_responsible = item.amount,
                RateCode::Aptc => amounts.aptc = item.amount,
                RateCode::CsrAmount => amounts.csr = item.amount,
                RateCode::OtherPayment1 | RateCode::OtherPayment2 => {
                    amounts.other_pay += item.amount;
                }
            }
        }
        amounts
    }

    /// Builds a new span's premium spans from scratch (the ADD path).
    ///
    /// The slices are contiguous by construction, so the resulting
    /// premium spans cover `[span.start_date, span.end_date]` whenever
    /// the first anchor sits on the span start.
    pub fn build(span: &EnrollmentSpan, txn: &EnrollmentTransaction) -> Vec<PremiumSpan> {
        Self::slice(txn, span.end_date)
            .into_iter()
            .map(|slice| {
                PremiumSpan::new(
                    span.id,
                    slice.start,
                    slice.end,
                    slice.csr_variant,
                    slice.amounts,
                )
            })
            .collect()
    }

    /// Diffs the transaction's slices against the span's active premium
    /// spans (the financial CHANGE path).
    ///
    /// Each slice is matched to the active premium span covering its
    /// start date, then classified: identical content and dates leave
    /// the span alone; a pulled-in end date alone shortens it; any
    /// change to the CSR variant, any of the five amounts, a dependent
    /// add/cancel/term in the same transaction, or a pushed-out end
    /// date cancels and recreates it. A span targeted by more than one
    /// slice resolves to [`PremiumUpdate::AlreadyHandled`] after the
    /// first.
    ///
    /// # Errors
    ///
    /// `PremiumSpanNotFound` when no active premium span covers a
    /// slice's start date.
    pub fn diff(
        timeline: &AccountTimeline,
        span: &EnrollmentSpan,
        txn: &EnrollmentTransaction,
    ) -> Result<Vec<PremiumSpanUpdateInfo>, EnrollmentError> {
        let slices = Self::slice(txn, span.end_date);
        let active = timeline.active_premiums_of(span.id);
        let dependent_change = txn.has_dependent_change();

        let mut handled: HashSet<PremiumSpanId> = HashSet::new();
        let mut updates = Vec::with_capacity(slices.len());

        for slice in slices {
            let matched = active.iter().find(|p| p.covers(slice.start)).ok_or(
                EnrollmentError::PremiumSpanNotFound {
                    span_id: span.id,
                    date: slice.start,
                },
            )?;

            if !handled.insert(matched.id) {
                updates.push(PremiumSpanUpdateInfo {
                    premium_span_id: matched.id,
                    update: PremiumUpdate::AlreadyHandled,
                });
                continue;
            }

            let financial_delta = slice.csr_variant != matched.csr_variant
                || dependent_change
                || slice.amounts != matched.amounts;

            let update = if financial_delta || slice.end > matched.end_date {
                PremiumUpdate::Recreate {
                    start: slice.start,
                    end: slice.end,
                    csr_variant: slice.csr_variant.clone(),
                    amounts: slice.amounts,
                }
            } else if slice.end < matched.end_date {
                PremiumUpdate::ShortenTo(slice.end)
            } else {
                PremiumUpdate::NoChange
            };

            debug!(
                premium_span_id = %matched.id,
                slice_start = %slice.start,
                ?update,
                "premium reconciliation decision"
            );
            updates.push(PremiumSpanUpdateInfo {
                premium_span_id: matched.id,
                update,
            });
        }

        Ok(updates)
    }

    /// Applies one reconciliation decision to the timeline.
    pub fn apply(
        timeline: &mut AccountTimeline,
        info: &PremiumSpanUpdateInfo,
        changes: &mut ChangeSet,
    ) -> Result<(), EnrollmentError> {
        match &info.update {
            PremiumUpdate::NoChange | PremiumUpdate::AlreadyHandled => Ok(()),
            PremiumUpdate::ShortenTo(new_end) => {
                let premium = timeline
                    .premium_mut(info.premium_span_id)
                    .ok_or(EnrollmentError::PremiumSpanMissing(info.premium_span_id))?;
                premium.end_date = *new_end;
                premium.changed = true;
                changes.push(TimelineChange::PremiumShortened {
                    premium_span_id: info.premium_span_id,
                    new_end: *new_end,
                });
                Ok(())
            }
            PremiumUpdate::Recreate {
                start,
                end,
                csr_variant,
                amounts,
            } => {
                let premium = timeline
                    .premium_mut(info.premium_span_id)
                    .ok_or(EnrollmentError::PremiumSpanMissing(info.premium_span_id))?;
                let span_id = premium.enrollment_span_id;
                premium.status = PremiumStatus::Canceled;
                premium.changed = true;
                changes.push(TimelineChange::PremiumCanceled {
                    premium_span_id: info.premium_span_id,
                });

                let replacement =
                    PremiumSpan::new(span_id, *start, *end, csr_variant.clone(), *amounts);
                changes.push(TimelineChange::PremiumCreated {
                    premium_span_id: replacement.id,
                    span_id,
                });
                timeline.insert_premium(replacement);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{AccountId, EnrollmentSpanId, TransactionId};
    use rust_decimal_macros::dec;

    use crate::span::{CoverageType, SpanStatus};
    use crate::transaction::TransactionKind;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn transaction(items: Vec<RateLineItem>) -> EnrollmentTransaction {
        EnrollmentTransaction {
            id: TransactionId::new(),
            kind: TransactionKind::Change,
            account_id: AccountId::new(),
            coverage_type: CoverageType::Family,
            start_date: d(2023, 1, 1),
            end_date: None,
            state_code: "NY".into(),
            marketplace_type: "FFM".into(),
            business_unit: "IND".into(),
            plan_id: "PLAN-A".into(),
            group_policy_id: "GP-1".into(),
            csr_variant: "01".into(),
            rate_items: items,
            members: vec![],
        }
    }

    fn span() -> EnrollmentSpan {
        EnrollmentSpan {
            id: EnrollmentSpanId::new(),
            account_id: AccountId::new(),
            state_code: "NY".into(),
            marketplace_type: "FFM".into(),
            business_unit: "IND".into(),
            coverage_type: CoverageType::Family,
            start_date: d(2023, 1, 1),
            end_date: d(2023, 12, 31),
            exchange_subscriber_id: "SUB001".into(),
            effectuation_date: Some(d(2023, 1, 1)),
            delinquent: false,
            paid_through_date: None,
            plan_id: "PLAN-A".into(),
            group_policy_id: "GP-1".into(),
            status: SpanStatus::Enrolled,
        }
    }

    #[test]
    fn test_slice_boundaries() {
        let txn = transaction(vec![
            RateLineItem::new(RateCode::TotalPremium, dec!(450), d(2023, 1, 1)),
            RateLineItem::new(RateCode::TotalPremium, dec!(500), d(2023, 7, 1)),
        ]);

        let slices = PremiumSpanReconciler::slice(&txn, d(2023, 12, 31));
        assert_eq!(slices.len(), 2);
        assert_eq!((slices[0].start, slices[0].end), (d(2023, 1, 1), d(2023, 6, 30)));
        assert_eq!((slices[1].start, slices[1].end), (d(2023, 7, 1), d(2023, 12, 31)));
    }

    #[test]
    fn test_amounts_aggregate_other_pay() {
        let txn = transaction(vec![
            RateLineItem::new(RateCode::TotalPremium, dec!(450), d(2023, 1, 1)),
            RateLineItem::new(RateCode::TotalResponsibleAmount, dec!(50), d(2023, 1, 1)),
            RateLineItem::new(RateCode::Aptc, dec!(350), d(2023, 1, 1)),
            RateLineItem::new(RateCode::OtherPayment1, dec!(25), d(2023, 1, 1)),
            RateLineItem::new(RateCode::OtherPayment2, dec!(25), d(2023, 1, 1)),
            // different date, must not bleed in
            RateLineItem::new(RateCode::Aptc, dec!(999), d(2023, 7, 1)),
        ]);

        let slices = PremiumSpanReconciler::slice(&txn, d(2023, 12, 31));
        assert_eq!(slices[0].amounts.total_premium, dec!(450));
        assert_eq!(slices[0].amounts.total_responsible, dec!(50));
        assert_eq!(slices[0].amounts.aptc, dec!(350));
        assert_eq!(slices[0].amounts.other_pay, dec!(50));
        assert_eq!(slices[0].amounts.csr, dec!(0));
    }

    #[test]
    fn test_build_covers_span() {
        let s = span();
        let txn = transaction(vec![
            RateLineItem::new(RateCode::TotalPremium, dec!(450), d(2023, 1, 1)),
            RateLineItem::new(RateCode::TotalPremium, dec!(500), d(2023, 7, 1)),
        ]);

        let premiums = PremiumSpanReconciler::build(&s, &txn);
        assert_eq!(premiums.len(), 2);
        assert_eq!(premiums[0].start_date, s.start_date);
        assert_eq!(premiums[1].end_date, s.end_date);
        assert_eq!(premiums[0].end_date, day_before(premiums[1].start_date));
        assert!(premiums.iter().all(|p| p.changed && p.is_active()));
    }

    fn timeline_with(span: &EnrollmentSpan, premiums: Vec<PremiumSpan>) -> AccountTimeline {
        let mut timeline = AccountTimeline::new(span.account_id);
        timeline.insert_span(span.clone());
        for p in premiums {
            timeline.insert_premium(p);
        }
        timeline
    }

    fn matching_amounts() -> PremiumAmounts {
        PremiumAmounts {
            total_premium: dec!(450),
            total_responsible: dec!(50),
            aptc: dec!(400),
            other_pay: dec!(0),
            csr: dec!(0),
        }
    }

    fn matching_items(date: NaiveDate) -> Vec<RateLineItem> {
        vec![
            RateLineItem::new(RateCode::TotalPremium, dec!(450), date),
            RateLineItem::new(RateCode::TotalResponsibleAmount, dec!(50), date),
            RateLineItem::new(RateCode::Aptc, dec!(400), date),
        ]
    }

    #[test]
    fn test_diff_no_op_when_identical() {
        let s = span();
        let existing = PremiumSpan::new(s.id, d(2023, 1, 1), d(2023, 12, 31), "01", matching_amounts());
        let timeline = timeline_with(&s, vec![existing]);
        let txn = transaction(matching_items(d(2023, 1, 1)));

        let updates = PremiumSpanReconciler::diff(&timeline, &s, &txn).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update, PremiumUpdate::NoChange);
    }

    #[test]
    fn test_diff_amount_change_recreates() {
        let s = span();
        let existing = PremiumSpan::new(s.id, d(2023, 1, 1), d(2023, 12, 31), "01", matching_amounts());
        let timeline = timeline_with(&s, vec![existing]);

        let mut items = matching_items(d(2023, 1, 1));
        items[2] = RateLineItem::new(RateCode::Aptc, dec!(399.99), d(2023, 1, 1));
        let txn = transaction(items);

        let updates = PremiumSpanReconciler::diff(&timeline, &s, &txn).unwrap();
        assert!(matches!(updates[0].update, PremiumUpdate::Recreate { .. }));
    }

    #[test]
    fn test_diff_csr_variant_change_recreates() {
        let s = span();
        let existing = PremiumSpan::new(s.id, d(2023, 1, 1), d(2023, 12, 31), "06", matching_amounts());
        let timeline = timeline_with(&s, vec![existing]);
        let txn = transaction(matching_items(d(2023, 1, 1)));

        let updates = PremiumSpanReconciler::diff(&timeline, &s, &txn).unwrap();
        assert!(matches!(updates[0].update, PremiumUpdate::Recreate { .. }));
    }

    #[test]
    fn test_diff_earlier_end_shortens() {
        let mut s = span();
        s.end_date = d(2023, 9, 30);
        let existing = PremiumSpan::new(s.id, d(2023, 1, 1), d(2023, 12, 31), "01", matching_amounts());
        let timeline = timeline_with(&s, vec![existing]);
        let txn = transaction(matching_items(d(2023, 1, 1)));

        let updates = PremiumSpanReconciler::diff(&timeline, &s, &txn).unwrap();
        assert_eq!(updates[0].update, PremiumUpdate::ShortenTo(d(2023, 9, 30)));
    }

    #[test]
    fn test_diff_dependent_change_forces_recreate() {
        let s = span();
        let existing = PremiumSpan::new(s.id, d(2023, 1, 1), d(2023, 12, 31), "01", matching_amounts());
        let timeline = timeline_with(&s, vec![existing]);

        let mut txn = transaction(matching_items(d(2023, 1, 1)));
        txn.members.push(crate::transaction::MemberChange {
            member_id: core_kernel::MemberId::new(),
            exchange_member_id: "EX-101".into(),
            kind: TransactionKind::Cancel,
            effective_date: d(2023, 6, 1),
            household_head: false,
        });

        let updates = PremiumSpanReconciler::diff(&timeline, &s, &txn).unwrap();
        assert!(matches!(updates[0].update, PremiumUpdate::Recreate { .. }));
    }

    #[test]
    fn test_diff_second_slice_on_same_span_already_handled() {
        let s = span();
        // one existing span covering the whole year; two line-items land on it
        let existing = PremiumSpan::new(s.id, d(2023, 1, 1), d(2023, 12, 31), "01", matching_amounts());
        let timeline = timeline_with(&s, vec![existing]);

        let mut items = matching_items(d(2023, 1, 1));
        items.push(RateLineItem::new(RateCode::TotalPremium, dec!(500), d(2023, 7, 1)));
        let txn = transaction(items);

        let updates = PremiumSpanReconciler::diff(&timeline, &s, &txn).unwrap();
        assert_eq!(updates.len(), 2);
        // first slice shrinks the year-long span (same amounts, earlier end)
        assert!(updates[0].update.is_actionable());
        assert_eq!(updates[1].update, PremiumUpdate::AlreadyHandled);
    }

    #[test]
    fn test_diff_unmatched_date_errors() {
        let s = span();
        let existing = PremiumSpan::new(s.id, d(2023, 1, 1), d(2023, 6, 30), "01", matching_amounts());
        let timeline = timeline_with(&s, vec![existing]);

        let mut items = matching_items(d(2023, 1, 1));
        items.push(RateLineItem::new(RateCode::TotalPremium, dec!(500), d(2023, 8, 1)));
        let txn = transaction(items);

        let err = PremiumSpanReconciler::diff(&timeline, &s, &txn).unwrap_err();
        assert!(matches!(err, EnrollmentError::PremiumSpanNotFound { .. }));
    }

    #[test]
    fn test_apply_recreate_cancels_and_creates() {
        let s = span();
        let existing = PremiumSpan::new(s.id, d(2023, 1, 1), d(2023, 12, 31), "01", matching_amounts());
        let existing_id = existing.id;
        let mut timeline = timeline_with(&s, vec![existing]);

        let new_amounts = PremiumAmounts {
            total_premium: dec!(500),
            ..matching_amounts()
        };
        let info = PremiumSpanUpdateInfo {
            premium_span_id: existing_id,
            update: PremiumUpdate::Recreate {
                start: d(2023, 7, 1),
                end: d(2023, 12, 31),
                csr_variant: "01".into(),
                amounts: new_amounts,
            },
        };

        let mut changes = ChangeSet::new();
        PremiumSpanReconciler::apply(&mut timeline, &info, &mut changes).unwrap();

        assert_eq!(
            timeline.premium(existing_id).unwrap().status,
            PremiumStatus::Canceled
        );
        let active = timeline.active_premiums_of(s.id);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].amounts.total_premium, dec!(500));
        assert_eq!(changes.len(), 2);
    }
}
