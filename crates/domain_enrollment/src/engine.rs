//! Transaction orchestration
//!
//! The engine ties the components together for the five transaction
//! kinds and exposes the two-pass flow the external validation exchange
//! needs: `prepare` materializes candidate changes without touching the
//! timeline, `apply` re-validates them against current state and
//! mutates. Accounts are processed one transaction at a time; the
//! caller serializes access per account and holds (or re-validates) the
//! prepared candidate across its validation round trip.
//!
//! Any error aborts the transaction before the first mutation: `apply`
//! verifies every fingerprint up front, so a failed transaction never
//! leaves a partially-mutated timeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{day_before, EnrollmentSpanId};

use crate::changes::{ChangeSet, TimelineChange};
use crate::classifier::{ChangeClassifier, ChangeTransactionInfo};
use crate::error::EnrollmentError;
use crate::overlap::{OverlapResolver, SpanResolution};
use crate::reconcile::PremiumSpanReconciler;
use crate::span::{EnrollmentSpan, PremiumStatus, SpanStatus};
use crate::status::StatusDeterminer;
use crate::timeline::AccountTimeline;
use crate::transaction::{EnrollmentTransaction, TransactionKind};

/// How the out-of-process business-rule validation exchange is handled.
///
/// The engine itself never calls the validation service; this strategy
/// is an explicit parameter so callers (and tests) choose the flow
/// instead of the engine sniffing its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Two passes: the caller runs `prepare`, ships the candidate to
    /// the validation service, and runs `apply` on acknowledgement.
    #[default]
    External,
    /// Single pass: `process` prepares and applies back-to-back.
    Bypass,
}

/// Snapshot of a span's mutable state, captured at prepare time
///
/// The account may be mutated by another transaction between the two
/// passes; `apply` re-checks every fingerprint before mutating anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanFingerprint {
    pub span_id: EnrollmentSpanId,
    pub end_date: NaiveDate,
    pub status: SpanStatus,
}

impl SpanFingerprint {
    fn of(span: &EnrollmentSpan) -> Self {
        Self {
            span_id: span.id,
            end_date: span.end_date,
            status: span.status,
        }
    }

    fn verify(&self, timeline: &AccountTimeline) -> Result<(), EnrollmentError> {
        match timeline.span(self.span_id) {
            Some(span) if span.end_date == self.end_date && span.status == self.status => Ok(()),
            _ => Err(EnrollmentError::StaleCandidate {
                span_id: self.span_id,
            }),
        }
    }
}

/// Candidate changes materialized by the prepare pass
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    transaction: EnrollmentTransaction,
    plan: TransactionPlan,
}

impl PreparedTransaction {
    pub fn transaction(&self) -> &EnrollmentTransaction {
        &self.transaction
    }

    /// The existing span this transaction targets, when it targets one
    pub fn matched_span(&self) -> Option<EnrollmentSpanId> {
        match &self.plan {
            TransactionPlan::Add { .. } => None,
            TransactionPlan::Change { info, .. } => Some(info.span_id),
            TransactionPlan::Cancel { fingerprint }
            | TransactionPlan::Term { fingerprint, .. }
            | TransactionPlan::Reinstate { fingerprint, .. } => Some(fingerprint.span_id),
        }
    }

    /// The classification result, for CHANGE candidates
    pub fn change_info(&self) -> Option<&ChangeTransactionInfo> {
        match &self.plan {
            TransactionPlan::Change { info, .. } => Some(info),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum TransactionPlan {
    Add {
        exchange_subscriber_id: String,
        end_date: NaiveDate,
        resolutions: Vec<SpanResolution>,
        fingerprints: Vec<SpanFingerprint>,
    },
    Change {
        info: ChangeTransactionInfo,
        fingerprint: SpanFingerprint,
    },
    Cancel {
        fingerprint: SpanFingerprint,
    },
    Term {
        fingerprint: SpanFingerprint,
        term_end: NaiveDate,
    },
    Reinstate {
        fingerprint: SpanFingerprint,
        new_end: NaiveDate,
    },
}

/// Orchestrates enrollment transactions against one account's timeline
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrollmentEngine {
    validation: ValidationMode,
}

impl EnrollmentEngine {
    pub fn new(validation: ValidationMode) -> Self {
        Self { validation }
    }

    pub fn validation(&self) -> ValidationMode {
        self.validation
    }

    /// Pass 1: materializes candidate changes without mutating the
    /// timeline.
    ///
    /// # Errors
    ///
    /// Malformed transactions (`MissingHouseholdHead`), lookup failures
    /// (`SpanNotFound`, `PremiumSpanNotFound`), and timeline
    /// inconsistencies (`AmbiguousOverlap`) all reject the transaction
    /// here, before anything is mutated.
    pub fn prepare(
        &self,
        timeline: &AccountTimeline,
        txn: &EnrollmentTransaction,
    ) -> Result<PreparedTransaction, EnrollmentError> {
        let plan = match txn.kind {
            TransactionKind::Add => {
                let exchange_subscriber_id = txn.exchange_subscriber_id()?;
                let end_date = txn.effective_end();
                let resolutions = OverlapResolver::plan(
                    timeline,
                    txn.start_date,
                    end_date,
                    txn.coverage_type,
                )?;
                let fingerprints = resolutions
                    .iter()
                    .map(|r| {
                        timeline
                            .span(r.span_id())
                            .map(SpanFingerprint::of)
                            .ok_or(EnrollmentError::SpanMissing(r.span_id()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                TransactionPlan::Add {
                    exchange_subscriber_id,
                    end_date,
                    resolutions,
                    fingerprints,
                }
            }
            TransactionKind::Change => {
                let info = ChangeClassifier::classify(timeline, txn)?;
                let span = timeline
                    .span(info.span_id)
                    .ok_or(EnrollmentError::SpanMissing(info.span_id))?;
                TransactionPlan::Change {
                    fingerprint: SpanFingerprint::of(span),
                    info,
                }
            }
            TransactionKind::Cancel => {
                let span = timeline
                    .find_active_by_group_policy(&txn.group_policy_id)
                    .ok_or_else(|| EnrollmentError::span_not_found(&txn.group_policy_id))?;
                TransactionPlan::Cancel {
                    fingerprint: SpanFingerprint::of(span),
                }
            }
            TransactionKind::Term => {
                let span = timeline
                    .find_active_by_group_policy(&txn.group_policy_id)
                    .ok_or_else(|| EnrollmentError::span_not_found(&txn.group_policy_id))?;
                TransactionPlan::Term {
                    fingerprint: SpanFingerprint::of(span),
                    term_end: txn.effective_end(),
                }
            }
            TransactionKind::Reinstatement => {
                let span = timeline
                    .find_by_group_policy(&txn.group_policy_id)
                    .ok_or_else(|| EnrollmentError::span_not_found(&txn.group_policy_id))?;
                TransactionPlan::Reinstate {
                    fingerprint: SpanFingerprint::of(span),
                    new_end: txn.effective_end(),
                }
            }
        };
        Ok(PreparedTransaction {
            transaction: txn.clone(),
            plan,
        })
    }

    /// Pass 2: re-validates the candidate and applies it.
    ///
    /// `today` is supplied by the caller; the engine never reads a
    /// clock.
    pub fn apply(
        &self,
        timeline: &mut AccountTimeline,
        prepared: PreparedTransaction,
        today: NaiveDate,
    ) -> Result<ChangeSet, EnrollmentError> {
        let PreparedTransaction { transaction, plan } = prepared;
        match plan {
            TransactionPlan::Add {
                exchange_subscriber_id,
                end_date,
                resolutions,
                fingerprints,
            } => Self::apply_add(
                timeline,
                &transaction,
                exchange_subscriber_id,
                end_date,
                &resolutions,
                &fingerprints,
                today,
            ),
            TransactionPlan::Change { info, fingerprint } => {
                Self::apply_change(timeline, &info, &fingerprint)
            }
            TransactionPlan::Cancel { fingerprint } => Self::apply_cancel(timeline, &fingerprint),
            TransactionPlan::Term {
                fingerprint,
                term_end,
            } => Self::apply_term(timeline, &fingerprint, term_end),
            TransactionPlan::Reinstate {
                fingerprint,
                new_end,
            } => Self::apply_reinstate(timeline, &fingerprint, new_end, today),
        }
    }

    /// Prepares and applies in one call.
    ///
    /// This is the [`ValidationMode::Bypass`] path; under
    /// [`ValidationMode::External`] the caller drives `prepare` and
    /// `apply` around its validation exchange instead.
    pub fn process(
        &self,
        timeline: &mut AccountTimeline,
        txn: &EnrollmentTransaction,
        today: NaiveDate,
    ) -> Result<ChangeSet, EnrollmentError> {
        let prepared = self.prepare(timeline, txn)?;
        self.apply(timeline, prepared, today)
    }

    fn apply_add(
        timeline: &mut AccountTimeline,
        txn: &EnrollmentTransaction,
        exchange_subscriber_id: String,
        end_date: NaiveDate,
        resolutions: &[SpanResolution],
        fingerprints: &[SpanFingerprint],
        today: NaiveDate,
    ) -> Result<ChangeSet, EnrollmentError> {
        for fingerprint in fingerprints {
            fingerprint.verify(timeline)?;
        }

        let mut changes = ChangeSet::new();

        // Resolution runs to completion before the new span exists:
        // status determination below consults the just-mutated
        // chronological predecessor.
        for resolution in resolutions {
            OverlapResolver::apply(timeline, resolution, &mut changes)?;
        }

        let mut span = EnrollmentSpan {
            id: EnrollmentSpanId::new(),
            account_id: txn.account_id,
            state_code: txn.state_code.clone(),
            marketplace_type: txn.marketplace_type.clone(),
            business_unit: txn.business_unit.clone(),
            coverage_type: txn.coverage_type,
            start_date: txn.start_date,
            end_date,
            exchange_subscriber_id,
            effectuation_date: None,
            delinquent: false,
            paid_through_date: None,
            plan_id: txn.plan_id.clone(),
            group_policy_id: txn.group_policy_id.clone(),
            status: SpanStatus::PreMember,
        };

        {
            let prior = timeline.spans_before(span.start_date);
            span.effectuation_date = StatusDeterminer::derive_effectuation_date(
                txn.responsible_amount_at_start(),
                &txn.plan_id,
                span.start_date,
                &prior,
                today,
            );
            span.status = StatusDeterminer::determine(&span, &prior, today);
        }

        debug!(span_id = %span.id, status = ?span.status, "created enrollment span");
        let premiums = PremiumSpanReconciler::build(&span, txn);
        changes.push(TimelineChange::SpanCreated { span_id: span.id });
        let span_id = span.id;
        timeline.insert_span(span);
        for premium in premiums {
            changes.push(TimelineChange::PremiumCreated {
                premium_span_id: premium.id,
                span_id,
            });
            timeline.insert_premium(premium);
        }
        Ok(changes)
    }

    fn apply_change(
        timeline: &mut AccountTimeline,
        info: &ChangeTransactionInfo,
        fingerprint: &SpanFingerprint,
    ) -> Result<ChangeSet, EnrollmentError> {
        fingerprint.verify(timeline)?;

        let mut changes = ChangeSet::new();
        if !info.financial {
            // demographic change; nothing for this engine to persist
            return Ok(changes);
        }
        // every referenced premium span must still exist before the
        // first mutation lands
        for update in &info.updates {
            if timeline.premium(update.premium_span_id).is_none() {
                return Err(EnrollmentError::StaleCandidate {
                    span_id: fingerprint.span_id,
                });
            }
        }
        for update in &info.updates {
            PremiumSpanReconciler::apply(timeline, update, &mut changes)?;
        }
        Ok(changes)
    }

    fn apply_cancel(
        timeline: &mut AccountTimeline,
        fingerprint: &SpanFingerprint,
    ) -> Result<ChangeSet, EnrollmentError> {
        fingerprint.verify(timeline)?;

        let span = timeline
            .span(fingerprint.span_id)
            .ok_or(EnrollmentError::SpanMissing(fingerprint.span_id))?;
        // canonical canceled encoding: end date before start date
        let voided_end = day_before(span.start_date);
        let mut changes = ChangeSet::new();
        changes.extend(timeline.cancel_span(fingerprint.span_id, voided_end)?);
        Ok(changes)
    }

    fn apply_term(
        timeline: &mut AccountTimeline,
        fingerprint: &SpanFingerprint,
        term_end: NaiveDate,
    ) -> Result<ChangeSet, EnrollmentError> {
        fingerprint.verify(timeline)?;

        let span = timeline
            .span(fingerprint.span_id)
            .ok_or(EnrollmentError::SpanMissing(fingerprint.span_id))?;
        let (start, old_end) = (span.start_date, span.end_date);

        let mut changes = ChangeSet::new();
        if term_end < start {
            // a term before coverage begins voids the span
            changes.extend(timeline.cancel_span(fingerprint.span_id, term_end)?);
        } else if term_end < old_end {
            changes.extend(timeline.shorten_span(fingerprint.span_id, term_end)?);
        } else if term_end > old_end {
            let span = timeline
                .span_mut(fingerprint.span_id)
                .ok_or(EnrollmentError::SpanMissing(fingerprint.span_id))?;
            span.end_date = term_end;
            changes.push(TimelineChange::SpanEndRestored {
                span_id: fingerprint.span_id,
                new_end: term_end,
            });
        }
        Ok(changes)
    }

    fn apply_reinstate(
        timeline: &mut AccountTimeline,
        fingerprint: &SpanFingerprint,
        new_end: NaiveDate,
        today: NaiveDate,
    ) -> Result<ChangeSet, EnrollmentError> {
        fingerprint.verify(timeline)?;
        let span_id = fingerprint.span_id;

        let mut changes = ChangeSet::new();
        {
            let span = timeline
                .span_mut(span_id)
                .ok_or(EnrollmentError::SpanMissing(span_id))?;
            span.end_date = new_end;
        }
        changes.push(TimelineChange::SpanEndRestored { span_id, new_end });

        let restored = timeline
            .span(span_id)
            .ok_or(EnrollmentError::SpanMissing(span_id))?
            .clone();
        let status = {
            let prior = timeline.spans_before(restored.start_date);
            StatusDeterminer::determine(&restored, &prior, today)
        };
        if status != fingerprint.status {
            let span = timeline
                .span_mut(span_id)
                .ok_or(EnrollmentError::SpanMissing(span_id))?;
            span.status = status;
            changes.push(TimelineChange::SpanStatusChanged { span_id, status });
        }

        changes.extend(Self::repair_premiums_after_reinstate(
            timeline, span_id, new_end,
        ));
        Ok(changes)
    }

    /// Restores premium coverage after a span's end date comes back:
    /// the last active premium span stretches to the new end, or, when
    /// the cancel left none active, the most recent canceled one is
    /// revived.
    fn repair_premiums_after_reinstate(
        timeline: &mut AccountTimeline,
        span_id: EnrollmentSpanId,
        new_end: NaiveDate,
    ) -> Vec<TimelineChange> {
        let mut changes = Vec::new();

        if let Some(last_active) = timeline.active_premiums_of(span_id).last().map(|p| p.id) {
            if let Some(premium) = timeline.premium_mut(last_active) {
                if premium.end_date < new_end {
                    premium.end_date = new_end;
                    premium.changed = true;
                    changes.push(TimelineChange::PremiumExtended {
                        premium_span_id: last_active,
                        new_end,
                    });
                }
            }
            return changes;
        }

        let latest_canceled = timeline
            .premiums_of(span_id)
            .into_iter()
            .filter(|p| p.status == PremiumStatus::Canceled)
            .max_by_key(|p| p.start_date)
            .map(|p| p.id);
        if let Some(premium_id) = latest_canceled {
            if let Some(premium) = timeline.premium_mut(premium_id) {
                premium.status = PremiumStatus::Active;
                premium.end_date = new_end;
                premium.changed = true;
                changes.push(TimelineChange::PremiumReactivated {
                    premium_span_id: premium_id,
                    new_end,
                });
            }
        }
        changes
    }
}
