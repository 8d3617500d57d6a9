//! Change transaction classification
//!
//! A CHANGE transaction is financial only when it carries rate
//! line-items anchored by a total-premium item; everything else is a
//! demographic change the engine leaves to the caller. Financial
//! changes are handed to the reconciler and come back as per-span
//! update decisions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::EnrollmentSpanId;

use crate::error::EnrollmentError;
use crate::reconcile::{PremiumSpanReconciler, PremiumSpanUpdateInfo};
use crate::timeline::AccountTimeline;
use crate::transaction::EnrollmentTransaction;

/// Classification outcome for one CHANGE transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTransactionInfo {
    /// The span matched by group policy id
    pub span_id: EnrollmentSpanId,
    /// Whether the transaction carries reconcilable financial content
    pub financial: bool,
    /// Per-premium-span decisions; empty for non-financial changes
    pub updates: Vec<PremiumSpanUpdateInfo>,
}

impl ChangeTransactionInfo {
    fn non_financial(span_id: EnrollmentSpanId) -> Self {
        Self {
            span_id,
            financial: false,
            updates: Vec::new(),
        }
    }

    /// True when at least one decision mutates the timeline
    pub fn requires_update(&self) -> bool {
        self.updates.iter().any(|u| u.update.is_actionable())
    }
}

/// Decides whether a CHANGE transaction needs premium-span
/// reconciliation, and produces the decisions when it does
pub struct ChangeClassifier;

impl ChangeClassifier {
    /// Classifies a CHANGE transaction against the account timeline.
    ///
    /// Classification is read-only and idempotent: the same timeline
    /// and transaction always produce the same decision set.
    ///
    /// # Errors
    ///
    /// `SpanNotFound` when no non-canceled span matches the
    /// transaction's group policy id; `PremiumSpanNotFound` when a
    /// line-item's date matches no active premium span.
    pub fn classify(
        timeline: &AccountTimeline,
        txn: &EnrollmentTransaction,
    ) -> Result<ChangeTransactionInfo, EnrollmentError> {
        let span = timeline
            .find_active_by_group_policy(&txn.group_policy_id)
            .ok_or_else(|| EnrollmentError::span_not_found(&txn.group_policy_id))?;

        if txn.rate_items.is_empty() {
            debug!(span_id = %span.id, "no rate line-items; non-financial change");
            return Ok(ChangeTransactionInfo::non_financial(span.id));
        }

        if txn.total_premium_items().is_empty() {
            debug!(span_id = %span.id, "no total-premium line-item; non-financial change");
            return Ok(ChangeTransactionInfo::non_financial(span.id));
        }

        let updates = PremiumSpanReconciler::diff(timeline, span, txn)?;
        debug!(
            span_id = %span.id,
            decisions = updates.len(),
            "classified financial change"
        );
        Ok(ChangeTransactionInfo {
            span_id: span.id,
            financial: true,
            updates,
        })
    }
}
