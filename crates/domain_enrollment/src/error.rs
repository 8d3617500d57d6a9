//! Enrollment domain errors
//!
//! Every error here aborts the whole transaction's reconciliation: the
//! engine never commits a partial timeline mutation. Callers report the
//! failure upstream and own any compensating retry.

use chrono::NaiveDate;
use thiserror::Error;

use core_kernel::{EnrollmentSpanId, PremiumSpanId, TemporalError};

/// Errors that can occur while processing an enrollment transaction
#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// More than one existing span straddles the new span's start date.
    ///
    /// This is a data inconsistency in the stored timeline, not a
    /// resolvable conflict; the transaction is rejected rather than
    /// picking a span arbitrarily.
    #[error("Ambiguous overlap: {} spans straddle new start {start}", span_ids.len())]
    AmbiguousOverlap {
        start: NaiveDate,
        span_ids: Vec<EnrollmentSpanId>,
    },

    /// No enrollment span matches the transaction's group policy id
    #[error("No enrollment span found for group policy {0}")]
    SpanNotFound(String),

    /// A span id resolved during preparation is no longer in the timeline
    #[error("Enrollment span {0} is not in the timeline")]
    SpanMissing(EnrollmentSpanId),

    /// A premium span id is not in the timeline
    #[error("Premium span {0} is not in the timeline")]
    PremiumSpanMissing(PremiumSpanId),

    /// No active premium span covers a rate line-item's effective date
    #[error("No active premium span on {span_id} covers {date}")]
    PremiumSpanNotFound {
        span_id: EnrollmentSpanId,
        date: NaiveDate,
    },

    /// The transaction has no household-head member to derive the
    /// exchange subscriber id from
    #[error("Transaction has no household-head member")]
    MissingHouseholdHead,

    /// Required field is missing from the transaction
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// The matched span changed between the prepare and apply passes
    #[error("Prepared candidate is stale: span {span_id} was mutated between passes")]
    StaleCandidate { span_id: EnrollmentSpanId },

    /// Date arithmetic error
    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),
}

impl EnrollmentError {
    /// Creates a span-not-found error for a group policy id
    pub fn span_not_found(group_policy_id: impl Into<String>) -> Self {
        EnrollmentError::SpanNotFound(group_policy_id.into())
    }

    /// Creates a missing-required-field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        EnrollmentError::MissingRequiredField(field.into())
    }

    /// Returns true if this error indicates a referenced record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EnrollmentError::SpanNotFound(_)
                | EnrollmentError::SpanMissing(_)
                | EnrollmentError::PremiumSpanMissing(_)
                | EnrollmentError::PremiumSpanNotFound { .. }
        )
    }
}
