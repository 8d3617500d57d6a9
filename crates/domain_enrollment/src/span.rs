//! Enrollment span and premium span entities
//!
//! An enrollment span is one contiguous coverage period for an account
//! under one plan and group policy. Its financial history is carried by
//! premium spans: contiguous, non-overlapping sub-periods with stable
//! rate amounts that together cover the span's own date range.
//!
//! # Lifecycle
//!
//! ```text
//! PreMember -> Enrolled -> Delinquent -> Suspended
//!          \-> Canceled
//! ```
//!
//! Spans are never deleted. A superseded or voided span is end-dated or
//! canceled in place; a canceled span stays in the timeline with status
//! [`SpanStatus::Canceled`].

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, EnrollmentSpanId, PremiumSpanId};

/// Lifecycle status of an enrollment span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanStatus {
    /// Coverage created but not yet effectuated (first payment pending)
    PreMember,
    /// Effectuated, in-force coverage
    Enrolled,
    /// Voided coverage
    Canceled,
    /// Unpaid premium, inside the grace period
    Delinquent,
    /// Unpaid premium, grace period exhausted
    Suspended,
    /// Fallback for inconsistent input; logged as a data-quality error
    NoValidStatus,
}

/// Status of a premium span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PremiumStatus {
    Active,
    Canceled,
}

/// Whether a span covers the whole household or dependents only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoverageType {
    Family,
    DependentOnly,
}

/// The five monetary components of a premium span
///
/// Amounts use [`rust_decimal::Decimal`]; comparisons are numeric, so a
/// difference of any magnitude counts as a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PremiumAmounts {
    /// Gross monthly premium
    pub total_premium: Decimal,
    /// Amount the subscriber is responsible for
    pub total_responsible: Decimal,
    /// Advance premium tax credit
    pub aptc: Decimal,
    /// Sum of up to two other-payment sources
    pub other_pay: Decimal,
    /// Cost-sharing-reduction amount
    pub csr: Decimal,
}

/// A contiguous coverage period for one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentSpan {
    pub id: EnrollmentSpanId,
    pub account_id: AccountId,
    /// Issuing state, e.g. "NY"
    pub state_code: String,
    /// Marketplace segment classifier
    pub marketplace_type: String,
    pub business_unit: String,
    pub coverage_type: CoverageType,
    /// First covered day
    pub start_date: NaiveDate,
    /// Last covered day (inclusive). Never null once resolved; an end
    /// date before the start date is the canonical canceled encoding.
    pub end_date: NaiveDate,
    /// Subscriber identifier assigned by the exchange, derived from the
    /// household head
    pub exchange_subscriber_id: String,
    /// Date coverage was confirmed paid/active; None means pending
    pub effectuation_date: Option<NaiveDate>,
    /// Unpaid-premium indicator
    pub delinquent: bool,
    /// Last day claims are paid through while delinquent
    pub paid_through_date: Option<NaiveDate>,
    pub plan_id: String,
    pub group_policy_id: String,
    pub status: SpanStatus,
}

impl EnrollmentSpan {
    /// The coverage year this span belongs to (year of the start date)
    pub fn coverage_year(&self) -> i32 {
        self.start_date.year()
    }

    pub fn is_canceled(&self) -> bool {
        self.status == SpanStatus::Canceled
    }

    /// True when the span's dates encode live coverage (end not before start)
    pub fn has_valid_dates(&self) -> bool {
        self.end_date >= self.start_date
    }

    /// True when the span's interval straddles `date`: the span starts
    /// on `date`, or starts before it and ends after it.
    pub fn straddles(&self, date: NaiveDate) -> bool {
        self.start_date == date || (self.start_date <= date && date < self.end_date)
    }
}

/// A financial sub-period within an enrollment span
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumSpan {
    pub id: PremiumSpanId,
    /// Owning span, by id; the timeline arena holds both records
    pub enrollment_span_id: EnrollmentSpanId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PremiumStatus,
    /// Cost-sharing-reduction plan variant, part of plan identity for
    /// financial comparison
    pub csr_variant: String,
    pub amounts: PremiumAmounts,
    /// Dirty bit for downstream sync; set on every mutation
    pub changed: bool,
}

impl PremiumSpan {
    /// Creates an active premium span, flagged for downstream sync
    pub fn new(
        enrollment_span_id: EnrollmentSpanId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        csr_variant: impl Into<String>,
        amounts: PremiumAmounts,
    ) -> Self {
        Self {
            id: PremiumSpanId::new(),
            enrollment_span_id,
            start_date,
            end_date,
            status: PremiumStatus::Active,
            csr_variant: csr_variant.into(),
            amounts,
            changed: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PremiumStatus::Active
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}
