//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults.
//! Tests specify only the fields they care about.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use core_kernel::{AccountId, EnrollmentSpanId, MemberId, TransactionId};
use domain_enrollment::{
    CoverageType, EnrollmentSpan, EnrollmentTransaction, MemberChange, PremiumAmounts,
    PremiumSpan, RateCode, RateLineItem, SpanStatus, TransactionKind,
};

use crate::fixtures::{AmountFixtures, DateFixtures, StringFixtures};

/// Builder for enrollment spans
pub struct SpanBuilder {
    span: EnrollmentSpan,
}

impl Default for SpanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanBuilder {
    /// A full-year 2023 family span, enrolled and effectuated
    pub fn new() -> Self {
        Self {
            span: EnrollmentSpan {
                id: EnrollmentSpanId::new(),
                account_id: AccountId::new(),
                state_code: "NY".into(),
                marketplace_type: "FFM".into(),
                business_unit: "IND".into(),
                coverage_type: CoverageType::Family,
                start_date: DateFixtures::year_start(),
                end_date: DateFixtures::year_end(),
                exchange_subscriber_id: StringFixtures::exchange_member_id().into(),
                effectuation_date: Some(DateFixtures::year_start()),
                delinquent: false,
                paid_through_date: None,
                plan_id: StringFixtures::plan_id().into(),
                group_policy_id: StringFixtures::group_policy_id().into(),
                status: SpanStatus::Enrolled,
            },
        }
    }

    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.span.account_id = account_id;
        self
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.span.start_date = start;
        self.span.end_date = end;
        self
    }

    pub fn with_coverage_type(mut self, coverage_type: CoverageType) -> Self {
        self.span.coverage_type = coverage_type;
        self
    }

    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.span.status = status;
        self
    }

    pub fn with_effectuation(mut self, date: Option<NaiveDate>) -> Self {
        self.span.effectuation_date = date;
        self
    }

    pub fn delinquent(mut self, paid_through: Option<NaiveDate>) -> Self {
        self.span.delinquent = true;
        self.span.paid_through_date = paid_through;
        self
    }

    pub fn with_plan(mut self, plan_id: impl Into<String>) -> Self {
        self.span.plan_id = plan_id.into();
        self
    }

    pub fn with_group_policy(mut self, group_policy_id: impl Into<String>) -> Self {
        self.span.group_policy_id = group_policy_id.into();
        self
    }

    pub fn build(self) -> EnrollmentSpan {
        self.span
    }
}

/// Builder for premium spans
pub struct PremiumSpanBuilder {
    span_id: EnrollmentSpanId,
    start: NaiveDate,
    end: NaiveDate,
    csr_variant: String,
    amounts: PremiumAmounts,
}

impl PremiumSpanBuilder {
    /// A full-year 2023 premium span with the fixture amounts
    pub fn for_span(span_id: EnrollmentSpanId) -> Self {
        Self {
            span_id,
            start: DateFixtures::year_start(),
            end: DateFixtures::year_end(),
            csr_variant: StringFixtures::csr_variant().into(),
            amounts: PremiumAmounts {
                total_premium: AmountFixtures::total_premium(),
                total_responsible: AmountFixtures::responsible(),
                aptc: AmountFixtures::aptc(),
                other_pay: Decimal::ZERO,
                csr: Decimal::ZERO,
            },
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_csr_variant(mut self, csr_variant: impl Into<String>) -> Self {
        self.csr_variant = csr_variant.into();
        self
    }

    pub fn with_amounts(mut self, amounts: PremiumAmounts) -> Self {
        self.amounts = amounts;
        self
    }

    pub fn build(self) -> PremiumSpan {
        PremiumSpan::new(
            self.span_id,
            self.start,
            self.end,
            self.csr_variant,
            self.amounts,
        )
    }
}

/// Builder for enrollment transactions
pub struct TransactionBuilder {
    txn: EnrollmentTransaction,
}

impl TransactionBuilder {
    /// A bare transaction of the given kind for the 2023 plan year
    pub fn new(kind: TransactionKind) -> Self {
        Self {
            txn: EnrollmentTransaction {
                id: TransactionId::new(),
                kind,
                account_id: AccountId::new(),
                coverage_type: CoverageType::Family,
                start_date: DateFixtures::year_start(),
                end_date: None,
                state_code: "NY".into(),
                marketplace_type: "FFM".into(),
                business_unit: "IND".into(),
                plan_id: StringFixtures::plan_id().into(),
                group_policy_id: StringFixtures::group_policy_id().into(),
                csr_variant: StringFixtures::csr_variant().into(),
                rate_items: vec![],
                members: vec![],
            },
        }
    }

    /// A January 1 ADD with a household head and the fixture rate
    /// line-items. For other effective dates use
    /// `new(TransactionKind::Add)` and set the dates before attaching
    /// rates and members, which are stamped with the start date current
    /// at the time they are added.
    pub fn add() -> Self {
        Self::new(TransactionKind::Add)
            .with_household_head()
            .with_standard_rates()
    }

    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.txn.account_id = account_id;
        self
    }

    pub fn with_dates(mut self, start: NaiveDate, end: Option<NaiveDate>) -> Self {
        self.txn.start_date = start;
        self.txn.end_date = end;
        self
    }

    pub fn with_coverage_type(mut self, coverage_type: CoverageType) -> Self {
        self.txn.coverage_type = coverage_type;
        self
    }

    pub fn with_plan(mut self, plan_id: impl Into<String>) -> Self {
        self.txn.plan_id = plan_id.into();
        self
    }

    pub fn with_group_policy(mut self, group_policy_id: impl Into<String>) -> Self {
        self.txn.group_policy_id = group_policy_id.into();
        self
    }

    pub fn with_csr_variant(mut self, csr_variant: impl Into<String>) -> Self {
        self.txn.csr_variant = csr_variant.into();
        self
    }

    pub fn with_rate_item(mut self, code: RateCode, amount: Decimal, date: NaiveDate) -> Self {
        self.txn.rate_items.push(RateLineItem::new(code, amount, date));
        self
    }

    /// Total premium / responsible / APTC items effective at the
    /// transaction start
    pub fn with_standard_rates(self) -> Self {
        let date = self.txn.start_date;
        self.with_rate_item(RateCode::TotalPremium, AmountFixtures::total_premium(), date)
            .with_rate_item(
                RateCode::TotalResponsibleAmount,
                AmountFixtures::responsible(),
                date,
            )
            .with_rate_item(RateCode::Aptc, AmountFixtures::aptc(), date)
    }

    pub fn with_household_head(mut self) -> Self {
        let date = self.txn.start_date;
        let kind = self.txn.kind;
        self.txn.members.push(MemberChange {
            member_id: MemberId::new(),
            exchange_member_id: StringFixtures::exchange_member_id().into(),
            kind,
            effective_date: date,
            household_head: true,
        });
        self
    }

    pub fn with_dependent(mut self, kind: TransactionKind) -> Self {
        let date = self.txn.start_date;
        self.txn.members.push(MemberChange {
            member_id: MemberId::new(),
            exchange_member_id: "EX-DEP-0001".into(),
            kind,
            effective_date: date,
            household_head: false,
        });
        self
    }

    pub fn build(self) -> EnrollmentTransaction {
        self.txn
    }
}
