//! Enrollment transaction records
//!
//! A transaction is the engine's sole input besides the account
//! timeline: a type, an effective date range, the plan/group-policy
//! identity, a list of dated rate line-items, and the member-level
//! sub-transactions used to derive the exchange subscriber id and to
//! detect dependent add/cancel/term side effects.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{year_end_of, AccountId, MemberId, TransactionId};

use crate::error::EnrollmentError;
use crate::span::CoverageType;

/// Enrollment transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Add,
    Change,
    Cancel,
    Term,
    Reinstatement,
}

/// Rate-type vocabulary for line-items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateCode {
    /// Gross monthly premium; the item that anchors a premium span
    TotalPremium,
    /// Subscriber-responsible amount
    TotalResponsibleAmount,
    /// Advance premium tax credit
    Aptc,
    /// Cost-sharing-reduction amount
    CsrAmount,
    /// First other-payment source
    OtherPayment1,
    /// Second other-payment source
    OtherPayment2,
}

/// A dated financial line-item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLineItem {
    pub code: RateCode,
    pub amount: Decimal,
    pub effective_date: NaiveDate,
}

impl RateLineItem {
    pub fn new(code: RateCode, amount: Decimal, effective_date: NaiveDate) -> Self {
        Self {
            code,
            amount,
            effective_date,
        }
    }
}

/// A member-level sub-transaction
///
/// Members ride along on the account-level transaction. The engine only
/// consults them for the household head (exchange subscriber identity)
/// and for dependent add/cancel/term detection; member record upkeep is
/// the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberChange {
    pub member_id: MemberId,
    /// Identifier assigned to this member by the exchange
    pub exchange_member_id: String,
    pub kind: TransactionKind,
    pub effective_date: NaiveDate,
    pub household_head: bool,
}

/// One inbound enrollment transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentTransaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub account_id: AccountId,
    pub coverage_type: CoverageType,
    pub start_date: NaiveDate,
    /// Inclusive end date; None defaults to Dec-31 of the start year
    pub end_date: Option<NaiveDate>,
    pub state_code: String,
    pub marketplace_type: String,
    pub business_unit: String,
    pub plan_id: String,
    pub group_policy_id: String,
    /// Cost-sharing-reduction plan variant for the transaction's rates
    pub csr_variant: String,
    pub rate_items: Vec<RateLineItem>,
    pub members: Vec<MemberChange>,
}

impl EnrollmentTransaction {
    /// The effective end date, defaulted to Dec-31 of the start year
    /// when the transaction omits one.
    pub fn effective_end(&self) -> NaiveDate {
        self.end_date.unwrap_or_else(|| year_end_of(self.start_date))
    }

    /// The household-head member sub-transaction, if present
    pub fn household_head(&self) -> Option<&MemberChange> {
        self.members.iter().find(|m| m.household_head)
    }

    /// Derives the exchange subscriber id from the household head.
    ///
    /// # Errors
    ///
    /// `MissingHouseholdHead` when the transaction carries no
    /// household-head member; the transaction is malformed and must not
    /// be applied.
    pub fn exchange_subscriber_id(&self) -> Result<String, EnrollmentError> {
        self.household_head()
            .map(|m| m.exchange_member_id.clone())
            .ok_or(EnrollmentError::MissingHouseholdHead)
    }

    /// True when any dependent (non-household-head member) is being
    /// added, canceled, or termed by this transaction.
    pub fn has_dependent_change(&self) -> bool {
        self.members.iter().any(|m| {
            !m.household_head
                && matches!(
                    m.kind,
                    TransactionKind::Add | TransactionKind::Cancel | TransactionKind::Term
                )
        })
    }

    /// Total-premium line-items sorted ascending by effective date.
    /// Duplicate dates collapse to the last item given.
    pub fn total_premium_items(&self) -> Vec<&RateLineItem> {
        let mut by_date = std::collections::BTreeMap::new();
        for item in self
            .rate_items
            .iter()
            .filter(|i| i.code == RateCode::TotalPremium)
        {
            by_date.insert(item.effective_date, item);
        }
        by_date.into_values().collect()
    }

    /// The total-responsible-amount line-item effective at the
    /// transaction start, if any. Feeds effectuation derivation.
    pub fn responsible_amount_at_start(&self) -> Option<Decimal> {
        self.rate_items
            .iter()
            .filter(|i| {
                i.code == RateCode::TotalResponsibleAmount && i.effective_date == self.start_date
            })
            .map(|i| i.amount)
            .next_back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn transaction() -> EnrollmentTransaction {
        EnrollmentTransaction {
            id: TransactionId::new(),
            kind: TransactionKind::Add,
            account_id: AccountId::new(),
            coverage_type: CoverageType::Family,
            start_date: d(2023, 6, 1),
            end_date: None,
            state_code: "NY".into(),
            marketplace_type: "FFM".into(),
            business_unit: "IND".into(),
            plan_id: "PLAN-A".into(),
            group_policy_id: "GP-1".into(),
            csr_variant: "01".into(),
            rate_items: vec![],
            members: vec![],
        }
    }

    #[test]
    fn test_effective_end_defaults_to_year_end() {
        let txn = transaction();
        assert_eq!(txn.effective_end(), d(2023, 12, 31));

        let mut bounded = transaction();
        bounded.end_date = Some(d(2023, 9, 30));
        assert_eq!(bounded.effective_end(), d(2023, 9, 30));
    }

    #[test]
    fn test_subscriber_id_requires_household_head() {
        let mut txn = transaction();
        assert!(matches!(
            txn.exchange_subscriber_id(),
            Err(EnrollmentError::MissingHouseholdHead)
        ));

        txn.members.push(MemberChange {
            member_id: MemberId::new(),
            exchange_member_id: "EX-100".into(),
            kind: TransactionKind::Add,
            effective_date: d(2023, 6, 1),
            household_head: true,
        });
        assert_eq!(txn.exchange_subscriber_id().unwrap(), "EX-100");
    }

    #[test]
    fn test_dependent_change_ignores_household_head() {
        let mut txn = transaction();
        txn.members.push(MemberChange {
            member_id: MemberId::new(),
            exchange_member_id: "EX-100".into(),
            kind: TransactionKind::Term,
            effective_date: d(2023, 6, 1),
            household_head: true,
        });
        assert!(!txn.has_dependent_change());

        txn.members.push(MemberChange {
            member_id: MemberId::new(),
            exchange_member_id: "EX-101".into(),
            kind: TransactionKind::Cancel,
            effective_date: d(2023, 6, 1),
            household_head: false,
        });
        assert!(txn.has_dependent_change());
    }

    #[test]
    fn test_total_premium_items_sorted_and_deduped() {
        let mut txn = transaction();
        txn.rate_items = vec![
            RateLineItem::new(RateCode::TotalPremium, dec!(500), d(2023, 9, 1)),
            RateLineItem::new(RateCode::TotalPremium, dec!(450), d(2023, 6, 1)),
            RateLineItem::new(RateCode::Aptc, dec!(100), d(2023, 6, 1)),
            RateLineItem::new(RateCode::TotalPremium, dec!(475), d(2023, 9, 1)),
        ];

        let items = txn.total_premium_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].effective_date, d(2023, 6, 1));
        // later duplicate wins
        assert_eq!(items[1].amount, dec!(475));
    }

    #[test]
    fn test_responsible_amount_at_start() {
        let mut txn = transaction();
        txn.rate_items = vec![
            RateLineItem::new(RateCode::TotalResponsibleAmount, dec!(0), d(2023, 6, 1)),
            RateLineItem::new(RateCode::TotalResponsibleAmount, dec!(50), d(2023, 9, 1)),
        ];
        assert_eq!(txn.responsible_amount_at_start(), Some(dec!(0)));
    }
}
