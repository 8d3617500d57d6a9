//! Property-Based Test Generators
//!
//! Proptest strategies for generating enrollment data that stays inside
//! domain invariants.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_enrollment::{CoverageType, PremiumAmounts};

/// Strategy for a date inside the 2023 plan year (day kept <= 28 so any
/// month is valid)
pub fn plan_year_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1u32..13, 1u32..29).prop_map(|(m, d)| {
        NaiveDate::from_ymd_opt(2023, m, d).expect("valid generated date")
    })
}

/// Strategy for an ordered (start, end) pair inside the plan year
pub fn plan_year_range_strategy() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (plan_year_date_strategy(), plan_year_date_strategy())
        .prop_map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
}

/// Strategy for a coverage type
pub fn coverage_type_strategy() -> impl Strategy<Value = CoverageType> {
    prop_oneof![Just(CoverageType::Family), Just(CoverageType::DependentOnly)]
}

/// Strategy for a monetary amount in whole cents, non-negative
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..200_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for a full premium amount set with consistent components:
/// responsible + APTC + other = total
pub fn premium_amounts_strategy() -> impl Strategy<Value = PremiumAmounts> {
    (amount_strategy(), amount_strategy(), amount_strategy()).prop_map(
        |(responsible, aptc, csr)| PremiumAmounts {
            total_premium: responsible + aptc,
            total_responsible: responsible,
            aptc,
            other_pay: Decimal::ZERO,
            csr,
        },
    )
}

/// Strategy for a CSR variant code
pub fn csr_variant_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("01".to_string()),
        Just("02".to_string()),
        Just("04".to_string()),
        Just("05".to_string()),
        Just("06".to_string()),
    ]
}
