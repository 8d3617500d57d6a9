//! Deterministic Test Fixtures
//!
//! Fixed dates, amounts, and identifier strings so tests read clearly
//! and never depend on the wall clock.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Common coverage dates for the 2023 plan year
pub struct DateFixtures;

impl DateFixtures {
    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
    }

    /// January 1, 2023
    pub fn year_start() -> NaiveDate {
        Self::date(2023, 1, 1)
    }

    /// December 31, 2023
    pub fn year_end() -> NaiveDate {
        Self::date(2023, 12, 31)
    }

    /// June 1, 2023 - a mid-year effective date
    pub fn mid_year() -> NaiveDate {
        Self::date(2023, 6, 1)
    }

    /// A processing date inside the plan year
    pub fn today() -> NaiveDate {
        Self::date(2023, 5, 15)
    }
}

/// Common premium amounts
pub struct AmountFixtures;

impl AmountFixtures {
    pub fn total_premium() -> Decimal {
        dec!(450.00)
    }

    pub fn responsible() -> Decimal {
        dec!(50.00)
    }

    pub fn aptc() -> Decimal {
        dec!(400.00)
    }
}

/// Common identifier strings
pub struct StringFixtures;

impl StringFixtures {
    pub fn plan_id() -> &'static str {
        "86052NY0040001"
    }

    pub fn other_plan_id() -> &'static str {
        "86052NY0040002"
    }

    pub fn group_policy_id() -> &'static str {
        "GP-2023-0001"
    }

    pub fn csr_variant() -> &'static str {
        "01"
    }

    pub fn exchange_member_id() -> &'static str {
        "EX-MEM-0001"
    }
}
