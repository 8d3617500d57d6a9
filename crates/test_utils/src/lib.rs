//! Shared Test Utilities
//!
//! Common test infrastructure for the enrollment system test suites:
//! - **Fixtures**: deterministic dates, amounts, and identifiers
//! - **Builders**: fluent construction of spans and transactions with
//!   sensible defaults
//! - **Generators**: proptest strategies for property-based tests
//! - **Assertions**: timeline invariant checks

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod generators;

pub use assertions::{assert_no_overlaps, assert_premiums_cover_span};
pub use builders::{PremiumSpanBuilder, SpanBuilder, TransactionBuilder};
pub use fixtures::{AmountFixtures, DateFixtures, StringFixtures};
