//! Core Kernel - Foundational types and utilities for the enrollment system
//!
//! This crate provides the fundamental building blocks used across the domain
//! modules:
//! - Date-interval math with one shared boundary contract
//! - Strongly-typed identifiers
//! - Common error types

pub mod error;
pub mod identifiers;
pub mod temporal;

pub use error::CoreError;
pub use identifiers::{AccountId, EnrollmentSpanId, MemberId, PremiumSpanId, TransactionId};
pub use temporal::{
    day_after, day_before, gap_days, overlaps, year_end, year_end_of, DateRange, TemporalError,
};
