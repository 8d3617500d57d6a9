//! Enrollment Timeline Domain
//!
//! This crate maintains, per account, a consistent non-overlapping
//! timeline of coverage periods (enrollment spans), each carrying
//! contiguous financial sub-periods (premium spans). It resolves
//! temporal overlaps when new coverage arrives, derives lifecycle
//! status from effectuation/delinquency/gap rules, and reconciles
//! incoming financial line-items against existing premium spans.
//!
//! # Architecture
//!
//! The domain layer is infrastructure-agnostic and clock-free:
//! - **Arena**: [`AccountTimeline`] holds all spans for one account in
//!   flat id-keyed collections with parent-id references
//! - **Domain services**: [`OverlapResolver`], [`StatusDeterminer`],
//!   [`PremiumSpanReconciler`], [`ChangeClassifier`]
//! - **Orchestration**: [`EnrollmentEngine`] with a two-pass
//!   prepare/apply flow for the external validation exchange
//! - **Output**: a [`ChangeSet`] of mutation instructions for the
//!   caller to persist
//!
//! # Span Lifecycle
//!
//! ```text
//! PreMember -> Enrolled -> Delinquent -> Suspended
//!          \-> Canceled
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_enrollment::{AccountTimeline, EnrollmentEngine, ValidationMode};
//!
//! let engine = EnrollmentEngine::new(ValidationMode::External);
//! let prepared = engine.prepare(&timeline, &transaction)?;
//! // ... external validation round trip ...
//! let changes = engine.apply(&mut timeline, prepared, today)?;
//! store.persist(changes)?;
//! ```

pub mod changes;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod overlap;
pub mod reconcile;
pub mod span;
pub mod status;
pub mod timeline;
pub mod transaction;

pub use changes::{ChangeSet, TimelineChange};
pub use classifier::{ChangeClassifier, ChangeTransactionInfo};
pub use engine::{EnrollmentEngine, PreparedTransaction, SpanFingerprint, ValidationMode};
pub use error::EnrollmentError;
pub use overlap::{OverlapResolver, SpanResolution};
pub use reconcile::{PremiumSpanReconciler, PremiumSpanUpdateInfo, PremiumUpdate, RateSlice};
pub use span::{
    CoverageType, EnrollmentSpan, PremiumAmounts, PremiumSpan, PremiumStatus, SpanStatus,
};
pub use status::StatusDeterminer;
pub use timeline::AccountTimeline;
pub use transaction::{
    EnrollmentTransaction, MemberChange, RateCode, RateLineItem, TransactionKind,
};
