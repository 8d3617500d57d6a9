//! Timeline mutation instructions
//!
//! The engine performs no persistence. Every mutation it makes to the
//! in-memory timeline is mirrored by a [`TimelineChange`] instruction so
//! the caller can write the same mutations to its store. A transaction
//! yields one [`ChangeSet`]; an empty set means nothing to persist.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{EnrollmentSpanId, PremiumSpanId};

use crate::span::SpanStatus;

/// One persistable mutation produced while applying a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineChange {
    /// A new enrollment span was created
    SpanCreated { span_id: EnrollmentSpanId },

    /// An existing span's end date was pulled in
    SpanShortened {
        span_id: EnrollmentSpanId,
        new_end: NaiveDate,
    },

    /// An existing span was voided
    SpanCanceled { span_id: EnrollmentSpanId },

    /// A termed or canceled span's end date was restored
    SpanEndRestored {
        span_id: EnrollmentSpanId,
        new_end: NaiveDate,
    },

    /// A span's lifecycle status was recomputed
    SpanStatusChanged {
        span_id: EnrollmentSpanId,
        status: SpanStatus,
    },

    /// A new premium span was created
    PremiumCreated {
        premium_span_id: PremiumSpanId,
        span_id: EnrollmentSpanId,
    },

    /// A premium span's end date was pulled in
    PremiumShortened {
        premium_span_id: PremiumSpanId,
        new_end: NaiveDate,
    },

    /// A premium span's end date was pushed out (reinstatement repair)
    PremiumExtended {
        premium_span_id: PremiumSpanId,
        new_end: NaiveDate,
    },

    /// A premium span was voided
    PremiumCanceled { premium_span_id: PremiumSpanId },

    /// A canceled premium span was restored (reinstatement repair)
    PremiumReactivated {
        premium_span_id: PremiumSpanId,
        new_end: NaiveDate,
    },
}

/// The ordered set of mutations produced by one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    changes: Vec<TimelineChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: TimelineChange) {
        self.changes.push(change);
    }

    pub fn extend(&mut self, changes: impl IntoIterator<Item = TimelineChange>) {
        self.changes.extend(changes);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineChange> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn into_inner(self) -> Vec<TimelineChange> {
        self.changes
    }

    /// True if any change targets the given span
    pub fn touches_span(&self, span_id: EnrollmentSpanId) -> bool {
        self.changes.iter().any(|c| match c {
            TimelineChange::SpanCreated { span_id: id }
            | TimelineChange::SpanShortened { span_id: id, .. }
            | TimelineChange::SpanCanceled { span_id: id }
            | TimelineChange::SpanEndRestored { span_id: id, .. }
            | TimelineChange::SpanStatusChanged { span_id: id, .. }
            | TimelineChange::PremiumCreated { span_id: id, .. } => *id == span_id,
            _ => false,
        })
    }
}

impl IntoIterator for ChangeSet {
    type Item = TimelineChange;
    type IntoIter = std::vec::IntoIter<TimelineChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_change_set_round_trips_through_json() {
        // change sets cross the persistence boundary as data
        let mut changes = ChangeSet::new();
        let span_id = EnrollmentSpanId::new();
        changes.push(TimelineChange::SpanCreated { span_id });
        changes.push(TimelineChange::SpanShortened {
            span_id,
            new_end: NaiveDate::from_ymd_opt(2023, 5, 31).unwrap(),
        });

        let json = serde_json::to_string(&changes).unwrap();
        let back: ChangeSet = serde_json::from_str(&json).unwrap();
        assert_eq!(changes, back);
    }

    #[test]
    fn test_touches_span() {
        let span_id = EnrollmentSpanId::new();
        let mut changes = ChangeSet::new();
        changes.push(TimelineChange::PremiumCanceled {
            premium_span_id: PremiumSpanId::new(),
        });
        assert!(!changes.touches_span(span_id));

        changes.push(TimelineChange::SpanCanceled { span_id });
        assert!(changes.touches_span(span_id));
    }
}
