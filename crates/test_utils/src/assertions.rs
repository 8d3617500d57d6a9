//! Timeline Invariant Assertions
//!
//! Checks for the two structural invariants every applied transaction
//! must preserve: non-overlap of live spans within a partition, and
//! premium spans exactly covering their parent span.

use chrono::Datelike;

use core_kernel::{day_after, overlaps, EnrollmentSpanId};
use domain_enrollment::{AccountTimeline, CoverageType};

/// Panics if any two non-canceled spans in the same year/coverage-type
/// partition overlap.
pub fn assert_no_overlaps(timeline: &AccountTimeline) {
    let mut partitions: Vec<(i32, CoverageType)> = timeline
        .spans()
        .map(|s| (s.start_date.year(), s.coverage_type))
        .collect();
    partitions.sort_by_key(|(year, ct)| (*year, *ct as u8));
    partitions.dedup();

    for (year, coverage_type) in partitions {
        let live: Vec<_> = timeline
            .partition(year, coverage_type)
            .into_iter()
            .filter(|s| !s.is_canceled())
            .collect();
        for (i, a) in live.iter().enumerate() {
            for b in &live[i + 1..] {
                assert!(
                    !overlaps(a.start_date, a.end_date, b.start_date, b.end_date),
                    "spans {} [{}..{}] and {} [{}..{}] overlap in partition {}/{:?}",
                    a.id,
                    a.start_date,
                    a.end_date,
                    b.id,
                    b.start_date,
                    b.end_date,
                    year,
                    coverage_type,
                );
            }
        }
    }
}

/// Panics unless the span's active premium spans are contiguous,
/// non-overlapping, and together cover exactly the span's date range.
pub fn assert_premiums_cover_span(timeline: &AccountTimeline, span_id: EnrollmentSpanId) {
    let span = timeline
        .span(span_id)
        .unwrap_or_else(|| panic!("span {span_id} not in timeline"));
    let premiums = timeline.active_premiums_of(span_id);
    assert!(
        !premiums.is_empty(),
        "span {span_id} has no active premium spans"
    );

    assert_eq!(
        premiums[0].start_date, span.start_date,
        "first premium span does not start at the span start"
    );
    assert_eq!(
        premiums[premiums.len() - 1].end_date,
        span.end_date,
        "last premium span does not end at the span end"
    );
    for pair in premiums.windows(2) {
        assert_eq!(
            day_after(pair[0].end_date),
            pair[1].start_date,
            "premium spans {} and {} are not contiguous",
            pair[0].id,
            pair[1].id,
        );
    }
}
