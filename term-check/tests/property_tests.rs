//! Property-based tests for the check pipeline.
//!
//! These cover invariants that must hold for arbitrary data:
//! - checks never change the data they are called on
//! - head/tail lengths follow the sign convention for any `n`
//! - null and duplicate counts agree with a direct computation
//! - elapsed-time unit selection is monotonic in the duration

mod common;

use arrow::array::{ArrayRef, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use common::context;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use term_check::prelude::*;
use term_check::timer::TimeUnit;

fn table(values: &[Option<i64>]) -> RecordBatch {
    let column: ArrayRef = Arc::new(Int64Array::from(values.to_vec()));
    RecordBatch::try_new(
        Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, true)])),
        vec![column],
    )
    .unwrap()
}

fn values() -> impl Strategy<Value = Vec<Option<i64>>> {
    prop::collection::vec(prop::option::weighted(0.8, -20i64..20), 0..60)
}

proptest! {
    #[test]
    fn prop_checks_leave_data_untouched(values in values(), n in -70i64..70) {
        let (ctx, _) = context();
        let data = table(&values);
        let before = data.clone();
        data.check_with(&ctx)
            .head(n, None).unwrap()
            .tail(n, None).unwrap()
            .nnulls(false, None).unwrap()
            .ndups(None).unwrap()
            .value_counts("v", 5, None).unwrap();
        let _ = data.check_with(&ctx).assert_positive(false, AssertOptions::from("v"));
        prop_assert_eq!(data, before);
    }

    #[test]
    fn prop_head_and_tail_lengths(values in values(), n in -70i64..70) {
        let data = Data::Table(table(&values));
        let rows = values.len() as i64;
        let expected = if n >= 0 { n.min(rows) } else { (rows + n).max(0) };
        prop_assert_eq!(data.head(n).num_rows() as i64, expected);
        prop_assert_eq!(data.tail(n).num_rows() as i64, expected);
    }

    #[test]
    fn prop_counts_match_direct_computation(values in values()) {
        let data = Data::Table(table(&values));
        let nulls = values.iter().filter(|v| v.is_none()).count();
        prop_assert_eq!(data.rows_with_nulls(), nulls);

        let mut seen = HashSet::new();
        let dups = values.iter().filter(|v| !seen.insert(**v)).count();
        prop_assert_eq!(data.count_duplicates().unwrap(), dups);
    }

    #[test]
    fn prop_nrows_line_matches_length(values in values()) {
        let (ctx, buffer) = context();
        table(&values).check_with(&ctx).nrows(None).unwrap();
        prop_assert_eq!(buffer.contents(), format!("\n☰ Rows: {}\n", values.len()));
    }

    #[test]
    fn prop_auto_units_are_monotonic(a in 0u64..10_000_000, b in 0u64..10_000_000) {
        let rank = |unit: TimeUnit| match unit {
            TimeUnit::Milliseconds => 0,
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 2,
            TimeUnit::Hours => 3,
            TimeUnit::Auto => unreachable!(),
        };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let lo = TimeUnit::auto_for(Duration::from_millis(lo));
        let hi = TimeUnit::auto_for(Duration::from_millis(hi));
        prop_assert!(rank(lo) <= rank(hi));
    }
}

#[test]
fn test_auto_unit_boundaries() {
    let auto = |ms: u64| TimeUnit::auto_for(Duration::from_millis(ms));
    assert_eq!(auto(999), TimeUnit::Milliseconds);
    assert_eq!(auto(1_000), TimeUnit::Seconds);
    assert_eq!(auto(59_999), TimeUnit::Seconds);
    assert_eq!(auto(60_000), TimeUnit::Minutes);
    assert_eq!(auto(3_599_999), TimeUnit::Minutes);
    assert_eq!(auto(3_600_000), TimeUnit::Hours);
}
