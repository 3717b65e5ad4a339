//! Deterministic datasets for tests and benchmarks.
//!
//! Everything here is generated, so fixtures are identical across runs and
//! need no files on disk.

use crate::data::Series;
use arrow::array::{
    ArrayRef, BooleanArray, DurationMicrosecondArray, Float64Array, Int64Array, StringArray,
    TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

const SPECIES: [&str; 3] = ["setosa", "versicolor", "virginica"];

fn batch(fields: Vec<Field>, columns: Vec<ArrayRef>) -> RecordBatch {
    #[allow(clippy::expect_used)]
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .expect("fixture columns match their schema");
    batch
}

/// A 150-row, iris-shaped table: four positive float measurements and a
/// species label, 50 rows per species.
pub fn iris() -> RecordBatch {
    let n = 150usize;
    let measure = |base: f64, spread: usize, step: usize| -> ArrayRef {
        Arc::new(Float64Array::from(
            (0..n)
                .map(|i| base + ((i * step) % spread) as f64 / 10.0 + (i / 50) as f64 * 0.5)
                .collect::<Vec<_>>(),
        ))
    };
    let species: ArrayRef = Arc::new(StringArray::from(
        (0..n).map(|i| SPECIES[i / 50]).collect::<Vec<_>>(),
    ));

    batch(
        vec![
            Field::new("sepal_length", DataType::Float64, false),
            Field::new("sepal_width", DataType::Float64, false),
            Field::new("petal_length", DataType::Float64, false),
            Field::new("petal_width", DataType::Float64, false),
            Field::new("species", DataType::Utf8, false),
        ],
        vec![
            measure(4.3, 25, 7),
            measure(2.0, 20, 3),
            measure(1.0, 30, 11),
            measure(0.1, 15, 5),
            species,
        ],
    )
}

/// A small table with a repeated row and a value above 5.
///
/// ```text
/// a  | b
/// 1  | x
/// 2  | y
/// 2  | y
/// 3  | z
/// 10 | w
/// ```
pub fn small() -> RecordBatch {
    batch(
        vec![
            Field::new("a", DataType::Int64, false),
            Field::new("b", DataType::Utf8, false),
        ],
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 2, 3, 10])),
            Arc::new(StringArray::from(vec!["x", "y", "y", "z", "w"])),
        ],
    )
}

/// A table with nulls in two of its three columns.
///
/// Rows 1, 3 and 4 contain at least one null.
pub fn with_nulls() -> RecordBatch {
    batch(
        vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("score", DataType::Float64, true),
        ],
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5, 6])),
            Arc::new(StringArray::from(vec![
                Some("alice"),
                None,
                Some("carol"),
                Some("dave"),
                None,
                Some("frank"),
            ])),
            Arc::new(Float64Array::from(vec![
                Some(1.5),
                Some(-2.0),
                Some(3.25),
                None,
                Some(4.0),
                Some(0.5),
            ])),
        ],
    )
}

/// One column of each kind the type assertions recognise.
pub fn mixed_types() -> RecordBatch {
    batch(
        vec![
            Field::new("ints", DataType::Int64, false),
            Field::new("floats", DataType::Float64, false),
            Field::new("strings", DataType::Utf8, false),
            Field::new("flags", DataType::Boolean, false),
            Field::new(
                "times",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
            Field::new("waits", DataType::Duration(TimeUnit::Microsecond), false),
        ],
        vec![
            Arc::new(Int64Array::from(vec![1, -2, 3])),
            Arc::new(Float64Array::from(vec![0.5, 1.25, -3.0])),
            Arc::new(StringArray::from(vec!["a", "b", "c"])),
            Arc::new(BooleanArray::from(vec![true, false, true])),
            Arc::new(TimestampMicrosecondArray::from(vec![
                1_700_000_000_000_000,
                1_700_000_060_000_000,
                1_700_000_120_000_000,
            ])),
            Arc::new(DurationMicrosecondArray::from(vec![
                1_000_000, 2_500_000, 60_000_000,
            ])),
        ],
    )
}

/// A float series.
pub fn series(name: &str, values: Vec<Option<f64>>) -> Series {
    Series::new(name, Arc::new(Float64Array::from(values)))
}
