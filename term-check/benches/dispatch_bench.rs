//! Benchmarks for the check dispatch path.

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use term_check::display::{NullDisplay, PlainTextDisplay};
use term_check::prelude::*;

fn create_batch(rows: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("value", DataType::Float64, true),
        Field::new("category", DataType::Utf8, true),
    ]));
    let ids: ArrayRef = Arc::new(Int64Array::from((0..rows as i64).collect::<Vec<_>>()));
    let values: ArrayRef = Arc::new(Float64Array::from(
        (0..rows)
            .map(|i| if i % 20 == 0 { None } else { Some(i as f64 * 1.5) })
            .collect::<Vec<_>>(),
    ));
    let categories: ArrayRef = Arc::new(StringArray::from(
        (0..rows)
            .map(|i| if i % 10 == 0 { None } else { Some(format!("cat_{}", i % 7)) })
            .collect::<Vec<_>>(),
    ));
    RecordBatch::try_new(schema, vec![ids, values, categories]).unwrap()
}

fn bench_scalar_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalar_checks");
    let ctx = CheckContext::builder().target(NullDisplay).build();

    for rows in [1_000, 100_000] {
        let batch = create_batch(rows);
        group.bench_with_input(BenchmarkId::new("nrows_nnulls_ndups", rows), &batch, |b, batch| {
            b.iter(|| {
                black_box(batch)
                    .check_with(&ctx)
                    .nrows(None)
                    .unwrap()
                    .nnulls(false, None)
                    .unwrap()
                    .ndups(None)
                    .unwrap();
            })
        });
        group.bench_with_input(BenchmarkId::new("value_counts", rows), &batch, |b, batch| {
            b.iter(|| {
                black_box(batch)
                    .check_with(&ctx)
                    .value_counts("category", 10, None)
                    .unwrap();
            })
        });
    }
    group.finish();
}

fn bench_disabled_checks(c: &mut Criterion) {
    let ctx = CheckContext::builder().target(NullDisplay).build();
    ctx.settings().write().unwrap().disable_checks(true).unwrap();
    let batch = create_batch(100_000);

    c.bench_function("disabled_chain", |b| {
        b.iter(|| {
            black_box(&batch)
                .check_with(&ctx)
                .describe(None)
                .unwrap()
                .value_counts("category", 10, None)
                .unwrap();
        })
    });
}

fn bench_table_rendering(c: &mut Criterion) {
    let ctx = CheckContext::builder()
        .target(PlainTextDisplay::new(std::io::sink()).with_colors(false))
        .build();
    let batch = create_batch(1_000);

    c.bench_function("head_50_plain_text", |b| {
        b.iter(|| {
            black_box(&batch).check_with(&ctx).head(50, None).unwrap();
        })
    });
}

fn bench_sql_transform(c: &mut Criterion) {
    let ctx = CheckContext::builder().target(NullDisplay).build();
    let batch = create_batch(10_000);
    let options = CheckOptions::new().transform(Transform::filter("value > 100"));

    c.bench_function("filter_then_nrows", |b| {
        b.iter(|| {
            black_box(&batch)
                .check_with(&ctx)
                .nrows(options.clone())
                .unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_scalar_checks,
    bench_disabled_checks,
    bench_table_rendering,
    bench_sql_transform
);
criterion_main!(benches);
