//! End-to-end behaviour of the `.check()` surface.

mod common;

use arrow::record_batch::RecordBatch;
use common::{context, iris, small, with_nulls};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use term_check::prelude::*;

/// Runs every inspection method once, with a transform and subset where the
/// method takes them.
fn run_every_check(batch: &RecordBatch, ctx: &CheckContext) -> Result<()> {
    let head = || CheckOptions::new().transform(Transform::new(|d: &Data| Ok(d.head(3))));
    let timer = TimerHandle::now();
    batch
        .check_with(ctx)
        .columns(head())?
        .ncols(None)?
        .nrows(head())?
        .shape(CheckOptions::new().subset(["sepal_length"]))?
        .dtypes(None)?
        .describe(CheckOptions::new().subset(["sepal_length", "petal_width"]))?
        .head(5, None)?
        .tail(-140, None)?
        .print(3, None)?
        .print_text("milestone")?
        .print_value(vec![1i64, 2, 3], None)?
        .info(None)?
        .memory_usage(None)?
        .ndups(CheckOptions::from("species"))?
        .nnulls(true, None)?
        .nnulls(false, CheckOptions::new().subset(["petal_length", "species"]))?
        .nunique("species", None)?
        .unique("species", head())?
        .value_counts("species", 2, None)?
        .function(|d| Ok(CheckValue::from(d.num_rows() > 10)), None)?
        .hist(10, None)?
        .plot(&PlotOptions::default().x("petal_length").y("sepal_length"), None)?
        .get_mode()?
        .print_time_elapsed(&timer, None, "auto")?;
    Ok(())
}

#[test]
fn test_checks_never_modify_the_data() {
    let (ctx, buffer) = context();
    let data = iris();
    let before = data.clone();

    run_every_check(&data, &ctx).unwrap();
    assert_eq!(data, before);
    assert!(!buffer.is_empty());

    ctx.settings().write().unwrap().disable_checks(true).unwrap();
    run_every_check(&data, &ctx).unwrap();
    assert_eq!(data, before);
}

#[test]
fn test_disabled_checks_produce_no_output() {
    let (ctx, buffer) = context();
    let (sink, lines) = OutputSink::collector();
    {
        let mut settings = ctx.settings().write().unwrap();
        settings.set_custom_sink(Some(sink), true).unwrap();
        settings.disable_checks(true).unwrap();
    }
    run_every_check(&iris(), &ctx).unwrap();
    assert!(buffer.is_empty());
    assert!(lines.lock().unwrap().is_empty());
}

#[test]
fn test_asserts_survive_disabled_checks() {
    let (ctx, _) = context();
    let data = small();
    let checks = data.check_with(&ctx);
    checks.disable_checks(true).unwrap();
    assert!(checks.assert_nrows(99, None).is_err());

    checks.disable_checks(false).unwrap();
    checks.assert_nrows(99, None).unwrap();
}

#[test]
fn test_disabled_asserts_do_not_evaluate() {
    let (ctx, _) = context();
    ctx.settings().write().unwrap().set("enable_asserts", false).unwrap();
    let evaluated = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&evaluated);
    let predicate = Predicate::new(move |_| {
        seen.store(true, Ordering::SeqCst);
        Ok(false)
    });
    small().check_with(&ctx).assert_data(&predicate, None).unwrap();
    assert!(!evaluated.load(Ordering::SeqCst));
}

#[test]
fn test_row_count_scenario() {
    let (ctx, buffer) = context();
    let data = iris();
    data.check_with(&ctx).nrows(None).unwrap();
    assert_eq!(buffer.contents(), "\n☰ Rows: 150\n");

    buffer.clear();
    data.check_with(&ctx)
        .set_format([("use_emojis", OptionValue::from(false))])
        .unwrap()
        .nrows(None)
        .unwrap();
    assert_eq!(buffer.contents(), "\nRows: 150\n");
}

#[test]
fn test_failing_range_assertion_scenario() {
    let (ctx, _) = context();
    let err = small()
        .check_with(&ctx)
        .assert_less_than(5.0, false, AssertOptions::from("a"))
        .unwrap_err();
    assert_eq!(err.assertion_kind(), Some(&AssertionKind::Data));
}

#[test]
fn test_settings_reset_scenario() {
    let (ctx, _) = context();
    let data = small();
    data.check_with(&ctx)
        .set_format([
            ("precision", OptionValue::from(9)),
            ("check.use_emojis", OptionValue::from(false)),
        ])
        .unwrap()
        .reset_format()
        .unwrap();
    let format = ctx.format().unwrap();
    assert_eq!(format.precision, 2);
    assert!(format.use_emojis);
}

#[test]
fn test_bad_format_changes_nothing() {
    let (ctx, _) = context();
    let table = small();
    let checks = table.check_with(&ctx);
    let result = checks.set_format([
        ("precision", OptionValue::from(5)),
        ("no_such_option", OptionValue::from(1)),
    ]);
    assert!(matches!(result, Err(CheckError::UnknownOption { .. })));
    assert_eq!(ctx.format().unwrap().precision, 2);
}

#[test]
fn test_soft_failures_continue_the_chain() {
    let (ctx, buffer) = context();
    let soft = || AssertOptions::new().raise_on_fail(false);
    with_nulls()
        .check_with(&ctx)
        .assert_no_nulls(soft())
        .unwrap()
        .assert_positive(true, soft().subset("score"))
        .unwrap()
        .nrows(None)
        .unwrap();
    let out = buffer.contents();
    assert!(out.contains("ㄨ Assert no nulls failed"), "{out}");
    assert!(out.contains("ㄨ Assert positive failed: Nulls present"), "{out}");
    assert!(out.ends_with("☰ Rows: 6\n"));
}

#[test]
fn test_predicate_label_in_error() {
    let (ctx, _) = context();
    let predicate = Predicate::new(|d| Ok(d.num_rows() > 10)).labeled("rows > 10");
    let err = small()
        .check_with(&ctx)
        .assert_data(&predicate, AssertOptions::new().fail_message("too small"))
        .unwrap_err();
    assert_eq!(err.to_string(), "DataError: too small: rows > 10");
}

#[test]
fn test_sql_transform_feeds_checks() {
    let (ctx, buffer) = context();
    let options = CheckOptions::new()
        .transform(Transform::sql(
            "SELECT species, COUNT(*) AS n FROM data GROUP BY species ORDER BY species",
        ))
        .name("per species");
    iris().check_with(&ctx).nrows(options).unwrap();
    assert_eq!(buffer.contents(), "\nper species: 3\n");
}

#[test]
fn test_unsafe_sql_is_rejected() {
    let (ctx, buffer) = context();
    for query in [
        "DROP TABLE data",
        "SELECT * FROM data; DELETE FROM data",
        "SELECT * FROM data -- sneaky",
        "WITH x AS (SELECT 1) INSERT INTO data SELECT * FROM x",
    ] {
        let err = iris()
            .check_with(&ctx)
            .nrows(CheckOptions::new().transform(Transform::sql(query)))
            .unwrap_err();
        assert!(matches!(err, CheckError::InvalidExpression(_)), "{query}: {err}");
    }
    assert!(buffer.is_empty());
}

#[test]
fn test_tracing_sink_does_not_disturb_output() {
    let (ctx, buffer) = context();
    ctx.settings()
        .write()
        .unwrap()
        .set_custom_sink(Some(OutputSink::tracing(tracing::Level::INFO)), true)
        .unwrap();
    small().check_with(&ctx).ncols(None).unwrap();
    assert_eq!(buffer.contents(), "\n🏛️ Columns: 2\n");
}
