//! The assertion engine.
//!
//! An assertion evaluates a [`Predicate`] against the (optionally transformed
//! and subsetted) data. On failure it either returns
//! [`CheckError::Assertion`] or, when the caller opted out of raising, shows
//! a failure banner in the fail colors and carries on. Passing assertions are
//! silent unless `verbose` is set.
//!
//! Assertions are governed only by the `enable_asserts` option. While it is
//! off, the predicate is never evaluated.
//!
//! The specialised assertions (`assert_positive`, `assert_type`, ...) are
//! predicates built by the functions in this module plus default messages.

use crate::data::{Data, Subset};
use crate::dispatch::CheckContext;
use crate::display::TextColors;
use crate::error::{AssertionKind, CheckError, Result};
use crate::transform::{apply_modifications, Transform};
use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Shown when the null pre-check fails.
pub const NULLS_PRESENT: &str = "Nulls present (to disable, pass `assert_no_nulls(false)`)";

type PredicateFn = Arc<dyn Fn(&Data) -> Result<bool> + Send + Sync>;

/// A condition on the data, with an optional human-readable label that is
/// shown next to failure messages.
#[derive(Clone)]
pub struct Predicate {
    label: Option<String>,
    func: PredicateFn,
}

impl Predicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Data) -> Result<bool> + Send + Sync + 'static,
    {
        Self {
            label: None,
            func: Arc::new(f),
        }
    }

    /// Labels the predicate, e.g. `"rows > 0"`.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn evaluate(&self, data: &Data) -> Result<bool> {
        (self.func)(data)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.label.as_deref().unwrap_or("<closure>"))
    }
}

/// Per-call options for assertions.
#[derive(Debug, Clone)]
pub struct AssertOptions {
    pub transform: Transform,
    pub subset: Subset,
    /// Replaces the assertion's default failure message.
    pub fail_message: Option<String>,
    /// Replaces the assertion's default pass message.
    pub pass_message: Option<String>,
    /// Return an error on failure. Otherwise show a banner and continue.
    pub raise_on_fail: bool,
    /// Replaces the assertion's default error kind.
    pub error_kind: Option<AssertionKind>,
    /// Append the predicate's label to messages.
    pub show_condition_text: bool,
    /// Show the pass message when the assertion holds.
    pub verbose: bool,
}

impl Default for AssertOptions {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            subset: Subset::None,
            fail_message: None,
            pass_message: None,
            raise_on_fail: true,
            error_kind: None,
            show_condition_text: true,
            verbose: false,
        }
    }
}

impl AssertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn subset(mut self, subset: impl Into<Subset>) -> Self {
        self.subset = subset.into();
        self
    }

    pub fn fail_message(mut self, message: impl Into<String>) -> Self {
        self.fail_message = Some(message.into());
        self
    }

    pub fn pass_message(mut self, message: impl Into<String>) -> Self {
        self.pass_message = Some(message.into());
        self
    }

    pub fn raise_on_fail(mut self, raise: bool) -> Self {
        self.raise_on_fail = raise;
        self
    }

    pub fn error_kind(mut self, kind: AssertionKind) -> Self {
        self.error_kind = Some(kind);
        self
    }

    pub fn show_condition_text(mut self, show: bool) -> Self {
        self.show_condition_text = show;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl From<Subset> for AssertOptions {
    fn from(subset: Subset) -> Self {
        Self::new().subset(subset)
    }
}

impl From<&str> for AssertOptions {
    /// A bare string selects a column.
    fn from(column: &str) -> Self {
        Self::new().subset(column)
    }
}

/// Messages and error kind an assertion uses unless the caller overrides them.
#[derive(Debug, Clone)]
pub struct AssertDefaults {
    pub pass_message: String,
    pub fail_message: String,
    pub error_kind: AssertionKind,
}

impl AssertDefaults {
    pub fn new(pass_message: impl Into<String>, fail_message: impl Into<String>) -> Self {
        Self {
            pass_message: pass_message.into(),
            fail_message: fail_message.into(),
            error_kind: AssertionKind::Data,
        }
    }

    pub fn kind(mut self, kind: AssertionKind) -> Self {
        self.error_kind = kind;
        self
    }
}

/// Resolved messages for one call.
struct Outcome<'a> {
    pass: &'a str,
    fail: &'a str,
    kind: AssertionKind,
}

impl<'a> Outcome<'a> {
    fn resolve(options: &'a AssertOptions, defaults: &'a AssertDefaults) -> Self {
        Self {
            pass: options.pass_message.as_deref().unwrap_or(&defaults.pass_message),
            fail: options.fail_message.as_deref().unwrap_or(&defaults.fail_message),
            kind: options
                .error_kind
                .clone()
                .unwrap_or_else(|| defaults.error_kind.clone()),
        }
    }
}

/// Evaluates `predicate` against the modified data and reports the result.
///
/// Returns `Ok(())` when asserts are disabled, when the predicate holds, or
/// when it fails with `raise_on_fail` off. Errors from the transform or the
/// predicate propagate unchanged.
#[instrument(skip_all, fields(
    assert.predicate = predicate.label().unwrap_or(""),
    assert.subset = %options.subset
))]
pub fn assert_check(
    ctx: &CheckContext,
    data: &Data,
    predicate: &Predicate,
    options: &AssertOptions,
    defaults: &AssertDefaults,
) -> Result<()> {
    if !ctx.asserts_enabled()? {
        debug!("Assertions disabled, skipping");
        return Ok(());
    }
    let working = apply_modifications(data, &options.transform, &options.subset)?;
    report(ctx, &working, predicate, options, defaults)
}

fn report(
    ctx: &CheckContext,
    working: &Data,
    predicate: &Predicate,
    options: &AssertOptions,
    defaults: &AssertDefaults,
) -> Result<()> {
    let outcome = Outcome::resolve(options, defaults);
    let passed = predicate.evaluate(working)?;
    debug!(assert.passed = passed, "Assertion evaluated");

    let condition = predicate.label().filter(|_| options.show_condition_text);
    let format = ctx.format()?;
    if !passed {
        if options.raise_on_fail {
            let message = match condition {
                Some(label) => format!("{}: {label}", outcome.fail),
                None => outcome.fail.to_string(),
            };
            return Err(CheckError::assertion(outcome.kind, message));
        }
        return banner(ctx, outcome.fail, condition, format.fail_colors);
    }
    if options.verbose {
        banner(ctx, outcome.pass, condition, format.pass_colors)?;
    }
    Ok(())
}

fn banner(
    ctx: &CheckContext,
    message: &str,
    condition: Option<&str>,
    colors: crate::options::ColorPair,
) -> Result<()> {
    match condition {
        Some(label) => ctx
            .renderer()
            .show_line(label, Some(message), &TextColors::lead_in(colors)),
        None => ctx
            .renderer()
            .show_line(message, None, &TextColors::text(colors)),
    }
}

/// The null pre-check. Returns `true` when `working` contains nulls, after
/// raising or showing the failure as `options` dictates.
pub fn has_nulls(
    ctx: &CheckContext,
    working: &Data,
    options: &AssertOptions,
    defaults: &AssertDefaults,
) -> Result<bool> {
    if working.total_nulls() == 0 {
        return Ok(false);
    }
    let outcome = Outcome::resolve(options, defaults);
    if options.raise_on_fail {
        return Err(CheckError::assertion(
            outcome.kind,
            format!("{}: {NULLS_PRESENT}", outcome.fail),
        ));
    }
    let colors = ctx.format()?.fail_colors;
    ctx.renderer()
        .show_line(NULLS_PRESENT, Some(outcome.fail), &TextColors::lead_in(colors))?;
    Ok(true)
}

/// Sign assertion: optional null pre-check, then every non-null value must
/// have the required sign.
pub fn assert_sign(
    ctx: &CheckContext,
    data: &Data,
    positive: bool,
    check_nulls: bool,
    options: &AssertOptions,
    defaults: &AssertDefaults,
) -> Result<()> {
    if !ctx.asserts_enabled()? {
        return Ok(());
    }
    let working = apply_modifications(data, &options.transform, &options.subset)?;
    if check_nulls && has_nulls(ctx, &working, options, defaults)? {
        return Ok(());
    }
    let predicate = Predicate::new(move |d| {
        all_values(d, |v| match v {
            Some(v) if positive => v > 0.0,
            Some(v) => v < 0.0,
            None => true,
        })
    });
    report(ctx, &working, &predicate, options, defaults)
}

/// Type assertion. The default failure message names the expected kind and
/// the types found.
pub fn assert_type(
    ctx: &CheckContext,
    data: &Data,
    kind: &DataKind,
    options: &AssertOptions,
    pass_message: &str,
) -> Result<()> {
    if !ctx.asserts_enabled()? {
        return Ok(());
    }
    let working = apply_modifications(data, &options.transform, &options.subset)?;
    let found = working
        .dtypes()
        .iter()
        .map(|(_, t)| t.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let defaults = AssertDefaults::new(
        pass_message,
        format!("ㄨ Assert type failed: expected {kind}, got {found}"),
    )
    .kind(AssertionKind::Type);
    let kind = kind.clone();
    let predicate = Predicate::new(move |d| {
        Ok(d.dtypes().iter().all(|(_, t)| kind.matches(t)))
    });
    report(ctx, &working, &predicate, options, &defaults)
}

/// Broad type families for [`assert_type`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataKind {
    /// Any string type.
    Str,
    /// Any signed or unsigned integer type.
    Int,
    /// Any floating point type.
    Float,
    /// Dates and timestamps, with or without a time zone.
    Datetime,
    /// Durations and intervals.
    Timedelta,
    Bool,
    /// Exactly this Arrow type.
    Exact(DataType),
}

impl DataKind {
    pub fn matches(&self, data_type: &DataType) -> bool {
        match self {
            DataKind::Str => matches!(
                data_type,
                DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
            ),
            DataKind::Int => data_type.is_integer(),
            DataKind::Float => data_type.is_floating(),
            DataKind::Datetime => matches!(
                data_type,
                DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64
            ),
            DataKind::Timedelta => {
                matches!(data_type, DataType::Duration(_) | DataType::Interval(_))
            }
            DataKind::Bool => matches!(data_type, DataType::Boolean),
            DataKind::Exact(expected) => expected == data_type,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Str => write!(f, "str"),
            DataKind::Int => write!(f, "int"),
            DataKind::Float => write!(f, "float"),
            DataKind::Datetime => write!(f, "datetime"),
            DataKind::Timedelta => write!(f, "timedelta"),
            DataKind::Bool => write!(f, "bool"),
            DataKind::Exact(t) => write!(f, "{t}"),
        }
    }
}

impl From<DataType> for DataKind {
    fn from(value: DataType) -> Self {
        DataKind::Exact(value)
    }
}

/// How values are compared against a bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Above { min: f64, or_equal_to: bool },
    Below { max: f64, or_equal_to: bool },
}

impl Bound {
    pub fn holds(&self, value: f64) -> bool {
        match *self {
            Bound::Above { min, or_equal_to } => {
                if or_equal_to {
                    value >= min
                } else {
                    value > min
                }
            }
            Bound::Below { max, or_equal_to } => {
                if or_equal_to {
                    value <= max
                } else {
                    value < max
                }
            }
        }
    }
}

/// Applies `test` to every value of every column, cast to `f64`. Nulls and
/// NaNs are passed as `None`.
///
/// Non-numeric columns fail with [`CheckError::TypeMismatch`].
pub fn all_values(data: &Data, test: impl Fn(Option<f64>) -> bool) -> Result<bool> {
    for (name, values) in data.columns() {
        if !values.data_type().is_numeric() {
            return Err(CheckError::type_mismatch(
                "numeric column",
                format!("{name}: {}", values.data_type()),
            ));
        }
        let floats = cast(values.as_ref(), &DataType::Float64)?;
        let floats = floats.as_primitive::<Float64Type>();
        let value = |i: usize| Some(floats.value(i)).filter(|v| floats.is_valid(i) && !v.is_nan());
        if !(0..floats.len()).all(|i| test(value(i))) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Ready-made predicates for the specialised assertions.
pub mod predicates {
    use super::*;

    /// Every value is null.
    pub fn all_nulls() -> Predicate {
        Predicate::new(|d| Ok(d.null_counts().iter().all(|(_, n)| *n == d.num_rows())))
    }

    /// No value is null.
    pub fn no_nulls() -> Predicate {
        Predicate::new(|d| Ok(d.total_nulls() == 0))
    }

    pub fn nrows(expected: usize) -> Predicate {
        Predicate::new(move |d| Ok(d.num_rows() == expected))
    }

    /// No row repeats an earlier one.
    pub fn unique() -> Predicate {
        Predicate::new(|d| Ok(d.count_duplicates()? == 0))
    }

    /// Every value satisfies `bound`. Nulls fail.
    pub fn within(bound: Bound) -> Predicate {
        Predicate::new(move |d| all_values(d, |v| v.is_some_and(|v| bound.holds(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{PlainTextDisplay, SharedBuffer};
    use crate::options::OutputSink;
    use crate::test_fixtures;

    fn context() -> (CheckContext, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let ctx = CheckContext::builder()
            .target(PlainTextDisplay::new(buffer.clone()).with_colors(false))
            .build();
        (ctx, buffer)
    }

    fn defaults() -> AssertDefaults {
        AssertDefaults::new("✔️ Assertion passed", "ㄨ Assertion failed")
    }

    #[test]
    fn test_failing_assertion_raises_data_error() {
        let (ctx, _) = context();
        let data = Data::from(test_fixtures::small());
        let predicate = predicates::within(Bound::Below {
            max: 5.0,
            or_equal_to: false,
        });
        let err = assert_check(&ctx, &data, &predicate, &AssertOptions::from("a"), &defaults())
            .unwrap_err();
        assert_eq!(err.assertion_kind(), Some(&AssertionKind::Data));
        assert_eq!(err.to_string(), "DataError: ㄨ Assertion failed");
    }

    #[test]
    fn test_label_is_appended() {
        let (ctx, _) = context();
        let data = Data::from(test_fixtures::small());
        let predicate = Predicate::new(|d| Ok(d.num_rows() > 100)).labeled("rows > 100");
        let err = assert_check(&ctx, &data, &predicate, &AssertOptions::new(), &defaults())
            .unwrap_err();
        assert_eq!(err.to_string(), "DataError: ㄨ Assertion failed: rows > 100");

        let quiet = AssertOptions::new().show_condition_text(false);
        let err = assert_check(&ctx, &data, &predicate, &quiet, &defaults()).unwrap_err();
        assert_eq!(err.to_string(), "DataError: ㄨ Assertion failed");
    }

    #[test]
    fn test_non_raising_failure_shows_banner() {
        let (ctx, buffer) = context();
        let data = Data::from(test_fixtures::small());
        let options = AssertOptions::new()
            .raise_on_fail(false)
            .fail_message("too few rows");
        assert_check(&ctx, &data, &predicates::nrows(10), &options, &defaults()).unwrap();
        assert_eq!(buffer.contents(), "\ntoo few rows\n");
    }

    #[test]
    fn test_verbose_pass() {
        let (ctx, buffer) = context();
        let data = Data::from(test_fixtures::small());
        let options = AssertOptions::new().verbose(true);
        assert_check(&ctx, &data, &predicates::nrows(5), &options, &defaults()).unwrap();
        assert_eq!(buffer.contents(), "\n✔️ Assertion passed\n");

        buffer.clear();
        assert_check(&ctx, &data, &predicates::nrows(5), &AssertOptions::new(), &defaults())
            .unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_disabled_asserts_skip_predicate() {
        let (ctx, _) = context();
        ctx.settings().write().unwrap().set("enable_asserts", false).unwrap();
        let data = Data::from(test_fixtures::small());
        let predicate = Predicate::new(|_| panic!("predicate must not run"));
        assert_check(&ctx, &data, &predicate, &AssertOptions::new(), &defaults()).unwrap();
    }

    #[test]
    fn test_asserts_ignore_enable_checks() {
        let (ctx, _) = context();
        ctx.settings().write().unwrap().disable_checks(true).unwrap();
        let data = Data::from(test_fixtures::small());
        assert!(
            assert_check(&ctx, &data, &predicates::nrows(1), &AssertOptions::new(), &defaults())
                .is_err()
        );
    }

    #[test]
    fn test_sign_null_precheck() {
        let (ctx, buffer) = context();
        let data = Data::from(test_fixtures::with_nulls());
        let defaults = AssertDefaults::new("✔️ Assert positive passed", "ㄨ Assert positive failed");

        let err = assert_sign(&ctx, &data, true, true, &AssertOptions::from("score"), &defaults)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("DataError: ㄨ Assert positive failed: {NULLS_PRESENT}")
        );

        let (sink, lines) = OutputSink::collector();
        ctx.settings()
            .write()
            .unwrap()
            .set_custom_sink(Some(sink), true)
            .unwrap();
        let soft = AssertOptions::from("score").raise_on_fail(false);
        assert_sign(&ctx, &data, true, true, &soft, &defaults).unwrap();
        assert!(buffer.contents().contains(NULLS_PRESENT));
        assert_eq!(
            *lines.lock().unwrap(),
            vec![format!("ㄨ Assert positive failed: {NULLS_PRESENT}")]
        );
    }

    #[test]
    fn test_sign_ignores_nulls_without_precheck() {
        let (ctx, _) = context();
        let data = Data::from(test_fixtures::with_nulls());
        let defaults = AssertDefaults::new("pass", "fail");
        // score holds -2.0
        assert!(assert_sign(&ctx, &data, true, false, &AssertOptions::from("score"), &defaults)
            .is_err());
        assert!(assert_sign(&ctx, &data, true, false, &AssertOptions::from("id"), &defaults)
            .is_ok());
    }

    #[test]
    fn test_type_assertion() {
        let (ctx, _) = context();
        let data = Data::from(test_fixtures::mixed_types());
        assert!(assert_type(&ctx, &data, &DataKind::Int, &AssertOptions::from("ints"), "ok").is_ok());
        assert!(
            assert_type(&ctx, &data, &DataKind::Datetime, &AssertOptions::from("times"), "ok")
                .is_ok()
        );
        assert!(
            assert_type(&ctx, &data, &DataKind::Timedelta, &AssertOptions::from("waits"), "ok")
                .is_ok()
        );
        let err = assert_type(&ctx, &data, &DataKind::Str, &AssertOptions::from("floats"), "ok")
            .unwrap_err();
        assert_eq!(err.assertion_kind(), Some(&AssertionKind::Type));
        assert_eq!(
            err.to_string(),
            "TypeError: ㄨ Assert type failed: expected str, got Float64"
        );
    }

    #[test]
    fn test_range_predicates_fail_on_nulls_and_strings() {
        let with_nulls = Data::from(test_fixtures::with_nulls());
        let above = predicates::within(Bound::Above {
            min: -10.0,
            or_equal_to: false,
        });
        let score = with_nulls.select(&Subset::from("score")).unwrap();
        assert!(!above.evaluate(&score).unwrap());

        let name = with_nulls.select(&Subset::from("name")).unwrap();
        assert!(matches!(
            above.evaluate(&name).unwrap_err(),
            CheckError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_all_nulls_and_unique() {
        let small = Data::from(test_fixtures::small());
        assert!(!predicates::unique().evaluate(&small).unwrap());
        assert!(predicates::unique()
            .evaluate(&small.select(&Subset::from("b")).unwrap().head(2))
            .unwrap());
        assert!(!predicates::all_nulls().evaluate(&small).unwrap());
        assert!(!predicates::no_nulls()
            .evaluate(&Data::from(test_fixtures::with_nulls()))
            .unwrap());
    }
}
