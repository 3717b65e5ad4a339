//! The chainable `.check()` surface.
//!
//! [`CheckExt`] adds `check()` to Arrow tables, [`Series`] and [`Data`]. The
//! returned [`Checks`] borrows the value and exposes every inspection and
//! assertion as a method returning `Result<&Checks>`, so a pipeline can
//! interleave checks with `?`:
//!
//! ```rust,no_run
//! use term_check::prelude::*;
//! # fn load() -> arrow::record_batch::RecordBatch { unimplemented!() }
//!
//! let iris = load();
//! iris.check()
//!     .nrows(None)?
//!     .head(5, None)?
//!     .nnulls(true, CheckOptions::new().subset(["petal_width", "species"]))?
//!     .assert_positive(true, AssertOptions::from("sepal_length"))?;
//! # Ok::<(), term_check::CheckError>(())
//! ```
//!
//! No method touches the value it is called on. [`Checks::inner`] returns the
//! same reference that `check()` was called with.

use crate::assertions::{
    self, predicates, AssertDefaults, AssertOptions, Bound, DataKind, Predicate,
};
use crate::data::{self, Data, Series, Subset};
use crate::dispatch::{CheckContext, CheckOptions};
use crate::display::{DisplayMode, Figure, PlotOptions, TextColors};
use crate::engine::SqlEngine;
use crate::error::{CheckError, Result};
use crate::export;
use crate::options::{Mode, OptionValue};
use crate::timer::{self, TimerHandle};
use crate::transform::apply_modifications;
use crate::value::CheckValue;
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const COLUMNS: &str = "🏛️ Columns";
const ROWS: &str = "☰ Rows";
const SHAPE: &str = "📐 Shape";
const DATA_TYPES: &str = "🗂️ Data types";
const DATA_TYPE: &str = "🗂️ Data type";
const DISTRIBUTIONS: &str = "📏 Distributions";
const DISTRIBUTION: &str = "📏 Distribution";
const INFO: &str = "ℹ️ Info";
const MEMORY_USAGE: &str = "💾 Memory usage";
const DUPLICATED: &str = "👯‍♂️ Duplicated rows";
const NULL_ROWS: &str = "👻 Rows with NaNs";
const MODE: &str = "⚙️ Check mode";

/// Values that can be inspected with `.check()`.
pub trait CheckExt {
    /// The value as [`Data`]. Arrow buffers are shared, not copied.
    fn to_check_data(&self) -> Data;

    /// Checks against the global context.
    fn check(&self) -> Checks<'_, Self>
    where
        Self: Sized,
    {
        Checks::new(self, CheckContext::global())
    }

    /// Checks against an explicit context.
    fn check_with<'a>(&'a self, ctx: &'a CheckContext) -> Checks<'a, Self>
    where
        Self: Sized,
    {
        Checks::new(self, ctx)
    }
}

impl CheckExt for RecordBatch {
    fn to_check_data(&self) -> Data {
        Data::Table(self.clone())
    }
}

impl CheckExt for Series {
    fn to_check_data(&self) -> Data {
        Data::Series(self.clone())
    }
}

impl CheckExt for Data {
    fn to_check_data(&self) -> Data {
        self.clone()
    }
}

/// Check methods bound to one value and one context.
pub struct Checks<'a, T> {
    inner: &'a T,
    ctx: &'a CheckContext,
}

impl<'a, T> std::fmt::Debug for Checks<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checks").field("ctx", self.ctx).finish_non_exhaustive()
    }
}

impl<'a, T: CheckExt> Checks<'a, T> {
    pub fn new(inner: &'a T, ctx: &'a CheckContext) -> Self {
        Self { inner, ctx }
    }

    /// The value the checks were called on.
    pub fn inner(&self) -> &'a T {
        self.inner
    }

    pub fn context(&self) -> &'a CheckContext {
        self.ctx
    }

    fn data(&self) -> Data {
        self.inner.to_check_data()
    }

    fn run<F>(
        &self,
        compute: F,
        options: impl Into<Option<CheckOptions>>,
        default_name: Option<&str>,
    ) -> Result<&Self>
    where
        F: FnOnce(&Data) -> Result<CheckValue>,
    {
        let options = options.into().unwrap_or_default();
        self.ctx
            .run_check(&self.data(), compute, &options, default_name)?;
        Ok(self)
    }

    fn assert_with(
        &self,
        predicate: &Predicate,
        options: impl Into<Option<AssertOptions>>,
        defaults: AssertDefaults,
    ) -> Result<&Self> {
        let options = options.into().unwrap_or_default();
        assertions::assert_check(self.ctx, &self.data(), predicate, &options, &defaults)?;
        Ok(self)
    }

    // Inspection

    /// Shows the column names.
    pub fn columns(&self, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        self.run(|d| Ok(d.column_names().into()), options, Some(COLUMNS))
    }

    /// Shows the number of columns.
    pub fn ncols(&self, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        self.run(|d| Ok(d.num_columns().into()), options, Some(COLUMNS))
    }

    /// Shows the number of rows.
    pub fn nrows(&self, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        self.run(|d| Ok(d.num_rows().into()), options, Some(ROWS))
    }

    /// Shows `(rows, columns)`, or `(rows,)` for a series.
    pub fn shape(&self, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        self.run(|d| Ok(CheckValue::tuple(d.shape())), options, Some(SHAPE))
    }

    /// Shows each column's Arrow type. A single column shows one line.
    pub fn dtypes(&self, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        let options = options.into().unwrap_or_default();
        let single = self.inner.to_check_data().as_series().is_some()
            || matches!(options.subset, Subset::Column(_));
        let name = if single { DATA_TYPE } else { DATA_TYPES };
        self.run(
            |d| match d {
                Data::Series(series) => Ok(CheckValue::Text(series.data_type().to_string())),
                Data::Table(_) => Ok(dtype_table(&d.dtypes())?.into()),
            },
            options,
            Some(name),
        )
    }

    /// Shows summary statistics per column.
    pub fn describe(&self, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        self.run(
            |d| Ok(SqlEngine::global().describe(d)?.into()),
            options,
            Some(DISTRIBUTIONS),
        )
    }

    /// Shows the first `n` rows. Negative `n` shows all but the last `|n|`.
    pub fn head(&self, n: i64, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        let name = format!("⬆️ First {n} rows");
        self.run(|d| Ok(d.head(n).into()), options, Some(&name))
    }

    /// Shows the last `n` rows. Negative `n` shows all but the first `|n|`.
    pub fn tail(&self, n: i64, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        let name = format!("⬇️ Last {n} rows");
        self.run(|d| Ok(d.tail(n).into()), options, Some(&name))
    }

    /// Shows up to `max_rows` rows of the data.
    pub fn print(&self, max_rows: usize, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        let n = i64::try_from(max_rows).unwrap_or(i64::MAX);
        self.run(|d| Ok(d.head(n).into()), options, None)
    }

    /// Shows a line of text, e.g. a pipeline milestone.
    pub fn print_text(&self, text: &str) -> Result<&Self> {
        self.print_value(text, None)
    }

    /// Shows an arbitrary value in place of the data.
    pub fn print_value(
        &self,
        value: impl Into<CheckValue>,
        options: impl Into<Option<CheckOptions>>,
    ) -> Result<&Self> {
        let value = value.into();
        self.run(move |_| Ok(value), options, None)
    }

    /// Shows non-null counts and types per column, then total memory.
    pub fn info(&self, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        if !self.ctx.checks_enabled()? {
            return Ok(self);
        }
        let options = options.into().unwrap_or_default();
        let working = apply_modifications(&self.data(), &options.transform, &options.subset)?;
        let name = options.display_name(Some(INFO));
        let renderer = self.ctx.renderer();
        renderer.show_table(&data::info_table(&working)?, name.as_deref())?;
        let bytes: usize = working.memory_usage().iter().map(|(_, b)| b).sum();
        renderer.show_line(
            &format!("memory usage: {bytes} bytes"),
            None,
            &TextColors::default(),
        )?;
        Ok(self)
    }

    /// Shows the bytes held by each column.
    pub fn memory_usage(&self, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        self.run(
            |d| Ok(data::named_counts(&d.memory_usage(), "bytes")?.into()),
            options,
            Some(MEMORY_USAGE),
        )
    }

    /// Shows how many rows repeat an earlier row.
    pub fn ndups(&self, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        let options = options.into().unwrap_or_default();
        let name = match &options.subset {
            Subset::None => DUPLICATED.to_string(),
            subset => format!("👯‍♂️ Rows with duplication in {subset}"),
        };
        self.run(|d| Ok(d.count_duplicates()?.into()), options, Some(&name))
    }

    /// Shows null counts.
    ///
    /// With `by_column`, one count per column. Otherwise the number of rows
    /// with a null in any column. When a subset is given and no name, the
    /// line reads `"... in {subset}: {n} out of {rows}"`.
    pub fn nnulls(
        &self,
        by_column: bool,
        options: impl Into<Option<CheckOptions>>,
    ) -> Result<&Self> {
        let options = options.into().unwrap_or_default();
        let with_subset = options.name.is_none() && !options.subset.is_none();
        let name = if with_subset {
            format!("{NULL_ROWS} in {}", options.subset)
        } else {
            NULL_ROWS.to_string()
        };
        self.run(
            |d| {
                if by_column && d.as_table().is_some() {
                    return Ok(data::named_counts(&d.null_counts(), "nulls")?.into());
                }
                let n = d.rows_with_nulls();
                if with_subset && !by_column {
                    Ok(CheckValue::Text(format!("{n} out of {}", d.num_rows())))
                } else {
                    Ok(n.into())
                }
            },
            options,
            Some(&name),
        )
    }

    /// Shows the number of distinct non-null values in `column`.
    pub fn nunique(
        &self,
        column: &str,
        options: impl Into<Option<CheckOptions>>,
    ) -> Result<&Self> {
        let options = options.into().unwrap_or_default().subset(column);
        let name = format!("🌟 Unique values in {column}");
        self.run(
            |d| Ok(data::count_unique(&single_column(d)?)?.into()),
            options,
            Some(&name),
        )
    }

    /// Shows the distinct non-null values of `column` in order of first
    /// appearance.
    pub fn unique(&self, column: &str, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        let options = options.into().unwrap_or_default().subset(column);
        let name = format!("🌟 Unique values of {column}");
        self.run(
            |d| Ok(data::unique(&single_column(d)?)?.into()),
            options,
            Some(&name),
        )
    }

    /// Shows the `max_rows` most frequent values of `column`.
    pub fn value_counts(
        &self,
        column: &str,
        max_rows: usize,
        options: impl Into<Option<CheckOptions>>,
    ) -> Result<&Self> {
        let options = options.into().unwrap_or_default().subset(column);
        let name = format!("🧮 Value counts, first {max_rows} values");
        self.run(
            |d| Ok(data::value_counts(&single_column(d)?, Some(max_rows))?.into()),
            options,
            Some(&name),
        )
    }

    /// Shows whatever `compute` returns for the modified data.
    pub fn function<F>(&self, compute: F, options: impl Into<Option<CheckOptions>>) -> Result<&Self>
    where
        F: FnOnce(&Data) -> Result<CheckValue>,
    {
        self.run(compute, options, None)
    }

    fn figures_visible(&self) -> Result<bool> {
        Ok(self.ctx.checks_enabled()?
            && self.ctx.renderer().mode() == DisplayMode::Rich
            && self.ctx.format()?.print_to_stdout)
    }

    /// Shows a histogram per numeric column. Only rich displays show
    /// figures; elsewhere this does nothing.
    pub fn hist(&self, bins: usize, options: impl Into<Option<CheckOptions>>) -> Result<&Self> {
        if !self.figures_visible()? {
            debug!("Skipping histogram outside a rich display");
            return Ok(self);
        }
        let options = options.into().unwrap_or_default();
        let single = match &options.subset {
            Subset::Column(_) => true,
            Subset::Columns(cs) => cs.len() == 1,
            Subset::None => self.data().num_columns() == 1,
        };
        let name = if single { DISTRIBUTION } else { DISTRIBUTIONS };
        self.run(|d| Ok(Figure::histogram(d, bins)?.into()), options, Some(name))
    }

    /// Shows a line, scatter or bar chart. Rich displays only.
    pub fn plot(
        &self,
        plot: &PlotOptions,
        options: impl Into<Option<CheckOptions>>,
    ) -> Result<&Self> {
        if !self.figures_visible()? {
            debug!("Skipping plot outside a rich display");
            return Ok(self);
        }
        self.run(
            |d| Ok(Figure::plot(d, plot)?.into()),
            options,
            plot.title.as_deref(),
        )
    }

    /// Writes the modified data to `path`.
    ///
    /// The format comes from `format` or the file extension. Does nothing
    /// while checks are disabled.
    pub fn write(
        &self,
        path: impl AsRef<Path>,
        format: Option<&str>,
        verbose: bool,
        options: impl Into<Option<CheckOptions>>,
    ) -> Result<&Self> {
        if !self.ctx.checks_enabled()? {
            return Ok(self);
        }
        let path = path.as_ref();
        let options = options.into().unwrap_or_default();
        let working = apply_modifications(&self.data(), &options.transform, &options.subset)?;
        let written = export::write(&working, path, format)?;
        if self.ctx.log_config().log_data_operations {
            info!(
                export.path = %path.display(),
                export.format = %written,
                export.rows = working.num_rows(),
                "Exported checked data"
            );
        }
        if verbose {
            self.ctx.renderer().show_line(
                &format!("📦 Wrote file {}", path.display()),
                None,
                &TextColors::default(),
            )?;
        }
        Ok(self)
    }

    // Mode and format

    /// Shows whether checks and assertions are enabled.
    pub fn get_mode(&self) -> Result<&Self> {
        if !self.ctx.checks_enabled()? {
            return Ok(self);
        }
        let mode = self.ctx.settings().read()?.mode();
        self.ctx
            .renderer()
            .show_line(&mode.to_string(), Some(MODE), &TextColors::default())?;
        Ok(self)
    }

    pub fn set_mode(&self, enable_checks: bool, enable_asserts: bool) -> Result<&Self> {
        self.ctx
            .settings()
            .write()?
            .set_mode(Mode::new(enable_checks, enable_asserts))?;
        Ok(self)
    }

    pub fn enable_checks(&self, enable_asserts: bool) -> Result<&Self> {
        self.ctx.settings().write()?.enable_checks(enable_asserts)?;
        Ok(self)
    }

    pub fn disable_checks(&self, enable_asserts: bool) -> Result<&Self> {
        self.ctx.settings().write()?.disable_checks(enable_asserts)?;
        Ok(self)
    }

    /// Sets several formatting options at once; all or nothing.
    pub fn set_format<I, K>(&self, pairs: I) -> Result<&Self>
    where
        I: IntoIterator<Item = (K, OptionValue)>,
        K: AsRef<str>,
    {
        self.ctx.settings().write()?.set_format(pairs)?;
        Ok(self)
    }

    pub fn reset_format(&self) -> Result<&Self> {
        self.ctx.settings().write()?.reset_format();
        Ok(self)
    }

    /// Shows the time since `handle` was started.
    pub fn print_time_elapsed(
        &self,
        handle: &TimerHandle,
        label: Option<&str>,
        units: &str,
    ) -> Result<&Self> {
        timer::print_time_elapsed_with(self.ctx, handle, label, units)?;
        Ok(self)
    }

    // Assertions

    /// Asserts an arbitrary predicate on the modified data.
    pub fn assert_data(
        &self,
        predicate: &Predicate,
        options: impl Into<Option<AssertOptions>>,
    ) -> Result<&Self> {
        self.assert_with(
            predicate,
            options,
            AssertDefaults::new("✔️ Assertion passed", "ㄨ Assertion failed"),
        )
    }

    /// Asserts that every value is null.
    pub fn assert_all_nulls(&self, options: impl Into<Option<AssertOptions>>) -> Result<&Self> {
        self.assert_with(
            &predicates::all_nulls(),
            options,
            AssertDefaults::new("✔️ Assert all nulls passed", "ㄨ Assert all nulls failed"),
        )
    }

    /// Asserts that no value is null.
    pub fn assert_no_nulls(&self, options: impl Into<Option<AssertOptions>>) -> Result<&Self> {
        self.assert_with(
            &predicates::no_nulls(),
            options,
            AssertDefaults::new("✔️ Assert no nulls passed", "ㄨ Assert no nulls failed"),
        )
    }

    pub fn assert_nrows(
        &self,
        expected: usize,
        options: impl Into<Option<AssertOptions>>,
    ) -> Result<&Self> {
        self.assert_with(
            &predicates::nrows(expected),
            options,
            AssertDefaults::new("✔️ Assert nrows passed", "ㄨ Assert nrows failed"),
        )
    }

    /// Asserts the modified data has as many rows as `other`.
    pub fn assert_same_nrows<U: CheckExt>(
        &self,
        other: &U,
        options: impl Into<Option<AssertOptions>>,
    ) -> Result<&Self> {
        let expected = other.to_check_data().num_rows();
        self.assert_with(
            &predicates::nrows(expected),
            options,
            AssertDefaults::new("✔️ Assert same_nrows passed", "ㄨ Assert same_nrows failed"),
        )
    }

    /// Asserts no row repeats an earlier one.
    pub fn assert_unique(&self, options: impl Into<Option<AssertOptions>>) -> Result<&Self> {
        self.assert_with(
            &predicates::unique(),
            options,
            AssertDefaults::new("✔️ Assert unique passed", "ㄨ Assert unique failed"),
        )
    }

    /// Asserts every value is above `min`. Nulls fail.
    pub fn assert_greater_than(
        &self,
        min: f64,
        or_equal_to: bool,
        options: impl Into<Option<AssertOptions>>,
    ) -> Result<&Self> {
        self.assert_with(
            &predicates::within(Bound::Above { min, or_equal_to }),
            options,
            AssertDefaults::new("✔️ Assert minimum passed", "ㄨ Assert minimum failed"),
        )
    }

    /// Asserts every value is below `max`. Nulls fail.
    pub fn assert_less_than(
        &self,
        max: f64,
        or_equal_to: bool,
        options: impl Into<Option<AssertOptions>>,
    ) -> Result<&Self> {
        self.assert_with(
            &predicates::within(Bound::Below { max, or_equal_to }),
            options,
            AssertDefaults::new("✔️ Assert maximum passed", "ㄨ Assert maximum failed"),
        )
    }

    /// Asserts every non-null value is positive, after failing on nulls when
    /// `assert_no_nulls` is set.
    pub fn assert_positive(
        &self,
        assert_no_nulls: bool,
        options: impl Into<Option<AssertOptions>>,
    ) -> Result<&Self> {
        self.assert_sign(
            true,
            assert_no_nulls,
            options,
            AssertDefaults::new("✔️ Assert positive passed", "ㄨ Assert positive failed"),
        )
    }

    /// Asserts every non-null value is negative, after failing on nulls when
    /// `assert_no_nulls` is set.
    pub fn assert_negative(
        &self,
        assert_no_nulls: bool,
        options: impl Into<Option<AssertOptions>>,
    ) -> Result<&Self> {
        self.assert_sign(
            false,
            assert_no_nulls,
            options,
            AssertDefaults::new("✔️ Assert negative passed", "ㄨ Assert negative failed"),
        )
    }

    fn assert_sign(
        &self,
        positive: bool,
        check_nulls: bool,
        options: impl Into<Option<AssertOptions>>,
        defaults: AssertDefaults,
    ) -> Result<&Self> {
        let options = options.into().unwrap_or_default();
        assertions::assert_sign(self.ctx, &self.data(), positive, check_nulls, &options, &defaults)?;
        Ok(self)
    }

    /// Asserts every column has the given type family or exact type.
    pub fn assert_type(
        &self,
        kind: impl Into<DataKind>,
        options: impl Into<Option<AssertOptions>>,
    ) -> Result<&Self> {
        self.assert_kind(kind.into(), options, "✔️ Assert type passed")
    }

    fn assert_kind(
        &self,
        kind: DataKind,
        options: impl Into<Option<AssertOptions>>,
        pass_message: &str,
    ) -> Result<&Self> {
        let options = options.into().unwrap_or_default();
        assertions::assert_type(self.ctx, &self.data(), &kind, &options, pass_message)?;
        Ok(self)
    }

    pub fn assert_str(&self, options: impl Into<Option<AssertOptions>>) -> Result<&Self> {
        self.assert_kind(DataKind::Str, options, "✔️ Assert string passed")
    }

    pub fn assert_int(&self, options: impl Into<Option<AssertOptions>>) -> Result<&Self> {
        self.assert_kind(DataKind::Int, options, "✔️ Assert integer passed")
    }

    pub fn assert_float(&self, options: impl Into<Option<AssertOptions>>) -> Result<&Self> {
        self.assert_kind(DataKind::Float, options, "✔️ Assert float passed")
    }

    pub fn assert_datetime(&self, options: impl Into<Option<AssertOptions>>) -> Result<&Self> {
        self.assert_kind(DataKind::Datetime, options, "✔️ Assert datetime passed")
    }

    pub fn assert_timedelta(&self, options: impl Into<Option<AssertOptions>>) -> Result<&Self> {
        self.assert_kind(DataKind::Timedelta, options, "✔️ Assert timedelta passed")
    }
}

/// The single column a per-column check works on.
fn single_column(data: &Data) -> Result<Series> {
    match data {
        Data::Series(series) => Ok(series.clone()),
        Data::Table(_) => Err(CheckError::type_mismatch(
            "a single column",
            data.kind_name(),
        )),
    }
}

fn dtype_table(dtypes: &[(String, DataType)]) -> Result<RecordBatch> {
    let names: ArrayRef = Arc::new(StringArray::from(
        dtypes.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
    ));
    let types: ArrayRef = Arc::new(StringArray::from(
        dtypes.iter().map(|(_, t)| t.to_string()).collect::<Vec<_>>(),
    ));
    let schema = Schema::new(vec![
        Field::new("column", DataType::Utf8, false),
        Field::new("dtype", DataType::Utf8, false),
    ]);
    Ok(RecordBatch::try_new(Arc::new(schema), vec![names, types])?)
}
