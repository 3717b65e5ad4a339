//! Tabular values that checks inspect.
//!
//! A check runs against either a two-dimensional Arrow [`RecordBatch`] or a
//! one-dimensional named [`Series`]. Both are wrapped in [`Data`] once a
//! transform or subset has been applied. Arrow arrays are immutable and
//! reference counted, so every derived view shares buffers with its source
//! and the source is never modified.

use crate::error::{CheckError, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, Int64Array, StringArray, UInt32Array, UInt64Array,
};
use arrow::compute::take;
use arrow::datatypes::{DataType, Field, Float16Type, Float32Type, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use arrow::row::{RowConverter, SortField};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A one-dimensional named column of values.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub values: ArrayRef,
}

impl PartialEq for Series {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.values.as_ref() == other.values.as_ref()
    }
}

impl Series {
    pub fn new(name: impl Into<String>, values: ArrayRef) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn data_type(&self) -> &DataType {
        self.values.data_type()
    }

    /// Converts to a single-column table named after the series.
    pub fn to_table(&self) -> Result<RecordBatch> {
        let schema = Schema::new(vec![Field::new(
            self.name.clone(),
            self.data_type().clone(),
            true,
        )]);
        Ok(RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::clone(&self.values)],
        )?)
    }

    /// Returns the values at `indices` as a new series with the same name.
    pub fn take(&self, indices: &[u32]) -> Result<Series> {
        let indices = UInt32Array::from(indices.to_vec());
        Ok(Series::new(
            self.name.clone(),
            take(self.values.as_ref(), &indices, None)?,
        ))
    }
}

/// Which columns a check looks at.
///
/// An empty name or empty list means "everything", the same as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Subset {
    #[default]
    None,
    Column(String),
    Columns(Vec<String>),
}

impl Subset {
    pub fn is_none(&self) -> bool {
        matches!(self, Subset::None)
    }

    fn normalized(self) -> Self {
        match self {
            Subset::Column(c) if c.is_empty() => Subset::None,
            Subset::Columns(cs) if cs.is_empty() => Subset::None,
            other => other,
        }
    }

    /// Column names in the subset, empty for `None`.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Subset::None => Vec::new(),
            Subset::Column(c) => vec![c.as_str()],
            Subset::Columns(cs) => cs.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subset::None => Ok(()),
            Subset::Column(c) => write!(f, "{c}"),
            Subset::Columns(cs) => write!(f, "[{}]", cs.join(", ")),
        }
    }
}

impl From<&str> for Subset {
    fn from(value: &str) -> Self {
        Subset::Column(value.to_string()).normalized()
    }
}

impl From<String> for Subset {
    fn from(value: String) -> Self {
        Subset::Column(value).normalized()
    }
}

impl From<Vec<String>> for Subset {
    fn from(value: Vec<String>) -> Self {
        Subset::Columns(value).normalized()
    }
}

impl From<Vec<&str>> for Subset {
    fn from(value: Vec<&str>) -> Self {
        Subset::Columns(value.into_iter().map(str::to_string).collect()).normalized()
    }
}

impl<const N: usize> From<[&str; N]> for Subset {
    fn from(value: [&str; N]) -> Self {
        Subset::from(value.to_vec())
    }
}

impl<T: Into<Subset>> From<Option<T>> for Subset {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// A table or a series.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Table(RecordBatch),
    Series(Series),
}

impl From<RecordBatch> for Data {
    fn from(value: RecordBatch) -> Self {
        Data::Table(value)
    }
}

impl From<Series> for Data {
    fn from(value: Series) -> Self {
        Data::Series(value)
    }
}

fn column_index(batch: &RecordBatch, column: &str) -> Result<usize> {
    batch
        .schema()
        .index_of(column)
        .map_err(|_| CheckError::ColumnNotFound {
            column: column.to_string(),
        })
}

/// Per-value missing flags. A floating point NaN counts as missing, the
/// same as a null slot.
pub(crate) fn null_flags(array: &ArrayRef) -> Vec<bool> {
    let mut flags = match array.logical_nulls() {
        Some(nulls) => (0..array.len()).map(|i| nulls.is_null(i)).collect(),
        None => vec![false; array.len()],
    };
    if let Some(nans) = nan_flags(array) {
        for (flag, nan) in flags.iter_mut().zip(nans) {
            *flag |= nan;
        }
    }
    flags
}

fn nan_flags(array: &ArrayRef) -> Option<Vec<bool>> {
    match array.data_type() {
        DataType::Float16 => Some(
            array.as_primitive::<Float16Type>().values().iter().map(|v| v.is_nan()).collect(),
        ),
        DataType::Float32 => Some(
            array.as_primitive::<Float32Type>().values().iter().map(|v| v.is_nan()).collect(),
        ),
        DataType::Float64 => Some(
            array.as_primitive::<Float64Type>().values().iter().map(|v| v.is_nan()).collect(),
        ),
        _ => None,
    }
}

fn null_count(array: &ArrayRef) -> usize {
    if array.data_type().is_floating() {
        return null_flags(array).into_iter().filter(|n| *n).count();
    }
    array.logical_nulls().map(|n| n.null_count()).unwrap_or(0)
}

impl Data {
    /// "table" or "series", for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Data::Table(_) => "table",
            Data::Series(_) => "series",
        }
    }

    pub fn as_table(&self) -> Option<&RecordBatch> {
        match self {
            Data::Table(batch) => Some(batch),
            Data::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&Series> {
        match self {
            Data::Series(series) => Some(series),
            Data::Table(_) => None,
        }
    }

    /// The data as a table; a series becomes a single-column table.
    pub fn to_table(&self) -> Result<RecordBatch> {
        match self {
            Data::Table(batch) => Ok(batch.clone()),
            Data::Series(series) => series.to_table(),
        }
    }

    pub fn num_rows(&self) -> usize {
        match self {
            Data::Table(batch) => batch.num_rows(),
            Data::Series(series) => series.len(),
        }
    }

    pub fn num_columns(&self) -> usize {
        match self {
            Data::Table(batch) => batch.num_columns(),
            Data::Series(_) => 1,
        }
    }

    /// `[rows, columns]` for a table, `[rows]` for a series.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Data::Table(batch) => vec![batch.num_rows(), batch.num_columns()],
            Data::Series(series) => vec![series.len()],
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        match self {
            Data::Table(batch) => batch
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect(),
            Data::Series(series) => vec![series.name.clone()],
        }
    }

    /// `(name, values)` for every column.
    pub fn columns(&self) -> Vec<(String, ArrayRef)> {
        match self {
            Data::Table(batch) => batch
                .schema()
                .fields()
                .iter()
                .zip(batch.columns())
                .map(|(f, c)| (f.name().clone(), Arc::clone(c)))
                .collect(),
            Data::Series(series) => vec![(series.name.clone(), Arc::clone(&series.values))],
        }
    }

    /// Looks up one column. For a series, `name` must be the series' own name.
    pub fn column(&self, name: &str) -> Result<Series> {
        match self {
            Data::Table(batch) => {
                let idx = column_index(batch, name)?;
                Ok(Series::new(name, Arc::clone(batch.column(idx))))
            }
            Data::Series(series) if series.name == name => Ok(series.clone()),
            Data::Series(_) => Err(CheckError::ColumnNotFound {
                column: name.to_string(),
            }),
        }
    }

    /// Applies a subset.
    ///
    /// A single column of a table yields a series; a list of columns yields a
    /// projected table, even when the list has one entry.
    pub fn select(&self, subset: &Subset) -> Result<Data> {
        match (self, subset) {
            (_, Subset::None) => Ok(self.clone()),
            (Data::Table(_), Subset::Column(name)) => Ok(Data::Series(self.column(name)?)),
            (Data::Table(batch), Subset::Columns(names)) => {
                let indices = names
                    .iter()
                    .map(|n| column_index(batch, n))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Data::Table(batch.project(&indices)?))
            }
            (Data::Series(series), Subset::Column(name)) if *name == series.name => {
                Ok(self.clone())
            }
            (Data::Series(series), Subset::Columns(names))
                if names.len() == 1 && names[0] == series.name =>
            {
                Ok(self.clone())
            }
            (Data::Series(_), other) => Err(CheckError::ColumnNotFound {
                column: other.to_string(),
            }),
        }
    }

    fn slice(&self, offset: usize, len: usize) -> Data {
        match self {
            Data::Table(batch) => Data::Table(batch.slice(offset, len)),
            Data::Series(series) => {
                Data::Series(Series::new(series.name.clone(), series.values.slice(offset, len)))
            }
        }
    }

    /// The first `n` rows; negative `n` drops the last `|n|` rows.
    pub fn head(&self, n: i64) -> Data {
        let rows = self.num_rows();
        let len = if n >= 0 {
            (n as usize).min(rows)
        } else {
            rows.saturating_sub(n.unsigned_abs() as usize)
        };
        self.slice(0, len)
    }

    /// The last `n` rows; negative `n` drops the first `|n|` rows.
    pub fn tail(&self, n: i64) -> Data {
        let rows = self.num_rows();
        let len = if n >= 0 {
            (n as usize).min(rows)
        } else {
            rows.saturating_sub(n.unsigned_abs() as usize)
        };
        self.slice(rows - len, len)
    }

    /// Null count per column.
    pub fn null_counts(&self) -> Vec<(String, usize)> {
        self.columns()
            .into_iter()
            .map(|(name, values)| {
                let count = null_count(&values);
                (name, count)
            })
            .collect()
    }

    pub fn total_nulls(&self) -> usize {
        self.null_counts().iter().map(|(_, n)| n).sum()
    }

    /// For each row, whether any column is null.
    pub fn row_null_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.num_rows()];
        for (_, values) in self.columns() {
            for (row, is_null) in null_flags(&values).into_iter().enumerate() {
                mask[row] |= is_null;
            }
        }
        mask
    }

    pub fn rows_with_nulls(&self) -> usize {
        self.row_null_mask().into_iter().filter(|n| *n).count()
    }

    /// For each row, whether an identical row appeared earlier.
    pub fn duplicated(&self) -> Result<Vec<bool>> {
        let columns: Vec<ArrayRef> = self.columns().into_iter().map(|(_, v)| v).collect();
        if columns.is_empty() {
            return Ok(vec![false; self.num_rows()]);
        }
        let converter = RowConverter::new(
            columns
                .iter()
                .map(|c| SortField::new(c.data_type().clone()))
                .collect(),
        )?;
        let rows = converter.convert_columns(&columns)?;
        let mut seen = HashSet::with_capacity(rows.num_rows());
        Ok(rows.iter().map(|row| !seen.insert(row)).collect())
    }

    pub fn count_duplicates(&self) -> Result<usize> {
        Ok(self.duplicated()?.into_iter().filter(|d| *d).count())
    }

    /// Data type per column.
    pub fn dtypes(&self) -> Vec<(String, DataType)> {
        self.columns()
            .into_iter()
            .map(|(name, values)| (name, values.data_type().clone()))
            .collect()
    }

    /// Bytes held by each column. A sliced column counts only its own rows,
    /// not the whole buffer it shares with its parent.
    pub fn memory_usage(&self) -> Vec<(String, usize)> {
        self.columns()
            .into_iter()
            .map(|(name, values)| {
                let bytes = values
                    .to_data()
                    .get_slice_memory_size()
                    .unwrap_or_else(|_| values.get_array_memory_size());
                (name, bytes)
            })
            .collect()
    }
}

/// Distinct non-null values of a series, in order of first appearance.
pub fn unique(series: &Series) -> Result<Series> {
    let (first, _) = first_occurrences(series)?;
    series.take(&first)
}

/// Number of distinct non-null values.
pub fn count_unique(series: &Series) -> Result<usize> {
    Ok(first_occurrences(series)?.0.len())
}

/// Distinct non-null values with their counts, most frequent first. Ties
/// keep first-appearance order.
pub fn value_counts(series: &Series, max_rows: Option<usize>) -> Result<RecordBatch> {
    let (first, counts) = first_occurrences(series)?;
    let mut order: Vec<usize> = (0..first.len()).collect();
    order.sort_by(|a, b| counts[*b].cmp(&counts[*a]).then(a.cmp(b)));
    if let Some(max) = max_rows {
        order.truncate(max);
    }

    let indices: Vec<u32> = order.iter().map(|i| first[*i]).collect();
    let values = series.take(&indices)?;
    let counts: ArrayRef = Arc::new(Int64Array::from(
        order
            .iter()
            .map(|i| i64::try_from(counts[*i]).unwrap_or(i64::MAX))
            .collect::<Vec<_>>(),
    ));

    let schema = Schema::new(vec![
        Field::new(series.name.clone(), series.data_type().clone(), true),
        Field::new("count", DataType::Int64, false),
    ]);
    Ok(RecordBatch::try_new(
        Arc::new(schema),
        vec![values.values, counts],
    )?)
}

/// Indices of first appearances and the count of each distinct value.
fn first_occurrences(series: &Series) -> Result<(Vec<u32>, Vec<usize>)> {
    let converter = RowConverter::new(vec![SortField::new(series.data_type().clone())])?;
    let rows = converter.convert_columns(&[Arc::clone(&series.values)])?;
    let nulls = null_flags(&series.values);

    let mut slots: HashMap<_, usize> = HashMap::new();
    let mut first = Vec::new();
    let mut counts = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if nulls[i] {
            continue;
        }
        match slots.get(&row) {
            Some(slot) => counts[*slot] += 1,
            None => {
                slots.insert(row, first.len());
                first.push(u32::try_from(i).map_err(|_| {
                    CheckError::NotSupported("series longer than u32::MAX rows".to_string())
                })?);
                counts.push(1);
            }
        }
    }
    Ok((first, counts))
}

/// Per-column overview: non-null count and type.
pub fn info_table(data: &Data) -> Result<RecordBatch> {
    let rows = data.num_rows();
    let columns = data.columns();
    let names: ArrayRef = Arc::new(StringArray::from(
        columns.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
    ));
    let non_null: ArrayRef = Arc::new(UInt64Array::from(
        columns
            .iter()
            .map(|(_, v)| (rows - null_count(v)) as u64)
            .collect::<Vec<_>>(),
    ));
    let dtypes: ArrayRef = Arc::new(StringArray::from(
        columns
            .iter()
            .map(|(_, v)| v.data_type().to_string())
            .collect::<Vec<_>>(),
    ));
    let schema = Schema::new(vec![
        Field::new("column", DataType::Utf8, false),
        Field::new("non_null", DataType::UInt64, false),
        Field::new("dtype", DataType::Utf8, false),
    ]);
    Ok(RecordBatch::try_new(
        Arc::new(schema),
        vec![names, non_null, dtypes],
    )?)
}

/// Two-column `(column, value)` table from name/value pairs.
pub fn named_counts(pairs: &[(String, usize)], value_name: &str) -> Result<RecordBatch> {
    let names: ArrayRef = Arc::new(StringArray::from(
        pairs.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
    ));
    let values: ArrayRef = Arc::new(UInt64Array::from(
        pairs.iter().map(|(_, v)| *v as u64).collect::<Vec<_>>(),
    ));
    let schema = Schema::new(vec![
        Field::new("column", DataType::Utf8, false),
        Field::new(value_name, DataType::UInt64, false),
    ]);
    Ok(RecordBatch::try_new(Arc::new(schema), vec![names, values])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;
    use arrow::array::AsArray;
    use arrow::datatypes::Int64Type;

    fn small() -> Data {
        Data::Table(test_fixtures::small())
    }

    #[test]
    fn test_subset_from_empty_is_none() {
        assert_eq!(Subset::from(""), Subset::None);
        assert_eq!(Subset::from(Vec::<&str>::new()), Subset::None);
        assert_eq!(Subset::from(None::<&str>), Subset::None);
        assert_eq!(Subset::from("a"), Subset::Column("a".into()));
        assert_eq!(Subset::from(["a", "b"]).to_string(), "[a, b]");
    }

    #[test]
    fn test_select_column_yields_series() {
        let selected = small().select(&"a".into()).unwrap();
        let series = selected.as_series().unwrap();
        assert_eq!(series.name, "a");
        assert_eq!(series.len(), 5);
    }

    #[test]
    fn test_select_columns_yields_table() {
        let selected = small().select(&["b"].into()).unwrap();
        assert_eq!(selected.column_names(), vec!["b"]);
        assert!(selected.as_table().is_some());
    }

    #[test]
    fn test_select_missing_column() {
        let err = small().select(&"zzz".into()).unwrap_err();
        assert!(matches!(err, CheckError::ColumnNotFound { column } if column == "zzz"));
    }

    #[test]
    fn test_select_on_series() {
        let series = Data::Series(test_fixtures::series("x", vec![Some(1.0)]));
        assert_eq!(series.select(&"x".into()).unwrap(), series);
        assert!(series.select(&"y".into()).is_err());
    }

    #[test]
    fn test_select_does_not_touch_source() {
        let batch = test_fixtures::small();
        let data = Data::Table(batch.clone());
        let _ = data.select(&["a"].into()).unwrap();
        assert_eq!(data, Data::Table(batch));
    }

    #[test]
    fn test_head_and_tail() {
        let data = small();
        let head = data.head(2);
        assert_eq!(head.num_rows(), 2);
        let tail = data.tail(2);
        let a = tail.as_table().unwrap().column(0).as_primitive::<Int64Type>();
        assert_eq!(a.values().to_vec(), vec![3, 10]);

        assert_eq!(data.head(100).num_rows(), 5);
        assert_eq!(data.head(-2).num_rows(), 3);
        assert_eq!(data.tail(-4).num_rows(), 1);
    }

    #[test]
    fn test_nulls() {
        let data = Data::Table(test_fixtures::with_nulls());
        assert_eq!(
            data.null_counts(),
            vec![
                ("id".to_string(), 0),
                ("name".to_string(), 2),
                ("score".to_string(), 1)
            ]
        );
        assert_eq!(data.rows_with_nulls(), 3);
        assert_eq!(data.total_nulls(), 3);
    }

    #[test]
    fn test_duplicates() {
        let data = small();
        assert_eq!(
            data.duplicated().unwrap(),
            vec![false, false, true, false, false]
        );
        assert_eq!(data.count_duplicates().unwrap(), 1);
        let b = data.select(&"a".into()).unwrap();
        assert_eq!(b.count_duplicates().unwrap(), 1);
    }

    #[test]
    fn test_unique_and_value_counts() {
        let series = small().column("b").unwrap();
        let uniques = unique(&series).unwrap();
        let values = uniques.values.as_string::<i32>();
        assert_eq!(
            values.iter().flatten().collect::<Vec<_>>(),
            vec!["x", "y", "z", "w"]
        );
        assert_eq!(count_unique(&series).unwrap(), 4);

        let counts = value_counts(&series, Some(2)).unwrap();
        assert_eq!(counts.num_rows(), 2);
        let labels = counts.column(0).as_string::<i32>();
        assert_eq!(labels.value(0), "y");
        assert_eq!(labels.value(1), "x");
        let n = counts.column(1).as_primitive::<Int64Type>();
        assert_eq!(n.values().to_vec(), vec![2, 1]);
    }

    #[test]
    fn test_unique_skips_nulls() {
        let series = test_fixtures::series("s", vec![Some(1.0), None, Some(1.0), None]);
        assert_eq!(count_unique(&series).unwrap(), 1);
    }

    #[test]
    fn test_info_table() {
        let info = info_table(&Data::Table(test_fixtures::with_nulls())).unwrap();
        assert_eq!(info.num_rows(), 3);
        let non_null = info.column(1).as_primitive::<arrow::datatypes::UInt64Type>();
        assert_eq!(non_null.values().to_vec(), vec![6, 4, 5]);
    }

    #[test]
    fn test_shape() {
        assert_eq!(small().shape(), vec![5, 2]);
        let series = Data::Series(test_fixtures::series("x", vec![Some(1.0), None]));
        assert_eq!(series.shape(), vec![2]);
        assert_eq!(series.num_columns(), 1);
    }

    #[test]
    fn test_nan_counts_as_null() {
        let series = test_fixtures::series("x", vec![Some(1.0), Some(f64::NAN), None]);
        let data = Data::Series(series.clone());
        assert_eq!(data.null_counts(), vec![("x".to_string(), 2)]);
        assert_eq!(data.total_nulls(), 2);
        assert_eq!(data.row_null_mask(), vec![false, true, true]);
        assert_eq!(count_unique(&series).unwrap(), 1);

        let ints = small();
        assert_eq!(ints.total_nulls(), 0);
    }

    #[test]
    fn test_memory_usage_of_slices() {
        let full = Data::Table(test_fixtures::iris());
        let head = full.head(10);
        let full_bytes: usize = full.memory_usage().iter().map(|(_, b)| b).sum();
        let head_bytes: usize = head.memory_usage().iter().map(|(_, b)| b).sum();
        assert!(head_bytes > 0);
        assert!(head_bytes < full_bytes, "{head_bytes} >= {full_bytes}");
    }
}
