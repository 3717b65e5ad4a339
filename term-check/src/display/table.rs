//! Table rendering for terminals and rich displays.
//!
//! Both renderings start from the same text cells so a table looks the same
//! in a notebook, a terminal and a log sink. Float columns are rounded to
//! the configured precision.

use super::text::{escape_html, indent_lines};
use crate::error::{CheckError, Result};
use crate::options::TableStyle;
use arrow::array::{Array, ArrayRef, AsArray, StringArray};
use arrow::datatypes::{DataType, Field, Float16Type, Float32Type, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use std::fmt::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static TABLE_IDS: AtomicUsize = AtomicUsize::new(0);

/// Column headers plus every cell rendered as text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextTable {
    pub headers: Vec<String>,
    pub columns: Vec<Vec<String>>,
    pub numeric: Vec<bool>,
}

impl TextTable {
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    /// Renders every cell of `batch`.
    ///
    /// Fails with [`CheckError::UnsupportedDisplay`] naming the first column
    /// type Arrow cannot format.
    pub fn from_batch(batch: &RecordBatch, precision: usize) -> Result<Self> {
        let options = FormatOptions::default().with_null("null");
        let schema = batch.schema();
        let mut headers = Vec::with_capacity(batch.num_columns());
        let mut columns = Vec::with_capacity(batch.num_columns());
        let mut numeric = Vec::with_capacity(batch.num_columns());

        for (field, array) in schema.fields().iter().zip(batch.columns()) {
            headers.push(field.name().clone());
            numeric.push(field.data_type().is_numeric());
            columns.push(format_column(array, precision, &options)?);
        }
        Ok(Self {
            headers,
            columns,
            numeric,
        })
    }

    fn to_batch(&self) -> Result<RecordBatch> {
        let fields: Vec<Field> = self
            .headers
            .iter()
            .map(|h| Field::new(h.clone(), DataType::Utf8, false))
            .collect();
        let arrays: Vec<ArrayRef> = self
            .columns
            .iter()
            .map(|c| Arc::new(StringArray::from(c.clone())) as ArrayRef)
            .collect();
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }

    /// Box-drawn table, each line prefixed with `indent` spaces.
    /// A table without columns renders as an empty string.
    pub fn to_terminal(&self, indent: usize) -> Result<String> {
        if self.headers.is_empty() {
            return Ok(String::new());
        }
        let text = arrow::util::pretty::pretty_format_batches(&[self.to_batch()?])?.to_string();
        Ok(indent_lines(&text, indent))
    }

    /// HTML table with an optional caption and hover rule.
    pub fn to_html(&self, caption: Option<&str>, hover: Option<&TableStyle>) -> String {
        let id = format!("term-check-{}", TABLE_IDS.fetch_add(1, Ordering::Relaxed));
        let mut html = String::new();

        if let Some(style) = hover {
            let _ = write!(html, "<style>{}</style>", style.to_css(Some(&format!("#{id}"))));
        }
        let _ = write!(html, "<table id=\"{id}\">");
        if let Some(caption) = caption {
            let _ = write!(html, "<caption>{caption}</caption>");
        }
        html.push_str("<thead><tr>");
        for header in &self.headers {
            let _ = write!(html, "<th>{}</th>", escape_html(header));
        }
        html.push_str("</tr></thead><tbody>");
        for row in 0..self.num_rows() {
            html.push_str("<tr>");
            for (column, numeric) in self.columns.iter().zip(&self.numeric) {
                let align = if *numeric { " style=\"text-align: right\"" } else { "" };
                let _ = write!(html, "<td{align}>{}</td>", escape_html(&column[row]));
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody></table>");
        html
    }
}

fn format_column(array: &ArrayRef, precision: usize, options: &FormatOptions) -> Result<Vec<String>> {
    let rounded = |v: Option<f64>| match v {
        Some(v) => format!("{v:.precision$}"),
        None => "null".to_string(),
    };
    match array.data_type() {
        DataType::Float64 => Ok(array.as_primitive::<Float64Type>().iter().map(rounded).collect()),
        DataType::Float32 => Ok(array
            .as_primitive::<Float32Type>()
            .iter()
            .map(|v| rounded(v.map(f64::from)))
            .collect()),
        DataType::Float16 => Ok(array
            .as_primitive::<Float16Type>()
            .iter()
            .map(|v| rounded(v.map(f64::from)))
            .collect()),
        other => {
            let formatter = ArrayFormatter::try_new(array.as_ref(), options).map_err(|_| {
                CheckError::UnsupportedDisplay {
                    type_name: other.to_string(),
                }
            })?;
            (0..array.len())
                .map(|i| {
                    formatter
                        .value(i)
                        .try_to_string()
                        .map_err(|_| CheckError::UnsupportedDisplay {
                            type_name: other.to_string(),
                        })
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;
    use arrow::array::{Float64Array, Int64Array};

    fn floats() -> RecordBatch {
        RecordBatch::try_new(
            Arc::new(Schema::new(vec![
                Field::new("x", DataType::Float64, true),
                Field::new("n", DataType::Int64, false),
            ])),
            vec![
                Arc::new(Float64Array::from(vec![Some(1.23456), None])),
                Arc::new(Int64Array::from(vec![7, 8])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_precision_applies_to_floats() {
        let table = TextTable::from_batch(&floats(), 2).unwrap();
        assert_eq!(table.columns[0], vec!["1.23", "null"]);
        assert_eq!(table.columns[1], vec!["7", "8"]);
        assert_eq!(table.numeric, vec![true, true]);
    }

    #[test]
    fn test_zero_column_table() {
        let empty = RecordBatch::new_empty(Arc::new(Schema::empty()));
        let table = TextTable::from_batch(&empty, 2).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.to_terminal(4).unwrap(), "");
        assert!(table.to_html(None, None).contains("<thead><tr></tr></thead>"));
    }

    #[test]
    fn test_terminal_indent() {
        let text = TextTable::from_batch(&floats(), 1)
            .unwrap()
            .to_terminal(4)
            .unwrap();
        for line in text.lines() {
            assert!(line.starts_with("    +") || line.starts_with("    |"), "{line}");
        }
        assert!(text.contains("| 1.2 "));
    }

    #[test]
    fn test_html_table() {
        let table = TextTable::from_batch(&test_fixtures::small(), 2).unwrap();
        let html = table.to_html(Some("<h5>Rows</h5>"), Some(&TableStyle::default()));
        assert!(html.starts_with("<style>#term-check-"));
        assert!(html.contains("tr:hover { background-color: #2986cc; }"));
        assert!(html.contains("<caption><h5>Rows</h5></caption>"));
        assert!(html.contains("<th>a</th><th>b</th>"));
        assert!(html.contains("<td style=\"text-align: right\">10</td><td>w</td>"));

        let plain = table.to_html(None, None);
        assert!(plain.starts_with("<table id="));
        assert!(!plain.contains("<caption>"));
    }
}
