//! Values produced by a check's compute step.

use crate::data::{Data, Series};
use crate::display::plot::Figure;
use arrow::record_batch::RecordBatch;
use std::fmt;

/// Anything a check can display.
///
/// Scalars and short collections render on a single line as
/// `"{name}: {value}"`. Tables, series and figures get their own rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Tuple(Vec<CheckValue>),
    List(Vec<CheckValue>),
    Map(Vec<(String, CheckValue)>),
    Table(RecordBatch),
    Series(Series),
    Figure(Figure),
}

impl CheckValue {
    pub fn tuple<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CheckValue>,
    {
        CheckValue::Tuple(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CheckValue>,
    {
        CheckValue::Map(items.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// True for values rendered on a single line.
    pub fn is_scalar_like(&self) -> bool {
        !matches!(
            self,
            CheckValue::Table(_) | CheckValue::Series(_) | CheckValue::Figure(_)
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CheckValue::Null => "null",
            CheckValue::Bool(_) => "bool",
            CheckValue::Int(_) => "int",
            CheckValue::UInt(_) => "uint",
            CheckValue::Float(_) => "float",
            CheckValue::Text(_) => "text",
            CheckValue::Tuple(_) => "tuple",
            CheckValue::List(_) => "list",
            CheckValue::Map(_) => "map",
            CheckValue::Table(_) => "table",
            CheckValue::Series(_) => "series",
            CheckValue::Figure(_) => "figure",
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckValue::Text(s) => write!(f, "'{s}'"),
            other => write!(f, "{other}"),
        }
    }
}

fn fmt_float(value: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

impl fmt::Display for CheckValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckValue::Null => write!(f, "None"),
            CheckValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            CheckValue::Int(i) => write!(f, "{i}"),
            CheckValue::UInt(u) => write!(f, "{u}"),
            CheckValue::Float(v) => fmt_float(*v, f),
            CheckValue::Text(s) => write!(f, "{s}"),
            CheckValue::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            CheckValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                write!(f, "]")
            }
            CheckValue::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{key}': ")?;
                    value.fmt_nested(f)?;
                }
                write!(f, "}}")
            }
            CheckValue::Table(batch) => {
                write!(f, "<table {}x{}>", batch.num_rows(), batch.num_columns())
            }
            CheckValue::Series(series) => write!(f, "<series {} ({})>", series.name, series.len()),
            CheckValue::Figure(figure) => write!(f, "<figure with {} panels>", figure.num_panels()),
        }
    }
}

impl From<bool> for CheckValue {
    fn from(value: bool) -> Self {
        CheckValue::Bool(value)
    }
}

impl From<i64> for CheckValue {
    fn from(value: i64) -> Self {
        CheckValue::Int(value)
    }
}

impl From<i32> for CheckValue {
    fn from(value: i32) -> Self {
        CheckValue::Int(i64::from(value))
    }
}

impl From<u64> for CheckValue {
    fn from(value: u64) -> Self {
        CheckValue::UInt(value)
    }
}

impl From<usize> for CheckValue {
    fn from(value: usize) -> Self {
        CheckValue::UInt(value as u64)
    }
}

impl From<f64> for CheckValue {
    fn from(value: f64) -> Self {
        CheckValue::Float(value)
    }
}

impl From<&str> for CheckValue {
    fn from(value: &str) -> Self {
        CheckValue::Text(value.to_string())
    }
}

impl From<String> for CheckValue {
    fn from(value: String) -> Self {
        CheckValue::Text(value)
    }
}

impl<T: Into<CheckValue>> From<Vec<T>> for CheckValue {
    fn from(value: Vec<T>) -> Self {
        CheckValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<CheckValue>> From<Option<T>> for CheckValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CheckValue::Null)
    }
}

impl From<RecordBatch> for CheckValue {
    fn from(value: RecordBatch) -> Self {
        CheckValue::Table(value)
    }
}

impl From<Series> for CheckValue {
    fn from(value: Series) -> Self {
        CheckValue::Series(value)
    }
}

impl From<Data> for CheckValue {
    fn from(value: Data) -> Self {
        match value {
            Data::Table(batch) => CheckValue::Table(batch),
            Data::Series(series) => CheckValue::Series(series),
        }
    }
}

impl From<Figure> for CheckValue {
    fn from(value: Figure) -> Self {
        CheckValue::Figure(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;

    #[test]
    fn test_scalar_rendering() {
        assert_eq!(CheckValue::from(150usize).to_string(), "150");
        assert_eq!(CheckValue::from(-3i64).to_string(), "-3");
        assert_eq!(CheckValue::from(2.0).to_string(), "2.0");
        assert_eq!(CheckValue::from(0.25).to_string(), "0.25");
        assert_eq!(CheckValue::from(true).to_string(), "True");
        assert_eq!(CheckValue::from(None::<i64>).to_string(), "None");
    }

    #[test]
    fn test_collection_rendering() {
        assert_eq!(CheckValue::tuple([150usize, 5]).to_string(), "(150, 5)");
        assert_eq!(CheckValue::tuple([150usize]).to_string(), "(150,)");
        assert_eq!(CheckValue::from(vec!["a", "b"]).to_string(), "['a', 'b']");
        assert_eq!(
            CheckValue::map([("enable_checks", true), ("enable_asserts", false)]).to_string(),
            "{'enable_checks': True, 'enable_asserts': False}"
        );
    }

    #[test]
    fn test_scalar_like() {
        assert!(CheckValue::from(vec![1i64, 2]).is_scalar_like());
        let table = CheckValue::from(test_fixtures::small());
        assert!(!table.is_scalar_like());
        assert_eq!(table.to_string(), "<table 5x2>");
        assert_eq!(table.type_name(), "table");
    }
}
