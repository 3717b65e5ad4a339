//! Transforms applied to the data before a check computes its result.
//!
//! A [`Transform`] derives a new value from the checked data; it never
//! touches the original. Besides closures, the safe SQL mini-language lets
//! callers express a transform as text:
//!
//! ```rust,no_run
//! use term_check::transform::Transform;
//!
//! let short = Transform::filter("sepal_length < 5");
//! let projected = Transform::sql("SELECT species, petal_width * 10 AS pw FROM data");
//! ```

use crate::data::{Data, Subset};
use crate::engine::SqlEngine;
use crate::error::{CheckError, Result};
use arrow::record_batch::RecordBatch;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

type TransformFn = Arc<dyn Fn(&Data) -> Result<Data> + Send + Sync>;

/// A function from the checked data to the value a check inspects.
#[derive(Clone)]
pub struct Transform {
    label: String,
    func: Option<TransformFn>,
}

impl Transform {
    /// Passes the data through unchanged.
    pub fn identity() -> Self {
        Self {
            label: "identity".to_string(),
            func: None,
        }
    }

    /// Wraps a closure over [`Data`].
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Data) -> Result<Data> + Send + Sync + 'static,
    {
        Self {
            label: "closure".to_string(),
            func: Some(Arc::new(f)),
        }
    }

    /// Wraps a closure over a table. Applying it to a series fails with
    /// [`CheckError::TypeMismatch`].
    pub fn map_table<F>(f: F) -> Self
    where
        F: Fn(&RecordBatch) -> Result<RecordBatch> + Send + Sync + 'static,
    {
        Self {
            label: "table closure".to_string(),
            func: Some(Arc::new(move |data: &Data| match data {
                Data::Table(batch) => Ok(Data::Table(f(batch)?)),
                other => Err(CheckError::type_mismatch("table", other.kind_name())),
            })),
        }
    }

    /// Runs a read-only SQL query over the data, registered as table `data`.
    ///
    /// The query is validated when the transform is applied.
    pub fn sql(query: impl Into<String>) -> Self {
        let query = query.into();
        let label = format!("sql({query})");
        Self {
            label,
            func: Some(Arc::new(move |data: &Data| {
                SqlEngine::global().query(data, &query)
            })),
        }
    }

    /// Keeps the rows matching a SQL boolean expression.
    pub fn filter(predicate: impl Into<String>) -> Self {
        let predicate = predicate.into();
        let label = format!("filter({predicate})");
        Self {
            label,
            func: Some(Arc::new(move |data: &Data| {
                SqlEngine::global().filter(data, &predicate)
            })),
        }
    }

    /// Replaces the label shown in logs.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_identity(&self) -> bool {
        self.func.is_none()
    }

    /// Applies the transform to `data`.
    pub fn apply(&self, data: &Data) -> Result<Data> {
        match &self.func {
            Some(f) => f(data),
            None => Ok(data.clone()),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transform({})", self.label)
    }
}

/// Applies `transform`, then selects `subset` from the result.
///
/// Errors from the transform propagate unchanged. An empty subset selects
/// everything.
pub fn apply_modifications(data: &Data, transform: &Transform, subset: &Subset) -> Result<Data> {
    trace!(transform = transform.label(), subset = %subset, "Applying modifications");
    let transformed = transform.apply(data)?;
    transformed.select(subset)
}
