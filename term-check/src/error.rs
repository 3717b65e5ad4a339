//! Error types for term-check.
//!
//! Every fallible operation in the crate returns [`CheckError`]. The variants
//! fall into four groups: configuration errors raised by the settings
//! registry, usage errors raised at the API boundary, assertion failures
//! raised by the `assert_*` checks, and wrapped errors from Arrow, DataFusion
//! and the filesystem.

use std::fmt;
use thiserror::Error;

/// The category attached to a raised assertion failure.
///
/// Callers pick the kind through `AssertOptions::error_kind` and match on it
/// when they catch the error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssertionKind {
    /// The data failed a business predicate. The default for data assertions.
    #[default]
    Data,
    /// The data had an unexpected type.
    Type,
    /// A value was outside its allowed domain.
    Value,
    /// A caller-defined category.
    Custom(String),
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionKind::Data => write!(f, "DataError"),
            AssertionKind::Type => write!(f, "TypeError"),
            AssertionKind::Value => write!(f, "ValueError"),
            AssertionKind::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// The main error type for term-check.
#[derive(Error, Debug)]
pub enum CheckError {
    /// An option name that the settings registry does not know.
    #[error("No option named '{name}'. Available options: {}", available.join(", "))]
    UnknownOption {
        name: String,
        available: Vec<String>,
    },

    /// A value rejected by an option's validator.
    #[error("Invalid value for option '{name}': {message}")]
    InvalidOptionValue { name: String, message: String },

    /// A raised assertion failure.
    #[error("{kind}: {message}")]
    Assertion {
        kind: AssertionKind,
        /// Human-readable message, including the condition label when shown
        message: String,
    },

    /// A value the renderer cannot display.
    #[error("Can't display values of type {type_name}")]
    UnsupportedDisplay { type_name: String },

    /// A time unit token that the timer does not recognise.
    #[error("Unknown time unit '{0}'. Use one of: auto, milliseconds (ms), seconds (s), minutes (m), hours (h)")]
    UnknownTimeUnit(String),

    /// A file extension or format name with no export writer.
    #[error("Can't write data to '{path}': unrecognized file format")]
    UnknownExportFormat { path: String },

    /// A transform or predicate applied to the wrong kind of data.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A subset or argument that names a missing column.
    #[error("Column '{column}' not found in data")]
    ColumnNotFound { column: String },

    /// A SQL expression rejected before execution.
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from the Parquet writer.
    #[cfg(feature = "parquet")]
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An operation that is not available in this build or for this input.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, CheckError>`.
pub type Result<T> = std::result::Result<T, CheckError>;

impl CheckError {
    /// Creates an assertion failure of the given kind.
    pub fn assertion(kind: AssertionKind, message: impl Into<String>) -> Self {
        Self::Assertion {
            kind,
            message: message.into(),
        }
    }

    /// Creates an invalid option value error.
    pub fn invalid_option(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOptionValue {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Returns the assertion kind if this is an assertion failure.
    pub fn assertion_kind(&self) -> Option<&AssertionKind> {
        match self {
            Self::Assertion { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// True for errors raised by the settings registry.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownOption { .. } | Self::InvalidOptionValue { .. }
        )
    }
}

impl From<serde_json::Error> for CheckError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CheckError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("lock poisoned: {err}"))
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<CheckError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            CheckError::Internal(inner) => CheckError::Internal(format!("{msg}: {inner}")),
            other => CheckError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                CheckError::Internal(inner) => CheckError::Internal(format!("{msg}: {inner}")),
                other => CheckError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
