//! # term-check - chainable inspection checks for Arrow tables
//!
//! term-check lets you look inside a data pipeline without breaking it apart.
//! Call `.check()` on a `RecordBatch` (or a [`data::Series`]) and chain
//! inspections and assertions between your transformation steps. Every check
//! prints what it finds and hands back the data untouched.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use term_check::prelude::*;
//! # fn load_iris() -> arrow::record_batch::RecordBatch { unimplemented!() }
//!
//! let iris = load_iris();
//! iris.check()
//!     .nrows(None)?                                     // ☰ Rows: 150
//!     .nnulls(false, None)?                             // 👻 Rows with NaNs: 0
//!     .head(3, None)?
//!     .value_counts("species", 10, None)?
//!     .assert_positive(true, AssertOptions::from("sepal_length"))?
//!     .assert_data(
//!         &Predicate::new(|d| Ok(d.num_rows() > 100)).labeled("rows > 100"),
//!         None,
//!     )?;
//! # Ok::<(), term_check::CheckError>(())
//! ```
//!
//! ## Key Features
//!
//! - **Non-mutating**: checks run on a derived view. The original value is
//!   returned by reference, so checks slot into existing code.
//! - **Transforms and subsets**: every check accepts a [`transform::Transform`]
//!   (a closure, or a read-only SQL query run by DataFusion) and a column
//!   subset, applied before the check computes its result.
//! - **Assertions**: raise [`CheckError::Assertion`] with a typed
//!   [`error::AssertionKind`], or show a colored banner and carry on.
//! - **Explicit output**: a [`display::DisplayTarget`] chosen up front decides
//!   between plain text, HTML and silence. A custom sink receives a plain-text
//!   copy of everything, e.g. for `tracing`.
//! - **Global switches**: `disable_checks()` makes the whole check surface
//!   inert in production while assertions keep running.
//!
//! ## Configuration
//!
//! Options live in a [`options::Settings`] registry. The global registry reads
//! `TERM_CHECK_*` environment variables once at start-up; contexts built with
//! [`dispatch::CheckContext::builder`] can carry their own.
//!
//! ```rust,no_run
//! use term_check::options;
//!
//! options::set_option("precision", 4)?;
//! options::disable_checks(true)?;
//! # Ok::<(), term_check::CheckError>(())
//! ```

pub mod assertions;
pub mod checks;
pub mod data;
pub mod dispatch;
pub mod display;
pub mod engine;
pub mod error;
pub mod export;
pub mod formatters;
pub mod logging;
pub mod options;
pub mod prelude;
pub mod security;
pub mod timer;
pub mod transform;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

pub use error::{CheckError, Result};
