//! Shared helpers for integration tests.

#![allow(dead_code)]

use term_check::display::{PlainTextDisplay, SharedBuffer};
use term_check::dispatch::CheckContext;

pub use term_check::test_fixtures::{iris, mixed_types, series, small, with_nulls};

/// A context writing uncolored plain text into a buffer the test can read.
pub fn context() -> (CheckContext, SharedBuffer) {
    let buffer = SharedBuffer::new();
    let ctx = CheckContext::builder()
        .target(PlainTextDisplay::new(buffer.clone()).with_colors(false))
        .build();
    (ctx, buffer)
}
