//! Prelude for commonly used types and traits in term-check.

pub use crate::assertions::{AssertOptions, DataKind, Predicate};
pub use crate::checks::{CheckExt, Checks};
pub use crate::data::{Data, Series, Subset};
pub use crate::dispatch::{CheckContext, CheckOptions};
pub use crate::display::{DisplayMode, PlotKind, PlotOptions};
pub use crate::error::{AssertionKind, CheckError, ErrorContext, Result};
pub use crate::logging::LogConfig;
pub use crate::options::{OptionValue, OutputSink};
pub use crate::timer::{print_time_elapsed, start_timer, TimerHandle};
pub use crate::transform::Transform;
pub use crate::value::CheckValue;
