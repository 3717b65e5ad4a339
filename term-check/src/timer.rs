//! Stopwatch for timing steps of a pipeline.
//!
//! ```rust,no_run
//! use term_check::timer::{print_time_elapsed, start_timer};
//!
//! let t = start_timer(false)?;
//! // ... pipeline steps ...
//! print_time_elapsed(&t, None, "auto")?;
//! # Ok::<(), term_check::CheckError>(())
//! ```
//!
//! Both functions honour `enable_checks`. A handle taken while checks were
//! disabled is "not started" and reports that instead of a duration.

use crate::dispatch::CheckContext;
use crate::display::TextColors;
use crate::error::{CheckError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::debug;

/// Label used when the caller gives none.
pub const DEFAULT_LABEL: &str = "⏱️ Time elapsed";

/// Shown for a handle that was never started.
pub const NOT_STARTED: &str = "Timer hasn't been started. Call start_timer() first";

/// A point in time returned by [`start_timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    started: Option<(Instant, DateTime<Utc>)>,
}

impl TimerHandle {
    pub fn now() -> Self {
        Self {
            started: Some((Instant::now(), Utc::now())),
        }
    }

    /// The sentinel handed out while checks are disabled.
    pub fn not_started() -> Self {
        Self { started: None }
    }

    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    /// Wall-clock start time.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started.map(|(_, wall)| wall)
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.started.map(|(instant, _)| instant.elapsed())
    }
}

/// Units for reporting elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// The coarsest unit in which the value is at least 1.
    Auto,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Picks the unit for `elapsed`: milliseconds under a second, seconds
    /// under a minute, minutes under an hour, hours after that.
    pub fn auto_for(elapsed: Duration) -> TimeUnit {
        let secs = elapsed.as_secs_f64();
        if secs >= 3600.0 {
            TimeUnit::Hours
        } else if secs >= 60.0 {
            TimeUnit::Minutes
        } else if secs >= 1.0 {
            TimeUnit::Seconds
        } else {
            TimeUnit::Milliseconds
        }
    }

    /// `elapsed` expressed in this unit. `Auto` resolves first.
    pub fn convert(self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        match self {
            TimeUnit::Auto => TimeUnit::auto_for(elapsed).convert(elapsed),
            TimeUnit::Milliseconds => secs * 1000.0,
            TimeUnit::Seconds => secs,
            TimeUnit::Minutes => secs / 60.0,
            TimeUnit::Hours => secs / 3600.0,
        }
    }

    pub fn long_name(self) -> &'static str {
        match self {
            TimeUnit::Auto => "auto",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(TimeUnit::Auto),
            "milliseconds" | "ms" => Ok(TimeUnit::Milliseconds),
            "seconds" | "s" => Ok(TimeUnit::Seconds),
            "minutes" | "m" => Ok(TimeUnit::Minutes),
            "hours" | "h" => Ok(TimeUnit::Hours),
            other => Err(CheckError::UnknownTimeUnit(other.to_string())),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.long_name())
    }
}

/// Formats an elapsed duration as `"{value} {units}"`.
///
/// Under `auto` the unit shown is the resolved long name; otherwise it is the
/// token the caller passed, so `"ms"` stays `"ms"`.
pub fn format_elapsed(elapsed: Duration, units: &str, precision: usize) -> Result<String> {
    let unit: TimeUnit = units.parse()?;
    let (resolved, shown) = match unit {
        TimeUnit::Auto => {
            let resolved = TimeUnit::auto_for(elapsed);
            (resolved, resolved.long_name())
        }
        fixed => (fixed, units),
    };
    Ok(format!("{:.precision$} {shown}", resolved.convert(elapsed)))
}

/// Starts a timer on `ctx`. Returns a not-started handle while checks are
/// disabled.
pub fn start_timer_with(ctx: &CheckContext, verbose: bool) -> Result<TimerHandle> {
    if !ctx.checks_enabled()? {
        return Ok(TimerHandle::not_started());
    }
    let handle = TimerHandle::now();
    if verbose {
        if let Some(at) = handle.started_at() {
            ctx.renderer().show_line(
                &format!(
                    "⏱️ Started timer at: {}",
                    at.to_rfc3339_opts(SecondsFormat::Millis, true)
                ),
                None,
                &TextColors::default(),
            )?;
        }
    }
    Ok(handle)
}

/// Shows the time since `handle` was started on `ctx`.
///
/// Does nothing while checks are disabled. Unknown `units` fail with
/// [`CheckError::UnknownTimeUnit`].
pub fn print_time_elapsed_with(
    ctx: &CheckContext,
    handle: &TimerHandle,
    label: Option<&str>,
    units: &str,
) -> Result<()> {
    if !ctx.checks_enabled()? {
        return Ok(());
    }
    let renderer = ctx.renderer();
    let Some(elapsed) = handle.elapsed() else {
        return renderer.show_line(NOT_STARTED, None, &TextColors::default());
    };
    let precision = ctx.format()?.precision;
    let text = format_elapsed(elapsed, units, precision)?;
    debug!(timer.units = units, timer.elapsed_ms = elapsed.as_millis() as u64, "Timer read");
    renderer.show_line(
        &format!("{}: {text}", label.unwrap_or(DEFAULT_LABEL)),
        None,
        &TextColors::default(),
    )
}

/// Starts a timer on the global context.
pub fn start_timer(verbose: bool) -> Result<TimerHandle> {
    start_timer_with(CheckContext::global(), verbose)
}

/// Shows the time elapsed since `handle` on the global context.
pub fn print_time_elapsed(handle: &TimerHandle, label: Option<&str>, units: &str) -> Result<()> {
    print_time_elapsed_with(CheckContext::global(), handle, label, units)
}
