//! The check pipeline: modify, compute, display.
//!
//! A [`CheckContext`] bundles the settings registry with a [`Renderer`] for
//! one display target. Every check method goes through
//! [`CheckContext::run_check`], which does nothing at all while checks are
//! disabled.

use crate::data::{Data, Subset};
use crate::display::{target_for, DisplayMode, DisplayTarget, Renderer};
use crate::error::Result;
use crate::logging::{truncate_field, LogConfig};
use crate::options::{self, Format, SharedSettings};
use crate::transform::{apply_modifications, Transform};
use crate::value::CheckValue;
use once_cell::sync::Lazy;
use tracing::{debug, instrument};

static GLOBAL_CONTEXT: Lazy<CheckContext> = Lazy::new(|| {
    CheckContext::builder()
        .settings(options::global())
        .mode(DisplayMode::from_env())
        .build()
});

/// Per-call options shared by every inspection check.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Applied to the data before the check computes its result.
    pub transform: Transform,
    /// Columns to inspect after the transform.
    pub subset: Subset,
    /// Replaces the check's default display name.
    pub name: Option<String>,
}

impl CheckOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn subset(mut self, subset: impl Into<Subset>) -> Self {
        self.subset = subset.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The name to display: the explicit name, then `default`, then the subset.
    pub fn display_name(&self, default: Option<&str>) -> Option<String> {
        self.name
            .clone()
            .or_else(|| default.map(str::to_string))
            .or_else(|| (!self.subset.is_none()).then(|| self.subset.to_string()))
    }
}

impl From<Transform> for CheckOptions {
    fn from(transform: Transform) -> Self {
        Self::new().transform(transform)
    }
}

impl From<Subset> for CheckOptions {
    fn from(subset: Subset) -> Self {
        Self::new().subset(subset)
    }
}

impl From<&str> for CheckOptions {
    /// A bare string selects a column.
    fn from(column: &str) -> Self {
        Self::new().subset(column)
    }
}

/// Settings plus a display target: everything a check needs to run.
pub struct CheckContext {
    settings: SharedSettings,
    renderer: Renderer,
    log_config: LogConfig,
}

impl std::fmt::Debug for CheckContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckContext")
            .field("renderer", &self.renderer)
            .field("log_config", &self.log_config)
            .finish_non_exhaustive()
    }
}

impl CheckContext {
    pub fn new(settings: SharedSettings, target: impl DisplayTarget + 'static) -> Self {
        Self {
            renderer: Renderer::new(settings.clone(), target),
            settings,
            log_config: LogConfig::default(),
        }
    }

    pub fn builder() -> CheckContextBuilder {
        CheckContextBuilder::default()
    }

    /// The context used by [`CheckExt::check`](crate::checks::CheckExt::check):
    /// global settings, display mode from `TERM_CHECK_DISPLAY`.
    pub fn global() -> &'static CheckContext {
        &GLOBAL_CONTEXT
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn log_config(&self) -> &LogConfig {
        &self.log_config
    }

    pub fn checks_enabled(&self) -> Result<bool> {
        Ok(self.settings.read()?.checks_enabled())
    }

    pub fn asserts_enabled(&self) -> Result<bool> {
        Ok(self.settings.read()?.asserts_enabled())
    }

    /// Snapshot of the current formatting options.
    pub fn format(&self) -> Result<Format> {
        Ok(self.settings.read()?.format())
    }

    /// Runs one check.
    ///
    /// 1. Returns immediately while checks are disabled.
    /// 2. Applies the transform and subset from `options`.
    /// 3. Computes the result with `compute`.
    /// 4. Shows it under the name chosen by [`CheckOptions::display_name`].
    ///
    /// Errors from the transform or `compute` propagate unchanged.
    #[instrument(skip_all, fields(
        check.name = default_name.unwrap_or(""),
        check.subset = %options.subset,
        check.transform = options.transform.label()
    ))]
    pub fn run_check<F>(
        &self,
        data: &Data,
        compute: F,
        options: &CheckOptions,
        default_name: Option<&str>,
    ) -> Result<()>
    where
        F: FnOnce(&Data) -> Result<CheckValue>,
    {
        if !self.checks_enabled()? {
            debug!("Checks disabled, skipping");
            return Ok(());
        }
        let working = apply_modifications(data, &options.transform, &options.subset)?;
        let value = compute(&working)?;
        if self.log_config.log_check_details {
            debug!(
                check.value = %truncate_field(&value.to_string(), self.log_config.max_field_length),
                check.rows = working.num_rows(),
                "Check computed"
            );
        }
        let name = options.display_name(default_name);
        self.renderer.show(&value, name.as_deref())
    }
}

/// Builds a [`CheckContext`].
#[derive(Default)]
pub struct CheckContextBuilder {
    settings: Option<SharedSettings>,
    target: Option<Box<dyn DisplayTarget>>,
    log_config: Option<LogConfig>,
}

impl CheckContextBuilder {
    /// Uses an existing registry. Defaults to a fresh one with built-in options.
    pub fn settings(mut self, settings: SharedSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn target(mut self, target: impl DisplayTarget + 'static) -> Self {
        self.target = Some(Box::new(target));
        self
    }

    /// Writes to standard output in the given mode.
    pub fn mode(mut self, mode: DisplayMode) -> Self {
        self.target = Some(target_for(mode));
        self
    }

    /// How much the context logs about the checks it runs.
    pub fn log_config(mut self, config: LogConfig) -> Self {
        self.log_config = Some(config);
        self
    }

    pub fn build(self) -> CheckContext {
        let settings = self
            .settings
            .unwrap_or_else(|| options::Settings::new().shared());
        let target = self.target.unwrap_or_else(|| target_for(DisplayMode::Plain));
        CheckContext {
            renderer: Renderer::from_boxed(settings.clone(), target),
            settings,
            log_config: self.log_config.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{PlainTextDisplay, SharedBuffer};
    use crate::error::CheckError;
    use crate::options::Settings;
    use crate::test_fixtures;
    use std::cell::Cell;

    fn context() -> (CheckContext, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let ctx = CheckContext::builder()
            .target(PlainTextDisplay::new(buffer.clone()).with_colors(false))
            .build();
        (ctx, buffer)
    }

    #[test]
    fn test_run_check_renders_named_result() {
        let (ctx, buffer) = context();
        let data = Data::from(test_fixtures::iris());
        ctx.run_check(
            &data,
            |d| Ok(d.num_rows().into()),
            &CheckOptions::new(),
            Some("☰ Rows"),
        )
        .unwrap();
        assert_eq!(buffer.contents(), "\n☰ Rows: 150\n");
    }

    #[test]
    fn test_disabled_checks_skip_everything() {
        let (ctx, buffer) = context();
        ctx.settings().write().unwrap().disable_checks(true).unwrap();
        let called = Cell::new(false);
        let data = Data::from(test_fixtures::small());
        let options = CheckOptions::new().transform(Transform::new(|_| {
            Err(CheckError::Internal("transform ran".to_string()))
        }));
        ctx.run_check(
            &data,
            |_| {
                called.set(true);
                Ok(CheckValue::Null)
            },
            &options,
            None,
        )
        .unwrap();
        assert!(!called.get());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_subset_is_default_name() {
        let options = CheckOptions::new().subset(["a", "b"]);
        assert_eq!(options.display_name(None).as_deref(), Some("[a, b]"));
        assert_eq!(options.display_name(Some("x")).as_deref(), Some("x"));
        let named = options.name("mine");
        assert_eq!(named.display_name(Some("x")).as_deref(), Some("mine"));
        assert_eq!(CheckOptions::new().display_name(None), None);
    }

    #[test]
    fn test_compute_errors_propagate() {
        let (ctx, buffer) = context();
        let data = Data::from(test_fixtures::small());
        let err = ctx
            .run_check(&data, |d| Ok(d.column("zzz")?.into()), &CheckOptions::new(), None)
            .unwrap_err();
        assert!(matches!(err, CheckError::ColumnNotFound { .. }));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_builder_defaults_to_fresh_settings() {
        let ctx = CheckContext::builder().mode(DisplayMode::Silent).build();
        assert!(ctx.checks_enabled().unwrap());
        assert_eq!(ctx.renderer().mode(), DisplayMode::Silent);
        assert!(!ctx.log_config().log_check_details);
        let verbose = CheckContext::builder().log_config(LogConfig::verbose()).build();
        assert!(verbose.log_config().log_check_details);
        let settings = Settings::new().shared();
        let ctx = CheckContext::new(settings.clone(), crate::display::NullDisplay);
        settings.write().unwrap().disable_checks(false).unwrap();
        assert!(!ctx.checks_enabled().unwrap());
        assert!(!ctx.asserts_enabled().unwrap());
    }
}
