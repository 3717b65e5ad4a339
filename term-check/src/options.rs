//! Settings registry for term-check.
//!
//! All checks read their mode flags and formatting options from a
//! [`Settings`] value. A context normally shares one registry behind an
//! `Arc<RwLock<_>>` ([`SharedSettings`]); the process-wide default lives in
//! [`global()`] and the free functions in this module operate on it.
//!
//! # Examples
//!
//! ```rust
//! use term_check::options::Settings;
//!
//! let mut settings = Settings::new();
//! settings.set_format([("precision", 4.into()), ("use_emojis", false.into())]).unwrap();
//! assert_eq!(settings.precision(), 4);
//!
//! settings.reset_format();
//! assert_eq!(settings.precision(), 2);
//! assert!(settings.use_emojis());
//! ```

use crate::error::{CheckError, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use tracing::Level;

/// Optional prefix accepted in front of every option name.
pub const OPTION_PREFIX: &str = "check.";

/// Prefix of environment variables read by [`Settings::apply_env`].
pub const ENV_PREFIX: &str = "TERM_CHECK_";

const MODE_OPTIONS: [&str; 2] = ["enable_checks", "enable_asserts"];
const OUTPUT_OPTIONS: [&str; 2] = ["custom_sink", "print_to_stdout"];

/// A function that receives a plain-text copy of every rendered check.
///
/// Rich content (HTML tables, images) is never forwarded; the sink sees the
/// same text a terminal would, minus colors.
#[derive(Clone)]
pub struct OutputSink {
    label: String,
    emit: Arc<dyn Fn(&str) + Send + Sync>,
}

impl OutputSink {
    /// Wraps a closure as a sink.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            label: "custom".to_string(),
            emit: Arc::new(f),
        }
    }

    /// Forwards check output to `tracing` at the given level.
    ///
    /// Events are emitted under the `term_check::output` target so they can be
    /// filtered separately from the crate's own diagnostics.
    pub fn tracing(level: Level) -> Self {
        let emit = move |text: &str| match level {
            Level::ERROR => tracing::error!(target: "term_check::output", "{text}"),
            Level::WARN => tracing::warn!(target: "term_check::output", "{text}"),
            Level::INFO => tracing::info!(target: "term_check::output", "{text}"),
            Level::DEBUG => tracing::debug!(target: "term_check::output", "{text}"),
            Level::TRACE => tracing::trace!(target: "term_check::output", "{text}"),
        };
        Self {
            label: format!("tracing({level})"),
            emit: Arc::new(emit),
        }
    }

    /// A sink that appends every message to a shared vector.
    pub fn collector() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&lines);
        let sink = Self {
            label: "collector".to_string(),
            emit: Arc::new(move |text: &str| {
                if let Ok(mut lines) = store.lock() {
                    lines.push(text.to_string());
                }
            }),
        };
        (sink, lines)
    }

    /// Sets the label shown by `describe_all`.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sends one message to the sink.
    pub fn emit(&self, text: &str) {
        (self.emit)(text)
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputSink({})", self.label)
    }
}

impl PartialEq for OutputSink {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.emit, &other.emit)
    }
}

/// A CSS rule applied to rich tables, e.g. the row hover highlight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStyle {
    pub selector: String,
    pub props: Vec<(String, String)>,
}

impl TableStyle {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            props: Vec::new(),
        }
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.push((name.into(), value.into()));
        self
    }

    /// Renders the rule as CSS, scoped under `scope` when given.
    pub fn to_css(&self, scope: Option<&str>) -> String {
        let props: String = self
            .props
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        match scope {
            Some(scope) => format!("{scope} {} {{ {props} }}", self.selector),
            None => format!("{} {{ {props} }}", self.selector),
        }
    }
}

impl Default for TableStyle {
    fn default() -> Self {
        TableStyle::new("tr:hover").prop("background-color", "#2986cc")
    }
}

/// A value stored in the settings registry.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Style(Option<TableStyle>),
    Sink(Option<OutputSink>),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "int",
            OptionValue::Text(_) => "text",
            OptionValue::Style(_) => "style",
            OptionValue::Sink(_) => "sink",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(i) => write!(f, "{i}"),
            OptionValue::Text(s) => write!(f, "{s}"),
            OptionValue::Style(Some(style)) => write!(f, "{}", style.to_css(None)),
            OptionValue::Style(None) | OptionValue::Sink(None) => write!(f, "none"),
            OptionValue::Sink(Some(sink)) => write!(f, "{}", sink.label),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int(i64::from(value))
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::Int(i64::from(value))
    }
}

impl From<usize> for OptionValue {
    fn from(value: usize) -> Self {
        OptionValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<TableStyle> for OptionValue {
    fn from(value: TableStyle) -> Self {
        OptionValue::Style(Some(value))
    }
}

impl From<OutputSink> for OptionValue {
    fn from(value: OutputSink) -> Self {
        OptionValue::Sink(Some(value))
    }
}

/// Predicate deciding whether a value is acceptable for an option.
pub type Validator = Arc<dyn Fn(&OptionValue) -> bool + Send + Sync>;

/// Stock validators used by the built-in options.
pub mod validators {
    use super::{OptionValue, Validator};
    use once_cell::sync::Lazy;
    use regex::Regex;
    use std::sync::Arc;

    static HTML_TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").ok());
    static COLOR: Lazy<Option<Regex>> =
        Lazy::new(|| Regex::new(r"(?i)^(on_)?([a-z]+([ _][a-z]+)*|#[0-9a-f]{6})$").ok());

    pub fn is_bool() -> Validator {
        Arc::new(|v| matches!(v, OptionValue::Bool(_)))
    }

    pub fn is_int() -> Validator {
        Arc::new(|v| matches!(v, OptionValue::Int(_)))
    }

    pub fn is_nonnegative_int() -> Validator {
        Arc::new(|v| matches!(v, OptionValue::Int(i) if *i >= 0))
    }

    pub fn is_text() -> Validator {
        Arc::new(|v| matches!(v, OptionValue::Text(_)))
    }

    pub fn is_html_tag() -> Validator {
        Arc::new(|v| match (v, HTML_TAG.as_ref()) {
            (OptionValue::Text(tag), Some(re)) => re.is_match(tag),
            _ => false,
        })
    }

    /// Color names such as `red` or `bright blue`, `on_`-prefixed background
    /// names, and `#rrggbb` hex codes.
    pub fn is_color() -> Validator {
        Arc::new(|v| match (v, COLOR.as_ref()) {
            (OptionValue::Text(color), Some(re)) => re.is_match(color),
            _ => false,
        })
    }

    pub fn is_style() -> Validator {
        Arc::new(|v| matches!(v, OptionValue::Style(_)))
    }

    pub fn is_sink() -> Validator {
        Arc::new(|v| matches!(v, OptionValue::Sink(_)))
    }

    /// Accepts any value.
    pub fn any() -> Validator {
        Arc::new(|_| true)
    }
}

#[derive(Clone)]
struct OptionEntry {
    default: OptionValue,
    current: OptionValue,
    description: String,
    validator: Validator,
}

/// Introspection record returned by [`Settings::describe_all`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionDescription {
    pub name: String,
    pub default: String,
    pub current: String,
    pub description: String,
}

/// Whether checks and assertions run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mode {
    pub enable_checks: bool,
    pub enable_asserts: bool,
}

impl Mode {
    pub fn new(enable_checks: bool, enable_asserts: bool) -> Self {
        Self {
            enable_checks,
            enable_asserts,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{enable_checks: {}, enable_asserts: {}}}",
            self.enable_checks, self.enable_asserts
        )
    }
}

/// Foreground and background color pair for a lead-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorPair {
    pub fg: Option<String>,
    pub bg: Option<String>,
}

impl ColorPair {
    pub fn new(fg: impl Into<String>, bg: impl Into<String>) -> Self {
        Self {
            fg: Some(fg.into()),
            bg: Some(bg.into()),
        }
    }
}

/// Snapshot of the options the renderer needs for one call.
#[derive(Debug, Clone)]
pub struct Format {
    pub precision: usize,
    pub use_emojis: bool,
    pub indent_table_terminal: usize,
    pub indent_table_plot_rich: usize,
    pub check_text_tag: String,
    pub table_title_tag: String,
    pub plot_title_tag: String,
    pub table_row_hover_style: Option<TableStyle>,
    pub fail_colors: ColorPair,
    pub pass_colors: ColorPair,
    pub custom_sink: Option<OutputSink>,
    pub print_to_stdout: bool,
}

impl Default for Format {
    fn default() -> Self {
        Settings::new().format()
    }
}

/// The registry of named options.
#[derive(Clone)]
pub struct Settings {
    entries: BTreeMap<String, OptionEntry>,
}

/// A registry shared between a context's renderer, dispatcher and engine.
pub type SharedSettings = Arc<RwLock<Settings>>;

fn normalize(name: &str) -> &str {
    name.strip_prefix(OPTION_PREFIX).unwrap_or(name)
}

impl Settings {
    /// Creates a registry holding every built-in option at its default.
    pub fn new() -> Self {
        let mut settings = Self::empty();
        settings.register_builtins();
        settings
    }

    /// Creates a registry with no options.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Wraps the registry for sharing.
    pub fn shared(self) -> SharedSettings {
        Arc::new(RwLock::new(self))
    }

    fn register_builtins(&mut self) {
        use validators::*;

        let builtins: Vec<(&str, OptionValue, &str, Validator)> = vec![
            (
                "enable_checks",
                true.into(),
                "Run checks and report their results. Also gates the timer. Does not affect assertions.",
                is_bool(),
            ),
            (
                "enable_asserts",
                true.into(),
                "Run assertion checks. Independent of enable_checks.",
                is_bool(),
            ),
            (
                "precision",
                2.into(),
                "Number of decimal places shown for floating point values in tables.",
                is_nonnegative_int(),
            ),
            (
                "table_row_hover_style",
                TableStyle::default().into(),
                "CSS rule applied to rows of rich tables on hover.",
                is_style(),
            ),
            (
                "use_emojis",
                true.into(),
                "Show emojis in check names and messages.",
                is_bool(),
            ),
            (
                "indent_table_terminal",
                4.into(),
                "Spaces to indent tables printed in a terminal.",
                is_nonnegative_int(),
            ),
            (
                "indent_table_plot_rich",
                30.into(),
                "Pixels to indent tables and plots in rich displays.",
                is_nonnegative_int(),
            ),
            (
                "check_text_tag",
                "h5".into(),
                "HTML tag wrapping check results in rich displays.",
                is_html_tag(),
            ),
            (
                "table_title_tag",
                "h5".into(),
                "HTML tag wrapping table titles in rich displays.",
                is_html_tag(),
            ),
            (
                "plot_title_tag",
                "h5".into(),
                "HTML tag wrapping plot titles in rich displays.",
                is_html_tag(),
            ),
            (
                "fail_message_fg_color",
                "white".into(),
                "Foreground color of the lead-in when an assertion fails.",
                is_color(),
            ),
            (
                "fail_message_bg_color",
                "red".into(),
                "Background color of the lead-in when an assertion fails.",
                is_color(),
            ),
            (
                "pass_message_fg_color",
                "black".into(),
                "Foreground color of the lead-in when an assertion passes.",
                is_color(),
            ),
            (
                "pass_message_bg_color",
                "green".into(),
                "Background color of the lead-in when an assertion passes.",
                is_color(),
            ),
            (
                "custom_sink",
                OptionValue::Sink(None),
                "Function that also receives a plain-text copy of every check output.",
                is_sink(),
            ),
            (
                "print_to_stdout",
                true.into(),
                "Send check output to the display target. Set to false to only use custom_sink.",
                is_bool(),
            ),
        ];

        for (name, default, description, validator) in builtins {
            self.entries.insert(
                name.to_string(),
                OptionEntry {
                    current: default.clone(),
                    default,
                    description: description.to_string(),
                    validator,
                },
            );
        }
    }

    /// Registers an option.
    ///
    /// Registering a name that already exists resets its current value to
    /// `default`, checked against the existing validator, rather than adding
    /// a second entry.
    pub fn register(
        &mut self,
        name: &str,
        default: impl Into<OptionValue>,
        description: impl Into<String>,
        validator: Validator,
    ) -> Result<()> {
        let name = normalize(name);
        let default = default.into();

        if let Some(entry) = self.entries.get_mut(name) {
            if !(entry.validator)(&default) {
                return Err(CheckError::invalid_option(
                    name,
                    format!("value '{default}' rejected by validator"),
                ));
            }
            entry.current = default;
            return Ok(());
        }

        if !validator(&default) {
            return Err(CheckError::invalid_option(
                name,
                format!("default '{default}' rejected by validator"),
            ));
        }
        self.entries.insert(
            name.to_string(),
            OptionEntry {
                current: default.clone(),
                default,
                description: description.into(),
                validator,
            },
        );
        Ok(())
    }

    fn unknown(&self, name: &str) -> CheckError {
        CheckError::UnknownOption {
            name: name.to_string(),
            available: self.names(),
        }
    }

    /// Names of all registered options, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(normalize(name))
    }

    /// Sets an option after validating the new value.
    pub fn set(&mut self, name: &str, value: impl Into<OptionValue>) -> Result<()> {
        let name = normalize(name);
        let value = value.into();
        if !self.entries.contains_key(name) {
            return Err(self.unknown(name));
        }
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| CheckError::Internal(format!("option '{name}' vanished")))?;
        if !(entry.validator)(&value) {
            return Err(CheckError::invalid_option(
                name,
                format!(
                    "value '{value}' ({}) rejected by validator",
                    value.type_name()
                ),
            ));
        }
        tracing::debug!(option.name = name, option.value = %value, "Option set");
        entry.current = value;
        Ok(())
    }

    /// Returns the current value of an option.
    pub fn get(&self, name: &str) -> Result<&OptionValue> {
        let name = normalize(name);
        self.entries
            .get(name)
            .map(|entry| &entry.current)
            .ok_or_else(|| self.unknown(name))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        let value = self.get(name)?;
        value
            .as_bool()
            .ok_or_else(|| CheckError::type_mismatch("bool", value.type_name()))
    }

    pub fn get_int(&self, name: &str) -> Result<i64> {
        let value = self.get(name)?;
        value
            .as_int()
            .ok_or_else(|| CheckError::type_mismatch("int", value.type_name()))
    }

    pub fn get_text(&self, name: &str) -> Result<String> {
        let value = self.get(name)?;
        value
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| CheckError::type_mismatch("text", value.type_name()))
    }

    fn bool_or(&self, name: &str, fallback: bool) -> bool {
        self.get_bool(name).unwrap_or(fallback)
    }

    fn usize_or(&self, name: &str, fallback: usize) -> usize {
        self.get_int(name)
            .ok()
            .and_then(|i| usize::try_from(i).ok())
            .unwrap_or(fallback)
    }

    fn text_or(&self, name: &str, fallback: &str) -> String {
        self.get_text(name).unwrap_or_else(|_| fallback.to_string())
    }

    pub fn checks_enabled(&self) -> bool {
        self.bool_or("enable_checks", true)
    }

    pub fn asserts_enabled(&self) -> bool {
        self.bool_or("enable_asserts", true)
    }

    pub fn precision(&self) -> usize {
        self.usize_or("precision", 2)
    }

    pub fn use_emojis(&self) -> bool {
        self.bool_or("use_emojis", true)
    }

    pub fn custom_sink(&self) -> Option<OutputSink> {
        match self.get("custom_sink") {
            Ok(OptionValue::Sink(sink)) => sink.clone(),
            _ => None,
        }
    }

    pub fn print_to_stdout(&self) -> bool {
        self.bool_or("print_to_stdout", true)
    }

    /// Captures the formatting options for one render call.
    pub fn format(&self) -> Format {
        let color = |name: &str, fallback: &str| Some(self.text_or(name, fallback));
        Format {
            precision: self.precision(),
            use_emojis: self.use_emojis(),
            indent_table_terminal: self.usize_or("indent_table_terminal", 4),
            indent_table_plot_rich: self.usize_or("indent_table_plot_rich", 30),
            check_text_tag: self.text_or("check_text_tag", "h5"),
            table_title_tag: self.text_or("table_title_tag", "h5"),
            plot_title_tag: self.text_or("plot_title_tag", "h5"),
            table_row_hover_style: match self.get("table_row_hover_style") {
                Ok(OptionValue::Style(style)) => style.clone(),
                _ => None,
            },
            fail_colors: ColorPair {
                fg: color("fail_message_fg_color", "white"),
                bg: color("fail_message_bg_color", "red"),
            },
            pass_colors: ColorPair {
                fg: color("pass_message_fg_color", "black"),
                bg: color("pass_message_bg_color", "green"),
            },
            custom_sink: self.custom_sink(),
            print_to_stdout: self.print_to_stdout(),
        }
    }

    /// Restores every option to its default.
    pub fn reset_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.current = entry.default.clone();
        }
    }

    /// Restores the named options to their defaults, leaving the rest alone.
    pub fn reset_subset<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        for name in names {
            let name = normalize(name.as_ref());
            if !self.entries.contains_key(name) {
                return Err(self.unknown(name));
            }
        }
        for name in names {
            if let Some(entry) = self.entries.get_mut(normalize(name.as_ref())) {
                entry.current = entry.default.clone();
            }
        }
        Ok(())
    }

    /// Restores the formatting options, keeping the mode flags and output routing.
    pub fn reset_format(&mut self) {
        for (name, entry) in self.entries.iter_mut() {
            if MODE_OPTIONS.contains(&name.as_str()) || OUTPUT_OPTIONS.contains(&name.as_str()) {
                continue;
            }
            entry.current = entry.default.clone();
        }
    }

    /// Sets several options. Either every value is applied or none is.
    pub fn set_format<I, K>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, OptionValue)>,
        K: AsRef<str>,
    {
        let mut staged = self.clone();
        for (name, value) in pairs {
            staged.set(name.as_ref(), value)?;
        }
        *self = staged;
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        Mode::new(self.checks_enabled(), self.asserts_enabled())
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.set("enable_checks", mode.enable_checks)?;
        self.set("enable_asserts", mode.enable_asserts)
    }

    /// Turns checks on, with assertions on or off.
    pub fn enable_checks(&mut self, enable_asserts: bool) -> Result<()> {
        self.set_mode(Mode::new(true, enable_asserts))
    }

    /// Turns checks off, with assertions on or off.
    pub fn disable_checks(&mut self, enable_asserts: bool) -> Result<()> {
        self.set_mode(Mode::new(false, enable_asserts))
    }

    /// Installs a sink and chooses whether output still reaches the display.
    pub fn set_custom_sink(&mut self, sink: Option<OutputSink>, print_to_stdout: bool) -> Result<()> {
        self.set("custom_sink", OptionValue::Sink(sink))?;
        self.set("print_to_stdout", print_to_stdout)
    }

    /// Lists every option with its default and current value.
    pub fn describe_all(&self) -> Vec<OptionDescription> {
        self.entries
            .iter()
            .map(|(name, entry)| OptionDescription {
                name: format!("{OPTION_PREFIX}{name}"),
                default: entry.default.to_string(),
                current: entry.current.to_string(),
                description: entry.description.clone(),
            })
            .collect()
    }

    /// Applies `TERM_CHECK_<NAME>` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(std::env::vars())
    }

    /// Applies overrides from `(variable, value)` pairs.
    ///
    /// Only bool, integer and text options can be overridden this way.
    /// Variables that don't name an option are ignored. If any value is
    /// invalid, none are applied.
    pub fn apply_env_from<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut staged = self.clone();
        for (key, raw) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let name = name.to_lowercase();
            let Some(entry) = staged.entries.get(&name) else {
                continue;
            };
            let value = match &entry.default {
                OptionValue::Bool(_) => match raw.trim().to_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => OptionValue::Bool(true),
                    "0" | "false" | "no" | "off" => OptionValue::Bool(false),
                    _ => return Err(CheckError::invalid_option(&name, format!("'{raw}' is not a boolean"))),
                },
                OptionValue::Int(_) => raw
                    .trim()
                    .parse::<i64>()
                    .map(OptionValue::Int)
                    .map_err(|e| CheckError::invalid_option(&name, e.to_string()))?,
                OptionValue::Text(_) => OptionValue::Text(raw.trim().to_string()),
                OptionValue::Style(_) | OptionValue::Sink(_) => continue,
            };
            tracing::info!(option.name = %name, env.var = %key, "Applying option override from environment");
            staged.set(&name, value)?;
        }
        *self = staged;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, entry) in &self.entries {
            map.entry(name, &entry.current);
        }
        map.finish()
    }
}

static GLOBAL: Lazy<SharedSettings> = Lazy::new(|| {
    let mut settings = Settings::new();
    if let Err(e) = settings.apply_env() {
        tracing::warn!(error = %e, "Ignoring invalid option override from environment");
    }
    settings.shared()
});

/// The process-wide settings registry.
pub fn global() -> SharedSettings {
    Arc::clone(&GLOBAL)
}

fn with_global<T>(f: impl FnOnce(&mut Settings) -> Result<T>) -> Result<T> {
    let mut settings = GLOBAL.write()?;
    f(&mut settings)
}

fn read_global<T>(f: impl FnOnce(&Settings) -> T) -> Result<T> {
    let settings = GLOBAL.read()?;
    Ok(f(&settings))
}

/// Registers an option in the global registry.
pub fn register_option(
    name: &str,
    default: impl Into<OptionValue>,
    description: impl Into<String>,
    validator: Validator,
) -> Result<()> {
    with_global(|s| s.register(name, default, description, validator))
}

pub fn set_option(name: &str, value: impl Into<OptionValue>) -> Result<()> {
    with_global(|s| s.set(name, value))
}

pub fn get_option(name: &str) -> Result<OptionValue> {
    read_global(|s| s.get(name).cloned())?
}

pub fn reset_all() -> Result<()> {
    with_global(|s| {
        s.reset_all();
        Ok(())
    })
}

pub fn reset_subset<S: AsRef<str>>(names: &[S]) -> Result<()> {
    with_global(|s| s.reset_subset(names))
}

pub fn reset_format() -> Result<()> {
    with_global(|s| {
        s.reset_format();
        Ok(())
    })
}

pub fn set_format<I, K>(pairs: I) -> Result<()>
where
    I: IntoIterator<Item = (K, OptionValue)>,
    K: AsRef<str>,
{
    with_global(|s| s.set_format(pairs))
}

pub fn get_mode() -> Result<Mode> {
    read_global(Settings::mode)
}

pub fn set_mode(enable_checks: bool, enable_asserts: bool) -> Result<()> {
    with_global(|s| s.set_mode(Mode::new(enable_checks, enable_asserts)))
}

pub fn enable_checks(enable_asserts: bool) -> Result<()> {
    with_global(|s| s.enable_checks(enable_asserts))
}

pub fn disable_checks(enable_asserts: bool) -> Result<()> {
    with_global(|s| s.disable_checks(enable_asserts))
}

pub fn set_custom_sink(sink: Option<OutputSink>, print_to_stdout: bool) -> Result<()> {
    with_global(|s| s.set_custom_sink(sink, print_to_stdout))
}

pub fn describe_all() -> Result<Vec<OptionDescription>> {
    read_global(Settings::describe_all)
}

/// Prints every global option in human-readable form.
pub fn describe_options() -> Result<()> {
    use crate::formatters::{HumanFormatter, OptionsFormatter};
    let text = HumanFormatter::new().format(&describe_all()?)?;
    println!("{text}");
    Ok(())
}
