//! Formatters for the settings registry's introspection output.
//!
//! [`Settings::describe_all`](crate::options::Settings::describe_all) returns
//! plain records; these formatters turn them into console text, JSON or a
//! Markdown table for documentation.
//!
//! # Examples
//!
//! ```rust
//! use term_check::formatters::{MarkdownFormatter, OptionsFormatter};
//! use term_check::options::Settings;
//!
//! let described = Settings::new().describe_all();
//! let markdown = MarkdownFormatter::new().format(&described).unwrap();
//! assert!(markdown.contains("| `check.precision` | 2 | 2 |"));
//! ```

use crate::error::Result;
use crate::options::OptionDescription;
use colored::Colorize;
use std::fmt::Write;

/// Configuration shared by the formatters.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include option descriptions
    pub include_descriptions: bool,
    /// Only list options whose current value differs from the default
    pub changed_only: bool,
    /// Whether to use colorized output (human formatter)
    pub use_colors: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_descriptions: true,
            changed_only: false,
            use_colors: true,
        }
    }
}

impl FormatterConfig {
    /// Names and values only, no colors.
    pub fn minimal() -> Self {
        Self {
            include_descriptions: false,
            changed_only: false,
            use_colors: false,
        }
    }

    pub fn with_descriptions(mut self, include: bool) -> Self {
        self.include_descriptions = include;
        self
    }

    pub fn with_changed_only(mut self, changed_only: bool) -> Self {
        self.changed_only = changed_only;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn select<'a>(&self, options: &'a [OptionDescription]) -> Vec<&'a OptionDescription> {
        options
            .iter()
            .filter(|o| !self.changed_only || o.current != o.default)
            .collect()
    }
}

/// Renders option descriptions into a string.
pub trait OptionsFormatter {
    fn format(&self, options: &[OptionDescription]) -> Result<String>;
}

/// Serializes descriptions as JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionsFormatter for JsonFormatter {
    fn format(&self, options: &[OptionDescription]) -> Result<String> {
        let mut selected = Vec::new();
        for option in self.config.select(options) {
            let mut value = serde_json::to_value(option)?;
            if !self.config.include_descriptions {
                if let Some(fields) = value.as_object_mut() {
                    fields.remove("description");
                }
            }
            selected.push(value);
        }

        let json = if self.pretty {
            serde_json::to_string_pretty(&selected)?
        } else {
            serde_json::to_string(&selected)?
        };
        Ok(json)
    }
}

/// Console listing, one block per option.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl OptionsFormatter for HumanFormatter {
    fn format(&self, options: &[OptionDescription]) -> Result<String> {
        let mut output = String::new();
        for option in self.config.select(options) {
            let name = if self.config.use_colors {
                option.name.bold().to_string()
            } else {
                option.name.clone()
            };
            let changed = option.current != option.default;
            let current = if self.config.use_colors && changed {
                option.current.yellow().to_string()
            } else {
                option.current.clone()
            };

            let _ = writeln!(output);
            let _ = writeln!(output, "{name}");
            if self.config.include_descriptions {
                let _ = writeln!(output, "    {}", option.description);
            }
            let _ = writeln!(
                output,
                "    [default: {}] [currently: {current}]",
                option.default
            );
        }
        Ok(output)
    }
}

/// Markdown table for documentation.
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl OptionsFormatter for MarkdownFormatter {
    fn format(&self, options: &[OptionDescription]) -> Result<String> {
        let mut output = String::new();
        if self.config.include_descriptions {
            let _ = writeln!(output, "| Option | Default | Current | Description |");
            let _ = writeln!(output, "|--------|---------|---------|-------------|");
        } else {
            let _ = writeln!(output, "| Option | Default | Current |");
            let _ = writeln!(output, "|--------|---------|---------|");
        }
        for o in self.config.select(options) {
            let default = o.default.replace('|', "\\|");
            let current = o.current.replace('|', "\\|");
            if self.config.include_descriptions {
                let _ = writeln!(
                    output,
                    "| `{}` | {default} | {current} | {} |",
                    o.name,
                    o.description.replace('|', "\\|")
                );
            } else {
                let _ = writeln!(output, "| `{}` | {default} | {current} |", o.name);
            }
        }
        Ok(output)
    }
}
