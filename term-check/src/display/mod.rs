//! Rendering of check results.
//!
//! The [`Renderer`] turns a [`CheckValue`] into output on an injected
//! [`DisplayTarget`] and forwards a plain-text copy to the configured output
//! sink. Which target is used is decided when the context is built:
//!
//! - [`RichDisplay`]: HTML lines, styled tables and inline SVG figures.
//! - [`PlainTextDisplay`]: ANSI colored lines and box-drawn tables. Figures
//!   are skipped entirely.
//! - [`NullDisplay`]: nothing is shown, the sink still receives text.
//!
//! With `print_to_stdout` off the target is bypassed and only the sink sees
//! output.

pub mod plot;
pub mod table;
pub mod target;
pub mod text;

pub use plot::{Figure, PlotKind, PlotOptions};
pub use table::TextTable;
pub use target::{
    target_for, DisplayMode, DisplayTarget, NullDisplay, PlainTextDisplay, RichDisplay,
    SharedBuffer,
};

use crate::error::Result;
use crate::options::{ColorPair, Format, SharedSettings};
use crate::value::CheckValue;
use arrow::record_batch::RecordBatch;
use std::sync::Mutex;
use tracing::{debug, trace};

/// Lead-in shown before warnings such as "no nulls found".
pub const WARNING_LEAD_IN: &str = "🩺 Check warning";

/// Foreground and background colors for a line's body and its lead-in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextColors {
    pub text: ColorPair,
    pub lead_in: ColorPair,
}

impl TextColors {
    /// Colors the body of the line only.
    pub fn text(colors: ColorPair) -> Self {
        Self {
            text: colors,
            lead_in: ColorPair::default(),
        }
    }

    /// Colors the lead-in only.
    pub fn lead_in(colors: ColorPair) -> Self {
        Self {
            text: ColorPair::default(),
            lead_in: colors,
        }
    }
}

/// Shows check results on a display target and forwards them to the sink.
pub struct Renderer {
    settings: SharedSettings,
    target: Mutex<Box<dyn DisplayTarget>>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new(settings: SharedSettings, target: impl DisplayTarget + 'static) -> Self {
        Self::from_boxed(settings, Box::new(target))
    }

    pub fn from_boxed(settings: SharedSettings, target: Box<dyn DisplayTarget>) -> Self {
        Self {
            settings,
            target: Mutex::new(target),
        }
    }

    /// The target's display mode. A poisoned target reports `Silent`.
    pub fn mode(&self) -> DisplayMode {
        self.target
            .lock()
            .map(|t| t.mode())
            .unwrap_or(DisplayMode::Silent)
    }

    fn format(&self) -> Result<Format> {
        Ok(self.settings.read()?.format())
    }

    /// Shows a check result under an optional name.
    ///
    /// Scalar-like values render as one `"{name}: {value}"` line. Tables and
    /// series render as tables titled `name`, figures as titled images.
    pub fn show(&self, value: &CheckValue, name: Option<&str>) -> Result<()> {
        trace!(value.kind = value.type_name(), name = ?name, "Rendering check result");
        match value {
            CheckValue::Table(batch) => self.show_table(batch, name),
            CheckValue::Series(series) => self.show_table(&series.to_table()?, name),
            CheckValue::Figure(figure) => self.show_plot(figure, name),
            scalar => {
                let line = match name {
                    Some(name) => format!("{name}: {scalar}"),
                    None => scalar.to_string(),
                };
                self.show_line(&line, None, &TextColors::default())
            }
        }
    }

    /// Shows one line of text, optionally preceded by `lead_in` and a colon.
    pub fn show_line(&self, text: &str, lead_in: Option<&str>, colors: &TextColors) -> Result<()> {
        let format = self.format()?;
        let tag = format.check_text_tag.clone();
        self.render_text(&format, text, &tag, lead_in, colors, true)
    }

    /// Shows a warning with the standard lead-in.
    pub fn warning(&self, message: &str) -> Result<()> {
        let colors = TextColors::lead_in(ColorPair::new("black", "yellow"));
        self.show_line(message, Some(WARNING_LEAD_IN), &colors)
    }

    fn render_text(
        &self,
        format: &Format,
        text: &str,
        tag: &str,
        lead_in: Option<&str>,
        colors: &TextColors,
        forward: bool,
    ) -> Result<()> {
        let text = text::filter_emojis(text, format.use_emojis);
        let lead_in = lead_in.map(|l| text::filter_emojis(l, format.use_emojis));

        if format.print_to_stdout {
            let mut target = self.target.lock()?;
            match target.mode() {
                DisplayMode::Rich => {
                    let body = text::span(
                        &text::escape_html(&text),
                        colors.text.fg.as_deref(),
                        colors.text.bg.as_deref(),
                    );
                    let html = match &lead_in {
                        Some(lead_in) => format!(
                            "<{tag}>{} {body}</{tag}>",
                            text::lead_in_html(
                                lead_in,
                                colors.lead_in.fg.as_deref(),
                                colors.lead_in.bg.as_deref()
                            )
                        ),
                        None => format!("<{tag}>{body}</{tag}>"),
                    };
                    target.display_html(&html)?;
                }
                DisplayMode::Plain => {
                    let use_color = target.supports_color();
                    let paint = |s: &str, pair: &ColorPair| {
                        if use_color {
                            text::colorize(s, pair.fg.as_deref(), pair.bg.as_deref())
                        } else {
                            s.to_string()
                        }
                    };
                    let line = match &lead_in {
                        Some(lead_in) => format!(
                            "{}: {}",
                            paint(lead_in, &colors.lead_in),
                            paint(&text, &colors.text)
                        ),
                        None => paint(&text, &colors.text),
                    };
                    target.print("")?;
                    target.print(&line)?;
                }
                DisplayMode::Silent => {}
            }
        }

        if forward {
            if let Some(sink) = &format.custom_sink {
                let plain = match &lead_in {
                    Some(lead_in) => format!("{lead_in}: {text}"),
                    None => text,
                };
                sink.emit(&plain);
            }
        }
        Ok(())
    }

    /// Shows a table titled `title`.
    ///
    /// Plain targets print the title and a box-drawn table, indented by
    /// `indent_table_terminal`. Rich targets show an HTML table captioned by
    /// the title. The sink receives the plain rendering either way.
    pub fn show_table(&self, batch: &RecordBatch, title: Option<&str>) -> Result<()> {
        let format = self.format()?;
        let table = TextTable::from_batch(batch, format.precision)?;
        let title = title.map(|t| text::filter_emojis(t, format.use_emojis));
        debug!(
            table.rows = batch.num_rows(),
            table.columns = batch.num_columns(),
            "Rendering table"
        );

        let plain = || -> Result<String> {
            let body = table.to_terminal(format.indent_table_terminal)?;
            Ok(match &title {
                Some(title) => format!("{title}\n{body}"),
                None => body,
            })
        };

        if format.print_to_stdout {
            let mut target = self.target.lock()?;
            match target.mode() {
                DisplayMode::Rich => {
                    let tag = &format.table_title_tag;
                    let caption = title
                        .as_ref()
                        .map(|t| format!("<{tag}>{}</{tag}>", text::escape_html(t)));
                    let html = table.to_html(caption.as_deref(), format.table_row_hover_style.as_ref());
                    target.display_html(&format!(
                        "<div style=\"margin-left: {}px\">{html}</div>",
                        format.indent_table_plot_rich
                    ))?;
                }
                DisplayMode::Plain => {
                    target.print("")?;
                    target.print(&plain()?)?;
                }
                DisplayMode::Silent => {}
            }
        }

        if let Some(sink) = &format.custom_sink {
            sink.emit(&plain()?);
        }
        Ok(())
    }

    /// Shows a figure on rich targets. Everywhere else this does nothing,
    /// not even the title, and images never reach the sink.
    pub fn show_plot(&self, figure: &Figure, title: Option<&str>) -> Result<()> {
        let format = self.format()?;
        if !format.print_to_stdout || self.mode() != DisplayMode::Rich {
            debug!("Skipping figure outside a rich display");
            return Ok(());
        }
        if let Some(title) = title {
            let tag = format.plot_title_tag.clone();
            self.render_text(&format, title, &tag, None, &TextColors::default(), false)?;
        }
        let html = format!(
            "<div style=\"display: flex; margin-left: {}px\"><img src=\"{}\"/></div>",
            format.indent_table_plot_rich,
            figure.to_data_uri()
        );
        self.target.lock()?.display_html(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Data;
    use crate::options::{OutputSink, Settings};
    use crate::test_fixtures;

    fn plain(settings: Settings) -> (Renderer, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let display = PlainTextDisplay::new(buffer.clone()).with_colors(false);
        (Renderer::new(settings.shared(), display), buffer)
    }

    fn rich(settings: Settings) -> (Renderer, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let display = RichDisplay::new(buffer.clone());
        (Renderer::new(settings.shared(), display), buffer)
    }

    #[test]
    fn test_scalar_line() {
        let (renderer, buffer) = plain(Settings::new());
        renderer
            .show(&CheckValue::from(150usize), Some("☰ Rows"))
            .unwrap();
        assert_eq!(buffer.contents(), "\n☰ Rows: 150\n");
    }

    #[test]
    fn test_scalar_without_name() {
        let (renderer, buffer) = plain(Settings::new());
        renderer.show(&CheckValue::from("hello"), None).unwrap();
        assert_eq!(buffer.contents(), "\nhello\n");
    }

    #[test]
    fn test_emojis_stripped_when_disabled() {
        let mut settings = Settings::new();
        settings.set("use_emojis", false).unwrap();
        let (renderer, buffer) = plain(settings);
        renderer
            .show(&CheckValue::from(150usize), Some("☰ Rows"))
            .unwrap();
        assert_eq!(buffer.contents(), "\nRows: 150\n");
    }

    #[test]
    fn test_sink_receives_plain_text() {
        let (sink, lines) = OutputSink::collector();
        let mut settings = Settings::new();
        settings.set_custom_sink(Some(sink), false).unwrap();
        let (renderer, buffer) = plain(settings);

        renderer.show(&CheckValue::from(5usize), Some("☰ Rows")).unwrap();
        renderer.warning("no nulls").unwrap();

        assert!(buffer.is_empty());
        assert_eq!(
            *lines.lock().unwrap(),
            vec!["☰ Rows: 5".to_string(), "🩺 Check warning: no nulls".to_string()]
        );
    }

    #[test]
    fn test_table_in_terminal() {
        let (renderer, buffer) = plain(Settings::new());
        renderer
            .show(&CheckValue::from(test_fixtures::small()), Some("⬆️ First 5 rows"))
            .unwrap();
        let out = buffer.contents();
        assert!(out.starts_with("\n⬆️ First 5 rows\n    +"));
        assert!(out.contains("| 10 | w |"));
    }

    #[test]
    fn test_series_renders_as_table() {
        let (renderer, buffer) = plain(Settings::new());
        let series = test_fixtures::series("x", vec![Some(1.0), None]);
        renderer.show(&CheckValue::Series(series), None).unwrap();
        let out = buffer.contents();
        assert!(out.contains("| x    |"));
        assert!(out.contains("| 1.00 |"));
    }

    #[test]
    fn test_rich_line_and_table() {
        let (renderer, buffer) = rich(Settings::new());
        renderer.show(&CheckValue::from(3usize), Some("Rows")).unwrap();
        assert!(buffer
            .contents()
            .contains("<h5><span>Rows: 3</span></h5>"));

        buffer.clear();
        renderer
            .show(&CheckValue::from(test_fixtures::small()), Some("Head"))
            .unwrap();
        let out = buffer.contents();
        assert!(out.contains("<div style=\"margin-left: 30px\">"));
        assert!(out.contains("<caption><h5>Head</h5></caption>"));
    }

    #[test]
    fn test_plot_is_noop_in_terminal() {
        let (sink, lines) = OutputSink::collector();
        let mut settings = Settings::new();
        settings.set_custom_sink(Some(sink), true).unwrap();
        let (renderer, buffer) = plain(settings);
        let figure = Figure::histogram(&Data::from(test_fixtures::iris()), 10).unwrap();

        renderer
            .show(&CheckValue::Figure(figure), Some("📏 Distributions"))
            .unwrap();
        assert!(buffer.is_empty());
        assert!(lines.lock().unwrap().is_empty());
    }

    #[test]
    fn test_plot_in_rich_display() {
        let (sink, lines) = OutputSink::collector();
        let mut settings = Settings::new();
        settings.set_custom_sink(Some(sink), true).unwrap();
        let (renderer, buffer) = rich(settings);
        let figure = Figure::histogram(&Data::from(test_fixtures::iris()), 10).unwrap();

        renderer.show_plot(&figure, Some("Distributions")).unwrap();
        let out = buffer.contents();
        assert!(out.contains("<h5><span>Distributions</span></h5>"));
        assert!(out.contains("<img src=\"data:image/svg+xml;base64,"));
        assert!(lines.lock().unwrap().is_empty());
    }

    #[test]
    fn test_silent_display_still_forwards() {
        let (sink, lines) = OutputSink::collector();
        let mut settings = Settings::new();
        settings.set_custom_sink(Some(sink), true).unwrap();
        let renderer = Renderer::new(settings.shared(), NullDisplay);
        renderer.show(&CheckValue::from(1i64), Some("n")).unwrap();
        assert_eq!(*lines.lock().unwrap(), vec!["n: 1".to_string()]);
    }
}
