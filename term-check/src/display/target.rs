//! Destinations for rendered check output.

use crate::error::{CheckError, Result};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Which kind of output a target can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// HTML tables, styled text and inline images (notebook front ends).
    Rich,
    /// Plain text with optional ANSI colors.
    Plain,
    /// Nothing reaches the screen. A custom sink still receives text.
    Silent,
}

impl DisplayMode {
    /// Reads `TERM_CHECK_DISPLAY` (`rich`, `plain` or `silent`), defaulting to plain.
    pub fn from_env() -> Self {
        std::env::var("TERM_CHECK_DISPLAY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DisplayMode::Plain)
    }
}

impl std::str::FromStr for DisplayMode {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rich" | "html" | "notebook" => Ok(DisplayMode::Rich),
            "plain" | "text" | "terminal" => Ok(DisplayMode::Plain),
            "silent" | "null" | "none" => Ok(DisplayMode::Silent),
            other => Err(CheckError::invalid_option(
                "display",
                format!("unknown display mode '{other}'"),
            )),
        }
    }
}

/// Where rendered output is written.
///
/// Targets are chosen explicitly when a context is built; nothing inspects the
/// runtime environment.
pub trait DisplayTarget: Send {
    fn mode(&self) -> DisplayMode;

    /// Writes one line of text.
    fn print(&mut self, text: &str) -> Result<()>;

    /// Shows a fragment of HTML. Only rich targets support this.
    fn display_html(&mut self, _html: &str) -> Result<()> {
        Err(CheckError::NotSupported(
            "HTML output on a plain-text display".to_string(),
        ))
    }

    /// Whether ANSI colors should be applied to printed text.
    fn supports_color(&self) -> bool {
        false
    }
}

/// Terminal output.
pub struct PlainTextDisplay<W: Write + Send = io::Stdout> {
    writer: W,
    colors: bool,
}

impl PlainTextDisplay<io::Stdout> {
    /// Prints to standard output with colors enabled.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> PlainTextDisplay<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            colors: true,
        }
    }

    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }
}

impl<W: Write + Send> DisplayTarget for PlainTextDisplay<W> {
    fn mode(&self) -> DisplayMode {
        DisplayMode::Plain
    }

    fn print(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{text}")?;
        Ok(())
    }

    fn supports_color(&self) -> bool {
        self.colors
    }
}

/// Notebook output using the `EVCXR_BEGIN_CONTENT` protocol understood by
/// Jupyter kernels for Rust. Plain lines are printed as-is.
pub struct RichDisplay<W: Write + Send = io::Stdout> {
    writer: W,
}

impl RichDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> RichDisplay<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> DisplayTarget for RichDisplay<W> {
    fn mode(&self) -> DisplayMode {
        DisplayMode::Rich
    }

    fn print(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{text}")?;
        Ok(())
    }

    fn display_html(&mut self, html: &str) -> Result<()> {
        writeln!(self.writer, "EVCXR_BEGIN_CONTENT text/html\n{html}\nEVCXR_END_CONTENT")?;
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplayTarget for NullDisplay {
    fn mode(&self) -> DisplayMode {
        DisplayMode::Silent
    }

    fn print(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn display_html(&mut self, _html: &str) -> Result<()> {
        Ok(())
    }
}

/// An in-memory writer whose contents can be read back, for capturing output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        self.bytes
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut b) = self.bytes.lock() {
            b.clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().map(|b| b.is_empty()).unwrap_or(true)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds the target for a mode, writing to standard output.
pub fn target_for(mode: DisplayMode) -> Box<dyn DisplayTarget> {
    match mode {
        DisplayMode::Rich => Box::new(RichDisplay::stdout()),
        DisplayMode::Plain => Box::new(PlainTextDisplay::stdout()),
        DisplayMode::Silent => Box::new(NullDisplay),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("rich".parse::<DisplayMode>().unwrap(), DisplayMode::Rich);
        assert_eq!(" Plain ".parse::<DisplayMode>().unwrap(), DisplayMode::Plain);
        assert_eq!("null".parse::<DisplayMode>().unwrap(), DisplayMode::Silent);
        assert!("fancy".parse::<DisplayMode>().is_err());
    }

    #[test]
    fn test_plain_display_writes_lines() {
        let buffer = SharedBuffer::new();
        let mut display = PlainTextDisplay::new(buffer.clone());
        display.print("hello").unwrap();
        display.print("").unwrap();
        assert_eq!(buffer.contents(), "hello\n\n");
        assert!(display.display_html("<b>x</b>").is_err());
    }

    #[test]
    fn test_rich_display_wraps_html() {
        let buffer = SharedBuffer::new();
        let mut display = RichDisplay::new(buffer.clone());
        display.display_html("<b>x</b>").unwrap();
        assert_eq!(
            buffer.contents(),
            "EVCXR_BEGIN_CONTENT text/html\n<b>x</b>\nEVCXR_END_CONTENT\n"
        );
    }

    #[test]
    fn test_null_display() {
        let mut display = NullDisplay;
        display.print("ignored").unwrap();
        display.display_html("ignored").unwrap();
        assert_eq!(display.mode(), DisplayMode::Silent);
    }
}
