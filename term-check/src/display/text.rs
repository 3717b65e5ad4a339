//! Text helpers shared by the plain and rich renderers.

use colored::{Color, Colorize};
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

/// Emoji glyphs plus the joiners, variation selectors and modifiers that
/// travel with them. U+2630..U+2637 (trigrams such as "☰") are included
/// because check names use them as icons.
static EMOJI: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"[\p{Extended_Pictographic}\u{1F3FB}-\u{1F3FF}\u{1F1E6}-\u{1F1FF}\u{200D}\u{FE0E}\u{FE0F}\u{20E3}\u{2630}-\u{2637}]",
    )
    .ok()
});

/// Removes emojis and trims the result.
pub fn strip_emojis(text: &str) -> String {
    match EMOJI.as_ref() {
        Some(re) => re.replace_all(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Strips emojis when they are disabled; otherwise returns `text` unchanged.
pub fn filter_emojis(text: &str, use_emojis: bool) -> String {
    if use_emojis {
        text.to_string()
    } else {
        strip_emojis(text)
    }
}

/// Normalizes a background color to the terminal `on_` form.
///
/// `"red"` and `"on_red"` both become `"on_red"`.
pub fn format_background_color(color: Option<&str>) -> Option<String> {
    color.map(|c| {
        if c.starts_with("on_") {
            c.to_string()
        } else {
            format!("on_{c}")
        }
    })
}

/// Drops the terminal `on_` prefix for use in CSS.
pub fn html_color(color: &str) -> &str {
    color.strip_prefix("on_").unwrap_or(color)
}

fn parse_color(name: &str) -> Option<Color> {
    let name = html_color(name);
    if let Some(hex) = name.strip_prefix('#') {
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return Some(Color::TrueColor {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        });
    }
    Color::from_str(&name.replace('_', " ")).ok()
}

/// Applies terminal colors. Unknown color names leave the text unstyled.
pub fn colorize(text: &str, fg: Option<&str>, bg: Option<&str>) -> String {
    if fg.is_none() && bg.is_none() {
        return text.to_string();
    }
    let mut styled = text.normal();
    if let Some(color) = fg.and_then(parse_color) {
        styled = styled.color(color);
    }
    if let Some(color) = format_background_color(bg).as_deref().and_then(parse_color) {
        styled = styled.on_color(color);
    }
    styled.to_string()
}

/// Inline CSS for a color pair, `None` when neither color is set.
pub fn css_colors(fg: Option<&str>, bg: Option<&str>) -> Option<String> {
    let mut props = Vec::new();
    if let Some(fg) = fg {
        props.push(format!("color:{}", html_color(fg)));
    }
    if let Some(bg) = bg {
        props.push(format!("background-color:{}", html_color(bg)));
    }
    (!props.is_empty()).then(|| props.join("; "))
}

/// Wraps `text` in a span carrying the given colors.
pub fn span(text: &str, fg: Option<&str>, bg: Option<&str>) -> String {
    match css_colors(fg, bg) {
        Some(style) => format!("<span style='{style}'>{text}</span>"),
        None => format!("<span>{text}</span>"),
    }
}

/// Renders a colored lead-in followed by a colon, for rich output.
pub fn lead_in_html(lead_in: &str, fg: Option<&str>, bg: Option<&str>) -> String {
    format!("{}:", span(&escape_html(lead_in.trim()), fg, bg))
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Prefixes every line of `text` with `indent` spaces.
pub fn indent_lines(text: &str, indent: usize) -> String {
    if indent == 0 {
        return text.to_string();
    }
    let pad = " ".repeat(indent);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_emojis() {
        assert_eq!(strip_emojis("☰ Rows: 150"), "Rows: 150");
        assert_eq!(strip_emojis("🏛️ Columns"), "Columns");
        assert_eq!(strip_emojis("👯‍♂️ Duplicated rows"), "Duplicated rows");
        assert_eq!(strip_emojis("⏱️ Time elapsed"), "Time elapsed");
        assert_eq!(strip_emojis(" ✔️ Assert passed "), "Assert passed");
        assert_eq!(strip_emojis("ㄨ Assert failed"), "ㄨ Assert failed");
        assert_eq!(strip_emojis("plain text"), "plain text");
    }

    #[test]
    fn test_filter_respects_setting() {
        assert_eq!(filter_emojis("📐 Shape", true), "📐 Shape");
        assert_eq!(filter_emojis("📐 Shape", false), "Shape");
    }

    #[test]
    fn test_format_background_color() {
        assert_eq!(format_background_color(Some("red")).as_deref(), Some("on_red"));
        assert_eq!(
            format_background_color(Some("on_green")).as_deref(),
            Some("on_green")
        );
        assert_eq!(format_background_color(None), None);
        assert_eq!(html_color("on_green"), "green");
    }

    #[test]
    fn test_lead_in_html() {
        assert_eq!(
            lead_in_html("Hello", Some("red"), Some("green")),
            "<span style='color:red; background-color:green'>Hello</span>:"
        );
        assert_eq!(
            lead_in_html(" Hi ", None, Some("on_yellow")),
            "<span style='background-color:yellow'>Hi</span>:"
        );
    }

    #[test]
    fn test_colorize_without_colors_is_identity() {
        assert_eq!(colorize("Rows: 5", None, None), "Rows: 5");
    }

    #[test]
    fn test_colorize_forced() {
        colored::control::set_override(true);
        let styled = colorize("fail", Some("white"), Some("red"));
        colored::control::unset_override();
        assert!(styled.contains("fail"));
        assert!(styled.starts_with("\x1b["));
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("red"), Some(Color::Red));
        assert_eq!(parse_color("on_green"), Some(Color::Green));
        assert_eq!(parse_color("bright_blue"), Some(Color::BrightBlue));
        assert_eq!(
            parse_color("#2986cc"),
            Some(Color::TrueColor {
                r: 0x29,
                g: 0x86,
                b: 0xcc
            })
        );
        assert_eq!(parse_color("#12"), None);
    }

    #[test]
    fn test_indent_lines() {
        assert_eq!(indent_lines("a\n\nb", 2), "  a\n\n  b");
        assert_eq!(indent_lines("a", 0), "a");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<class 'x'>"), "&lt;class &#39;x&#39;&gt;");
    }
}
