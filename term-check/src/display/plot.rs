//! SVG figures for the `hist` and `plot` checks.
//!
//! A [`Figure`] is an explicit value built from the data; nothing depends on
//! a globally active plot. Rich displays embed it as a base64 image, other
//! displays skip it.

use super::text::escape_html;
use crate::data::Data;
use crate::error::{CheckError, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use base64::Engine;
use std::fmt::Write;

const PANEL_WIDTH: f32 = 320.0;
const PANEL_HEIGHT: f32 = 220.0;
const MARGIN: f32 = 36.0;
const TITLE_HEIGHT: f32 = 28.0;
const PALETTE: [&str; 6] = ["#2986cc", "#e06666", "#6aa84f", "#f1c232", "#8e7cc3", "#76a5af"];

/// How a panel draws its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotKind {
    #[default]
    Line,
    Scatter,
    Bar,
}

/// Options for [`Figure::plot`].
#[derive(Debug, Clone, Default)]
pub struct PlotOptions {
    pub kind: PlotKind,
    /// Column used for the x axis; row position when unset.
    pub x: Option<String>,
    /// Columns to draw; every numeric column except `x` when empty.
    pub y: Vec<String>,
    pub title: Option<String>,
}

impl PlotOptions {
    pub fn kind(mut self, kind: PlotKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn x(mut self, column: impl Into<String>) -> Self {
        self.x = Some(column.into());
        self
    }

    pub fn y(mut self, column: impl Into<String>) -> Self {
        self.y.push(column.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Panel {
    Histogram {
        title: String,
        edges: Vec<f64>,
        counts: Vec<u64>,
    },
    Series {
        title: String,
        kind: PlotKind,
        lines: Vec<(String, Vec<(f64, f64)>)>,
    },
}

/// A grid of chart panels that renders to SVG.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    title: Option<String>,
    panels: Vec<Panel>,
}

/// Values of a numeric column as floats, or `None` for other types.
fn numeric_values(values: &ArrayRef) -> Result<Option<Vec<Option<f64>>>> {
    if !values.data_type().is_numeric() {
        return Ok(None);
    }
    let floats = cast(values.as_ref(), &DataType::Float64)?;
    Ok(Some(floats.as_primitive::<Float64Type>().iter().collect()))
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Equal-width bin edges and counts over the finite values.
pub fn histogram(values: &[Option<f64>], bins: usize) -> (Vec<f64>, Vec<u64>) {
    let bins = bins.max(1);
    let (lo, hi) = match bounds(values.iter().flatten().copied()) {
        Some((lo, hi)) if lo < hi => (lo, hi),
        Some((v, _)) => (v - 0.5, v + 0.5),
        None => (0.0, 1.0),
    };
    let width = (hi - lo) / bins as f64;
    let edges = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0u64; bins];
    for v in values.iter().flatten().filter(|v| v.is_finite()) {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    (edges, counts)
}

impl Figure {
    pub fn new() -> Self {
        Self {
            title: None,
            panels: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn num_panels(&self) -> usize {
        self.panels.len()
    }

    /// One histogram panel per numeric column.
    pub fn histogram(data: &Data, bins: usize) -> Result<Self> {
        let mut figure = Figure::new();
        for (name, values) in data.columns() {
            if let Some(values) = numeric_values(&values)? {
                let (edges, counts) = histogram(&values, bins);
                figure.panels.push(Panel::Histogram {
                    title: name,
                    edges,
                    counts,
                });
            }
        }
        if figure.panels.is_empty() {
            return Err(CheckError::type_mismatch(
                "at least one numeric column",
                data.dtypes()
                    .iter()
                    .map(|(_, t)| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ));
        }
        Ok(figure)
    }

    /// A single panel drawing the chosen columns against `x`.
    pub fn plot(data: &Data, options: &PlotOptions) -> Result<Self> {
        let xs: Option<Vec<Option<f64>>> = match &options.x {
            Some(column) => Some(numeric_values(&data.column(column)?.values)?.ok_or_else(
                || CheckError::type_mismatch("numeric x column", column.clone()),
            )?),
            None => None,
        };

        let mut lines = Vec::new();
        for (name, values) in data.columns() {
            let wanted = if options.y.is_empty() {
                options.x.as_deref() != Some(name.as_str())
            } else {
                options.y.contains(&name)
            };
            if !wanted {
                continue;
            }
            let Some(ys) = numeric_values(&values)? else {
                if options.y.contains(&name) {
                    return Err(CheckError::type_mismatch("numeric column", name));
                }
                continue;
            };
            let points: Vec<(f64, f64)> = ys
                .iter()
                .enumerate()
                .filter_map(|(i, y)| {
                    let x = match &xs {
                        Some(xs) => xs.get(i).copied().flatten()?,
                        None => i as f64,
                    };
                    Some((x, (*y)?))
                })
                .collect();
            lines.push((name, points));
        }
        if lines.is_empty() {
            return Err(CheckError::type_mismatch(
                "at least one numeric column",
                data.kind_name(),
            ));
        }

        let mut figure = Figure::new();
        figure.title = options.title.clone();
        figure.panels.push(Panel::Series {
            title: String::new(),
            kind: options.kind,
            lines,
        });
        Ok(figure)
    }

    fn grid(&self) -> (usize, usize) {
        let n = self.panels.len().max(1);
        let cols = (n as f64).sqrt().ceil() as usize;
        let rows = n.div_ceil(cols);
        (cols, rows)
    }

    /// Renders the figure as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let (cols, rows) = self.grid();
        let header = if self.title.is_some() { TITLE_HEIGHT } else { 0.0 };
        let width = cols as f32 * PANEL_WIDTH;
        let height = rows as f32 * PANEL_HEIGHT + header;

        let mut svg = String::new();
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" font-family=\"sans-serif\" font-size=\"11\">"
        );
        let _ = write!(svg, "<rect width=\"{width}\" height=\"{height}\" fill=\"#ffffff\"/>");
        if let Some(title) = &self.title {
            let _ = write!(
                svg,
                "<text x=\"{}\" y=\"18\" text-anchor=\"middle\" font-size=\"14\">{}</text>",
                width / 2.0,
                escape_html(title)
            );
        }
        for (i, panel) in self.panels.iter().enumerate() {
            let x0 = (i % cols) as f32 * PANEL_WIDTH;
            let y0 = (i / cols) as f32 * PANEL_HEIGHT + header;
            panel.render(&mut svg, x0, y0);
        }
        svg.push_str("</svg>");
        svg
    }

    /// `data:` URI embedding the SVG as base64.
    pub fn to_data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(self.to_svg());
        format!("data:image/svg+xml;base64,{encoded}")
    }
}

impl Default for Figure {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps data coordinates into a panel's plotting area.
struct Frame {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    x: (f64, f64),
    y: (f64, f64),
}

impl Frame {
    fn new(x0: f32, y0: f32, x: (f64, f64), y: (f64, f64)) -> Self {
        let widen = |(lo, hi): (f64, f64)| if lo < hi { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
        Self {
            left: x0 + MARGIN,
            top: y0 + TITLE_HEIGHT,
            width: PANEL_WIDTH - MARGIN * 1.5,
            height: PANEL_HEIGHT - TITLE_HEIGHT - MARGIN,
            x: widen(x),
            y: widen(y),
        }
    }

    fn px(&self, x: f64) -> f32 {
        self.left + ((x - self.x.0) / (self.x.1 - self.x.0)) as f32 * self.width
    }

    fn py(&self, y: f64) -> f32 {
        self.top + self.height - ((y - self.y.0) / (self.y.1 - self.y.0)) as f32 * self.height
    }

    fn axes(&self, svg: &mut String) {
        let bottom = self.top + self.height;
        let _ = write!(
            svg,
            "<path d=\"M{l} {t} L{l} {b} L{r} {b}\" fill=\"none\" stroke=\"#555555\"/>",
            l = self.left,
            t = self.top,
            b = bottom,
            r = self.left + self.width
        );
        let label = |v: f64| format!("{v:.2}");
        let _ = write!(
            svg,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"start\">{}</text><text x=\"{}\" y=\"{}\" text-anchor=\"end\">{}</text>",
            self.left,
            bottom + 14.0,
            label(self.x.0),
            self.left + self.width,
            bottom + 14.0,
            label(self.x.1)
        );
        let _ = write!(
            svg,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"end\">{}</text><text x=\"{}\" y=\"{}\" text-anchor=\"end\">{}</text>",
            self.left - 4.0,
            bottom,
            label(self.y.0),
            self.left - 4.0,
            self.top + 8.0,
            label(self.y.1)
        );
    }
}

impl Panel {
    fn render(&self, svg: &mut String, x0: f32, y0: f32) {
        match self {
            Panel::Histogram {
                title,
                edges,
                counts,
            } => {
                let first = edges.first().copied().unwrap_or(0.0);
                let last = edges.last().copied().unwrap_or(1.0);
                let peak = counts.iter().copied().max().unwrap_or(0) as f64;
                let frame = Frame::new(x0, y0, (first, last), (0.0, peak.max(1.0)));
                panel_title(svg, x0, y0, title);
                for (i, count) in counts.iter().enumerate() {
                    let left = frame.px(edges[i]);
                    let right = frame.px(edges[i + 1]);
                    let top = frame.py(*count as f64);
                    let _ = write!(
                        svg,
                        "<rect x=\"{left}\" y=\"{top}\" width=\"{}\" height=\"{}\" fill=\"{}\" stroke=\"#ffffff\"/>",
                        (right - left).max(0.0),
                        (frame.py(0.0) - top).max(0.0),
                        PALETTE[0]
                    );
                }
                frame.axes(svg);
            }
            Panel::Series { title, kind, lines } => {
                let all = || lines.iter().flat_map(|(_, points)| points.iter());
                let x = bounds(all().map(|p| p.0)).unwrap_or((0.0, 1.0));
                let y = bounds(all().map(|p| p.1)).unwrap_or((0.0, 1.0));
                let y = if *kind == PlotKind::Bar {
                    (y.0.min(0.0), y.1.max(0.0))
                } else {
                    y
                };
                let frame = Frame::new(x0, y0, x, y);
                panel_title(svg, x0, y0, title);

                for (i, (name, points)) in lines.iter().enumerate() {
                    let color = PALETTE[i % PALETTE.len()];
                    match kind {
                        PlotKind::Line => {
                            let coords: Vec<String> = points
                                .iter()
                                .map(|(x, y)| format!("{},{}", frame.px(*x), frame.py(*y)))
                                .collect();
                            let _ = write!(
                                svg,
                                "<polyline points=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"1.5\"/>",
                                coords.join(" ")
                            );
                        }
                        PlotKind::Scatter => {
                            for (x, y) in points {
                                let _ = write!(
                                    svg,
                                    "<circle cx=\"{}\" cy=\"{}\" r=\"2.5\" fill=\"{color}\"/>",
                                    frame.px(*x),
                                    frame.py(*y)
                                );
                            }
                        }
                        PlotKind::Bar => {
                            let slot = frame.width / points.len().max(1) as f32;
                            let bar = slot / lines.len() as f32;
                            let zero = frame.py(0.0);
                            for (j, (_, y)) in points.iter().enumerate() {
                                let top = frame.py(*y).min(zero);
                                let _ = write!(
                                    svg,
                                    "<rect x=\"{}\" y=\"{top}\" width=\"{}\" height=\"{}\" fill=\"{color}\"/>",
                                    frame.left + slot * j as f32 + bar * i as f32,
                                    bar * 0.9,
                                    (frame.py(*y) - zero).abs()
                                );
                            }
                        }
                    }
                    let _ = write!(
                        svg,
                        "<text x=\"{}\" y=\"{}\" fill=\"{color}\">{}</text>",
                        frame.left + frame.width - 60.0,
                        frame.top + 12.0 * (i as f32 + 1.0),
                        escape_html(name)
                    );
                }
                frame.axes(svg);
            }
        }
    }
}

fn panel_title(svg: &mut String, x0: f32, y0: f32, title: &str) {
    if title.is_empty() {
        return;
    }
    let _ = write!(
        svg,
        "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"12\">{}</text>",
        x0 + PANEL_WIDTH / 2.0,
        y0 + 18.0,
        escape_html(title)
    );
}
