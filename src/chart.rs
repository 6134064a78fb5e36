//! Latency history charts
//!
//! [`ChartLayout::compute`] does all the geometry in abstract units and has no
//! idea what will draw it. [`render_canvas`] rasterises a layout onto a
//! character grid for the terminal, and [`sparkline`] squeezes a history into
//! a single row for table cells.

use colored::Colorize;
use serde::Serialize;

/// Inset between the cell rect and the plot rect, on every side
pub const PLOT_INSET: f64 = 4.0;
/// Plots narrower or shorter than this are not drawn
pub const MIN_PLOT_SIDE: f64 = 10.0;
/// Ranges below this are treated as flat
pub const FLAT_RANGE_EPSILON: f64 = 0.01;
pub const FLAT_RANGE: f64 = 1.0;
/// Fraction of the range added above the max and below the min
pub const RANGE_PADDING: f64 = 0.1;
pub const POINT_RADIUS: f64 = 3.0;
pub const LATEST_POINT_RADIUS: f64 = 4.0;

pub const LINE_COLOR: Rgba = Rgba(30, 144, 255, 255);
pub const LATEST_COLOR: Rgba = Rgba(255, 69, 0, 255);
pub const MAX_LABEL_COLOR: Rgba = Rgba(220, 20, 60, 255);
pub const MIN_LABEL_COLOR: Rgba = Rgba(0, 100, 0, 255);
pub const MIDLINE_COLOR: Rgba = Rgba(200, 200, 200, 255);
/// Semi-transparent white behind labels
pub const PLATE_COLOR: Rgba = Rgba(255, 255, 255, 200);

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned rectangle; y grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Last whole row inside the rectangle, one unit above `bottom()`
    pub fn bottom_row(&self) -> f64 {
        self.bottom() - 1.0
    }

    /// Shrink by `d` on each side
    pub fn inset(&self, d: f64) -> Self {
        Self::new(self.x + d, self.y + d, self.width - 2.0 * d, self.height - 2.0 * d)
    }
}

/// Padded value range used for the y axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Text measurements used to size annotation plates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelMetrics {
    pub char_width: f64,
    pub line_height: f64,
    /// Distance of the text from the plot's left edge
    pub offset_x: f64,
    /// Distance of the text from the plot's top or bottom edge
    pub offset_y: f64,
    /// Plate padding: this much left and above, twice this right and below
    pub pad_x: f64,
    pub pad_y: f64,
}

impl LabelMetrics {
    /// Small font on a pixel surface
    pub fn pixels() -> Self {
        Self {
            char_width: 6.0,
            line_height: 11.0,
            offset_x: 2.0,
            offset_y: 1.0,
            pad_x: 2.0,
            pad_y: 1.0,
        }
    }

    /// One character per cell
    pub fn cells() -> Self {
        Self {
            char_width: 1.0,
            line_height: 1.0,
            offset_x: 1.0,
            offset_y: 0.0,
            pad_x: 0.0,
            pad_y: 0.0,
        }
    }

    fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.char_width
    }
}

/// A min or max label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub text: String,
    /// Top-left corner of the text
    pub anchor: Point,
    pub plate: Rect,
    pub plate_color: Rgba,
    pub color: Rgba,
}

/// Geometry of one history chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLayout {
    pub bounds: Rect,
    pub plot: Rect,
    pub range: ValueRange,
    pub midline_y: f64,
    pub points: Vec<Point>,
    pub point_radius: f64,
    pub latest_radius: f64,
    pub max_label: Annotation,
    pub min_label: Annotation,
}

/// Min and max of `samples`, padded by 10% of their spread.
///
/// A spread under 0.01 is widened to 1.0 first so flat histories still get
/// a usable axis.
pub fn scaled_range(samples: &[f64]) -> Option<ValueRange> {
    let (min, max) = min_max(samples)?;
    let mut range = max - min;
    if range < FLAT_RANGE_EPSILON {
        range = FLAT_RANGE;
    }
    Some(ValueRange {
        min: min - range * RANGE_PADDING,
        max: max + range * RANGE_PADDING,
    })
}

fn min_max(samples: &[f64]) -> Option<(f64, f64)> {
    let first = *samples.first()?;
    Some(samples.iter().fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))))
}

impl ChartLayout {
    /// Lay out `samples` inside `rect`. Nothing is drawn (`None`) for an
    /// empty history or a plot area under the minimum side.
    pub fn compute(samples: &[f64], rect: Rect, metrics: &LabelMetrics) -> Option<Self> {
        let plot = rect.inset(PLOT_INSET);
        if plot.width < MIN_PLOT_SIDE || plot.height < MIN_PLOT_SIDE {
            return None;
        }
        let range = scaled_range(samples)?;
        let (orig_min, orig_max) = min_max(samples)?;

        let divisor = samples.len().saturating_sub(1).max(1) as f64;
        let points = samples
            .iter()
            .enumerate()
            .map(|(i, &v)| Point {
                x: plot.left() + i as f64 / divisor * plot.width,
                y: plot.bottom() - (v - range.min) / range.span() * plot.height,
            })
            .collect();

        let max_text = format!("max:{:.1}", orig_max);
        let max_anchor = Point {
            x: plot.left() + metrics.offset_x,
            y: plot.top() + metrics.offset_y,
        };
        let min_text = format!("min:{:.1}", orig_min);
        let min_anchor = Point {
            x: plot.left() + metrics.offset_x,
            y: plot.bottom_row() - metrics.line_height - metrics.offset_y,
        };

        Some(Self {
            bounds: rect,
            plot,
            range,
            midline_y: plot.top() + (plot.height / 2.0).floor(),
            points,
            point_radius: POINT_RADIUS,
            latest_radius: LATEST_POINT_RADIUS,
            max_label: annotation(max_text, max_anchor, metrics, MAX_LABEL_COLOR),
            min_label: annotation(min_text, min_anchor, metrics, MIN_LABEL_COLOR),
        })
    }

    pub fn latest(&self) -> Option<Point> {
        self.points.last().copied()
    }
}

fn annotation(text: String, anchor: Point, metrics: &LabelMetrics, color: Rgba) -> Annotation {
    let plate = Rect::new(
        anchor.x - metrics.pad_x,
        anchor.y - metrics.pad_y,
        metrics.text_width(&text) + 3.0 * metrics.pad_x,
        metrics.line_height + 3.0 * metrics.pad_y,
    );
    Annotation {
        text,
        anchor,
        plate,
        plate_color: PLATE_COLOR,
        color,
    }
}

#[derive(Clone, Copy)]
struct Cell {
    ch: char,
    color: Option<Rgba>,
}

struct Canvas {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell { ch: ' ', color: None }; width * height],
        }
    }

    fn put(&mut self, x: f64, y: f64, ch: char, color: Option<Rgba>) {
        if x < 0.0 || y < 0.0 {
            return;
        }
        let (col, row) = (x.round() as usize, y.round() as usize);
        if col < self.width && row < self.height {
            self.cells[row * self.width + col] = Cell { ch, color };
        }
    }

    fn line(&mut self, from: Point, to: Point, ch: char, color: Rgba) {
        let steps = (to.x - from.x).abs().max((to.y - from.y).abs()).ceil().max(1.0) as usize;
        for s in 0..=steps {
            let t = s as f64 / steps as f64;
            self.put(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t, ch, Some(color));
        }
    }

    fn into_lines(self, use_color: bool) -> Vec<String> {
        self.cells
            .chunks(self.width.max(1))
            .take(self.height)
            .map(|row| {
                row.iter()
                    .map(|cell| match (use_color, cell.color) {
                        (true, Some(Rgba(r, g, b, _))) => cell.ch.to_string().truecolor(r, g, b).to_string(),
                        _ => cell.ch.to_string(),
                    })
                    .collect()
            })
            .collect()
    }
}

/// Draw a layout on a character grid, one unit per cell.
///
/// Layers, bottom to top: dashed midline, polyline, point markers, latest
/// marker, label plates and text.
pub fn render_canvas(layout: &ChartLayout, use_color: bool) -> Vec<String> {
    let width = layout.bounds.right().ceil().max(0.0) as usize;
    let height = layout.bounds.bottom().ceil().max(0.0) as usize;
    let mut canvas = Canvas::new(width, height);

    let mut x = layout.plot.left();
    while x <= layout.plot.right() {
        canvas.put(x, layout.midline_y, '-', Some(MIDLINE_COLOR));
        x += 2.0;
    }

    for pair in layout.points.windows(2) {
        canvas.line(pair[0], pair[1], '·', LINE_COLOR);
    }
    for point in &layout.points {
        canvas.put(point.x, point.y, 'o', Some(LINE_COLOR));
    }
    if let Some(latest) = layout.latest() {
        canvas.put(latest.x, latest.y, '@', Some(LATEST_COLOR));
    }

    for label in [&layout.max_label, &layout.min_label] {
        let plate = label.plate;
        let mut row = plate.top();
        while row < plate.bottom() {
            let mut col = plate.left();
            while col < plate.right() {
                canvas.put(col, row, ' ', None);
                col += 1.0;
            }
            row += 1.0;
        }
        for (i, ch) in label.text.chars().enumerate() {
            canvas.put(label.anchor.x + i as f64, label.anchor.y, ch, Some(label.color));
        }
    }

    canvas.into_lines(use_color)
}

/// One-row block rendering of a history, one character per sample
pub fn sparkline(samples: &[f64]) -> String {
    let Some(range) = scaled_range(samples) else {
        return String::new();
    };
    let top = (SPARK_LEVELS.len() - 1) as f64;
    samples
        .iter()
        .map(|&v| {
            let level = ((v - range.min) / range.span() * top).round().clamp(0.0, top) as usize;
            SPARK_LEVELS[level]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_scaled_range_pads_ten_percent() {
        let range = scaled_range(&[5.0, 15.0]).unwrap();
        assert!((range.min - 4.0).abs() < EPS);
        assert!((range.max - 16.0).abs() < EPS);
    }

    #[test]
    fn test_scaled_range_flat_history() {
        let range = scaled_range(&[7.0, 7.0]).unwrap();
        assert!((range.min - 6.9).abs() < EPS);
        assert!((range.max - 7.1).abs() < EPS);
        assert!(range.span() > 0.0);
    }

    #[test]
    fn test_scaled_range_empty() {
        assert_eq!(scaled_range(&[]), None);
    }

    #[test]
    fn test_layout_rejects_small_plot() {
        let metrics = LabelMetrics::cells();
        assert!(ChartLayout::compute(&[1.0, 2.0], Rect::new(0.0, 0.0, 17.0, 40.0), &metrics).is_none());
        assert!(ChartLayout::compute(&[1.0, 2.0], Rect::new(0.0, 0.0, 40.0, 17.0), &metrics).is_none());
        assert!(ChartLayout::compute(&[1.0, 2.0], Rect::new(0.0, 0.0, 18.0, 18.0), &metrics).is_some());
        assert!(ChartLayout::compute(&[], Rect::new(0.0, 0.0, 60.0, 20.0), &metrics).is_none());
    }

    #[test]
    fn test_layout_point_positions() {
        let rect = Rect::new(0.0, 0.0, 108.0, 58.0);
        let layout = ChartLayout::compute(&[5.0, 10.0, 15.0], rect, &LabelMetrics::pixels()).unwrap();

        assert_eq!(layout.plot, Rect::new(4.0, 4.0, 100.0, 50.0));
        assert_eq!(layout.points.len(), 3);
        assert!((layout.points[0].x - 4.0).abs() < EPS);
        assert!((layout.points[1].x - 54.0).abs() < EPS);
        assert!((layout.points[2].x - 104.0).abs() < EPS);

        // range is [4, 16]; 5 sits 1/12 of the way up
        assert!((layout.points[0].y - (54.0 - 50.0 / 12.0)).abs() < EPS);
        assert!((layout.points[2].y - (54.0 - 50.0 * 11.0 / 12.0)).abs() < EPS);
        assert_eq!(layout.midline_y, 29.0);
        assert_eq!(layout.latest(), Some(layout.points[2]));
    }

    #[test]
    fn test_single_sample_sits_on_left_edge() {
        let layout = ChartLayout::compute(&[3.0], Rect::new(0.0, 0.0, 30.0, 30.0), &LabelMetrics::cells()).unwrap();
        assert_eq!(layout.points[0].x, layout.plot.left());
    }

    #[test]
    fn test_annotations() {
        let rect = Rect::new(0.0, 0.0, 108.0, 58.0);
        let layout = ChartLayout::compute(&[5.0, 15.04], rect, &LabelMetrics::pixels()).unwrap();

        assert_eq!(layout.max_label.text, "max:15.0");
        assert_eq!(layout.min_label.text, "min:5.0");
        assert_eq!(layout.max_label.anchor, Point { x: 6.0, y: 5.0 });
        // text ends one row above the plot's last row
        assert_eq!(layout.min_label.anchor, Point { x: 6.0, y: 41.0 });
        assert_eq!(
            layout.min_label.anchor.y + LabelMetrics::pixels().line_height,
            layout.plot.bottom_row() - 1.0
        );
        assert_eq!(layout.max_label.plate_color, Rgba(255, 255, 255, 200));
        assert_eq!(layout.max_label.color, MAX_LABEL_COLOR);
        assert_eq!(layout.min_label.color, MIN_LABEL_COLOR);
        assert_eq!(layout.point_radius, 3.0);
        assert_eq!(layout.latest_radius, 4.0);
    }

    #[test]
    fn test_render_canvas_plain() {
        let rect = Rect::new(0.0, 0.0, 40.0, 20.0);
        let layout = ChartLayout::compute(&[10.0, 30.0, 20.0], rect, &LabelMetrics::cells()).unwrap();
        let lines = render_canvas(&layout, false);

        assert_eq!(lines.len(), 20);
        assert!(lines.iter().all(|l| l.chars().count() == 40));
        let text = lines.join("\n");
        assert!(text.contains("max:30.0"));
        assert!(text.contains("min:10.0"));
        assert!(text.contains('@'));
        assert!(text.contains('-'));
    }

    #[test]
    fn test_sparkline() {
        assert_eq!(sparkline(&[]), "");
        let line = sparkline(&[1.0, 5.0, 9.0]);
        assert_eq!(line.chars().count(), 3);
        let chars: Vec<char> = line.chars().collect();
        assert!(chars[0] < chars[1] && chars[1] < chars[2]);
        let flat: Vec<char> = sparkline(&[4.0, 4.0]).chars().collect();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0], flat[1]);
    }
}
