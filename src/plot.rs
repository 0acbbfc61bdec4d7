//! SVG rendering of the experiment fronts.
//!
//! Two figures are produced: a two-row grid with one scatter panel per
//! algorithm, and a single chart overlaying every front with a legend and the
//! design variables of the merged front written next to each point.

use crate::core::Solution;
use crate::experiment::ExperimentReport;

/// Horizontal axis label of every chart.
pub const AREA_LABEL: &str = "area (cm²)";
/// Vertical axis label of every chart.
pub const DEFLECTION_LABEL: &str = "deflection (cm)";
/// Title of the combined chart.
pub const COMBINED_TITLE: &str = "All algorithms";

const PANEL_WIDTH: f64 = 300.0;
const PANEL_HEIGHT: f64 = 240.0;
const COMBINED_WIDTH: f64 = 960.0;
const COMBINED_HEIGHT: f64 = 640.0;
const MARGIN_LEFT: f64 = 64.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 44.0;
const TICKS: usize = 5;

const PALETTE: [&str; 8] = [
    "#d62728", "#1f77b4", "#2ca02c", "#17becf", "#9467bd", "#000000", "#bcbd22", "#ff7f0e",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Dot,
    Cross,
    TriangleUp,
    Square,
    Plus,
    Diamond,
    TriangleDown,
}

const MARKERS: [Marker; 7] = [
    Marker::Dot,
    Marker::Cross,
    Marker::TriangleUp,
    Marker::Square,
    Marker::Plus,
    Marker::Diamond,
    Marker::TriangleDown,
];

/// Grid of per-algorithm scatter panels laid out on two rows.
///
/// # Examples
/// ```
/// use ibeam::plot::fronts_figure;
/// use ibeam::{AlgorithmSpec, Experiment, IBeamProblem, SerialEvaluator};
///
/// let mut evaluator = SerialEvaluator::new(IBeamProblem::new());
/// let report = Experiment::new(vec![AlgorithmSpec::nsga2("NSGAII", 20)])
///     .max_evaluations(100)
///     .seed(2)
///     .run(&mut evaluator)
///     .unwrap();
/// let svg = fronts_figure(&report);
/// assert!(svg.starts_with("<svg"));
/// assert!(svg.contains(">NSGAII</text>"));
/// ```
#[must_use]
pub fn fronts_figure(report: &ExperimentReport) -> String {
    let panels = report.algorithms.len().max(1);
    let rows = if panels > 1 { 2 } else { 1 };
    let columns = panels.div_ceil(rows);
    #[allow(clippy::cast_precision_loss)]
    let (width, height) = (PANEL_WIDTH * columns as f64, PANEL_HEIGHT * rows as f64);
    let mut svg = open_document(width, height);
    for (idx, result) in report.algorithms.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let (column, row) = ((idx % columns) as f64, (idx / columns) as f64);
        let points = objective_points(&result.front);
        let frame = Frame::new(
            column * PANEL_WIDTH + MARGIN_LEFT,
            row * PANEL_HEIGHT + MARGIN_TOP,
            PANEL_WIDTH - MARGIN_LEFT - MARGIN_RIGHT,
            PANEL_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM,
            Extent::covering(&points),
        );
        frame.draw_axes(&mut svg, result.name());
        if points.is_empty() {
            svg.push_str(&format!(
                "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"10\" text-anchor=\"middle\" \
                 fill=\"#777\">no feasible design</text>\n",
                frame.left + frame.width / 2.0,
                frame.top + frame.height / 2.0
            ));
        }
        for &(x, y) in &points {
            let (px, py) = frame.map(x, y);
            draw_marker(&mut svg, Marker::Dot, px, py, PALETTE[1]);
        }
    }
    close_document(svg)
}

/// Every front on one chart with a legend and annotated merged front.
///
/// # Examples
/// ```
/// use ibeam::plot::{combined_figure, COMBINED_TITLE};
/// use ibeam::{AlgorithmSpec, Experiment, IBeamProblem, SerialEvaluator};
///
/// let mut evaluator = SerialEvaluator::new(IBeamProblem::new());
/// let report = Experiment::new(vec![AlgorithmSpec::nsga2("NSGAII", 20)])
///     .max_evaluations(100)
///     .seed(2)
///     .run(&mut evaluator)
///     .unwrap();
/// let svg = combined_figure(&report);
/// assert!(svg.contains(COMBINED_TITLE));
/// assert!(svg.contains("x1="));
/// ```
#[must_use]
pub fn combined_figure(report: &ExperimentReport) -> String {
    let series: Vec<Vec<(f64, f64)>> = report
        .algorithms
        .iter()
        .map(|result| objective_points(&result.front))
        .collect();
    let everything: Vec<(f64, f64)> = series.iter().flatten().copied().collect();
    let mut svg = open_document(COMBINED_WIDTH, COMBINED_HEIGHT);
    let frame = Frame::new(
        MARGIN_LEFT + 16.0,
        MARGIN_TOP + 8.0,
        COMBINED_WIDTH - MARGIN_LEFT - MARGIN_RIGHT - 32.0,
        COMBINED_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM - 16.0,
        Extent::covering(&everything),
    );
    frame.draw_axes(&mut svg, COMBINED_TITLE);
    for (idx, points) in series.iter().enumerate() {
        let (color, marker) = style(idx);
        for &(x, y) in points {
            let (px, py) = frame.map(x, y);
            draw_marker(&mut svg, marker, px, py, color);
        }
    }
    for solution in &report.merged_front {
        if let [x, y, ..] = solution.objectives.as_slice() {
            let (px, py) = frame.map(*x, *y);
            svg.push_str(&format!(
                "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"8\" fill=\"#333\">{}</text>\n",
                px + 5.0,
                py - 5.0,
                escape(&design_label(&solution.variables))
            ));
        }
    }
    draw_legend(&mut svg, &frame, report);
    close_document(svg)
}

/// `x1=…, x2=…` label of a design, two decimals per variable.
///
/// # Examples
/// ```
/// use ibeam::plot::design_label;
/// assert_eq!(design_label(&[80.0, 50.0, 0.9, 2.345]), "x1=80.00, x2=50.00, x3=0.90, x4=2.35");
/// ```
#[must_use]
pub fn design_label(variables: &[f64]) -> String {
    variables
        .iter()
        .enumerate()
        .map(|(idx, value)| format!("x{}={value:.2}", idx + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

fn objective_points(front: &[Solution]) -> Vec<(f64, f64)> {
    front
        .iter()
        .filter_map(|solution| match solution.objectives.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .collect()
}

fn style(idx: usize) -> (&'static str, Marker) {
    (PALETTE[idx % PALETTE.len()], MARKERS[idx % MARKERS.len()])
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Extent {
    fn covering(points: &[(f64, f64)]) -> Self {
        let (x_min, x_max) = padded(points.iter().map(|p| p.0));
        let (y_min, y_max) = padded(points.iter().map(|p| p.1));
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }
}

fn padded(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (low, high) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), value| {
        (low.min(value), high.max(value))
    });
    if !low.is_finite() || !high.is_finite() {
        return (0.0, 1.0);
    }
    let span = high - low;
    if span <= f64::EPSILON * high.abs().max(1.0) {
        let pad = low.abs().max(1.0) * 0.05;
        return (low - pad, high + pad);
    }
    (low - span * 0.05, high + span * 0.05)
}

struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    extent: Extent,
}

impl Frame {
    fn new(left: f64, top: f64, width: f64, height: f64, extent: Extent) -> Self {
        Self {
            left,
            top,
            width,
            height,
            extent,
        }
    }

    fn map(&self, x: f64, y: f64) -> (f64, f64) {
        let e = &self.extent;
        let px = self.left + (x - e.x_min) / (e.x_max - e.x_min) * self.width;
        let py = self.top + self.height - (y - e.y_min) / (e.y_max - e.y_min) * self.height;
        (px, py)
    }

    fn draw_axes(&self, svg: &mut String, title: &str) {
        let bottom = self.top + self.height;
        let right = self.left + self.width;
        let e = self.extent;
        for tick in nice_ticks(e.x_min, e.x_max, TICKS) {
            let (px, _) = self.map(tick, e.y_min);
            svg.push_str(&format!(
                "<line x1=\"{px:.1}\" y1=\"{:.1}\" x2=\"{px:.1}\" y2=\"{bottom:.1}\" \
                 stroke=\"#ddd\"/>\n",
                self.top
            ));
            svg.push_str(&format!(
                "<text x=\"{px:.1}\" y=\"{:.1}\" font-size=\"9\" \
                 text-anchor=\"middle\">{}</text>\n",
                bottom + 12.0,
                format_tick(tick)
            ));
        }
        for tick in nice_ticks(e.y_min, e.y_max, TICKS) {
            let (_, py) = self.map(e.x_min, tick);
            svg.push_str(&format!(
                "<line x1=\"{:.1}\" y1=\"{py:.1}\" x2=\"{right:.1}\" y2=\"{py:.1}\" \
                 stroke=\"#ddd\"/>\n",
                self.left
            ));
            svg.push_str(&format!(
                "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"9\" text-anchor=\"end\">{}</text>\n",
                self.left - 4.0,
                py + 3.0,
                format_tick(tick)
            ));
        }
        svg.push_str(&format!(
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" \
             fill=\"none\" stroke=\"#000\"/>\n",
            self.left,
            self.top,
            self.width,
            self.height
        ));
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"middle\">{}</text>\n",
            self.left + self.width / 2.0,
            self.top - 8.0,
            escape(title)
        ));
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"10\" text-anchor=\"middle\">{}</text>\n",
            self.left + self.width / 2.0,
            bottom + 28.0,
            escape(AREA_LABEL)
        ));
        let label_x = self.left - 48.0;
        let label_y = self.top + self.height / 2.0;
        svg.push_str(&format!(
            "<text x=\"{label_x:.1}\" y=\"{label_y:.1}\" font-size=\"10\" \
             text-anchor=\"middle\" transform=\"rotate(-90 {label_x:.1} {label_y:.1})\">\
             {}</text>\n",
            escape(DEFLECTION_LABEL)
        ));
    }
}

fn draw_legend(svg: &mut String, frame: &Frame, report: &ExperimentReport) {
    let entries = report.algorithms.len();
    if entries == 0 {
        return;
    }
    let longest = report
        .algorithms
        .iter()
        .map(|result| result.name().chars().count())
        .max()
        .unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let (width, height) = (30.0 + longest as f64 * 6.5, 8.0 + entries as f64 * 14.0);
    let left = frame.left + frame.width - width - 6.0;
    let top = frame.top + 6.0;
    svg.push_str(&format!(
        "<rect x=\"{left:.1}\" y=\"{top:.1}\" width=\"{width:.1}\" height=\"{height:.1}\" \
         fill=\"#fff\" fill-opacity=\"0.85\" stroke=\"#999\"/>\n"
    ));
    for (idx, result) in report.algorithms.iter().enumerate() {
        let (color, marker) = style(idx);
        #[allow(clippy::cast_precision_loss)]
        let y = top + 11.0 + idx as f64 * 14.0;
        draw_marker(svg, marker, left + 12.0, y - 3.0, color);
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{y:.1}\" font-size=\"10\">{}</text>\n",
            left + 22.0,
            escape(result.name())
        ));
    }
}

fn draw_marker(svg: &mut String, marker: Marker, x: f64, y: f64, color: &str) {
    let r = 3.0;
    let element = match marker {
        Marker::Dot => format!("<circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"{r}\" fill=\"{color}\"/>"),
        Marker::Square => format!(
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{}\" height=\"{}\" fill=\"{color}\"/>",
            x - r,
            y - r,
            2.0 * r,
            2.0 * r
        ),
        Marker::Cross => format!(
            "<path d=\"M{:.1} {:.1}L{:.1} {:.1}M{:.1} {:.1}L{:.1} {:.1}\" \
             stroke=\"{color}\" stroke-width=\"1.5\"/>",
            x - r,
            y - r,
            x + r,
            y + r,
            x - r,
            y + r,
            x + r,
            y - r
        ),
        Marker::Plus => format!(
            "<path d=\"M{:.1} {y:.1}L{:.1} {y:.1}M{x:.1} {:.1}L{x:.1} {:.1}\" \
             stroke=\"{color}\" stroke-width=\"1.5\"/>",
            x - r,
            x + r,
            y - r,
            y + r
        ),
        Marker::TriangleUp => format!(
            "<polygon points=\"{x:.1},{:.1} {:.1},{:.1} {:.1},{:.1}\" fill=\"{color}\"/>",
            y - r,
            x - r,
            y + r,
            x + r,
            y + r
        ),
        Marker::TriangleDown => format!(
            "<polygon points=\"{x:.1},{:.1} {:.1},{:.1} {:.1},{:.1}\" fill=\"{color}\"/>",
            y + r,
            x - r,
            y - r,
            x + r,
            y - r
        ),
        Marker::Diamond => format!(
            "<polygon points=\"{x:.1},{:.1} {:.1},{y:.1} {x:.1},{:.1} {:.1},{y:.1}\" \
             fill=\"{color}\"/>",
            y - r,
            x + r,
            y + r,
            x - r
        ),
    };
    svg.push_str(&element);
    svg.push('\n');
}

/// Round tick positions covering `[min, max]`.
fn nice_ticks(min: f64, max: f64, count: usize) -> Vec<f64> {
    if !(min.is_finite() && max.is_finite()) || max <= min || count == 0 {
        return Vec::new();
    }
    #[allow(clippy::cast_precision_loss)]
    let raw = (max - min) / count as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|factor| factor * magnitude)
        .find(|step| *step >= raw)
        .unwrap_or(10.0 * magnitude);
    let mut tick = (min / step).ceil() * step;
    let mut ticks = Vec::new();
    while tick <= max + step * 1e-9 {
        ticks.push(if tick.abs() < step * 1e-9 { 0.0 } else { tick });
        tick += step;
    }
    ticks
}

fn format_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-3..1e5).contains(&magnitude) {
        format!("{value:.1e}")
    } else if magnitude >= 100.0 || value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let text = format!("{value:.3}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn open_document(width: f64, height: f64) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" \
         viewBox=\"0 0 {width:.0} {height:.0}\" font-family=\"sans-serif\">\n\
         <rect width=\"100%\" height=\"100%\" fill=\"#fff\"/>\n"
    )
}

fn close_document(mut svg: String) -> String {
    svg.push_str("</svg>\n");
    svg
}
