use std::ops::Range;
use std::path::Path;
use std::process::Command;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use slog::{info, warn, Logger};

use crate::{
    colors::{adjust_lightness, to_rgb8, DARKEN},
    datatypes::{AeroResult, Airfoil, Method},
    error::PolarError,
    format::{eng_string, format_g, log_tick_label, log_ticks},
};

const FIGURE_SIZE: (u32, u32) = (800, 500);
const TITLE: &str = "Comparison of CL-CD Polar for NeuralFoil vs. XFoil";
const FOOTNOTE: &str = "Note the log-scale on CD, which is unconventional - it's the only way to keep it readable given the wide range.";
const CURVE_ALPHA: f64 = 0.7;

const LEGEND_TITLE: &str = "Analysis Method";
const LEGEND_GLYPH: i32 = 24;
const LEGEND_GAP: i32 = 6;
const LEGEND_COLUMN_GAP: i32 = 18;
const LEGEND_ROW: i32 = 18;
const LEGEND_PAD: i32 = 6;

// Inset box in pixels. The shape area keeps the 1.1 x 0.33 data window at
// equal aspect.
const INSET_WIDTH: i32 = 240;
const INSET_HEIGHT: i32 = 72;
const INSET_LABEL: i32 = 18;
const INSET_TOP: i32 = 70;
const INSET_RIGHT: i32 = 24;
const INSET_X: (f64, f64) = (-0.05, 1.05);
const INSET_Y: (f64, f64) = (-0.05, 0.28);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    /// Dash length and gap in pixels; `None` for a continuous line
    pub fn dash(&self) -> Option<(u32, u32)> {
        match self {
            LineStyle::Solid => None,
            LineStyle::Dashed => Some((8, 4)),
            LineStyle::Dotted => Some((2, 3)),
        }
    }
}

/// One polar on the figure
#[derive(Debug, Clone)]
pub struct Curve {
    pub re: f64,
    pub method: Method,
    pub style: LineStyle,
    pub color: [f64; 3],
    pub result: AeroResult,
}

impl Curve {
    /// (CD, CL) pairs that can be placed on a log CD axis
    fn plottable(&self) -> Vec<(f64, f64)> {
        self.result
            .polar()
            .into_iter()
            .filter(|(cd, cl)| cd.is_finite() && *cd > 0.0 && cl.is_finite())
            .collect()
    }

    /// Where the " Re = ..." label goes: the last point of the polar, unless
    /// it cannot sit on a log CD axis
    fn annotation_anchor(&self) -> Option<(f64, f64)> {
        self.result
            .last_point()
            .filter(|(cd, cl)| cd.is_finite() && *cd > 0.0 && cl.is_finite())
    }
}

/// Pixel spans `(start, end)` of the dashes making up a legend glyph
fn glyph_segments(style: LineStyle, length: i32) -> Vec<(i32, i32)> {
    match style.dash() {
        None => vec![(0, length)],
        Some((size, spacing)) => {
            let (size, period) = (size as i32, (size + spacing) as usize);
            (0..length)
                .step_by(period)
                .map(|start| (start, (start + size).min(length)))
                .collect()
        }
    }
}

/// Accumulates curves during the sweep and draws them once it is done
pub struct PolarFigure {
    airfoil: Airfoil,
    y_min: f64,
    curves: Vec<Curve>,
}

impl PolarFigure {
    pub fn new(airfoil: Airfoil, y_min: f64) -> PolarFigure {
        PolarFigure {
            airfoil,
            y_min,
            curves: Vec::new(),
        }
    }

    pub fn add_curve(&mut self, curve: Curve) {
        self.curves.push(curve);
    }

    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    /// Drag axis limits, padded so the end points sit inside the frame
    pub fn cd_bounds(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for (cd, _) in self.curves.iter().flat_map(|c| c.plottable()) {
            lo = lo.min(cd);
            hi = hi.max(cd);
        }
        if !lo.is_finite() {
            return (1e-3, 1e-1);
        }
        (lo / 1.15, hi * 1.15)
    }

    /// Lift axis limits. The lower bound is fixed, the upper follows the data.
    pub fn cl_bounds(&self) -> (f64, f64) {
        let max = self
            .curves
            .iter()
            .flat_map(|c| c.plottable())
            .map(|(_, cl)| cl)
            .fold(f64::NEG_INFINITY, f64::max);

        if !max.is_finite() || max <= self.y_min {
            return (self.y_min, self.y_min + 1.0);
        }
        (self.y_min, max + 0.05 * (max - self.y_min))
    }

    /// One legend row per line style, solid first
    fn legend_entries(&self) -> Vec<(String, LineStyle)> {
        let mut entries: Vec<(String, LineStyle)> = Vec::new();
        for style in [LineStyle::Solid, LineStyle::Dashed, LineStyle::Dotted] {
            if let Some(curve) = self.curves.iter().find(|c| c.style == style) {
                entries.push((curve.method.label(), style));
            }
        }
        entries
    }

    /// Writes the figure to `path` as SVG
    pub fn render(&self, path: &Path) -> Result<(), PolarError> {
        self.draw(path).map_err(|err| {
            PolarError::Renderer(format!("Unable to draw {}: {err}", path.display()))
        })
    }

    fn draw(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let body = root.titled(TITLE, ("sans-serif", 20))?;

        let (x_lo, x_hi) = self.cd_bounds();
        let (y_lo, y_hi) = self.cl_bounds();

        let mut chart = ChartBuilder::on(&body)
            .caption(
                format!("On {} Airfoil (out-of-sample)", self.airfoil.name),
                ("sans-serif", 14),
            )
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(
                (x_lo..x_hi)
                    .log_scale()
                    .with_key_points(log_ticks(x_lo, x_hi)),
                y_lo..y_hi,
            )?;

        chart
            .configure_mesh()
            .x_desc("Drag Coefficient CD")
            .y_desc("Lift Coefficient CL")
            .x_label_formatter(&|cd| log_tick_label(*cd))
            .y_label_formatter(&|cl| format_g(*cl, 2))
            .bold_line_style(BLACK.mix(0.15).stroke_width(1))
            .light_line_style(BLACK.mix(0.05).stroke_width(1))
            .draw()?;

        for curve in &self.curves {
            let points = curve.plottable();
            let stroke = rgb(curve.color).mix(CURVE_ALPHA).stroke_width(2);
            match curve.style.dash() {
                None => chart.draw_series(LineSeries::new(points, stroke))?,
                Some((size, spacing)) => chart.draw_series(DashedLineSeries::new(
                    points.into_iter(),
                    size,
                    spacing,
                    stroke,
                ))?,
            };
        }

        for curve in self.curves.iter().filter(|c| c.method == Method::Reference) {
            let Some(end) = curve.annotation_anchor() else {
                continue;
            };
            let color = rgb(adjust_lightness(curve.color, DARKEN));
            chart.draw_series(std::iter::once(Text::new(
                format!(" Re = {}", eng_string(curve.re)),
                end,
                ("sans-serif", 12).into_font().color(&color),
            )))?;
        }

        self.draw_legend(&root, chart.plotting_area().get_pixel_range())?;
        self.draw_inset(&root)?;

        root.draw_text(
            FOOTNOTE,
            &("sans-serif", 11).into_font().color(&BLACK.mix(0.6)),
            (8, FIGURE_SIZE.1 as i32 - 16),
        )?;

        root.present()?;
        Ok(())
    }

    /// Legend entries side by side under a centered title, anchored to the
    /// lower left corner of the plotting area
    fn draw_legend(
        &self,
        root: &DrawingArea<SVGBackend, Shift>,
        plot: (Range<i32>, Range<i32>),
    ) -> Result<(), Box<dyn std::error::Error>> {
        let entries = self.legend_entries();
        if entries.is_empty() {
            return Ok(());
        }

        let font = ("sans-serif", 12).into_font();
        let text = font.color(&BLACK);

        let mut widths = Vec::with_capacity(entries.len());
        for (label, _) in &entries {
            let (w, _) = root.estimate_text_size(label, &text)?;
            widths.push(LEGEND_GLYPH + LEGEND_GAP + w as i32);
        }
        let row: i32 = widths.iter().sum::<i32>() + LEGEND_COLUMN_GAP * (widths.len() as i32 - 1);
        let (title_width, _) = root.estimate_text_size(LEGEND_TITLE, &text)?;

        let width = row.max(title_width as i32) + 2 * LEGEND_PAD;
        let height = 2 * LEGEND_ROW + 2 * LEGEND_PAD;
        let left = plot.0.start + 10;
        let top = plot.1.end - 10 - height;
        let frame = [(left, top), (left + width, top + height)];

        root.draw(&Rectangle::new(frame, WHITE.mix(0.85).filled()))?;
        root.draw(&Rectangle::new(frame, BLACK.mix(0.3).stroke_width(1)))?;
        root.draw_text(
            LEGEND_TITLE,
            &text,
            (left + (width - title_width as i32) / 2, top + LEGEND_PAD),
        )?;

        let y_text = top + LEGEND_PAD + LEGEND_ROW;
        let y_line = y_text + 7;
        let mut x = left + LEGEND_PAD;
        for ((label, style), w) in std::iter::zip(&entries, widths) {
            for (a, b) in glyph_segments(*style, LEGEND_GLYPH) {
                root.draw(&PathElement::new(
                    vec![(x + a, y_line), (x + b, y_line)],
                    BLACK.stroke_width(2),
                ))?;
            }
            root.draw_text(label, &text, (x + LEGEND_GLYPH + LEGEND_GAP, y_text))?;
            x += w + LEGEND_COLUMN_GAP;
        }

        Ok(())
    }

    /// Airfoil silhouette in the upper right corner
    fn draw_inset(
        &self,
        root: &DrawingArea<SVGBackend, Shift>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (width, height) = (FIGURE_SIZE.0 as i32, FIGURE_SIZE.1 as i32);
        let left = width - INSET_RIGHT - INSET_WIDTH;
        let bottom = height - INSET_TOP - INSET_LABEL - INSET_HEIGHT;
        let inset = root.margin(INSET_TOP, bottom, left, INSET_RIGHT);
        let (label_area, shape_area) = inset.split_vertically(INSET_LABEL);

        label_area.titled(
            &format!("{} Airfoil", self.airfoil.name),
            ("sans-serif", 12),
        )?;
        shape_area.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&shape_area)
            .build_cartesian_2d(INSET_X.0..INSET_X.1, INSET_Y.0..INSET_Y.1)?;

        let outline: Vec<(f64, f64)> = self
            .airfoil
            .vertices
            .iter()
            .map(|v| (v.x, v.y))
            .collect();
        let mut closed = outline.clone();
        if let Some(first) = outline.first() {
            closed.push(*first);
        }

        chart.draw_series(std::iter::once(Polygon::new(
            outline,
            BLACK.mix(0.2).filled(),
        )))?;
        chart.draw_series(LineSeries::new(closed, BLACK.stroke_width(1)))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(INSET_X.0, INSET_Y.0), (INSET_X.1, INSET_Y.1)],
            BLACK.mix(0.4).stroke_width(1),
        )))?;

        Ok(())
    }
}

fn rgb(color: [f64; 3]) -> RGBColor {
    let [r, g, b] = to_rgb8(color);
    RGBColor(r, g, b)
}

/// Opens `path` in the platform's default viewer. The figure is already on
/// disk, so a missing viewer is only a warning.
pub fn show(path: &Path, logger: &Logger) {
    let mut command = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };

    match command.arg(path).spawn() {
        Ok(_) => info!(logger, "opened figure"; "path" => %path.display()),
        Err(err) => warn!(logger, "unable to open a viewer";
            "path" => %path.display(), "error" => %err),
    }
}
