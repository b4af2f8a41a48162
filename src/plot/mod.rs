//! Year-indexed line charts rendered to PNG.
//!
//! Two charts are drawn from a year summary: violations per year and total
//! penalties per year. Layout is fixed at 1200x600 with a zero-based y axis
//! stepped in 1/2/5 multiples.

pub mod canvas;
pub mod font;

use crate::aggregate::YearSummary;
use crate::output::{PENALTIES_CHART, VIOLATIONS_CHART};
use anyhow::Result;
use canvas::{Canvas, Rgb};
use std::path::{Path, PathBuf};
use tracing::info;

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 600;

const MARGIN_LEFT: i64 = 130;
const MARGIN_RIGHT: i64 = 40;
const MARGIN_TOP: i64 = 70;
const MARGIN_BOTTOM: i64 = 90;

const TITLE_SCALE: u32 = 3;
const LABEL_SCALE: u32 = 2;
const TICK_SCALE: u32 = 2;

/// How tick values are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    Count,
    Dollars,
}

#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub format: ValueFormat,
}

/// Optional inclusive bounds on the plotted years.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl YearWindow {
    pub fn contains(&self, year: i32) -> bool {
        self.min.is_none_or(|m| year >= m) && self.max.is_none_or(|m| year <= m)
    }
}

/// Step and upper bound for a zero-based value axis with roughly `target`
/// intervals. Steps are at least 1.
pub fn nice_axis(max: f64, target: u32) -> (f64, f64) {
    if max.is_nan() || max <= 0.0 {
        return (1.0, 1.0);
    }

    let raw = max / target.max(1) as f64;
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    let normalized = raw / magnitude;
    let step = [1.0, 2.0, 5.0, 10.0]
        .into_iter()
        .find(|m| *m >= normalized)
        .unwrap_or(10.0)
        * magnitude;
    let step = step.max(1.0);

    (step, (max / step).ceil() * step)
}

/// Domain and tick years for the x axis.
pub fn year_axis(first: i32, last: i32) -> ((i32, i32), Vec<i32>) {
    let (lo, hi) = if first == last {
        (first - 1, last + 1)
    } else {
        (first.min(last), first.max(last))
    };

    let span = hi - lo;
    let step = [1, 2, 5, 10, 20, 25, 50, 100]
        .into_iter()
        .find(|s| span / s <= 12)
        .unwrap_or(100);

    let ticks = (lo..=hi).filter(|y| y.rem_euclid(step) == 0).collect();
    ((lo, hi), ticks)
}

fn compact(value: f64) -> String {
    let (scaled, suffix) = if value.abs() >= 1_000_000.0 {
        (value / 1_000_000.0, "M")
    } else if value.abs() >= 1_000.0 {
        (value / 1_000.0, "K")
    } else {
        return format!("{:.0}", value);
    };

    let mut s = format!("{:.1}", scaled);
    if s.ends_with(".0") {
        s.truncate(s.len() - 2);
    }
    s + suffix
}

pub fn format_tick(value: f64, format: ValueFormat) -> String {
    match format {
        ValueFormat::Count => compact(value),
        ValueFormat::Dollars => format!("${}", compact(value)),
    }
}

/// Draws a single-series line chart with markers.
pub fn render_line_chart(spec: &ChartSpec, points: &[(i32, f64)]) -> Canvas {
    let mut c = Canvas::new(WIDTH, HEIGHT, Rgb::WHITE);

    let left = MARGIN_LEFT;
    let right = WIDTH as i64 - MARGIN_RIGHT;
    let top = MARGIN_TOP;
    let bottom = HEIGHT as i64 - MARGIN_BOTTOM;

    let first = points.first().map_or(0, |p| p.0);
    let last = points.last().map_or(0, |p| p.0);
    let ((x_lo, x_hi), x_ticks) = year_axis(first, last);

    let max = points.iter().map(|p| p.1).fold(0.0, f64::max);
    let (step, y_top) = nice_axis(max, 5);

    let px = |year: i32| -> i64 {
        left + ((year - x_lo) as f64 / (x_hi - x_lo) as f64 * (right - left) as f64).round() as i64
    };
    let py = |v: f64| -> i64 { bottom - (v / y_top * (bottom - top) as f64).round() as i64 };

    // Grid and tick labels.
    let tick_h = Canvas::line_height(TICK_SCALE);
    let mut v = 0.0;
    while v <= y_top + step / 2.0 {
        let y = py(v);
        c.dashed_hline(y, left, right, 6, 4, Rgb::LIGHT_GREY);
        c.text_right(left - 10, y - tick_h / 2, &format_tick(v, spec.format), TICK_SCALE, Rgb::DARK_GREY);
        v += step;
    }
    for year in &x_ticks {
        let x = px(*year);
        c.dashed_vline(x, top, bottom, 6, 4, Rgb::LIGHT_GREY);
        c.text_centered(x, bottom + 12, &year.to_string(), TICK_SCALE, Rgb::DARK_GREY);
    }

    // Axes.
    c.line((left, top), (left, bottom), 2, Rgb::DARK_GREY);
    c.line((left, bottom), (right, bottom), 2, Rgb::DARK_GREY);

    // Series.
    let pixels: Vec<(i64, i64)> = points.iter().map(|(yr, v)| (px(*yr), py(*v))).collect();
    for pair in pixels.windows(2) {
        c.line(pair[0], pair[1], 3, Rgb::ORANGE);
    }
    for (x, y) in &pixels {
        c.fill_circle(*x, *y, 5, Rgb::ORANGE);
    }

    // Title and axis labels.
    c.text_centered(WIDTH as i64 / 2, 22, &spec.title, TITLE_SCALE, Rgb::BLACK);
    c.text_centered(
        (left + right) / 2,
        HEIGHT as i64 - 40,
        &spec.x_label,
        LABEL_SCALE,
        Rgb::BLACK,
    );
    c.text_vertical(20, (top + bottom) / 2, &spec.y_label, LABEL_SCALE, Rgb::BLACK);

    c
}

pub fn violations_chart(rows: &[YearSummary]) -> Canvas {
    let spec = ChartSpec {
        title: "OSHA illumination-related violations per year".into(),
        x_label: "Year".into(),
        y_label: "Number of violations".into(),
        format: ValueFormat::Count,
    };
    let points: Vec<(i32, f64)> = rows
        .iter()
        .map(|r| (r.year, r.n_violations as f64))
        .collect();
    render_line_chart(&spec, &points)
}

pub fn penalties_chart(rows: &[YearSummary]) -> Canvas {
    let spec = ChartSpec {
        title: "Total OSHA penalties for lighting violations per year".into(),
        x_label: "Year".into(),
        y_label: "Total penalty (USD)".into(),
        format: ValueFormat::Dollars,
    };
    let points: Vec<(i32, f64)> = rows
        .iter()
        .map(|r| (r.year, r.total_penalty.as_f64()))
        .collect();
    render_line_chart(&spec, &points)
}

/// Renders both charts into `out_dir` and returns their paths.
pub fn render_year_charts(rows: &[YearSummary], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let charts = [
        (VIOLATIONS_CHART, violations_chart(rows)),
        (PENALTIES_CHART, penalties_chart(rows)),
    ];

    let mut written = Vec::new();
    for (name, canvas) in charts {
        let path = out_dir.join(name);
        canvas.save_png(&path)?;
        info!(path = %path.display(), "Saved figure");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Usd;

    #[test]
    fn test_nice_axis() {
        assert_eq!(nice_axis(0.0, 5), (1.0, 1.0));
        assert_eq!(nice_axis(3.0, 5), (1.0, 3.0));
        assert_eq!(nice_axis(47.0, 5), (10.0, 50.0));
        assert_eq!(nice_axis(230.0, 5), (50.0, 250.0));
        assert_eq!(nice_axis(1_234_567.0, 5), (500_000.0, 1_500_000.0));
    }

    #[test]
    fn test_year_axis() {
        let ((lo, hi), ticks) = year_axis(2019, 2019);
        assert_eq!((lo, hi), (2018, 2020));
        assert_eq!(ticks, vec![2018, 2019, 2020]);

        let ((lo, hi), ticks) = year_axis(1972, 2024);
        assert_eq!((lo, hi), (1972, 2024));
        assert_eq!(ticks, vec![1975, 1980, 1985, 1990, 1995, 2000, 2005, 2010, 2015, 2020]);
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(0.0, ValueFormat::Count), "0");
        assert_eq!(format_tick(250.0, ValueFormat::Count), "250");
        assert_eq!(format_tick(2_500.0, ValueFormat::Count), "2.5K");
        assert_eq!(format_tick(10_000.0, ValueFormat::Count), "10K");
        assert_eq!(format_tick(1_500_000.0, ValueFormat::Dollars), "$1.5M");
    }

    #[test]
    fn test_year_window() {
        let w = YearWindow {
            min: Some(2000),
            max: None,
        };
        assert!(!w.contains(1999));
        assert!(w.contains(2030));
        assert!(YearWindow::default().contains(1972));
    }

    #[test]
    fn test_chart_plots_series_in_orange() {
        let rows = vec![
            YearSummary {
                year: 2000,
                n_violations: 4,
                total_penalty: Usd::from_cents(100_000),
            },
            YearSummary {
                year: 2010,
                n_violations: 8,
                total_penalty: Usd::from_cents(300_000),
            },
        ];
        let c = violations_chart(&rows);
        assert_eq!((c.width(), c.height()), (WIDTH, HEIGHT));

        // Last point sits at the right edge, top of the axis (8 of 8).
        let x = WIDTH as i64 - MARGIN_RIGHT;
        assert_eq!(c.pixel(x, MARGIN_TOP), Some(Rgb::ORANGE));
    }
}
