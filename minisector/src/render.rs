//! Track map rendering: the merged lap drawn as one path, each piece
//! coloured by the driver who owns that minisector.

use std::panic;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;

use crate::attribute::Attribution;
use crate::competitor::Competitor;
use crate::trace::MergedSample;

/// Two-step blue to green scale, indexed by `Competitor::ordinal() - 1`.
const PALETTE: [RGBColor; 2] = [RGBColor(0, 0, 255), RGBColor(0, 255, 128)];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("nothing to draw: need at least two samples, got {0}")]
    NotEnoughSamples(usize),
    #[error("plotting error: {0}")]
    Backend(String),
    #[error("plotting backend panicked")]
    Panicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub line_width: u32,
    /// Draw the title and the driver legend.
    pub annotate: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1800,
            height: 1000,
            line_width: 5,
            annotate: true,
        }
    }
}

pub fn winner_color(competitor: Competitor) -> RGBColor {
    PALETTE[usize::from(competitor.ordinal() - 1)]
}

pub fn render_png(
    attribution: &Attribution,
    title: &str,
    path: &Path,
    opts: &RenderOptions,
) -> Result<(), RenderError> {
    ensure_drawable(attribution)?;
    guard(|| {
        let root = BitMapBackend::new(path, (opts.width, opts.height)).into_drawing_area();
        draw_track(&root, attribution, title, opts).map_err(|e| RenderError::Backend(e.to_string()))
    })
}

pub fn render_svg(
    attribution: &Attribution,
    title: &str,
    opts: &RenderOptions,
) -> Result<String, RenderError> {
    ensure_drawable(attribution)?;
    guard(|| {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (opts.width, opts.height))
                .into_drawing_area();
            draw_track(&root, attribution, title, opts)
                .map_err(|e| RenderError::Backend(e.to_string()))?;
        }
        Ok(svg)
    })
}

fn ensure_drawable(attribution: &Attribution) -> Result<(), RenderError> {
    match attribution.samples.len() {
        n if n < 2 => Err(RenderError::NotEnoughSamples(n)),
        _ => Ok(()),
    }
}

fn guard<T>(render: impl FnOnce() -> Result<T, RenderError>) -> Result<T, RenderError> {
    panic::catch_unwind(panic::AssertUnwindSafe(render)).map_err(|_| RenderError::Panicked)?
}

/// Consecutive path pieces with the same owner, merged into polylines.
///
/// Piece `i -> i+1` takes the colour of sample `i`.
pub fn colored_runs(samples: &[MergedSample]) -> Vec<(Competitor, Vec<(f64, f64)>)> {
    let mut runs: Vec<(Competitor, Vec<(f64, f64)>)> = Vec::new();
    for pair in samples.windows(2) {
        let winner = pair[0].winner;
        let to = (pair[1].x, pair[1].y);
        let extends = matches!(runs.last(), Some((owner, _)) if *owner == winner);
        if extends {
            if let Some((_, points)) = runs.last_mut() {
                points.push(to);
            }
        } else {
            runs.push((winner, vec![(pair[0].x, pair[0].y), to]));
        }
    }
    runs
}

/// Axis ranges with the same scale on x and y for a `width` x `height` canvas.
fn equal_aspect_bounds(
    samples: &[MergedSample],
    width: u32,
    height: u32,
) -> ((f64, f64), (f64, f64)) {
    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for s in samples {
        min_x = min_x.min(s.x);
        max_x = max_x.max(s.x);
        min_y = min_y.min(s.y);
        max_y = max_y.max(s.y);
    }
    let mut span_x = (max_x - min_x).max(1.0) * 1.05;
    let mut span_y = (max_y - min_y).max(1.0) * 1.05;
    let aspect = f64::from(width.max(1)) / f64::from(height.max(1));
    if span_x / span_y > aspect {
        span_y = span_x / aspect;
    } else {
        span_x = span_y * aspect;
    }
    let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
    (
        (cx - span_x / 2.0, cx + span_x / 2.0),
        (cy - span_y / 2.0, cy + span_y / 2.0),
    )
}

fn draw_track<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    attribution: &Attribution,
    title: &str,
    opts: &RenderOptions,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let samples = &attribution.samples;
    root.fill(&WHITE)?;

    let ((x0, x1), (y0, y1)) = equal_aspect_bounds(samples, opts.width, opts.height);
    let mut builder = ChartBuilder::on(root);
    builder.margin(20);
    if opts.annotate {
        builder.caption(title, ("sans-serif", 32));
    }
    let mut chart = builder.build_cartesian_2d(x0..x1, y0..y1)?;

    for (winner, points) in colored_runs(samples) {
        let style = winner_color(winner).stroke_width(opts.line_width);
        chart.draw_series(std::iter::once(PathElement::new(points, style)))?;
    }

    if opts.annotate {
        for competitor in Competitor::ALL {
            let color = winner_color(competitor);
            let line_width = opts.line_width;
            chart
                .draw_series(std::iter::empty::<PathElement<(f64, f64)>>())?
                .label(competitor.code())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 30, y)], color.stroke_width(line_width))
                });
        }
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK.mix(0.3))
            .label_font(("sans-serif", 24))
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attributor;
    use crate::trace::{Sample, Trace};

    fn attribution() -> Attribution {
        let ver: Vec<Sample> = (0..40)
            .map(|i| {
                let a = i as f64 / 40.0 * std::f64::consts::TAU;
                Sample::new(a.cos() * 500.0, a.sin() * 300.0, i as f64 * 25.0, 200.0 + (i % 7) as f64)
            })
            .collect();
        let ham: Vec<Sample> = (0..40)
            .map(|i| {
                let a = (i as f64 + 0.5) / 40.0 * std::f64::consts::TAU;
                Sample::new(a.cos() * 501.0, a.sin() * 301.0, i as f64 * 25.0 + 12.5, 203.0 - (i % 5) as f64)
            })
            .collect();
        Attributor::default()
            .attribute(
                &Trace::new(Competitor::Verstappen, ver),
                &Trace::new(Competitor::Hamilton, ham),
                5,
            )
            .unwrap()
    }

    #[test]
    fn palette_follows_ordinal_classes() {
        assert_eq!(winner_color(Competitor::Verstappen), RGBColor(0, 0, 255));
        assert_eq!(winner_color(Competitor::Hamilton), RGBColor(0, 255, 128));
    }

    #[test]
    fn runs_cover_every_piece_and_alternate_owners() {
        let attribution = attribution();
        let runs = colored_runs(&attribution.samples);
        let pieces: usize = runs.iter().map(|(_, points)| points.len() - 1).sum();
        assert_eq!(pieces, attribution.samples.len() - 1);
        for pair in runs.windows(2) {
            assert_ne!(pair[0].0, pair[1].0);
            // Runs join up: the path stays continuous.
            assert_eq!(pair[0].1.last(), pair[1].1.first());
        }
    }

    #[test]
    fn bounds_keep_equal_scale() {
        let attribution = attribution();
        let ((x0, x1), (y0, y1)) = equal_aspect_bounds(&attribution.samples, 1800, 1000);
        let ratio = (x1 - x0) / (y1 - y0);
        assert!((ratio - 1.8).abs() < 1e-9);
        assert!(x0 <= -500.0 && x1 >= 501.0);
        assert!(y0 <= -301.0 && y1 >= 301.0);
    }

    #[test]
    fn svg_contains_the_track() {
        let opts = RenderOptions {
            width: 600,
            height: 400,
            line_width: 3,
            annotate: false,
        };
        let svg = render_svg(&attribution(), "Monaco", &opts).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("polyline"));
    }

    #[test]
    fn png_is_written() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("comparison.png");
        let opts = RenderOptions {
            width: 320,
            height: 200,
            line_width: 2,
            annotate: false,
        };
        render_png(&attribution(), "Monza", &path, &opts).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
