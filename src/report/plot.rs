//! Error-bar plots of sweeps.
//!
//! Rendering goes through plotters; SVG and PNG share one drawing routine
//! generic over the backend.

use crate::analysis::sweep::Sweep;
use crate::config::PlotFormat;
use anyhow::{anyhow, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};

const PLOT_SIZE: (u32, u32) = (1000, 700);

/// Labels drawn around a plot.
#[derive(Debug, Clone)]
pub struct PlotLabels<'a> {
    pub caption: &'a str,
    pub x_desc: &'a str,
}

/// Path of the plot file for a sweep inside `dir`.
pub fn sweep_plot_path(dir: &Path, sweep: &Sweep, format: PlotFormat) -> PathBuf {
    dir.join(format!("{}_h.{}", sweep.name, format.extension()))
}

/// Draw every series of `sweep` as a line with vertical error bars.
pub fn draw_sweep(sweep: &Sweep, path: &Path, labels: &PlotLabels, format: PlotFormat) -> Result<()> {
    match format {
        PlotFormat::Svg => render(SVGBackend::new(path, PLOT_SIZE).into_drawing_area(), sweep, labels)
            .map_err(|e| anyhow!("Failed to draw {}: {}", path.display(), e)),
        PlotFormat::Png => render(BitMapBackend::new(path, PLOT_SIZE).into_drawing_area(), sweep, labels)
            .map_err(|e| anyhow!("Failed to draw {}: {}", path.display(), e)),
    }
}

fn render<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    sweep: &Sweep,
    labels: &PlotLabels,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let x_range = axis_range(sweep.x.iter().copied());
    let y_range = axis_range(sweep.series.iter().flat_map(|series| {
        series
            .points
            .iter()
            .flat_map(|p| [p.value - p.err, p.value + p.err])
    }));

    let mut chart = ChartBuilder::on(&root)
        .caption(labels.caption, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(labels.x_desc)
        .y_desc(sweep.y_label.as_str())
        .draw()?;

    for (idx, series) in sweep.series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points: Vec<(f64, f64)> = sweep
            .x
            .iter()
            .zip(&series.points)
            .map(|(&x, p)| (x, p.value))
            .collect();

        chart
            .draw_series(LineSeries::new(points, &color))?
            .label(series.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

        chart.draw_series(sweep.x.iter().zip(&series.points).map(|(&x, p)| {
            ErrorBar::new_vertical(x, p.value - p.err, p.value, p.value + p.err, color.filled(), 6)
        }))?;
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Padded range over the finite values; a unit range around a single value.
fn axis_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if min > max {
        return 0.0..1.0;
    }
    if min == max {
        return (min - 0.5)..(max + 0.5);
    }

    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}
