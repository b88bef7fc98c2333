//! Summary charts, rendered headless to SVG.

use std::path::Path;

use log::info;
use plotters::prelude::*;

use crate::error::{BenchError, Result};
use crate::schema::SummaryRow;

const SIZE: (u32, u32) = (960, 640);

struct Series<'a> {
    title: &'a str,
    y_desc: &'a str,
    /// `(size_mib, y, y_err)`
    points: Vec<(f64, f64, f64)>,
}

fn plot_err(path: &Path) -> impl Fn(String) -> BenchError + '_ {
    move |reason| BenchError::Plot {
        path: path.to_path_buf(),
        reason,
    }
}

/// Log-scale bounds padded so a single point still gets a visible axis.
fn x_bounds(points: &[(f64, f64, f64)]) -> (f64, f64) {
    let lo = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let hi = points
        .iter()
        .map(|p| p.0)
        .fold(f64::NEG_INFINITY, f64::max);
    (lo / 2.0, hi * 2.0)
}

fn y_upper(points: &[(f64, f64, f64)]) -> f64 {
    let hi = points.iter().map(|p| p.1 + p.2).fold(0.0_f64, f64::max);
    if hi > 0.0 && hi.is_finite() {
        hi * 1.1
    } else {
        1.0
    }
}

fn draw(path: &Path, series: &Series<'_>) -> Result<()> {
    let err = plot_err(path);
    let (x_lo, x_hi) = x_bounds(&series.points);
    let y_hi = y_upper(&series.points);

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| err(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(series.title, ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(72)
        .build_cartesian_2d((x_lo..x_hi).log_scale(), 0.0..y_hi)
        .map_err(|e| err(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc("Payload size (MiB)")
        .y_desc(series.y_desc)
        .x_label_formatter(&|v| format!("{v:.3}"))
        .draw()
        .map_err(|e| err(e.to_string()))?;

    chart
        .draw_series(LineSeries::new(
            series.points.iter().map(|&(x, y, _)| (x, y)),
            &BLUE,
        ))
        .map_err(|e| err(e.to_string()))?;

    chart
        .draw_series(
            series
                .points
                .iter()
                .map(|&(x, y, _)| Circle::new((x, y), 4, BLUE.filled())),
        )
        .map_err(|e| err(e.to_string()))?;

    if series.points.iter().any(|p| p.2 > 0.0) {
        chart
            .draw_series(series.points.iter().map(|&(x, y, e)| {
                ErrorBar::new_vertical(x, (y - e).max(0.0), y, y + e, BLUE.filled(), 8)
            }))
            .map_err(|e| err(e.to_string()))?;
    }

    root.present().map_err(|e| err(e.to_string()))?;
    Ok(())
}

/// Mean per-sign time in milliseconds, with ±1 stdev error bars.
pub fn plot_mean_time(rows: &[SummaryRow], path: &Path) -> Result<()> {
    if rows.is_empty() {
        return Err(BenchError::data_format(path, "no summary rows to plot"));
    }
    let series = Series {
        title: "Signing time vs payload size",
        y_desc: "Mean time per sign (ms)",
        points: rows
            .iter()
            .map(|r| {
                (
                    r.size_mib(),
                    r.mean_seconds_per_sign * 1e3,
                    r.stdev_seconds_per_sign * 1e3,
                )
            })
            .collect(),
    };
    draw(path, &series)?;
    info!("wrote {}", path.display());
    Ok(())
}

pub fn plot_throughput(rows: &[SummaryRow], path: &Path) -> Result<()> {
    if rows.is_empty() {
        return Err(BenchError::data_format(path, "no summary rows to plot"));
    }
    let series = Series {
        title: "Signing throughput vs payload size",
        y_desc: "Throughput (MB/s)",
        points: rows
            .iter()
            .map(|r| (r.size_mib(), r.throughput_mb_per_s, 0.0))
            .collect(),
    };
    draw(path, &series)?;
    info!("wrote {}", path.display());
    Ok(())
}
