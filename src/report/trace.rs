//! Per-run time-series traces.
//!
//! For every series file of a run a `<stem>.dat` table with a step column
//! is written next to it, optionally with a plot of the post-transient part.

use super::plot::{draw_sweep, PlotLabels};
use super::table::format_scientific;
use crate::analysis::sweep::{Series, Sweep, ValueFormat};
use crate::analysis::AnalysisSettings;
use crate::config::PlotFormat;
use crate::models::Measured;
use crate::reader::{read_table, Table};
use crate::scanner::{find_quantity_file, series_files, RunDir};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};

/// What to emit for each trace.
#[derive(Debug, Clone, Copy)]
pub struct TraceOptions {
    /// Leading rows left out of plots.
    pub transient_rows: usize,
    /// Plot format, or `None` to write tables only.
    pub plot_format: Option<PlotFormat>,
    pub temperature_scale: f64,
}

/// Render a series as a trace table: step index, then every column.
pub fn render_trace_table(table: &Table) -> String {
    let mut output = String::from("t");
    for pair in 0..table.pair_count() {
        output.push_str(&format!("\t{}\terr", table.pair_label(pair)));
    }
    output.push_str("\t\n");

    for (step, row) in table.rows.iter().enumerate() {
        output.push_str(&format!("{}\t", step));
        for value in row {
            output.push_str(&format_scientific(*value));
            output.push('\t');
        }
        output.push('\n');
    }

    output
}

/// Post-transient part of a series, one series per value/error pair.
pub fn trace_sweep(table: &Table, name: &str, transient_rows: usize) -> Sweep {
    let rows = table.rows.iter().skip(transient_rows);

    Sweep {
        name: name.to_string(),
        y_label: name.to_string(),
        x: (transient_rows..table.rows.len()).map(|s| s as f64).collect(),
        series: (0..table.pair_count())
            .map(|pair| Series {
                label: table.pair_label(pair),
                points: rows
                    .clone()
                    .map(|row| Measured::new(row[2 * pair], row[2 * pair + 1]))
                    .collect(),
            })
            .collect(),
        format: ValueFormat::Scientific,
    }
}

fn write_trace(path: &Path, run: &RunDir, options: &TraceOptions) -> Result<bool> {
    let table = match read_table(path) {
        Ok(table) => table,
        Err(e) => {
            warn!("Skipping trace of {}: {}", path.display(), e);
            return Ok(false);
        }
    };

    let dat = path.with_extension("dat");
    std::fs::write(&dat, render_trace_table(&table))
        .with_context(|| format!("Failed to write trace {}", dat.display()))?;
    debug!("Wrote {}", dat.display());

    if let Some(format) = options.plot_format {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sweep = trace_sweep(&table, &stem, options.transient_rows);
        if sweep.is_empty() {
            debug!("{} has no rows after the transient", path.display());
        } else {
            let caption = format!(
                "{}, {}",
                run.configuration.caption(options.temperature_scale),
                run.field
            );
            let labels = PlotLabels {
                caption: &caption,
                x_desc: "t",
            };
            let plot = path.with_extension(format.extension());
            if let Err(e) = draw_sweep(&sweep, &plot, &labels, format) {
                warn!("{}", e);
            }
        }
    }

    Ok(true)
}

/// Write traces for every tracked series file of one run. Returns how many
/// tables were written.
pub fn write_run_traces(
    run: &RunDir,
    settings: &AnalysisSettings,
    options: &TraceOptions,
) -> Result<usize> {
    let files = series_files(&run.path);
    let mut written = 0;

    for spec in &settings.quantities {
        if let Some(path) = find_quantity_file(&files, spec) {
            if write_trace(path, run, options)? {
                written += 1;
            }
        }
    }

    Ok(written)
}
