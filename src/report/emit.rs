//! Emission of per-configuration sweeps to disk.

use super::plot::{draw_sweep, sweep_plot_path, PlotLabels};
use super::table::write_sweep_table;
use crate::analysis::sweep::{build_sweeps, critical_field};
use crate::analysis::{AnalysisSettings, ConfigurationEntry};
use crate::config::{Config, PlotFormat};
use crate::models::{Configuration, ConfigurationReport};
use anyhow::Result;
use tracing::{debug, info, warn};

/// Output settings for sweeps.
#[derive(Debug, Clone, Copy)]
pub struct EmitOptions {
    /// Plot format, or `None` to write tables only.
    pub plot_format: Option<PlotFormat>,
    pub temperature_scale: f64,
}

impl From<&Config> for EmitOptions {
    fn from(config: &Config) -> Self {
        Self {
            plot_format: config.report.plots.then_some(config.report.plot_format),
            temperature_scale: config.report.temperature_scale,
        }
    }
}

/// Build and write every sweep of one configuration into its output
/// directory.
///
/// A table that cannot be written fails the configuration; a plot that
/// cannot be drawn is logged and the table is kept.
pub fn emit_configuration(
    configuration: &Configuration,
    entry: &ConfigurationEntry,
    settings: &AnalysisSettings,
    options: &EmitOptions,
) -> Result<ConfigurationReport> {
    let sweeps = build_sweeps(entry, settings)?;
    let critical = critical_field(&sweeps, settings);
    match critical {
        Some(h_x) => info!("{}: critical field {}", configuration, h_x),
        None => debug!("{}: no critical field", configuration),
    }

    let caption = configuration.caption(options.temperature_scale);
    let labels = PlotLabels {
        caption: &caption,
        x_desc: "h_x",
    };

    let mut emitted = Vec::with_capacity(sweeps.len());
    for sweep in &sweeps {
        let table = write_sweep_table(sweep, &entry.output_dir)?;
        debug!("Wrote {}", table.display());

        if let Some(format) = options.plot_format {
            let plot = sweep_plot_path(&entry.output_dir, sweep, format);
            match draw_sweep(sweep, &plot, &labels, format) {
                Ok(()) => debug!("Wrote {}", plot.display()),
                Err(e) => warn!("{}", e),
            }
        }

        emitted.push(sweep.name.clone());
    }

    Ok(ConfigurationReport {
        configuration: *configuration,
        output_dir: entry.output_dir.clone(),
        fields: entry.field_count(),
        quantities: entry.quantities.keys().cloned().collect(),
        sweeps: emitted,
        critical_field: critical,
    })
}
