//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.mrstat.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory and
/// in the run-tree root.
pub const CONFIG_FILE_NAME: &str = ".mrstat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Plateau estimation settings.
    #[serde(default)]
    pub plateau: PlateauConfig,

    /// Run directory layout and tracked quantities.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Output settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default processing report path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "mrstat_report.md".to_string()
}

/// Plateau estimator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateauConfig {
    /// Largest fraction of a series that may be trimmed. Must be below 1.
    #[serde(default = "default_n_param")]
    pub n_param: f64,

    /// Leading rows left out of time-series trace plots.
    #[serde(default = "default_transient_rows")]
    pub transient_rows: usize,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self {
            n_param: default_n_param(),
            transient_rows: default_transient_rows(),
        }
    }
}

fn default_n_param() -> f64 {
    crate::analysis::plateau::DEFAULT_N_PARAM
}

fn default_transient_rows() -> usize {
    50
}

/// One tracked time-series quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitySpec {
    /// Name used for grouping and for output files (`<name>_h.dat`).
    pub name: String,

    /// File stem, or stem prefix followed by a numeric tag.
    pub prefix: String,

    /// File suffix including the dot.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Record zeros at zero field when the file is absent.
    #[serde(default)]
    pub zero_field_placeholder: bool,
}

impl QuantitySpec {
    fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: name.to_string(),
            suffix: default_suffix(),
            zero_field_placeholder: false,
        }
    }
}

fn default_suffix() -> String {
    ".txt".to_string()
}

/// Run directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Averages file holding the magnetization components.
    #[serde(default = "default_magnetization_file")]
    pub magnetization_file: String,

    /// Column pair of the first magnetization indicator.
    #[serde(default = "default_m_first_pair")]
    pub m_first_pair: usize,

    /// Column pair of the second magnetization indicator.
    #[serde(default = "default_m_second_pair")]
    pub m_second_pair: usize,

    /// Magnetization column whose first positive value marks the critical
    /// field.
    #[serde(default = "default_critical_label")]
    pub critical_label: String,

    /// Quantity holding the LHC/UHC magnetoresistance history.
    #[serde(default = "default_mr_quantity")]
    pub mr_quantity: String,

    /// Quantity holding the two polarization estimates.
    #[serde(default = "default_polarization_quantity")]
    pub polarization_quantity: String,

    /// Tracked quantities.
    #[serde(default = "default_quantities")]
    pub quantities: Vec<QuantitySpec>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            magnetization_file: default_magnetization_file(),
            m_first_pair: default_m_first_pair(),
            m_second_pair: default_m_second_pair(),
            critical_label: default_critical_label(),
            mr_quantity: default_mr_quantity(),
            polarization_quantity: default_polarization_quantity(),
            quantities: default_quantities(),
        }
    }
}

fn default_magnetization_file() -> String {
    "m.txt".to_string()
}

fn default_m_first_pair() -> usize {
    1
}

fn default_m_second_pair() -> usize {
    5
}

fn default_critical_label() -> String {
    "m2x".to_string()
}

fn default_mr_quantity() -> String {
    "MR".to_string()
}

fn default_polarization_quantity() -> String {
    "P_mod".to_string()
}

fn default_quantities() -> Vec<QuantitySpec> {
    let mut quantities = vec![QuantitySpec {
        name: default_mr_quantity(),
        prefix: "MR_tw=".to_string(),
        suffix: default_suffix(),
        zero_field_placeholder: true,
    }];
    quantities.extend(["j", "Nup", "Ndown", "P", "P_mod"].map(QuantitySpec::plain));
    quantities
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Render field-sweep plots next to the data tables.
    #[serde(default = "default_true")]
    pub plots: bool,

    /// Plot image format.
    #[serde(default)]
    pub plot_format: PlotFormat,

    /// Write a `.dat` table and a plot for every series file of every run.
    #[serde(default)]
    pub traces: bool,

    /// Factor converting reduced temperatures to kelvin in captions.
    #[serde(default = "default_temperature_scale")]
    pub temperature_scale: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            plots: true,
            plot_format: PlotFormat::default(),
            traces: false,
            temperature_scale: default_temperature_scale(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_temperature_scale() -> f64 {
    318.8
}

/// Image format of rendered plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlotFormat {
    /// Scalable vector graphics (default)
    #[default]
    Svg,
    /// Portable network graphics
    Png,
}

impl PlotFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            PlotFormat::Svg => "svg",
            PlotFormat::Png => "png",
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory (e.g. the run-tree root).
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(n_param) = args.n_param {
            self.plateau.n_param = n_param;
        }
        if let Some(rows) = args.transient_rows {
            self.plateau.transient_rows = rows;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.plot_format {
            self.report.plot_format = format;
        }

        // Flags always override
        if args.no_plots {
            self.report.plots = false;
        }
        if args.traces {
            self.report.traces = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that would otherwise fail deep inside the pass.
    pub fn validate(&self) -> Result<()> {
        let n_param = self.plateau.n_param;
        if !(n_param > 0.0 && n_param < 1.0) {
            anyhow::bail!("plateau.n_param must be in (0, 1), got {}", n_param);
        }
        if self.layout.quantities.iter().any(|q| q.prefix.is_empty()) {
            anyhow::bail!("every [[layout.quantities]] entry needs a non-empty prefix");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
