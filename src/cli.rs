//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::PlotFormat;
use clap::Parser;
use std::path::PathBuf;

/// MRStat - plateau statistics for magnetoresistance simulations
///
/// Walks a tree of simulation runs laid out as
/// `N = <n>/T_creation = <t>/T_sample = <t>/h = (<x>, <y>, <z>)`,
/// estimates steady-state averages of every tracked time series and
/// writes field-sweep tables and plots for each configuration.
///
/// Examples:
///   mrstat ./results
///   mrstat ./results --no-plots --format json -o report.json
///   mrstat ./results --dry-run
///   mrstat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Root of the run tree
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Path to configuration file
    ///
    /// If not specified, looks for .mrstat.toml in the current directory,
    /// then in ROOT
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file path for the processing report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Largest fraction of a series the plateau estimator may trim
    ///
    /// Must be in (0, 1). Default: from config or 0.95.
    #[arg(long, value_name = "FRACTION", env = "MRSTAT_N_PARAM")]
    pub n_param: Option<f64>,

    /// Leading rows hidden from time-series trace plots
    #[arg(long, value_name = "ROWS")]
    pub transient_rows: Option<usize>,

    /// Plot image format (svg, png)
    #[arg(long, value_name = "FORMAT")]
    pub plot_format: Option<PlotFormat>,

    /// Write tables only, skip plot rendering
    #[arg(long)]
    pub no_plots: bool,

    /// Also write a table and plot for every series file of every run
    #[arg(long)]
    pub traces: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list the configurations and runs that would be processed
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .mrstat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(n_param) = self.n_param {
            if !(n_param > 0.0 && n_param < 1.0) {
                return Err(format!("--n-param must be in (0, 1), got {}", n_param));
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if !self.root.exists() {
            return Err(format!("Root directory does not exist: {}", self.root.display()));
        }
        if !self.root.is_dir() {
            return Err(format!("Root path is not a directory: {}", self.root.display()));
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            root: PathBuf::from("."),
            config: None,
            output: None,
            format: OutputFormat::Markdown,
            n_param: None,
            transient_rows: None,
            plot_format: None,
            no_plots: false,
            traces: false,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_defaults() {
        let args = Args::parse_from(["mrstat"]);
        assert_eq!(args.root, PathBuf::from("."));
        assert_eq!(args.format, OutputFormat::Markdown);
        assert!(args.plot_format.is_none());
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from([
            "mrstat",
            "results",
            "--n-param",
            "0.9",
            "--plot-format",
            "png",
            "--format",
            "json",
            "--no-plots",
        ]);
        assert_eq!(args.root, PathBuf::from("results"));
        assert_eq!(args.n_param, Some(0.9));
        assert_eq!(args.plot_format, Some(PlotFormat::Png));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.no_plots);
    }

    #[test]
    fn test_validation_n_param() {
        let mut args = make_args();
        args.n_param = Some(1.0);
        assert!(args.validate().is_err());
        args.n_param = Some(0.95);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_root() {
        let mut args = make_args();
        args.root = PathBuf::from("/definitely/not/a/run/tree");
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
