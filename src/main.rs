//! MRStat - plateau statistics for magnetoresistance simulations
//!
//! A CLI tool that walks a tree of spin-transport simulation runs, reduces
//! every time series to a steady-state estimate and writes field-sweep
//! tables and plots per configuration.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad parameter, unreadable config, write failure, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod reader;
mod report;
mod scanner;

use analysis::AnalysisSettings;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Report, ReportMetadata};
use report::{EmitOptions, TraceOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging, since it may raise verbosity
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config)?;

    info!("mrstat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match origin {
        ConfigOrigin::File(path) => info!("Loaded config from: {}", path.display()),
        ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
        ConfigOrigin::Fallback(reason) => warn!("Failed to load config: {}", reason),
    }

    if let Err(e) = config.validate().and_then(|()| run(&args, &config)) {
        error!("Processing failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .mrstat.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to change the plateau parameter, file layout and plot output.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run one complete pass over the run tree.
fn run(args: &Args, config: &Config) -> Result<()> {
    let start_time = Instant::now();

    let settings = AnalysisSettings::from(config);
    let root = args.root.clone();

    // Handle --dry-run: list runs and exit
    if args.dry_run {
        return handle_dry_run(&root);
    }

    // Step 1: Aggregate the tree
    if !args.quiet {
        println!("🔍 Scanning run tree: {}", root.display());
    }
    let aggregation = analysis::aggregate_tree(&root, &settings)
        .with_context(|| format!("Failed to aggregate {}", root.display()))?;

    if aggregation.table.is_empty() {
        warn!("No configuration under {} has usable data", root.display());
    }
    if !args.quiet {
        println!(
            "   {} runs, {} configurations, {} files skipped",
            aggregation.runs.len(),
            aggregation.table.len(),
            aggregation.skipped.len()
        );
    }

    // Step 2: Per-run traces
    if config.report.traces {
        let trace_options = TraceOptions {
            transient_rows: config.plateau.transient_rows,
            plot_format: config.report.plots.then_some(config.report.plot_format),
            temperature_scale: config.report.temperature_scale,
        };
        let mut written = 0;
        for run in &aggregation.runs {
            written += report::write_run_traces(run, &settings, &trace_options)?;
        }
        info!("Wrote {} traces", written);
    }

    // Step 3: Sweeps per configuration
    let emit_options = EmitOptions::from(config);
    let configurations = aggregation.table.configurations();
    let progress = progress_bar(configurations.len() as u64, args.quiet)?;

    let mut reports = Vec::with_capacity(configurations.len());
    for configuration in &configurations {
        progress.set_message(configuration.to_string());

        let Some(entry) = aggregation.table.entry(configuration) else {
            continue;
        };
        let configuration_report =
            report::emit_configuration(configuration, entry, &settings, &emit_options)
                .with_context(|| format!("Failed to emit sweeps for {}", configuration))?;
        info!(
            "{}: {} sweeps in {}",
            configuration,
            configuration_report.sweeps.len(),
            configuration_report.output_dir.display()
        );
        reports.push(configuration_report);
        progress.inc(1);
    }
    progress.finish_and_clear();

    // Step 4: Build and save the report
    let duration = start_time.elapsed().as_secs_f64();
    let sweeps_emitted = reports.iter().map(|r| r.sweeps.len()).sum();

    let report = Report {
        metadata: ReportMetadata {
            root: root.clone(),
            analysis_date: Utc::now(),
            runs_found: aggregation.runs.len(),
            runs_processed: aggregation.runs_processed,
            files_skipped: aggregation.skipped.len(),
            sweeps_emitted,
            duration_seconds: duration,
        },
        configurations: reports,
        skipped: aggregation.skipped,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = report_path(config, args);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    if !args.quiet {
        println!("\n📊 Summary:");
        println!(
            "   Runs processed: {}/{}",
            report.metadata.runs_processed, report.metadata.runs_found
        );
        println!("   Configurations: {}", report.configurations.len());
        println!("   Sweeps written: {}", sweeps_emitted);
        if report.metadata.files_skipped > 0 {
            println!("   ⚠️  Files skipped: {}", report.metadata.files_skipped);
        }
        println!("   Duration: {:.1}s", duration);
        println!("\n✅ Done! Report saved to: {}", output_path.display());
    }

    Ok(())
}

/// Handle --dry-run: list discovered runs, exit without reading any series.
fn handle_dry_run(root: &Path) -> Result<()> {
    println!("\n🔍 Dry run: scanning {} (no files are read)...\n", root.display());

    let discovery = scanner::RunScanner::new(root.to_path_buf()).scan();

    if discovery.runs.is_empty() {
        println!("   No run directories found.");
    } else {
        println!("   Found {} runs that would be processed:\n", discovery.runs.len());
        for run in &discovery.runs {
            println!("     📁 {} | {}", run.configuration, run.field);
        }
        println!("\n   Total: {} runs", discovery.runs.len());
    }

    for skipped in &discovery.skipped {
        println!("   ⚠️  {}: {}", skipped.path.display(), skipped.reason);
    }

    println!("\n✅ Dry run complete. Nothing was written.");
    Ok(())
}

fn progress_bar(len: u64, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Report path; the default Markdown name switches to `.json` for JSON output.
fn report_path(config: &Config, args: &Args) -> PathBuf {
    let mut path = PathBuf::from(&config.general.output);
    if args.output.is_none()
        && args.format == OutputFormat::Json
        && path.extension().map(|e| e == "md").unwrap_or(false)
    {
        path.set_extension("json");
    }
    path
}

/// Where the configuration came from.
enum ConfigOrigin {
    File(PathBuf),
    Defaults,
    /// A config file existed but could not be used.
    Fallback(String),
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so the origin is returned for the caller
/// to log. Only an explicit `--config` that cannot be loaded is an error.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::File(config_path.clone())));
    }

    // Try the working directory, then the run-tree root
    let cwd = Path::new(".").join(CONFIG_FILE_NAME);
    let found = match Config::load_default() {
        Ok(Some(config)) => Ok(Some((config, cwd))),
        Ok(None) => Config::load_from_dir(&args.root)
            .map(|config| config.map(|c| (c, args.root.join(CONFIG_FILE_NAME)))),
        Err(e) => Err(e),
    };

    Ok(match found {
        Ok(Some((config, path))) => (config, ConfigOrigin::File(path)),
        Ok(None) => (Config::default(), ConfigOrigin::Defaults),
        Err(e) => (Config::default(), ConfigOrigin::Fallback(format!("{:#}", e))),
    })
}
