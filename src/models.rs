//! Data models for the statistics pipeline.
//!
//! This module contains the core data structures shared by the scanner,
//! the aggregation stage and the report writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// One simulation ensemble: particle count and the two temperatures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Configuration {
    /// Particle count.
    pub n: u32,
    /// Temperature the sample was created at (reduced units).
    pub t_creation: f64,
    /// Temperature the sample was measured at (reduced units).
    pub t_sample: f64,
}

impl Configuration {
    fn key(&self) -> (u32, u64, u64) {
        (self.n, self.t_creation.to_bits(), self.t_sample.to_bits())
    }

    /// Caption used on plots, with temperatures converted to kelvin and
    /// rounded to hundreds.
    pub fn caption(&self, temperature_scale: f64) -> String {
        format!(
            "N = {}, T_creation = {}K, T_sample = {}K",
            self.n,
            to_kelvin(self.t_creation, temperature_scale),
            to_kelvin(self.t_sample, temperature_scale)
        )
    }
}

fn to_kelvin(reduced: f64, scale: f64) -> i64 {
    ((reduced * scale) / 100.0).round_ties_even() as i64 * 100
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Configuration {}

impl Hash for Configuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Configuration {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Configuration {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.n
            .cmp(&other.n)
            .then(self.t_creation.total_cmp(&other.t_creation))
            .then(self.t_sample.total_cmp(&other.t_sample))
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N = {}, T_creation = {}, T_sample = {}",
            self.n, self.t_creation, self.t_sample
        )
    }
}

/// Applied external field vector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Field {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Field {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True when every component is zero.
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    fn key(&self) -> (u64, u64, u64) {
        (self.x.to_bits(), self.y.to_bits(), self.z.to_bits())
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h = ({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Trimmed-mean estimate of a time series tail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateauResult {
    pub mean: f64,
    /// Standard error of the retained window.
    pub stderr: f64,
    /// Number of trailing samples retained.
    pub window_size: usize,
}

/// A value with its propagated error.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Measured {
    pub value: f64,
    pub err: f64,
}

impl Measured {
    pub fn new(value: f64, err: f64) -> Self {
        Self { value, err }
    }

    /// Absolute value and error scaled to percent.
    pub fn as_percent(&self) -> Self {
        Self {
            value: self.value.abs() * 100.0,
            err: self.err.abs() * 100.0,
        }
    }
}

/// Statistics of one value/error column pair over its plateau window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnStat {
    /// Plateau mean of the value column.
    pub mean: f64,
    /// Spread of the value column (standard error of the plateau).
    pub std: f64,
    /// Mean of the per-sample error column over the same window.
    pub err_mean: f64,
    /// Standard deviation of the per-sample error column over the window.
    pub err_std: f64,
}

impl ColumnStat {
    /// Collapse into a single value with the summed error budget.
    pub fn as_measured(&self) -> Measured {
        Measured::new(self.mean, self.std + self.err_mean + self.err_std)
    }
}

/// Per-field summary of one quantity file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuantitySummary {
    /// One label per column pair, taken from the file header.
    pub labels: Vec<String>,
    /// One entry per column pair.
    pub columns: Vec<ColumnStat>,
}

impl QuantitySummary {
    /// All-zero placeholder with `pairs` unlabeled column pairs.
    pub fn placeholder(pairs: usize) -> Self {
        Self {
            labels: Vec::new(),
            columns: vec![ColumnStat::default(); pairs],
        }
    }

    /// Column pair at `idx`, if the file had that many pairs.
    pub fn column(&self, idx: usize) -> Option<&ColumnStat> {
        self.columns.get(idx)
    }
}

/// A file that was skipped during the pass, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one configuration in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationReport {
    pub configuration: Configuration,
    /// Directory the sweeps were written to.
    pub output_dir: PathBuf,
    /// Number of distinct field points seen.
    pub fields: usize,
    /// Quantities recorded for this configuration.
    pub quantities: Vec<String>,
    /// Names of the sweeps that were emitted.
    pub sweeps: Vec<String>,
    /// First field at which the tracked magnetization turns positive.
    pub critical_field: Option<f64>,
}

/// Metadata about a processing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Root of the processed run tree.
    pub root: PathBuf,
    /// Date and time of the pass.
    pub analysis_date: DateTime<Utc>,
    /// Run directories discovered.
    pub runs_found: usize,
    /// Run directories that contributed at least one quantity.
    pub runs_processed: usize,
    /// Files skipped because of read or parse failures.
    pub files_skipped: usize,
    /// Sweeps written across all configurations.
    pub sweeps_emitted: usize,
    /// Duration of the pass in seconds.
    pub duration_seconds: f64,
}

/// The complete processing report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub configurations: Vec<ConfigurationReport>,
    pub skipped: Vec<SkippedFile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_configuration_hash_and_eq() {
        let a = Configuration {
            n: 10,
            t_creation: 0.1,
            t_sample: 0.1,
        };
        let b = Configuration { ..a };
        let c = Configuration { n: 7, ..a };

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(c < a);
    }

    #[test]
    fn test_field_is_zero() {
        assert!(Field::new(0.0, 0.0, 0.0).is_zero());
        assert!(!Field::new(0.5, 0.0, 0.0).is_zero());
        assert_eq!(Field::new(0.5, 0.0, 0.0), Field::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_caption_in_kelvin() {
        let config = Configuration {
            n: 10,
            t_creation: 1.0,
            t_sample: 0.1,
        };
        assert_eq!(
            config.caption(318.8),
            "N = 10, T_creation = 300K, T_sample = 0K"
        );
    }

    #[test]
    fn test_caption_rounds_half_to_even() {
        let config = Configuration {
            n: 7,
            t_creation: 250.0,
            t_sample: 350.0,
        };
        assert_eq!(
            config.caption(1.0),
            "N = 7, T_creation = 200K, T_sample = 400K"
        );

        let negative = Configuration {
            n: 7,
            t_creation: -250.0,
            t_sample: 0.0,
        };
        assert!(negative.caption(1.0).contains("T_creation = -200K"));
    }

    #[test]
    fn test_column_stat_as_measured() {
        let stat = ColumnStat {
            mean: 4.0,
            std: 0.5,
            err_mean: 0.25,
            err_std: 0.125,
        };
        assert_eq!(stat.as_measured(), Measured::new(4.0, 0.875));
    }

    #[test]
    fn test_measured_as_percent() {
        let p = Measured::new(-0.25, 0.5).as_percent();
        assert_eq!(p, Measured::new(25.0, 50.0));
    }

    #[test]
    fn test_placeholder_summary() {
        let summary = QuantitySummary::placeholder(2);
        assert_eq!(summary.columns.len(), 2);
        assert!(summary.labels.is_empty());
        assert_eq!(summary.column(1), Some(&ColumnStat::default()));
        assert!(summary.column(2).is_none());
    }
}
