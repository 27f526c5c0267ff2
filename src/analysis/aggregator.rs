//! Aggregation of per-run summaries across the run tree.
//!
//! Every run directory is reduced to one [`QuantitySummary`] per tracked
//! quantity; the summaries are grouped by configuration, quantity and field
//! in an [`AggregationTable`].

use super::cosort::cosort;
use super::plateau::{mean, summarize_pair};
use super::{AnalysisSettings, MAGNETIZATION};
use crate::error::{StatError, StatResult};
use crate::models::{ColumnStat, Configuration, Field, QuantitySummary, SkippedFile};
use crate::reader::{read_table, Table};
use crate::scanner::{find_quantity_file, series_files, RunDir, RunScanner};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Field → summary for one quantity of one configuration.
pub type FieldMap = HashMap<Field, QuantitySummary>;

/// Everything recorded for one configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationEntry {
    /// Directory sweeps for this configuration are written to.
    pub output_dir: PathBuf,
    /// Quantity name → field → summary.
    pub quantities: BTreeMap<String, FieldMap>,
}

impl ConfigurationEntry {
    /// Number of distinct fields across all quantities.
    pub fn field_count(&self) -> usize {
        self.quantities
            .values()
            .flat_map(|fields| fields.keys())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Fields and summaries of one quantity, ordered by ascending `h_x`.
    /// Fields sharing `h_x` are ordered by `h_y`, then `h_z`.
    pub fn sorted(&self, quantity: &str) -> StatResult<Vec<(Field, &QuantitySummary)>> {
        let fields = self
            .quantities
            .get(quantity)
            .ok_or_else(|| StatError::MissingKey(format!("quantity '{}'", quantity)))?;

        let mut pairs: Vec<(Field, &QuantitySummary)> =
            fields.iter().map(|(field, summary)| (*field, summary)).collect();
        pairs.sort_by(|(a, _), (b, _)| a.y.total_cmp(&b.y).then(a.z.total_cmp(&b.z)));
        let keys: Vec<f64> = pairs.iter().map(|(field, _)| field.x).collect();

        let (_, sorted) = cosort(&keys, pairs)?;
        Ok(sorted)
    }
}

/// Configuration → quantity → field → summary.
#[derive(Debug, Clone, Default)]
pub struct AggregationTable {
    entries: HashMap<Configuration, ConfigurationEntry>,
}

impl AggregationTable {
    /// Record one summary. The first run of a configuration fixes its
    /// output directory.
    pub fn insert(
        &mut self,
        configuration: Configuration,
        output_dir: &Path,
        quantity: &str,
        field: Field,
        summary: QuantitySummary,
    ) {
        let entry = self
            .entries
            .entry(configuration)
            .or_insert_with(|| ConfigurationEntry {
                output_dir: output_dir.to_path_buf(),
                quantities: BTreeMap::new(),
            });

        if entry
            .quantities
            .entry(quantity.to_string())
            .or_default()
            .insert(field, summary)
            .is_some()
        {
            warn!(
                "Duplicate {} for {} / {}: keeping the later run",
                quantity, configuration, field
            );
        }
    }

    /// Configurations in ascending order.
    pub fn configurations(&self) -> Vec<Configuration> {
        let mut configs: Vec<Configuration> = self.entries.keys().copied().collect();
        configs.sort();
        configs
    }

    pub fn entry(&self, configuration: &Configuration) -> Option<&ConfigurationEntry> {
        self.entries.get(configuration)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Summaries of one run directory.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Quantity name → summary.
    pub quantities: BTreeMap<String, QuantitySummary>,
    /// Files that could not be used.
    pub skipped: Vec<SkippedFile>,
}

/// Result of aggregating a whole tree.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub table: AggregationTable,
    pub runs: Vec<RunDir>,
    pub runs_processed: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Mean of every value/error column pair over all rows of the averages file.
pub fn summarize_averages(table: &Table) -> StatResult<QuantitySummary> {
    if table.rows.is_empty() {
        return Err(StatError::Degenerate("averages file has no rows".to_string()));
    }

    let columns = (0..table.pair_count())
        .map(|pair| ColumnStat {
            mean: mean(&table.column(2 * pair)),
            std: 0.0,
            err_mean: mean(&table.column(2 * pair + 1)),
            err_std: 0.0,
        })
        .collect();

    Ok(QuantitySummary {
        labels: pair_labels(table),
        columns,
    })
}

/// Plateau statistics of every value/error column pair of a time series.
pub fn summarize_series(table: &Table, n_param: f64) -> StatResult<QuantitySummary> {
    if table.pair_count() == 0 {
        return Err(StatError::Degenerate(
            "time series has no value/error column pairs".to_string(),
        ));
    }

    let columns = (0..table.pair_count())
        .map(|pair| {
            summarize_pair(
                &table.column(2 * pair),
                &table.column(2 * pair + 1),
                n_param,
            )
        })
        .collect::<StatResult<Vec<ColumnStat>>>()?;

    Ok(QuantitySummary {
        labels: pair_labels(table),
        columns,
    })
}

fn pair_labels(table: &Table) -> Vec<String> {
    (0..table.pair_count()).map(|i| table.pair_label(i)).collect()
}

/// Reduce one run directory.
///
/// Unreadable or malformed files are logged and listed in
/// [`RunSummary::skipped`]; only an invalid parameter aborts.
pub fn summarize_run(run: &RunDir, settings: &AnalysisSettings) -> StatResult<RunSummary> {
    let mut summary = RunSummary::default();
    let files = series_files(&run.path);

    let m_path = run.path.join(&settings.magnetization_file);
    if files.contains(&m_path) {
        let result = read_table(&m_path).and_then(|table| summarize_averages(&table));
        record(&mut summary, MAGNETIZATION, &m_path, result)?;
    } else {
        debug!("No {} in {}", settings.magnetization_file, run.path.display());
    }

    for spec in &settings.quantities {
        match find_quantity_file(&files, spec) {
            Some(path) => {
                let result = read_table(path)
                    .and_then(|table| summarize_series(&table, settings.n_param));
                record(&mut summary, &spec.name, path, result)?;
            }
            None if spec.zero_field_placeholder && run.field.is_zero() => {
                debug!("Zero-field placeholder for {} in {}", spec.name, run.path.display());
                summary
                    .quantities
                    .insert(spec.name.clone(), QuantitySummary::placeholder(2));
            }
            None => {}
        }
    }

    Ok(summary)
}

fn record(
    summary: &mut RunSummary,
    quantity: &str,
    path: &Path,
    result: StatResult<QuantitySummary>,
) -> StatResult<()> {
    match result {
        Ok(quantity_summary) => {
            summary
                .quantities
                .insert(quantity.to_string(), quantity_summary);
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            warn!("Skipping {}: {}", path.display(), e);
            summary.skipped.push(SkippedFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Walk the tree under `root` and aggregate every run.
pub fn aggregate_tree(root: &Path, settings: &AnalysisSettings) -> StatResult<Aggregation> {
    let discovery = RunScanner::new(root.to_path_buf()).scan();
    info!("Found {} run directories", discovery.runs.len());

    let mut aggregation = Aggregation {
        skipped: discovery.skipped,
        ..Aggregation::default()
    };

    for run in &discovery.runs {
        debug!("Processing {}", run.path.display());
        let summary = summarize_run(run, settings)?;

        aggregation.skipped.extend(summary.skipped);
        if summary.quantities.is_empty() {
            continue;
        }
        aggregation.runs_processed += 1;

        for (quantity, quantity_summary) in summary.quantities {
            aggregation.table.insert(
                run.configuration,
                &run.config_dir,
                &quantity,
                run.field,
                quantity_summary,
            );
        }
    }

    aggregation.runs = discovery.runs;
    Ok(aggregation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse_table;
    use std::fs;

    fn constant_series(value: f64, err: f64, rows: usize) -> String {
        let mut text = String::from("MR_h_lower_hc\t\tMR_h_upper_hc\t\n");
        for _ in 0..rows {
            text.push_str(&format!("{}\t{}\t{}\t{}\t\n", value, err, value, err));
        }
        text
    }

    fn config() -> Configuration {
        Configuration {
            n: 10,
            t_creation: 0.1,
            t_sample: 0.1,
        }
    }

    fn quantity<'a>(table: &'a AggregationTable, name: &str) -> Option<&'a FieldMap> {
        table
            .entry(&config())
            .and_then(|entry| entry.quantities.get(name))
    }

    fn make_tree(root: &Path) -> PathBuf {
        let config_dir = root
            .join("N = 10")
            .join("T_creation = 0.1")
            .join("T_sample = 0.1");
        for field in ["h = (0.5, 0, 0)", "h = (0, 0, 0)"] {
            let run = config_dir.join(field);
            fs::create_dir_all(&run).unwrap();
            fs::write(run.join("MR_tw=100.txt"), constant_series(2.5, 0.25, 20)).unwrap();
        }
        config_dir
    }

    #[test]
    fn test_summarize_averages() {
        let table = parse_table("m1x\t\tm1y\t\n1\t0.5\t2\t0.25\n3\t0.5\t4\t0.75\n", "m.txt").unwrap();
        let summary = summarize_averages(&table).unwrap();

        assert_eq!(summary.labels, vec!["m1x", "m1y"]);
        assert_eq!(summary.columns[0].mean, 2.0);
        assert_eq!(summary.columns[0].err_mean, 0.5);
        assert_eq!(summary.columns[1].mean, 3.0);
        assert_eq!(summary.columns[1].err_mean, 0.5);
    }

    #[test]
    fn test_summarize_series_requires_pairs() {
        let table = parse_table("a\n1\n2\n", "one.txt").unwrap();
        assert!(matches!(
            summarize_series(&table, 0.95),
            Err(StatError::Degenerate(_))
        ));
    }

    #[test]
    fn test_end_to_end_constant_tree() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = make_tree(dir.path());

        let aggregation = aggregate_tree(dir.path(), &AnalysisSettings::default()).unwrap();

        assert_eq!(aggregation.runs.len(), 2);
        assert_eq!(aggregation.runs_processed, 2);
        assert!(aggregation.skipped.is_empty());
        assert_eq!(aggregation.table.configurations(), vec![config()]);

        let entry = aggregation.table.entry(&config()).unwrap();
        assert_eq!(entry.output_dir, config_dir);
        assert_eq!(entry.quantities.len(), 1);
        for fields in entry.quantities.values() {
            assert_eq!(fields.len(), 2);
        }

        let sorted = entry.sorted("MR").unwrap();
        let xs: Vec<f64> = sorted.iter().map(|(field, _)| field.x).collect();
        assert_eq!(xs, vec![0.0, 0.5]);
        for (_, summary) in sorted {
            assert_eq!(summary.columns.len(), 2);
            for column in &summary.columns {
                assert_eq!(column.mean, 2.5);
                assert_eq!(column.std, 0.0);
                assert_eq!(column.err_mean, 0.25);
                assert_eq!(column.err_std, 0.0);
            }
        }
    }

    #[test]
    fn test_zero_field_placeholder_without_history() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = make_tree(dir.path());
        fs::remove_file(config_dir.join("h = (0, 0, 0)").join("MR_tw=100.txt")).unwrap();

        let aggregation = aggregate_tree(dir.path(), &AnalysisSettings::default()).unwrap();
        let fields = quantity(&aggregation.table, "MR").unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(
            fields.get(&Field::new(0.0, 0.0, 0.0)),
            Some(&QuantitySummary::placeholder(2))
        );
    }

    #[test]
    fn test_malformed_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = make_tree(dir.path());
        let run = config_dir.join("h = (0.5, 0, 0)");
        fs::write(run.join("j.txt"), "j_up\t\tj_down\t\n1\tnope\t1\t1\n").unwrap();
        fs::write(run.join("m.txt"), "m1x\t\n").unwrap();

        let aggregation = aggregate_tree(dir.path(), &AnalysisSettings::default()).unwrap();

        assert_eq!(aggregation.skipped.len(), 2);
        assert!(quantity(&aggregation.table, "j").is_none());
        assert!(quantity(&aggregation.table, MAGNETIZATION).is_none());
        assert_eq!(quantity(&aggregation.table, "MR").unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_n_param_aborts() {
        let dir = tempfile::tempdir().unwrap();
        make_tree(dir.path());

        let settings = AnalysisSettings {
            n_param: 1.0,
            ..AnalysisSettings::default()
        };
        let err = aggregate_tree(dir.path(), &settings).unwrap_err();
        assert!(matches!(err, StatError::InvalidParameter(_)));
    }

    #[test]
    fn test_sorted_missing_quantity() {
        let entry = ConfigurationEntry::default();
        assert!(matches!(
            entry.sorted("P_mod"),
            Err(StatError::MissingKey(_))
        ));
    }

    #[test]
    fn test_sorted_breaks_ties_by_y_then_z() {
        let mut entry = ConfigurationEntry::default();
        let fields = entry.quantities.entry("j".to_string()).or_default();
        for (x, y, z) in [
            (0.5, 0.2, 0.0),
            (0.0, 0.0, 0.0),
            (0.5, -0.2, 0.1),
            (0.5, 0.0, 0.0),
            (0.5, -0.2, -0.1),
        ] {
            fields.insert(Field::new(x, y, z), QuantitySummary::default());
        }

        let order: Vec<(f64, f64, f64)> = entry
            .sorted("j")
            .unwrap()
            .iter()
            .map(|(field, _)| (field.x, field.y, field.z))
            .collect();
        assert_eq!(
            order,
            vec![
                (0.0, 0.0, 0.0),
                (0.5, -0.2, -0.1),
                (0.5, -0.2, 0.1),
                (0.5, 0.0, 0.0),
                (0.5, 0.2, 0.0),
            ]
        );
    }

    #[test]
    fn test_field_count_spans_quantities() {
        let mut table = AggregationTable::default();
        let dir = PathBuf::from("out");
        table.insert(config(), &dir, "MR", Field::new(0.0, 0.0, 0.0), QuantitySummary::placeholder(2));
        table.insert(config(), &dir, "j", Field::new(0.5, 0.0, 0.0), QuantitySummary::default());
        table.insert(config(), &dir, "j", Field::new(0.0, 0.0, 0.0), QuantitySummary::default());

        assert_eq!(table.len(), 1);
        assert_eq!(table.entry(&config()).unwrap().field_count(), 2);
    }
}
