//! Per-configuration field sweeps.
//!
//! A sweep is a set of series sharing one x axis (the field component
//! `h_x`), ready for a table or a plot. Raw sweeps come straight from the
//! aggregated quantities; derived sweeps combine several of them.

use super::aggregator::ConfigurationEntry;
use super::derive::{mr_from_polarization, polarization_from_mr, select_history_class};
use super::{AnalysisSettings, MAGNETIZATION};
use crate::error::{StatError, StatResult};
use crate::models::{Measured, QuantitySummary};
use tracing::{debug, warn};

/// Magnetoresistance selected by history class.
pub const MR_R: &str = "MR_R";
/// Polarization derived from [`MR_R`].
pub const PS_R: &str = "Ps_R";
/// Magnetoresistance derived from the polarization pair.
pub const MR_PS: &str = "MR_Ps";

/// Numeric format of values in sweep tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// `%1.2e`
    Scientific,
    /// `%.2f`
    Fixed,
}

/// One labeled series of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<Measured>,
}

/// Series over a common, ascending field axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    /// Base name of the output files (`<name>_h.dat`).
    pub name: String,
    pub y_label: String,
    pub x: Vec<f64>,
    pub series: Vec<Series>,
    pub format: ValueFormat,
}

impl Sweep {
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

fn y_label(quantity: &str, settings: &AnalysisSettings) -> String {
    match quantity {
        MAGNETIZATION => "m_x".to_string(),
        "P" => "P_s, %".to_string(),
        "Nup" => "N_up".to_string(),
        "Ndown" => "N_down".to_string(),
        "j" => "j".to_string(),
        MR_R | MR_PS => "MR, %".to_string(),
        PS_R => "P_s, %".to_string(),
        q if q == settings.polarization_quantity => "P^R_s, %".to_string(),
        q if q == settings.mr_quantity => "MR, %".to_string(),
        q => q.to_string(),
    }
}

fn value_format(quantity: &str, settings: &AnalysisSettings) -> ValueFormat {
    if quantity == settings.mr_quantity || [MR_R, PS_R, MR_PS].contains(&quantity) {
        ValueFormat::Fixed
    } else {
        ValueFormat::Scientific
    }
}

fn is_percent_quantity(quantity: &str, settings: &AnalysisSettings) -> bool {
    quantity == "P" || quantity == settings.polarization_quantity
}

/// Sweep of one aggregated quantity: one series per column pair.
pub fn quantity_sweep(
    entry: &ConfigurationEntry,
    quantity: &str,
    settings: &AnalysisSettings,
) -> StatResult<Sweep> {
    let sorted = entry.sorted(quantity)?;
    let percent = is_percent_quantity(quantity, settings);

    let pairs = sorted
        .iter()
        .map(|(_, summary)| summary.columns.len())
        .max()
        .unwrap_or(0);
    let labels: &[String] = sorted
        .iter()
        .map(|(_, summary)| summary.labels.as_slice())
        .find(|labels| !labels.is_empty())
        .unwrap_or(&[]);

    let series = (0..pairs)
        .map(|pair| Series {
            label: labels
                .get(pair)
                .cloned()
                .unwrap_or_else(|| format!("col{}", pair)),
            points: sorted
                .iter()
                .map(|(_, summary)| {
                    let point = summary
                        .column(pair)
                        .map(|c| c.as_measured())
                        .unwrap_or_default();
                    if percent {
                        point.as_percent()
                    } else {
                        point
                    }
                })
                .collect(),
        })
        .collect();

    Ok(Sweep {
        name: quantity.to_string(),
        y_label: y_label(quantity, settings),
        x: sorted.iter().map(|(field, _)| field.x).collect(),
        series,
        format: value_format(quantity, settings),
    })
}

fn pair_measured(summary: &QuantitySummary, pair: usize, what: &str) -> StatResult<Measured> {
    summary
        .column(pair)
        .map(|c| c.as_measured())
        .ok_or_else(|| StatError::MissingKey(format!("{} column pair {}", what, pair)))
}

/// Magnetoresistance per field, taken from the LHC or UHC estimate
/// depending on the two magnetization indicators.
///
/// Fields without magnetization data are skipped with a warning.
pub fn history_selected_sweep(
    entry: &ConfigurationEntry,
    settings: &AnalysisSettings,
) -> StatResult<Sweep> {
    let mr = entry.sorted(&settings.mr_quantity)?;
    let magnetization = entry
        .quantities
        .get(MAGNETIZATION)
        .ok_or_else(|| StatError::MissingKey(format!("quantity '{}'", MAGNETIZATION)))?;

    let mut x = Vec::with_capacity(mr.len());
    let mut points = Vec::with_capacity(mr.len());
    for (field, mr_summary) in mr {
        let selected = magnetization
            .get(&field)
            .ok_or_else(|| StatError::MissingKey(format!("{} at {}", MAGNETIZATION, field)))
            .and_then(|m| {
                let m_fst = pair_measured(m, settings.m_first_pair, MAGNETIZATION)?;
                let m_snd = pair_measured(m, settings.m_second_pair, MAGNETIZATION)?;
                let lhc = pair_measured(mr_summary, 0, &settings.mr_quantity)?;
                let uhc = pair_measured(mr_summary, 1, &settings.mr_quantity)?;
                Ok(select_history_class(m_fst.value, m_snd.value, lhc, uhc))
            });

        match selected {
            Ok(point) => {
                x.push(field.x);
                points.push(point);
            }
            Err(e) => warn!("Dropping {} from {}: {}", field, MR_R, e),
        }
    }

    Ok(Sweep {
        name: MR_R.to_string(),
        y_label: y_label(MR_R, settings),
        x,
        series: vec![Series {
            label: "MR_R".to_string(),
            points,
        }],
        format: ValueFormat::Fixed,
    })
}

/// Polarization (percent) derived from a magnetoresistance sweep.
///
/// Only the value is converted to percent; the error stays as propagated.
/// Degenerate points are written as zero.
pub fn polarization_sweep(mr: &Sweep, settings: &AnalysisSettings) -> Sweep {
    let points = mr
        .series
        .first()
        .map(|series| series.points.as_slice())
        .unwrap_or(&[])
        .iter()
        .zip(&mr.x)
        .map(|(&point, x)| match polarization_from_mr(point) {
            Ok(p) => Measured::new(p.value.abs() * 100.0, p.err),
            Err(e) => {
                warn!("{} at h_x = {}: {}", PS_R, x, e);
                Measured::default()
            }
        })
        .collect();

    Sweep {
        name: PS_R.to_string(),
        y_label: y_label(PS_R, settings),
        x: mr.x.clone(),
        series: vec![Series {
            label: "Ps_R".to_string(),
            points,
        }],
        format: ValueFormat::Fixed,
    }
}

/// Magnetoresistance derived from the two polarization estimates.
///
/// Degenerate points are written as zero; fields whose polarization file
/// has fewer than two column pairs are skipped.
pub fn polarization_mr_sweep(
    entry: &ConfigurationEntry,
    settings: &AnalysisSettings,
) -> StatResult<Sweep> {
    let polarization = entry.sorted(&settings.polarization_quantity)?;

    let mut x = Vec::with_capacity(polarization.len());
    let mut points = Vec::with_capacity(polarization.len());
    for (field, summary) in polarization {
        let pair = pair_measured(summary, 0, &settings.polarization_quantity).and_then(|p1| {
            pair_measured(summary, 1, &settings.polarization_quantity).map(|p2| (p1, p2))
        });
        let (p1, p2) = match pair {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Dropping {} from {}: {}", field, MR_PS, e);
                continue;
            }
        };

        let point = match mr_from_polarization(p1, p2) {
            Ok(point) => point,
            Err(e) => {
                warn!("{} at {}: {}", MR_PS, field, e);
                Measured::default()
            }
        };
        x.push(field.x);
        points.push(point);
    }

    Ok(Sweep {
        name: MR_PS.to_string(),
        y_label: y_label(MR_PS, settings),
        x,
        series: vec![Series {
            label: "MR_Ps".to_string(),
            points,
        }],
        format: ValueFormat::Fixed,
    })
}

/// Critical field: the first ascending `h_x` at which the configured
/// magnetization column turns positive.
pub fn critical_field(sweeps: &[Sweep], settings: &AnalysisSettings) -> Option<f64> {
    let magnetization = sweeps.iter().find(|s| s.name == MAGNETIZATION)?;
    let series = magnetization
        .series
        .iter()
        .find(|s| s.label == settings.critical_label)?;

    magnetization
        .x
        .iter()
        .zip(&series.points)
        .find(|(_, point)| point.value > 0.0)
        .map(|(x, _)| *x)
}

/// All sweeps of one configuration: one per recorded quantity, then the
/// derived ones whose inputs are present.
///
/// Missing inputs are logged and the affected sweep is left out.
pub fn build_sweeps(entry: &ConfigurationEntry, settings: &AnalysisSettings) -> StatResult<Vec<Sweep>> {
    let mut sweeps = Vec::new();

    for quantity in entry.quantities.keys() {
        sweeps.push(quantity_sweep(entry, quantity, settings)?);
    }

    match history_selected_sweep(entry, settings) {
        Ok(mr) => {
            let ps = polarization_sweep(&mr, settings);
            sweeps.push(mr);
            sweeps.push(ps);
        }
        Err(e) if e.is_recoverable() => warn!("Skipping {} and {}: {}", MR_R, PS_R, e),
        Err(e) => return Err(e),
    }

    match polarization_mr_sweep(entry, settings) {
        Ok(sweep) => sweeps.push(sweep),
        Err(e) if e.is_recoverable() => warn!("Skipping {}: {}", MR_PS, e),
        Err(e) => return Err(e),
    }

    sweeps.retain(|sweep| {
        if sweep.is_empty() {
            debug!("Sweep {} has no points", sweep.name);
        }
        !sweep.is_empty()
    });
    Ok(sweeps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnStat, Field};

    fn stat(mean: f64, err: f64) -> ColumnStat {
        ColumnStat {
            mean,
            std: err,
            err_mean: 0.0,
            err_std: 0.0,
        }
    }

    fn summary(labels: &[&str], columns: Vec<ColumnStat>) -> QuantitySummary {
        QuantitySummary {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            columns,
        }
    }

    /// Magnetization with six pairs; pairs 1 and 5 carry the indicators.
    fn magnetization(m_fst: f64, m_snd: f64) -> QuantitySummary {
        let mut columns = vec![stat(0.0, 0.0); 6];
        columns[1] = stat(m_fst, 0.01);
        columns[5] = stat(m_snd, 0.01);
        summary(&[], columns)
    }

    fn entry() -> ConfigurationEntry {
        let mut entry = ConfigurationEntry::default();
        let h0 = Field::new(0.0, 0.0, 0.0);
        let h1 = Field::new(0.5, 0.0, 0.0);
        let h2 = Field::new(-0.5, 0.0, 0.0);

        let mr = entry.quantities.entry("MR".to_string()).or_default();
        mr.insert(h1, summary(&["lhc", "uhc"], vec![stat(10.0, 1.0), stat(20.0, 2.0)]));
        mr.insert(h0, QuantitySummary::placeholder(2));
        mr.insert(h2, summary(&["lhc", "uhc"], vec![stat(30.0, 3.0), stat(40.0, 4.0)]));

        let m = entry.quantities.entry(MAGNETIZATION.to_string()).or_default();
        m.insert(h0, magnetization(1.0, 1.0));
        m.insert(h1, magnetization(1.0, 2.0));
        m.insert(h2, magnetization(1.0, -2.0));

        let p = entry.quantities.entry("P_mod".to_string()).or_default();
        p.insert(h1, summary(&["P_1", "P_2"], vec![stat(0.5, 0.05), stat(0.25, 0.025)]));
        p.insert(h0, summary(&["P_1", "P_2"], vec![stat(1.0, 0.0), stat(1.0, 0.0)]));

        entry
    }

    #[test]
    fn test_quantity_sweep_is_field_ordered() {
        let sweep = quantity_sweep(&entry(), "MR", &AnalysisSettings::default()).unwrap();

        assert_eq!(sweep.x, vec![-0.5, 0.0, 0.5]);
        assert_eq!(sweep.series.len(), 2);
        assert_eq!(sweep.series[0].label, "lhc");
        assert_eq!(
            sweep.series[1].points,
            vec![
                Measured::new(40.0, 4.0),
                Measured::new(0.0, 0.0),
                Measured::new(20.0, 2.0)
            ]
        );
        assert_eq!(sweep.format, ValueFormat::Fixed);
    }

    #[test]
    fn test_polarization_quantity_in_percent() {
        let sweep = quantity_sweep(&entry(), "P_mod", &AnalysisSettings::default()).unwrap();
        assert_eq!(sweep.x, vec![0.0, 0.5]);
        assert_eq!(sweep.series[0].points[1], Measured::new(50.0, 5.0));
        assert_eq!(sweep.format, ValueFormat::Scientific);
    }

    #[test]
    fn test_history_selection_per_field() {
        let sweep = history_selected_sweep(&entry(), &AnalysisSettings::default()).unwrap();

        assert_eq!(sweep.x, vec![-0.5, 0.0, 0.5]);
        let points = &sweep.series[0].points;
        // opposite signs: lower class
        assert_eq!(points[0], Measured::new(30.0, 3.0));
        // placeholder at zero field
        assert_eq!(points[1], Measured::new(0.0, 0.0));
        // same sign: upper class
        assert_eq!(points[2], Measured::new(20.0, 2.0));
    }

    #[test]
    fn test_field_without_magnetization_is_dropped() {
        let mut entry = entry();
        entry
            .quantities
            .get_mut(MAGNETIZATION)
            .unwrap()
            .remove(&Field::new(-0.5, 0.0, 0.0));

        let sweep = history_selected_sweep(&entry, &AnalysisSettings::default()).unwrap();
        assert_eq!(sweep.x, vec![0.0, 0.5]);
    }

    #[test]
    fn test_polarization_sweep_guards_zero() {
        let settings = AnalysisSettings::default();
        let mr = history_selected_sweep(&entry(), &settings).unwrap();
        let ps = polarization_sweep(&mr, &settings);

        assert_eq!(ps.x, mr.x);
        assert_eq!(ps.series[0].points[1], Measured::new(0.0, 0.0));

        let expected = (20.0f64 / 220.0).sqrt() * 100.0;
        assert!((ps.series[0].points[2].value - expected).abs() < 1e-9);

        // MR_R = 20 +- 2: error is not scaled with the value
        let err = (2.0 / 20.0 + 2.0 / 220.0) * (20.0f64 / 220.0).sqrt().sqrt() / 2.0;
        assert!((ps.series[0].points[2].err - err).abs() < 1e-12);
        assert!((ps.series[0].points[2].err - 0.02995).abs() < 1e-4);
    }

    #[test]
    fn test_polarization_mr_sweep_guards_unit_product() {
        let sweep = polarization_mr_sweep(&entry(), &AnalysisSettings::default()).unwrap();

        assert_eq!(sweep.x, vec![0.0, 0.5]);
        assert_eq!(sweep.series[0].points[0], Measured::new(0.0, 0.0));
        let tmr = 2.0 * 0.125 / (1.0 - 0.125) * 100.0;
        assert!((sweep.series[0].points[1].value - tmr).abs() < 1e-9);
    }

    #[test]
    fn test_critical_field_first_positive() {
        let settings = AnalysisSettings::default();
        let mut entry = entry();
        let m = entry.quantities.get_mut(MAGNETIZATION).unwrap();
        let labels = ["m1x", "m1y", "m1z", "m2x", "m2y", "m2z"];
        for (h_x, m2x) in [(1.0, 0.9), (-0.5, -0.3), (0.0, 0.0), (0.5, 0.2)] {
            let mut columns = vec![stat(0.0, 0.0); 6];
            columns[3] = stat(m2x, 0.01);
            m.insert(Field::new(h_x, 0.0, 0.0), summary(&labels, columns));
        }

        let sweeps = build_sweeps(&entry, &settings).unwrap();
        assert_eq!(critical_field(&sweeps, &settings), Some(0.5));
    }

    #[test]
    fn test_critical_field_without_column() {
        let settings = AnalysisSettings::default();
        let sweeps = build_sweeps(&entry(), &settings).unwrap();
        assert_eq!(critical_field(&sweeps, &settings), None);

        let mut entry = entry();
        entry.quantities.remove(MAGNETIZATION);
        let sweeps = build_sweeps(&entry, &settings).unwrap();
        assert_eq!(critical_field(&sweeps, &settings), None);
    }

    #[test]
    fn test_build_sweeps_without_magnetization() {
        let mut entry = entry();
        entry.quantities.remove(MAGNETIZATION);
        entry.quantities.remove("P_mod");

        let sweeps = build_sweeps(&entry, &AnalysisSettings::default()).unwrap();
        let names: Vec<&str> = sweeps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["MR"]);
    }

    #[test]
    fn test_build_sweeps_full() {
        let sweeps = build_sweeps(&entry(), &AnalysisSettings::default()).unwrap();
        let names: Vec<&str> = sweeps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["MR", "P_mod", "m", "MR_R", "Ps_R", "MR_Ps"]);
    }
}
