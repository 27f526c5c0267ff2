//! Tab-separated sweep tables.

use crate::analysis::sweep::{Sweep, ValueFormat};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Format like C's `%1.2e`: two decimals, signed exponent of at least two
/// digits (`1.50e+00`).
pub fn format_scientific(value: f64) -> String {
    if let Some(special) = non_finite(value) {
        return special;
    }

    let raw = format!("{:.2e}", value);
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => raw,
    }
}

/// Format like C's `%.2f`.
pub fn format_fixed(value: f64) -> String {
    non_finite(value).unwrap_or_else(|| format!("{:.2}", value))
}

fn non_finite(value: f64) -> Option<String> {
    if value.is_nan() {
        Some("nan".to_string())
    } else if value.is_infinite() {
        Some(if value > 0.0 { "inf" } else { "-inf" }.to_string())
    } else {
        None
    }
}

pub fn format_value(value: f64, format: ValueFormat) -> String {
    match format {
        ValueFormat::Scientific => format_scientific(value),
        ValueFormat::Fixed => format_fixed(value),
    }
}

/// Render a sweep as a table: a `t` header with a label/err column pair per
/// series, then one row per field point.
pub fn render_sweep_table(sweep: &Sweep) -> String {
    let mut output = String::from("t");
    for series in &sweep.series {
        output.push_str(&format!("\t{}\t\terr\t", series.label));
    }
    output.push('\n');

    for (row, x) in sweep.x.iter().enumerate() {
        output.push_str(&format_fixed(*x));
        output.push('\t');
        for series in &sweep.series {
            if let Some(point) = series.points.get(row) {
                output.push_str(&format_value(point.value, sweep.format));
                output.push('\t');
                output.push_str(&format_value(point.err, sweep.format));
                output.push('\t');
            }
        }
        output.push('\n');
    }

    output
}

/// Path of the table file for a sweep inside `dir`.
pub fn sweep_table_path(dir: &Path, sweep: &Sweep) -> PathBuf {
    dir.join(format!("{}_h.dat", sweep.name))
}

/// Write `<name>_h.dat` into `dir`.
pub fn write_sweep_table(sweep: &Sweep, dir: &Path) -> Result<PathBuf> {
    let path = sweep_table_path(dir, sweep);
    std::fs::write(&path, render_sweep_table(sweep))
        .with_context(|| format!("Failed to write table {}", path.display()))?;
    Ok(path)
}
