//! Steady-state ("plateau") estimation.
//!
//! Early samples of a relaxation series carry the transient. The estimator
//! greedily strips leading samples whose squared deviation from the running
//! mean is not smaller than the running sum of squares, and reports the mean
//! and standard error of what remains. This is a heuristic, not a
//! changepoint test.

use crate::error::{StatError, StatResult};
use crate::models::{ColumnStat, PlateauResult};

/// Default fraction of the series that may be trimmed.
pub const DEFAULT_N_PARAM: f64 = 0.95;

/// Estimate the plateau of `vals`, trimming at most `ceil(n * n_param)`
/// leading samples.
pub fn find_plateau(vals: &[f64], n_param: f64) -> StatResult<PlateauResult> {
    check_n_param(n_param)?;

    let n = vals.len();
    if n < 2 {
        return Err(StatError::Degenerate(format!(
            "plateau needs at least 2 samples, got {}",
            n
        )));
    }

    let mut mean = mean(vals);
    let mut size = n;
    let mut sq_sum = population_variance(vals, mean) * n as f64 * (n as f64 - 1.0);

    if sq_sum == 0.0 {
        return Ok(PlateauResult {
            mean,
            stderr: 0.0,
            window_size: n,
        });
    }

    let limit = (n as f64 * n_param).ceil() as usize;
    for &val in vals.iter().take(limit) {
        let val_sq_sum = (val - mean).powi(2);
        if val_sq_sum < sq_sum {
            break;
        }
        // mean is updated before sq_sum; the next deviation uses it
        mean = mean * size as f64 - val;
        size -= 1;
        mean /= size as f64;
        sq_sum -= val_sq_sum;
    }

    if size <= 1 {
        return Err(StatError::Degenerate(format!(
            "plateau window shrank to {} sample(s)",
            size
        )));
    }

    Ok(PlateauResult {
        mean,
        stderr: (sq_sum / (size as f64 * (size as f64 - 1.0))).sqrt(),
        window_size: size,
    })
}

/// Plateau of a value column plus the statistics of its per-sample error
/// column over the same trailing window.
pub fn summarize_pair(values: &[f64], errors: &[f64], n_param: f64) -> StatResult<ColumnStat> {
    if values.len() != errors.len() {
        return Err(StatError::InvalidParameter(format!(
            "value and error columns differ in length ({} vs {})",
            values.len(),
            errors.len()
        )));
    }

    let plateau = find_plateau(values, n_param)?;
    let window = &errors[errors.len() - plateau.window_size..];
    let err_mean = mean(window);

    Ok(ColumnStat {
        mean: plateau.mean,
        std: plateau.stderr,
        err_mean,
        err_std: population_variance(window, err_mean).sqrt(),
    })
}

fn check_n_param(n_param: f64) -> StatResult<()> {
    if n_param >= 1.0 {
        return Err(StatError::InvalidParameter(format!(
            "n_param [{}] should be less than 1",
            n_param
        )));
    }
    if !(n_param.is_finite() && n_param > 0.0) {
        return Err(StatError::InvalidParameter(format!(
            "n_param [{}] should be a positive number",
            n_param
        )));
    }
    Ok(())
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(vals: &[f64]) -> f64 {
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn population_variance(vals: &[f64], mean: f64) -> f64 {
    vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / vals.len() as f64
}
