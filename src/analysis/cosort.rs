//! Pairwise sorting of a key sequence with its dependent values.

use crate::error::{StatError, StatResult};
use std::cmp::Ordering;

/// Reorder `keys` and `values` by ascending key, keeping each pair together.
///
/// The sort is stable; keys that cannot be compared (NaN) keep their
/// relative order. `keys` is copied, so the same key slice can be reused
/// for every dependent sequence.
pub fn cosort<K, V>(keys: &[K], values: Vec<V>) -> StatResult<(Vec<K>, Vec<V>)>
where
    K: Copy + PartialOrd,
{
    if keys.len() != values.len() {
        return Err(StatError::InvalidParameter(format!(
            "cosort needs equal lengths, got {} keys and {} values",
            keys.len(),
            values.len()
        )));
    }

    let mut pairs: Vec<(K, V)> = keys.iter().copied().zip(values).collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    Ok(pairs.into_iter().unzip())
}
