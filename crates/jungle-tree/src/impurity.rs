//! Impurity and error statistics over row subsets.
//!
//! Classification splits are scored by Gini gain (higher is better);
//! regression splits by the summed squared error of the two children
//! around their means (lower is better).

use crate::error::JungleError;
use crate::table::{LabelTable, ResponseTable};

/// Fraction of `rows` whose label equals `label`.
///
/// Returns 0.0 for an empty subset.
///
/// # Errors
///
/// Propagates row lookup errors from the table.
pub fn class_proportion<T: LabelTable + ?Sized>(
    table: &T,
    label: &str,
    rows: &[usize],
) -> Result<f64, JungleError> {
    if rows.is_empty() {
        return Ok(0.0);
    }
    let mut matches = 0usize;
    for &row in rows {
        if table.label(row)? == label {
            matches += 1;
        }
    }
    Ok(matches as f64 / rows.len() as f64)
}

/// Gini impurity `1 - Σ p(label)²` of `rows`, over the labels in `labels`.
///
/// Only the listed labels contribute, so a restricted label set yields a
/// larger value than the full one would.
///
/// # Errors
///
/// [`JungleError::NegativeImpurity`] if the sum of squared proportions
/// exceeds one, plus propagated table errors.
pub fn gini<T: LabelTable + ?Sized>(
    table: &T,
    labels: &[String],
    rows: &[usize],
) -> Result<f64, JungleError> {
    let mut value = 1.0;
    for label in labels {
        let p = class_proportion(table, label, rows)?;
        value -= p * p;
    }
    if value < 0.0 {
        return Err(JungleError::NegativeImpurity { value });
    }
    Ok(value)
}

/// Size-weighted mean of the children's Gini impurities.
///
/// The parent size is `left.len() + right.len()`.
///
/// # Errors
///
/// Propagates errors from [`gini`].
pub fn weighted_child_impurity<T: LabelTable + ?Sized>(
    table: &T,
    labels: &[String],
    left: &[usize],
    right: &[usize],
) -> Result<f64, JungleError> {
    let parent = (left.len() + right.len()) as f64;
    if parent == 0.0 {
        return Ok(0.0);
    }
    let left_gini = gini(table, labels, left)?;
    let right_gini = gini(table, labels, right)?;
    Ok(left.len() as f64 / parent * left_gini + right.len() as f64 / parent * right_gini)
}

/// Decrease in Gini impurity from `parent` to its `left`/`right` partition.
///
/// # Errors
///
/// Propagates errors from [`gini`].
pub fn gini_gain<T: LabelTable + ?Sized>(
    table: &T,
    labels: &[String],
    parent: &[usize],
    left: &[usize],
    right: &[usize],
) -> Result<f64, JungleError> {
    Ok(gini(table, labels, parent)? - weighted_child_impurity(table, labels, left, right)?)
}

/// Most frequent label among `rows`.
///
/// Ties go to the label seen first while scanning `rows` in order.
///
/// # Errors
///
/// [`JungleError::EmptySubset`] when `rows` is empty.
pub fn majority_label<T: LabelTable + ?Sized>(
    table: &T,
    rows: &[usize],
) -> Result<String, JungleError> {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for &row in rows {
        let label = table.label(row)?;
        match tally.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => tally.push((label, 1)),
        }
    }
    first_strict_max(&tally)
        .map(str::to_string)
        .ok_or(JungleError::EmptySubset {
            statistic: "majority label",
        })
}

/// Return the first entry whose count is strictly greater than every earlier one.
pub(crate) fn first_strict_max<'a>(tally: &[(&'a str, usize)]) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for &(label, count) in tally {
        if best.is_none_or(|(_, max)| count > max) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}

/// Arithmetic mean of the response over `rows`.
///
/// # Errors
///
/// [`JungleError::EmptySubset`] when `rows` is empty.
pub fn average<T: ResponseTable + ?Sized>(table: &T, rows: &[usize]) -> Result<f64, JungleError> {
    if rows.is_empty() {
        return Err(JungleError::EmptySubset { statistic: "average" });
    }
    let mut sum = 0.0;
    for &row in rows {
        sum += table.response(row)?;
    }
    Ok(sum / rows.len() as f64)
}

/// Squared error of each side around its own mean, summed over both sides.
///
/// # Errors
///
/// [`JungleError::EmptySubset`] when either side is empty.
pub fn sum_squared_error<T: ResponseTable + ?Sized>(
    table: &T,
    left: &[usize],
    right: &[usize],
) -> Result<f64, JungleError> {
    let mut total = 0.0;
    for side in [left, right] {
        let mean = average(table, side)?;
        for &row in side {
            let diff = table.response(row)? - mean;
            total += diff * diff;
        }
    }
    Ok(total)
}
