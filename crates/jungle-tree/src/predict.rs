//! Aggregation of per-tree predictions into one prediction per row.

use crate::error::JungleError;
use crate::impurity::first_strict_max;

/// Check that there is at least one list and that all lists share a length.
fn common_length<P>(per_tree: &[Vec<P>]) -> Result<usize, JungleError> {
    let Some(first) = per_tree.first() else {
        return Err(JungleError::EmptyEnsemble);
    };
    let expected = first.len();
    for (index, list) in per_tree.iter().enumerate() {
        if list.len() != expected {
            return Err(JungleError::PredictionLengthMismatch {
                index,
                expected,
                got: list.len(),
            });
        }
    }
    Ok(expected)
}

/// Majority vote across trees, position by position.
///
/// Ties go to the label first seen when reading the trees in order.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`JungleError::EmptyEnsemble`] | `per_tree` is empty |
/// | [`JungleError::PredictionLengthMismatch`] | the lists differ in length |
pub fn vote(per_tree: &[Vec<String>]) -> Result<Vec<String>, JungleError> {
    let n = common_length(per_tree)?;
    let mut out = Vec::with_capacity(n);
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for i in 0..n {
        tally.clear();
        for list in per_tree {
            let label = list[i].as_str();
            match tally.iter_mut().find(|(seen, _)| *seen == label) {
                Some((_, count)) => *count += 1,
                None => tally.push((label, 1)),
            }
        }
        // `per_tree` is non-empty, so the tally always has a winner.
        if let Some(winner) = first_strict_max(&tally) {
            out.push(winner.to_string());
        }
    }
    Ok(out)
}

/// Arithmetic mean across trees, position by position.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`JungleError::EmptyEnsemble`] | `per_tree` is empty |
/// | [`JungleError::PredictionLengthMismatch`] | the lists differ in length |
pub fn average(per_tree: &[Vec<f64>]) -> Result<Vec<f64>, JungleError> {
    let n = common_length(per_tree)?;
    let mut sums = vec![0.0; n];
    for list in per_tree {
        for (sum, value) in sums.iter_mut().zip(list) {
            *sum += value;
        }
    }
    let count = per_tree.len() as f64;
    Ok(sums.into_iter().map(|s| s / count).collect())
}
