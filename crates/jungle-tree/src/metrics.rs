//! Goodness-of-fit scores for predictions against known targets.

use crate::error::JungleError;

fn check_pair<A, B>(predicted: &[A], actual: &[B]) -> Result<(), JungleError> {
    if predicted.len() != actual.len() {
        return Err(JungleError::TargetLengthMismatch {
            predicted: predicted.len(),
            actual: actual.len(),
        });
    }
    if actual.is_empty() {
        return Err(JungleError::EmptyDataset);
    }
    Ok(())
}

/// Fraction of positions where the predicted label equals the actual one.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`JungleError::TargetLengthMismatch`] | slices differ in length |
/// | [`JungleError::EmptyDataset`] | zero labels provided |
pub fn accuracy<S: AsRef<str>>(predicted: &[S], actual: &[S]) -> Result<f64, JungleError> {
    check_pair(predicted, actual)?;
    let correct = predicted
        .iter()
        .zip(actual)
        .filter(|(p, a)| p.as_ref() == a.as_ref())
        .count();
    Ok(correct as f64 / actual.len() as f64)
}

/// Mean absolute error.
///
/// # Errors
///
/// Same as [`accuracy`].
pub fn mean_absolute_error(predicted: &[f64], actual: &[f64]) -> Result<f64, JungleError> {
    check_pair(predicted, actual)?;
    let total: f64 = predicted.iter().zip(actual).map(|(p, a)| (p - a).abs()).sum();
    Ok(total / actual.len() as f64)
}

/// Mean squared error.
///
/// # Errors
///
/// Same as [`accuracy`].
pub fn mean_squared_error(predicted: &[f64], actual: &[f64]) -> Result<f64, JungleError> {
    check_pair(predicted, actual)?;
    let total: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a) * (p - a))
        .sum();
    Ok(total / actual.len() as f64)
}

/// Root mean squared error.
///
/// # Errors
///
/// Same as [`accuracy`].
pub fn root_mean_squared_error(predicted: &[f64], actual: &[f64]) -> Result<f64, JungleError> {
    mean_squared_error(predicted, actual).map(f64::sqrt)
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// A constant target has no variance to explain: the score is 1.0 for a
/// perfect fit and 0.0 otherwise.
///
/// # Errors
///
/// Same as [`accuracy`].
pub fn r_squared(predicted: &[f64], actual: &[f64]) -> Result<f64, JungleError> {
    check_pair(predicted, actual)?;
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();
    let ss_res: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (a - p) * (a - p))
        .sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}
