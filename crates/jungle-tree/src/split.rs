use crate::error::JungleError;
use crate::impurity::{gini_gain, sum_squared_error};
use crate::table::{FeatureTable, LabelTable, ResponseTable};

/// Number of equal steps the threshold grid divides a feature's range into.
pub const THRESHOLD_STEPS: usize = 50;

/// Scores candidate partitions of a node and decides which score wins.
pub trait Criterion<T: FeatureTable + ?Sized> {
    /// Whether rows equal to the subset minimum are forced left while scoring.
    const MIN_GOES_LEFT: bool;

    /// Score the partition of `parent` into `left` and `right`.
    ///
    /// # Errors
    ///
    /// Propagates impurity and table errors.
    fn score(
        &self,
        table: &T,
        parent: &[usize],
        left: &[usize],
        right: &[usize],
    ) -> Result<f64, JungleError>;

    /// Return `true` if `candidate` is strictly better than `best`.
    fn improves(&self, candidate: f64, best: f64) -> bool;
}

/// Gini gain over a label set; higher is better.
#[derive(Debug, Clone, Copy)]
pub struct Gini<'a> {
    labels: &'a [String],
}

impl<'a> Gini<'a> {
    /// Score splits using only the given labels.
    #[must_use]
    pub fn new(labels: &'a [String]) -> Self {
        Self { labels }
    }
}

impl<T: LabelTable + ?Sized> Criterion<T> for Gini<'_> {
    const MIN_GOES_LEFT: bool = false;

    fn score(
        &self,
        table: &T,
        parent: &[usize],
        left: &[usize],
        right: &[usize],
    ) -> Result<f64, JungleError> {
        gini_gain(table, self.labels, parent, left, right)
    }

    fn improves(&self, candidate: f64, best: f64) -> bool {
        candidate > best
    }
}

/// Summed squared error of both children; lower is better.
///
/// While scoring, rows at the subset minimum always fall on the left, so the
/// first grid point never leaves the left side empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredError;

impl<T: ResponseTable + ?Sized> Criterion<T> for SquaredError {
    const MIN_GOES_LEFT: bool = true;

    fn score(
        &self,
        table: &T,
        _parent: &[usize],
        left: &[usize],
        right: &[usize],
    ) -> Result<f64, JungleError> {
        sum_squared_error(table, left, right)
    }

    fn improves(&self, candidate: f64, best: f64) -> bool {
        candidate < best
    }
}

/// Best quality found for one feature and the threshold that achieved it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdScore {
    /// Winning split quality.
    pub quality: f64,
    /// Winning threshold; 0.0 when the feature is constant over the subset.
    pub threshold: f64,
}

/// Best split over all features of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSplit {
    /// Winning feature column.
    pub feature: String,
    /// Quality of the winning split.
    pub quality: f64,
    /// Threshold of the winning split.
    pub threshold: f64,
}

/// Scan a fixed threshold grid over one feature and keep the best split.
///
/// The grid is `min + k * (max - min) / 50` for `k` in `0..50`, where
/// `min`/`max` are taken over `rows`. All grid points sharing the best
/// quality are collected in grid order and the middle one (index
/// `count / 2`) is returned. A feature that is constant over `rows` yields
/// quality 0.0 and threshold 0.0.
///
/// # Errors
///
/// Propagates table and scoring errors.
pub fn best_threshold<T, C>(
    table: &T,
    criterion: &C,
    feature: &str,
    rows: &[usize],
) -> Result<ThresholdScore, JungleError>
where
    T: FeatureTable + ?Sized,
    C: Criterion<T>,
{
    let values = rows
        .iter()
        .map(|&row| table.value(row, feature))
        .collect::<Result<Vec<f64>, _>>()?;

    let Some((min, max)) = min_max(&values) else {
        return Ok(ThresholdScore {
            quality: 0.0,
            threshold: 0.0,
        });
    };
    if min == max {
        return Ok(ThresholdScore {
            quality: 0.0,
            threshold: 0.0,
        });
    }

    let step = (max - min) / THRESHOLD_STEPS as f64;
    let mut best = 0.0;
    let mut winners: Vec<f64> = Vec::new();
    let mut left = Vec::with_capacity(rows.len());
    let mut right = Vec::with_capacity(rows.len());

    for k in 0..THRESHOLD_STEPS {
        let threshold = min + k as f64 * step;
        left.clear();
        right.clear();
        for (&row, &value) in rows.iter().zip(&values) {
            if value < threshold || (<C as Criterion<T>>::MIN_GOES_LEFT && value == min) {
                left.push(row);
            } else {
                right.push(row);
            }
        }

        let quality = criterion.score(table, rows, &left, &right)?;
        if k == 0 || criterion.improves(quality, best) {
            best = quality;
            winners.clear();
            winners.push(threshold);
        } else if quality == best {
            winners.push(threshold);
        }
    }

    Ok(ThresholdScore {
        quality: best,
        threshold: winners[winners.len() / 2],
    })
}

/// Run [`best_threshold`] on every feature column and keep the best.
///
/// The first feature is always accepted; a later feature replaces it only
/// when its quality is strictly better.
///
/// # Errors
///
/// [`JungleError::NoFeatures`] for a table without feature columns, plus
/// errors from [`best_threshold`].
pub fn best_split<T, C>(table: &T, criterion: &C, rows: &[usize]) -> Result<FeatureSplit, JungleError>
where
    T: FeatureTable + ?Sized,
    C: Criterion<T>,
{
    let mut best: Option<FeatureSplit> = None;
    for feature in table.feature_names() {
        let score = best_threshold(table, criterion, feature, rows)?;
        let accept = match &best {
            None => true,
            Some(current) => criterion.improves(score.quality, current.quality),
        };
        if accept {
            best = Some(FeatureSplit {
                feature: feature.clone(),
                quality: score.quality,
                threshold: score.threshold,
            });
        }
    }
    best.ok_or(JungleError::NoFeatures)
}

/// Partition `rows` into `value < threshold` (left) and the rest (right).
///
/// # Errors
///
/// Propagates table lookup errors.
pub fn partition<T: FeatureTable + ?Sized>(
    table: &T,
    feature: &str,
    threshold: f64,
    rows: &[usize],
) -> Result<(Vec<usize>, Vec<usize>), JungleError> {
    let mut left = Vec::with_capacity(rows.len() / 2);
    let mut right = Vec::with_capacity(rows.len() / 2);
    for &row in rows {
        if table.value(row, feature)? < threshold {
            left.push(row);
        } else {
            right.push(row);
        }
    }
    Ok((left, right))
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let (&first, rest) = values.split_first()?;
    Some(
        rest.iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}
