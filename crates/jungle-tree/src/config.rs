//! Configuration builder for jungle training.

use crate::error::JungleError;
use crate::jungle::{ClassificationJungle, RegressionJungle};
use crate::table::{LabelTable, ResponseTable};
use crate::tree::{TreeConfig, validate_min_split_fraction};

/// Configuration for a bagged ensemble of decision trees.
///
/// Construct via [`JungleConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter            | Default |
/// |----------------------|---------|
/// | `max_depth`          | 10      |
/// | `min_split_fraction` | 0.05    |
/// | `seed`               | 42      |
#[derive(Debug, Clone)]
pub struct JungleConfig {
    pub(crate) tree_count: usize,
    pub(crate) bootstrap_size: usize,
    pub(crate) max_depth: usize,
    pub(crate) min_split_fraction: f64,
    pub(crate) seed: u64,
}

impl JungleConfig {
    /// Create a config growing `tree_count` trees, each rooted on
    /// `bootstrap_size` distinct rows drawn without replacement.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`JungleError::InvalidTreeCount`] | `tree_count` is zero |
    /// | [`JungleError::InvalidBootstrapSize`] | `bootstrap_size` is zero |
    pub fn new(tree_count: usize, bootstrap_size: usize) -> Result<Self, JungleError> {
        if tree_count == 0 {
            return Err(JungleError::InvalidTreeCount { tree_count });
        }
        if bootstrap_size == 0 {
            return Err(JungleError::InvalidBootstrapSize { bootstrap_size });
        }
        Ok(Self {
            tree_count,
            bootstrap_size,
            max_depth: 10,
            min_split_fraction: 0.05,
            seed: 42,
        })
    }

    // --- Setters ---

    /// Set the maximum depth of every tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the node-size fraction below which trees stop splitting.
    ///
    /// # Errors
    ///
    /// [`JungleError::InvalidMinSplitFraction`] unless `0.0 < fraction <= 1.0`.
    pub fn with_min_split_fraction(mut self, fraction: f64) -> Result<Self, JungleError> {
        validate_min_split_fraction(fraction)?;
        self.min_split_fraction = fraction;
        Ok(self)
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.tree_count
    }

    /// Return the number of rows sampled for each tree's root.
    #[must_use]
    pub fn bootstrap_size(&self) -> usize {
        self.bootstrap_size
    }

    /// Return the maximum depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the minimum split fraction.
    #[must_use]
    pub fn min_split_fraction(&self) -> f64 {
        self.min_split_fraction
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_split_fraction: self.min_split_fraction,
        }
    }

    /// Train a classification jungle.
    ///
    /// Each tree scores its splits against a random `⌊√k⌋` subset of the
    /// table's `k` labels, redrawn after every split.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`JungleError::BootstrapTooLarge`] | `bootstrap_size` exceeds the table's rows |
    /// | [`JungleError::NoFeatures`] | `table` has zero feature columns |
    /// | tree errors | propagated from the first failing tree |
    pub fn fit_classifier<T: LabelTable + Sync + ?Sized>(
        &self,
        table: &T,
    ) -> Result<ClassificationJungle, JungleError> {
        crate::jungle::train_classifier(self, table)
    }

    /// Train a regression jungle.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`JungleError::BootstrapTooLarge`] | `bootstrap_size` exceeds the table's rows |
    /// | [`JungleError::NoFeatures`] | `table` has zero feature columns |
    /// | tree errors | propagated from the first failing tree |
    pub fn fit_regressor<T: ResponseTable + Sync + ?Sized>(
        &self,
        table: &T,
    ) -> Result<RegressionJungle, JungleError> {
        crate::jungle::train_regressor(self, table)
    }
}
