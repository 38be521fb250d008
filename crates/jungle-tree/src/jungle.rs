//! Jungle training with parallel tree construction.

use rayon::iter::{IntoParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::JungleConfig;
use crate::error::JungleError;
use crate::predict::{average, vote};
use crate::sample::Sampler;
use crate::table::{FeatureTable, LabelTable, ResponseTable};
use crate::tree::{DecisionTree, Origin, grow_classifier, grow_regressor};

/// A fitted bag of decision trees.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Jungle<P> {
    pub(crate) trees: Vec<DecisionTree<P>>,
    pub(crate) feature_names: Vec<String>,
    pub(crate) bootstrap_size: usize,
    pub(crate) seed: u64,
}

/// A jungle of classification trees, aggregated by majority vote.
pub type ClassificationJungle = Jungle<String>;

/// A jungle of regression trees, aggregated by averaging.
pub type RegressionJungle = Jungle<f64>;

/// Draw one seed per tree from the master RNG, in tree order.
fn tree_seeds(config: &JungleConfig) -> Vec<u64> {
    let mut master = Sampler::seeded(config.seed);
    (0..config.tree_count).map(|_| master.next_seed()).collect()
}

fn check_bootstrap<T: FeatureTable + ?Sized>(
    config: &JungleConfig,
    table: &T,
) -> Result<(), JungleError> {
    if config.bootstrap_size > table.n_rows() {
        return Err(JungleError::BootstrapTooLarge {
            requested: config.bootstrap_size,
            available: table.n_rows(),
        });
    }
    Ok(())
}

/// Seed a tree's sampler and draw its root rows.
fn jungle_origin(seed: u64, n_rows: usize, bootstrap_size: usize) -> Result<Origin, JungleError> {
    let mut sampler = Sampler::seeded(seed);
    let root_rows = sampler.rows(n_rows, bootstrap_size)?;
    Ok(Origin::Jungle { root_rows, sampler })
}

#[instrument(skip_all, fields(tree_count = config.tree_count, n_rows = table.n_rows()))]
pub(crate) fn train_classifier<T: LabelTable + Sync + ?Sized>(
    config: &JungleConfig,
    table: &T,
) -> Result<ClassificationJungle, JungleError> {
    check_bootstrap(config, table)?;
    info!(
        tree_count = config.tree_count,
        bootstrap_size = config.bootstrap_size,
        n_labels = table.distinct_labels().len(),
        "training classification jungle"
    );

    let tree_config = config.tree_config();
    let n_rows = table.n_rows();
    let bootstrap_size = config.bootstrap_size;
    let trees = tree_seeds(config)
        .into_par_iter()
        .map(|seed| {
            let origin = jungle_origin(seed, n_rows, bootstrap_size)?;
            grow_classifier(table, &tree_config, origin)
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(n_trees_trained = trees.len(), "tree training complete");
    Ok(Jungle::new(trees, table, config))
}

#[instrument(skip_all, fields(tree_count = config.tree_count, n_rows = table.n_rows()))]
pub(crate) fn train_regressor<T: ResponseTable + Sync + ?Sized>(
    config: &JungleConfig,
    table: &T,
) -> Result<RegressionJungle, JungleError> {
    check_bootstrap(config, table)?;
    info!(
        tree_count = config.tree_count,
        bootstrap_size = config.bootstrap_size,
        "training regression jungle"
    );

    let tree_config = config.tree_config();
    let n_rows = table.n_rows();
    let bootstrap_size = config.bootstrap_size;
    let trees = tree_seeds(config)
        .into_par_iter()
        .map(|seed| {
            let origin = jungle_origin(seed, n_rows, bootstrap_size)?;
            grow_regressor(table, &tree_config, origin)
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(n_trees_trained = trees.len(), "tree training complete");
    Ok(Jungle::new(trees, table, config))
}

impl<P> Jungle<P> {
    fn new<T: FeatureTable + ?Sized>(
        trees: Vec<DecisionTree<P>>,
        table: &T,
        config: &JungleConfig,
    ) -> Self {
        Self {
            trees,
            feature_names: table.feature_names().to_vec(),
            bootstrap_size: config.bootstrap_size,
            seed: config.seed,
        }
    }

    /// Predict every row of `table` with every tree, in tree order.
    ///
    /// # Errors
    ///
    /// Propagates table lookup errors from the first failing tree.
    pub fn predict_per_tree<T: FeatureTable + Sync + ?Sized>(
        &self,
        table: &T,
    ) -> Result<Vec<Vec<P>>, JungleError>
    where
        P: Clone + Send + Sync,
    {
        self.trees
            .par_iter()
            .map(|tree| tree.predict(table))
            .collect()
    }

    /// Borrow the member trees in training order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree<P>] {
        &self.trees
    }

    /// Return the number of trees in the jungle.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the number of rows each tree was rooted on.
    #[must_use]
    pub fn bootstrap_size(&self) -> usize {
        self.bootstrap_size
    }

    /// Return the seed the jungle was trained with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Jungle<String> {
    /// Predict every row of `table` by majority vote over the trees.
    ///
    /// # Errors
    ///
    /// Propagates table lookup errors and [`vote`] errors.
    pub fn predict<T: FeatureTable + Sync + ?Sized>(
        &self,
        table: &T,
    ) -> Result<Vec<String>, JungleError> {
        vote(&self.predict_per_tree(table)?)
    }
}

impl Jungle<f64> {
    /// Predict every row of `table` as the mean of the trees' predictions.
    ///
    /// # Errors
    ///
    /// Propagates table lookup errors and [`average`] errors.
    pub fn predict<T: FeatureTable + Sync + ?Sized>(&self, table: &T) -> Result<Vec<f64>, JungleError> {
        average(&self.predict_per_tree(table)?)
    }
}
