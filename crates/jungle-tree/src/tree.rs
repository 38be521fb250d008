use tracing::{debug, instrument};

use crate::{
    JungleError,
    impurity::{average, majority_label},
    node::{Node, NodeIndex},
    sample::Sampler,
    split::{FeatureSplit, Gini, SquaredError, best_split, partition},
    table::{FeatureTable, LabelTable, ResponseTable},
};

/// Classification splits whose Gini gain falls below this become leaves.
pub const MIN_GINI_GAIN: f64 = 0.05;

/// Configuration for a single decision tree.
///
/// Construct via [`TreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter            | Default                 |
/// |----------------------|-------------------------|
/// | `min_split_fraction` | 0.0 (no fraction stop)  |
#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub(crate) max_depth: usize,
    pub(crate) min_split_fraction: f64,
}

impl TreeConfig {
    /// Create a config that grows at most `max_depth` levels below the root.
    ///
    /// A `max_depth` of 0 yields a single leaf.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            min_split_fraction: 0.0,
        }
    }

    /// Set the maximum tree depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Stop splitting nodes holding fewer than `fraction` of the table's rows.
    ///
    /// Setting 0.05 turns every node with less than 5% of the rows into a leaf.
    ///
    /// # Errors
    ///
    /// [`JungleError::InvalidMinSplitFraction`] unless `0.0 < fraction <= 1.0`.
    pub fn with_min_split_fraction(mut self, fraction: f64) -> Result<Self, JungleError> {
        validate_min_split_fraction(fraction)?;
        self.min_split_fraction = fraction;
        Ok(self)
    }

    /// Return the maximum depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the minimum split fraction (0.0 when unset).
    #[must_use]
    pub fn min_split_fraction(&self) -> f64 {
        self.min_split_fraction
    }

    /// Grow a classification tree over every row of `table`.
    ///
    /// Splits are scored by Gini gain over all labels present in the table.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`JungleError::EmptyTable`] | `table` has zero rows |
    /// | [`JungleError::NoFeatures`] | `table` has zero feature columns |
    /// | [`JungleError::NegativeImpurity`] | an impurity computation goes negative |
    /// | table errors | propagated unchanged |
    #[instrument(skip_all, fields(n_rows = table.n_rows(), max_depth = self.max_depth))]
    pub fn fit_classifier<T: LabelTable + ?Sized>(
        &self,
        table: &T,
    ) -> Result<ClassificationTree, JungleError> {
        grow_classifier(table, self, Origin::Standalone)
    }

    /// Grow a regression tree over every row of `table`.
    ///
    /// Splits minimise the summed squared error of the two children.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`JungleError::EmptyTable`] | `table` has zero rows |
    /// | [`JungleError::NoFeatures`] | `table` has zero feature columns |
    /// | table errors | propagated unchanged |
    #[instrument(skip_all, fields(n_rows = table.n_rows(), max_depth = self.max_depth))]
    pub fn fit_regressor<T: ResponseTable + ?Sized>(
        &self,
        table: &T,
    ) -> Result<RegressionTree, JungleError> {
        grow_regressor(table, self, Origin::Standalone)
    }
}

pub(crate) fn validate_min_split_fraction(fraction: f64) -> Result<(), JungleError> {
    if fraction <= 0.0 || fraction > 1.0 || fraction.is_nan() {
        return Err(JungleError::InvalidMinSplitFraction { fraction });
    }
    Ok(())
}

/// Where a tree's root rows come from.
pub(crate) enum Origin {
    /// Every row of the table, scored against the full label set.
    Standalone,
    /// A jungle member: a bootstrap root sample, and a sampler that redraws
    /// the label subspace at the root and at every split.
    Jungle { root_rows: Vec<usize>, sampler: Sampler },
}

/// What differs between growing a classification and a regression tree.
trait Growth<T: ?Sized> {
    type Prediction: Default;
    /// Per-node state handed from a split node to both of its children.
    type Scope: Clone;

    fn leaf(&self, table: &T, rows: &[usize]) -> Result<Self::Prediction, JungleError>;

    /// Choose a split, or `None` when the node should become a leaf.
    fn split(
        &self,
        table: &T,
        scope: &Self::Scope,
        rows: &[usize],
    ) -> Result<Option<FeatureSplit>, JungleError>;

    fn child_scope(&mut self, scope: &Self::Scope) -> Self::Scope;
}

struct ClassGrowth {
    all_labels: Vec<String>,
    sampler: Option<Sampler>,
}

impl<T: LabelTable + ?Sized> Growth<T> for ClassGrowth {
    type Prediction = String;
    type Scope = Vec<String>;

    fn leaf(&self, table: &T, rows: &[usize]) -> Result<String, JungleError> {
        majority_label(table, rows)
    }

    fn split(
        &self,
        table: &T,
        labels: &Vec<String>,
        rows: &[usize],
    ) -> Result<Option<FeatureSplit>, JungleError> {
        let split = best_split(table, &Gini::new(labels), rows)?;
        if split.quality < MIN_GINI_GAIN {
            return Ok(None);
        }
        Ok(Some(split))
    }

    fn child_scope(&mut self, labels: &Vec<String>) -> Vec<String> {
        match &mut self.sampler {
            Some(sampler) => sampler.label_subspace(&self.all_labels),
            None => labels.clone(),
        }
    }
}

struct ValueGrowth;

impl<T: ResponseTable + ?Sized> Growth<T> for ValueGrowth {
    type Prediction = f64;
    type Scope = ();

    fn leaf(&self, table: &T, rows: &[usize]) -> Result<f64, JungleError> {
        average(table, rows)
    }

    fn split(&self, table: &T, _: &(), rows: &[usize]) -> Result<Option<FeatureSplit>, JungleError> {
        best_split(table, &SquaredError, rows).map(Some)
    }

    fn child_scope(&mut self, _: &()) {}
}

pub(crate) fn grow_classifier<T: LabelTable + ?Sized>(
    table: &T,
    config: &TreeConfig,
    origin: Origin,
) -> Result<ClassificationTree, JungleError> {
    check_table(table)?;
    let all_labels = table.distinct_labels();
    let (root_rows, root_labels, mut growth, in_jungle) = match origin {
        Origin::Standalone => {
            let rows = (0..table.n_rows()).collect();
            let growth = ClassGrowth {
                all_labels: all_labels.clone(),
                sampler: None,
            };
            (rows, all_labels, growth, false)
        }
        Origin::Jungle {
            root_rows,
            mut sampler,
        } => {
            let labels = sampler.label_subspace(&all_labels);
            let growth = ClassGrowth {
                all_labels,
                sampler: Some(sampler),
            };
            (root_rows, labels, growth, true)
        }
    };
    debug!(
        n_labels = root_labels.len(),
        n_root_rows = root_rows.len(),
        in_jungle,
        "growing classification tree"
    );
    let nodes = grow(table, &mut growth, root_rows, root_labels, config)?;
    Ok(DecisionTree::new(nodes, table, config, in_jungle))
}

pub(crate) fn grow_regressor<T: ResponseTable + ?Sized>(
    table: &T,
    config: &TreeConfig,
    origin: Origin,
) -> Result<RegressionTree, JungleError> {
    check_table(table)?;
    let (root_rows, in_jungle) = match origin {
        Origin::Standalone => ((0..table.n_rows()).collect(), false),
        Origin::Jungle { root_rows, .. } => (root_rows, true),
    };
    debug!(n_root_rows = root_rows.len(), in_jungle, "growing regression tree");
    let nodes = grow(table, &mut ValueGrowth, root_rows, (), config)?;
    Ok(DecisionTree::new(nodes, table, config, in_jungle))
}

fn check_table<T: FeatureTable + ?Sized>(table: &T) -> Result<(), JungleError> {
    if table.n_rows() == 0 {
        return Err(JungleError::EmptyTable);
    }
    if table.feature_names().is_empty() {
        return Err(JungleError::NoFeatures);
    }
    Ok(())
}

/// A node awaiting its leaf-or-split decision.
struct Candidate<S> {
    slot: usize,
    depth: usize,
    rows: Vec<usize>,
    scope: S,
}

/// Grow the arena depth-first with an explicit stack.
///
/// Each slot is reserved with a placeholder leaf when its parent splits and
/// overwritten once the candidate is popped. The left subtree is completed
/// before the right one.
fn grow<T, G>(
    table: &T,
    growth: &mut G,
    root_rows: Vec<usize>,
    root_scope: G::Scope,
    config: &TreeConfig,
) -> Result<Vec<Node<G::Prediction>>, JungleError>
where
    T: FeatureTable + ?Sized,
    G: Growth<T>,
{
    let min_rows = config.min_split_fraction * table.n_rows() as f64;
    let mut arena = vec![placeholder(0)];
    let mut stack = vec![Candidate {
        slot: 0,
        depth: 0,
        rows: root_rows,
        scope: root_scope,
    }];

    while let Some(Candidate {
        slot,
        depth,
        rows,
        scope,
    }) = stack.pop()
    {
        if depth >= config.max_depth || (rows.len() as f64) < min_rows {
            arena[slot] = make_leaf(table, growth, depth, rows)?;
            continue;
        }

        let Some(split) = growth.split(table, &scope, &rows)? else {
            arena[slot] = make_leaf(table, growth, depth, rows)?;
            continue;
        };

        let (left_rows, right_rows) = partition(table, &split.feature, split.threshold, &rows)?;
        if left_rows.is_empty() || right_rows.is_empty() {
            arena[slot] = make_leaf(table, growth, depth, rows)?;
            continue;
        }

        debug!(
            depth,
            n_rows = rows.len(),
            feature = %split.feature,
            threshold = split.threshold,
            quality = split.quality,
            "node split"
        );
        let child_scope = growth.child_scope(&scope);
        let left = arena.len();
        let right = left + 1;
        arena.push(placeholder(depth + 1));
        arena.push(placeholder(depth + 1));

        arena[slot] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            quality: split.quality,
            left: NodeIndex::new(left),
            right: NodeIndex::new(right),
            depth,
            rows,
        };

        stack.push(Candidate {
            slot: right,
            depth: depth + 1,
            rows: right_rows,
            scope: child_scope.clone(),
        });
        stack.push(Candidate {
            slot: left,
            depth: depth + 1,
            rows: left_rows,
            scope: child_scope,
        });
    }

    Ok(arena)
}

fn placeholder<P: Default>(depth: usize) -> Node<P> {
    Node::Leaf {
        prediction: P::default(),
        depth,
        rows: Vec::new(),
    }
}

fn make_leaf<T, G>(
    table: &T,
    growth: &G,
    depth: usize,
    rows: Vec<usize>,
) -> Result<Node<G::Prediction>, JungleError>
where
    T: FeatureTable + ?Sized,
    G: Growth<T>,
{
    let prediction = growth.leaf(table, &rows)?;
    Ok(Node::Leaf {
        prediction,
        depth,
        rows,
    })
}

/// A fitted decision tree.
///
/// Stored as an arena-based `Vec<Node<P>>` with the root at index 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree<P> {
    pub(crate) nodes: Vec<Node<P>>,
    pub(crate) feature_names: Vec<String>,
    pub(crate) n_training_rows: usize,
    pub(crate) max_depth: usize,
    pub(crate) min_split_fraction: f64,
    pub(crate) in_jungle: bool,
}

/// A tree predicting class labels.
pub type ClassificationTree = DecisionTree<String>;

/// A tree predicting continuous values.
pub type RegressionTree = DecisionTree<f64>;

impl<P> DecisionTree<P> {
    fn new<T: FeatureTable + ?Sized>(
        nodes: Vec<Node<P>>,
        table: &T,
        config: &TreeConfig,
        in_jungle: bool,
    ) -> Self {
        debug!(n_nodes = nodes.len(), "decision tree built");
        Self {
            nodes,
            feature_names: table.feature_names().to_vec(),
            n_training_rows: table.n_rows(),
            max_depth: config.max_depth,
            min_split_fraction: config.min_split_fraction,
            in_jungle,
        }
    }

    /// Predict the value of one row of `table`.
    ///
    /// Traverses from the root: at each `Split`, goes left when
    /// `value < threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Propagates table lookup errors, e.g. a missing split column.
    pub fn predict_row<T: FeatureTable + ?Sized>(
        &self,
        table: &T,
        row: usize,
    ) -> Result<&P, JungleError> {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { prediction, .. } => return Ok(prediction),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if table.value(row, feature)? < *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    /// Predict every row of `table`, in row order.
    ///
    /// # Errors
    ///
    /// Propagates table lookup errors.
    pub fn predict<T: FeatureTable + ?Sized>(&self, table: &T) -> Result<Vec<P>, JungleError>
    where
        P: Clone,
    {
        (0..table.n_rows())
            .map(|row| self.predict_row(table, row).cloned())
            .collect()
    }

    /// Borrow the node arena; the root is at index 0.
    #[must_use]
    pub fn nodes(&self) -> &[Node<P>] {
        &self.nodes
    }

    /// Borrow the node at `index`.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&Node<P>> {
        self.nodes.get(index.index())
    }

    /// Return the feature columns the tree was trained on.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the row count of the training table.
    #[must_use]
    pub fn n_training_rows(&self) -> usize {
        self.n_training_rows
    }

    /// Return the configured maximum depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the configured minimum split fraction.
    #[must_use]
    pub fn min_split_fraction(&self) -> f64 {
        self.min_split_fraction
    }

    /// Return `true` when the tree was grown as part of a jungle.
    #[must_use]
    pub fn in_jungle(&self) -> bool {
        self.in_jungle
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the depth of the deepest node; a single leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(Node::depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Frame;

    fn step_frame() -> Frame<String> {
        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        let labels = (0..10)
            .map(|i| (if i < 5 { "A" } else { "B" }).to_string())
            .collect();
        Frame::classification(vec![("X".to_string(), x)], labels).unwrap()
    }

    fn query(values: &[f64]) -> Frame {
        Frame::features(vec![("X".to_string(), values.to_vec())]).unwrap()
    }

    #[test]
    fn depth_two_tree_predicts_step() {
        let tree = TreeConfig::new(2).fit_classifier(&step_frame()).unwrap();
        assert_eq!(tree.predict(&query(&[2.0, 8.0])).unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn pure_child_stops_on_low_gain() {
        let tree = TreeConfig::new(5).fit_classifier(&step_frame()).unwrap();
        // Root splits, both children are pure and fall under the gain guard.
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn zero_depth_is_single_leaf() {
        let frame = Frame::classification(
            vec![("X".to_string(), vec![1.0, 2.0, 3.0])],
            vec!["b".into(), "a".into(), "a".into()],
        )
        .unwrap();
        let tree = TreeConfig::new(0).fit_classifier(&frame).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&query(&[100.0])).unwrap(), vec!["a"]);
    }

    #[test]
    fn min_split_fraction_stops_small_nodes() {
        // 0.6 * 10 = 6 rows needed to split; root has 10, children have 5.
        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        let labels = ["A", "B", "A", "B", "A", "B", "A", "B", "A", "B"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let frame = Frame::classification(vec![("X".to_string(), x)], labels).unwrap();
        let tree = TreeConfig::new(10)
            .with_min_split_fraction(0.6)
            .unwrap()
            .fit_classifier(&frame)
            .unwrap();
        for node in tree.nodes() {
            if !node.is_leaf() {
                assert!(node.rows().len() as f64 >= 6.0);
            }
        }
    }

    #[test]
    fn invalid_min_split_fraction() {
        for fraction in [0.0, -0.1, 1.5, f64::NAN] {
            let err = TreeConfig::new(3).with_min_split_fraction(fraction).unwrap_err();
            assert!(matches!(err, JungleError::InvalidMinSplitFraction { .. }));
        }
        assert!(TreeConfig::new(3).with_min_split_fraction(1.0).is_ok());
    }

    #[test]
    fn empty_table_error() {
        let frame = Frame::classification(vec![("X".to_string(), vec![])], vec![]).unwrap();
        let err = TreeConfig::new(3).fit_classifier(&frame).unwrap_err();
        assert!(matches!(err, JungleError::EmptyTable));
    }

    #[test]
    fn no_features_error() {
        let frame = Frame::regression(vec![], vec![1.0, 2.0]).unwrap();
        let err = TreeConfig::new(3).fit_regressor(&frame).unwrap_err();
        assert!(matches!(err, JungleError::NoFeatures));
    }

    #[test]
    fn regression_tree_tracks_linear_target() {
        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
        let frame = Frame::regression(vec![("X".to_string(), x)], y).unwrap();
        let tree = TreeConfig::new(5).fit_regressor(&frame).unwrap();

        let pred = tree.predict(&query(&[5.0])).unwrap();
        assert!((pred[0] - 10.0).abs() <= 1.0, "prediction = {}", pred[0]);
    }

    #[test]
    fn regression_split_at_zero_is_not_a_leaf() {
        // The winning threshold is exactly 0.0; traversal must still split.
        let frame = Frame::regression(
            vec![("X".to_string(), vec![-1.0, -0.5, 0.5, 1.0])],
            vec![-10.0, -10.0, 10.0, 10.0],
        )
        .unwrap();
        let tree = TreeConfig::new(1).fit_regressor(&frame).unwrap();
        let root_threshold = match &tree.nodes()[0] {
            Node::Split { threshold, .. } => *threshold,
            Node::Leaf { .. } => panic!("root should split"),
        };
        assert!(root_threshold > -0.5 && root_threshold <= 0.5);
        assert_eq!(tree.predict(&query(&[-0.7, 0.7])).unwrap(), vec![-10.0, 10.0]);
    }

    #[test]
    fn children_partition_parent() {
        let tree = TreeConfig::new(4).fit_classifier(&step_frame()).unwrap();
        for node in tree.nodes() {
            if let Node::Split { left, right, rows, .. } = node {
                let mut union: Vec<usize> = tree.nodes()[left.index()].rows().to_vec();
                union.extend_from_slice(tree.nodes()[right.index()].rows());
                union.sort_unstable();
                let mut parent = rows.clone();
                parent.sort_unstable();
                assert_eq!(union, parent);
            }
        }
    }

    #[test]
    fn missing_prediction_column() {
        let tree = TreeConfig::new(2).fit_classifier(&step_frame()).unwrap();
        let other = Frame::features(vec![("Y".to_string(), vec![1.0])]).unwrap();
        let err = tree.predict(&other).unwrap_err();
        assert!(matches!(err, JungleError::UnknownColumn { .. }));
    }

    fn quartile_frame() -> Frame<String> {
        let x: Vec<f64> = (0..40).map(f64::from).collect();
        let labels = (0..40)
            .map(|i| ["A", "B", "C", "D"][i / 10].to_string())
            .collect();
        Frame::classification(vec![("X".to_string(), x)], labels).unwrap()
    }

    fn jungle_member(frame: &Frame<String>, seed: u64) -> ClassificationTree {
        let origin = Origin::Jungle {
            root_rows: (0..frame.n_rows()).collect(),
            sampler: Sampler::seeded(seed),
        };
        grow_classifier(frame, &TreeConfig::new(2), origin).unwrap()
    }

    #[test]
    fn jungle_root_scores_label_subspace() {
        let frame = quartile_frame();
        let rows: Vec<usize> = (0..40).collect();
        let tree = jungle_member(&frame, 11);

        let mut replay = Sampler::seeded(11);
        let root_labels = replay.label_subspace(&frame.distinct_labels());
        assert_eq!(root_labels.len(), 2);
        let expected = best_split(&frame, &Gini::new(&root_labels), &rows).unwrap();
        let all_labels = frame.distinct_labels();
        let full = best_split(&frame, &Gini::new(&all_labels), &rows).unwrap();

        let Node::Split {
            feature,
            threshold,
            quality,
            ..
        } = &tree.nodes()[0]
        else {
            panic!("root should split");
        };
        assert_eq!(feature, &expected.feature);
        assert_eq!(*threshold, expected.threshold);
        assert!((quality - expected.quality).abs() < 1e-12);
        // Two of four labels can never reach the full-label gain here.
        assert!(full.quality - quality > 1e-6, "full = {}, root = {quality}", full.quality);
    }

    #[test]
    fn jungle_children_score_redrawn_subspace() {
        let frame = quartile_frame();
        let tree = jungle_member(&frame, 11);

        let mut replay = Sampler::seeded(11);
        let _root = replay.label_subspace(&frame.distinct_labels());
        let children = replay.label_subspace(&frame.distinct_labels());

        let mut n_split = 0;
        for node in &tree.nodes()[1..3] {
            assert_eq!(node.depth(), 1);
            if let Node::Split {
                feature,
                threshold,
                quality,
                rows,
                ..
            } = node
            {
                let expected = best_split(&frame, &Gini::new(&children), rows).unwrap();
                assert_eq!(feature, &expected.feature);
                assert_eq!(*threshold, expected.threshold);
                assert!((quality - expected.quality).abs() < 1e-12);
                n_split += 1;
            }
        }
        assert!(n_split > 0, "at least one child holds two or more labels");
    }

    #[test]
    fn standalone_root_scores_every_label() {
        let frame = quartile_frame();
        let rows: Vec<usize> = (0..40).collect();
        let tree = TreeConfig::new(2).fit_classifier(&frame).unwrap();
        let all_labels = frame.distinct_labels();
        let expected = best_split(&frame, &Gini::new(&all_labels), &rows).unwrap();
        let Node::Split { quality, .. } = &tree.nodes()[0] else {
            panic!("root should split");
        };
        assert!((quality - expected.quality).abs() < 1e-12);
    }

    #[test]
    fn deep_tree_does_not_recurse() {
        // A strictly alternating target keeps splitting until depth runs out.
        let n = 600;
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| (i % 7) as f64).collect();
        let frame = Frame::regression(vec![("X".to_string(), x)], y).unwrap();
        let tree = TreeConfig::new(300).fit_regressor(&frame).unwrap();
        assert!(tree.depth() <= 300);
        assert_eq!(tree.nodes()[0].rows().len(), n);
    }
}
