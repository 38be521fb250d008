//! End-to-end behavior of trees and jungles on small deterministic tables.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use jungle_tree::{
    FeatureTable, Frame, JungleConfig, JungleError, Model, Node, Predictions, TreeConfig, metrics,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn one_feature(values: &[f64]) -> Frame {
    Frame::features(vec![("X".to_string(), values.to_vec())]).unwrap()
}

fn step_table() -> Frame<String> {
    let x: Vec<f64> = (1..=10).map(f64::from).collect();
    let labels = ["A", "A", "A", "A", "A", "B", "B", "B", "B", "B"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    Frame::classification(vec![("X".to_string(), x)], labels).unwrap()
}

/// 300 rows, 6 features: features 0-1 carry the class, the rest are noise.
fn class_table(seed: u64, n_classes: usize) -> Frame<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n_rows = 300;
    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(n_rows); 6];
    let mut labels = Vec::with_capacity(n_rows);
    for i in 0..n_rows {
        let class = i % n_classes;
        labels.push(["red", "green", "blue"][class].to_string());
        for (f, column) in columns.iter_mut().enumerate() {
            let base = if f < 2 { class as f64 * 3.0 } else { 0.0 };
            column.push(base + rng.r#gen::<f64>() * 0.5);
        }
    }
    let named = columns
        .into_iter()
        .enumerate()
        .map(|(f, c)| (format!("f{f}"), c))
        .collect();
    Frame::classification(named, labels).unwrap()
}

// ---------------------------------------------------------------------------
// Single trees
// ---------------------------------------------------------------------------

#[test]
fn depth_two_step_scenario() {
    let tree = TreeConfig::new(2).fit_classifier(&step_table()).unwrap();
    let predicted = tree.predict(&one_feature(&[2.0, 8.0])).unwrap();
    assert_eq!(predicted, vec!["A", "B"]);
}

#[test]
fn linear_regression_scenario() {
    let x: Vec<f64> = (1..=10).map(f64::from).collect();
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
    let table = Frame::regression(vec![("X".to_string(), x)], y).unwrap();
    let tree = TreeConfig::new(5).fit_regressor(&table).unwrap();

    let predicted = tree.predict(&one_feature(&[5.0])).unwrap();
    assert!(
        (predicted[0] - 10.0).abs() <= 1.0,
        "prediction at X=5 was {}",
        predicted[0]
    );
}

#[test]
fn separable_threshold_is_learned_exactly() {
    let x: Vec<f64> = (0..40).map(|i| f64::from(i) * 0.25).collect();
    let labels: Vec<String> = x
        .iter()
        .map(|v| (if *v < 5.0 { "A" } else { "B" }).to_string())
        .collect();
    let table = Frame::classification(vec![("X".to_string(), x)], labels.clone()).unwrap();
    let tree = TreeConfig::new(4).fit_classifier(&table).unwrap();

    let predicted = tree.predict(&table).unwrap();
    assert_eq!(metrics::accuracy(&predicted, &labels).unwrap(), 1.0);
}

#[test]
fn multi_feature_tree_picks_informative_column() {
    let table = class_table(42, 3);
    let tree = TreeConfig::new(4).fit_classifier(&table).unwrap();
    let root_feature = match &tree.nodes()[0] {
        Node::Split { feature, .. } => feature.clone(),
        Node::Leaf { .. } => panic!("root should split"),
    };
    assert!(root_feature == "f0" || root_feature == "f1", "root split on {root_feature}");

    let predicted = tree.predict(&table).unwrap();
    let accuracy = metrics::accuracy(&predicted, table.targets()).unwrap();
    assert!(accuracy > 0.95, "training accuracy {accuracy}");
}

#[test]
fn stopping_rules_hold_for_every_node() {
    let table = class_table(7, 3);
    let tree = TreeConfig::new(3)
        .with_min_split_fraction(0.1)
        .unwrap()
        .fit_classifier(&table)
        .unwrap();
    let min_rows = 0.1 * table.n_rows() as f64;
    for node in tree.nodes() {
        assert!(node.depth() <= 3);
        if !node.is_leaf() {
            assert!(node.depth() < 3);
            assert!(node.rows().len() as f64 >= min_rows);
        }
    }
}

// ---------------------------------------------------------------------------
// Jungles
// ---------------------------------------------------------------------------

#[test]
fn classification_jungle_accuracy() {
    // With two labels the per-node label subspace is a single label, which
    // still isolates one class per split.
    let table = class_table(42, 2);
    let jungle = JungleConfig::new(15, 200)
        .unwrap()
        .with_seed(42)
        .fit_classifier(&table)
        .unwrap();
    assert_eq!(jungle.n_trees(), 15);

    let predicted = jungle.predict(&table).unwrap();
    let accuracy = metrics::accuracy(&predicted, table.targets()).unwrap();
    assert!(accuracy > 0.9, "jungle training accuracy {accuracy}");
}

#[test]
fn oversized_bootstrap_fails_before_growing() {
    let table = step_table();
    let err = JungleConfig::new(4, 11)
        .unwrap()
        .fit_classifier(&table)
        .unwrap_err();
    assert!(matches!(err, JungleError::BootstrapTooLarge { .. }));
}

#[test]
fn regression_jungle_r_squared() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let x: Vec<f64> = (0..200).map(|_| rng.gen_range(0.0..10.0)).collect();
    let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
    let table = Frame::regression(vec![("X".to_string(), x)], y.clone()).unwrap();

    let jungle = JungleConfig::new(10, 150)
        .unwrap()
        .with_max_depth(6)
        .fit_regressor(&table)
        .unwrap();
    let predicted = jungle.predict(&table).unwrap();
    let r2 = metrics::r_squared(&predicted, &y).unwrap();
    assert!(r2 > 0.95, "r2 = {r2}");
}

#[test]
fn model_dispatches_by_task() {
    let model: Model = TreeConfig::new(2).fit_classifier(&step_table()).unwrap().into();
    match model.predict(&one_feature(&[1.0, 9.0])).unwrap() {
        Predictions::Labels(labels) => assert_eq!(labels, vec!["A", "B"]),
        Predictions::Values(_) => panic!("classification model produced values"),
    }
}
