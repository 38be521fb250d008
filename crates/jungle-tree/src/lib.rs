//! Decision trees and jungles: grow, aggregate, score, persist.
//!
//! Provides classification trees split by Gini gain, regression trees split
//! by summed squared error, and bagged "jungles" of either kind trained in
//! parallel via rayon. Thresholds are searched on a fixed 50-step grid over
//! each feature's range. Fitted models serialize to a versioned bincode file.

mod config;
mod error;
pub mod impurity;
mod jungle;
pub mod metrics;
mod node;
pub mod predict;
mod sample;
mod serialize;
pub mod split;
mod table;
mod tree;

pub use config::JungleConfig;
pub use error::JungleError;
pub use jungle::{ClassificationJungle, Jungle, RegressionJungle};
pub use node::{Node, NodeIndex};
pub use sample::Sampler;
pub use serialize::{Model, Predictions};
pub use table::{FeatureTable, Frame, LabelTable, ResponseTable};
pub use tree::{ClassificationTree, DecisionTree, MIN_GINI_GAIN, RegressionTree, TreeConfig};
