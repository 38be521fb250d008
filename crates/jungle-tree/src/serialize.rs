//! Model serialization and deserialization via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::JungleError;
use crate::jungle::{ClassificationJungle, RegressionJungle};
use crate::table::FeatureTable;
use crate::tree::{ClassificationTree, RegressionTree};

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Any fitted model, tagged by task and shape.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Model {
    /// A single classification tree.
    ClassificationTree(ClassificationTree),
    /// A single regression tree.
    RegressionTree(RegressionTree),
    /// A bagged ensemble of classification trees.
    ClassificationJungle(ClassificationJungle),
    /// A bagged ensemble of regression trees.
    RegressionJungle(RegressionJungle),
}

/// Predictions from a [`Model`], typed by task.
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    /// One class label per row.
    Labels(Vec<String>),
    /// One continuous value per row.
    Values(Vec<f64>),
}

impl Predictions {
    /// Return the number of predicted rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Labels(v) => v.len(),
            Self::Values(v) => v.len(),
        }
    }

    /// Return `true` when no rows were predicted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Versioned envelope for the serialized model.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of trees in the model (1 for a single tree).
    n_trees: usize,
    /// Feature column names.
    feature_names: Vec<String>,
    /// The serialized model.
    model: Model,
}

impl Model {
    /// Return a short name for the model kind, e.g. `"classification jungle"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClassificationTree(_) => "classification tree",
            Self::RegressionTree(_) => "regression tree",
            Self::ClassificationJungle(_) => "classification jungle",
            Self::RegressionJungle(_) => "regression jungle",
        }
    }

    /// Return the number of trees (1 for a single tree).
    #[must_use]
    pub fn n_trees(&self) -> usize {
        match self {
            Self::ClassificationTree(_) | Self::RegressionTree(_) => 1,
            Self::ClassificationJungle(j) => j.n_trees(),
            Self::RegressionJungle(j) => j.n_trees(),
        }
    }

    /// Return the feature columns the model was trained on.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        match self {
            Self::ClassificationTree(t) => t.feature_names(),
            Self::RegressionTree(t) => t.feature_names(),
            Self::ClassificationJungle(j) => j.feature_names(),
            Self::RegressionJungle(j) => j.feature_names(),
        }
    }

    /// Predict every row of `table`; jungles aggregate by vote or average.
    ///
    /// # Errors
    ///
    /// Propagates table lookup and aggregation errors.
    pub fn predict<T: FeatureTable + Sync + ?Sized>(
        &self,
        table: &T,
    ) -> Result<Predictions, JungleError> {
        Ok(match self {
            Self::ClassificationTree(t) => Predictions::Labels(t.predict(table)?),
            Self::RegressionTree(t) => Predictions::Values(t.predict(table)?),
            Self::ClassificationJungle(j) => Predictions::Labels(j.predict(table)?),
            Self::RegressionJungle(j) => Predictions::Values(j.predict(table)?),
        })
    }

    /// Save the model to a binary file.
    ///
    /// Uses bincode encoding wrapped in a versioned envelope for
    /// forward-compatibility checking.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`JungleError::SerializeModel`] | bincode encoding failed |
    /// | [`JungleError::WriteModel`] | file write failed |
    #[instrument(skip_all, fields(path = %path.as_ref().display(), kind = self.kind()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), JungleError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: self.n_trees(),
            feature_names: self.feature_names().to_vec(),
            model: self.clone(),
        };

        let bytes =
            bincode::serialize(&envelope).map_err(|e| JungleError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| JungleError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(size_bytes = bytes.len(), n_trees = self.n_trees(), "model saved");

        Ok(())
    }

    /// Load a model from a binary file.
    ///
    /// Checks the format version and returns an error on mismatch.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`JungleError::ReadModel`] | file read failed |
    /// | [`JungleError::DeserializeModel`] | bincode decoding failed |
    /// | [`JungleError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, JungleError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| JungleError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| JungleError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(JungleError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            n_trees = envelope.n_trees,
            n_features = envelope.feature_names.len(),
            kind = envelope.model.kind(),
            "model loaded"
        );

        Ok(envelope.model)
    }
}

impl From<ClassificationTree> for Model {
    fn from(tree: ClassificationTree) -> Self {
        Self::ClassificationTree(tree)
    }
}

impl From<RegressionTree> for Model {
    fn from(tree: RegressionTree) -> Self {
        Self::RegressionTree(tree)
    }
}

impl From<ClassificationJungle> for Model {
    fn from(jungle: ClassificationJungle) -> Self {
        Self::ClassificationJungle(jungle)
    }
}

impl From<RegressionJungle> for Model {
    fn from(jungle: RegressionJungle) -> Self {
        Self::RegressionJungle(jungle)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::JungleConfig;
    use crate::table::Frame;
    use crate::tree::TreeConfig;

    fn training_frame() -> Frame<String> {
        let x = vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0];
        let y = vec![0.0; 6];
        let labels = ["a", "a", "a", "b", "b", "b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Frame::classification(vec![("x".to_string(), x), ("y".to_string(), y)], labels).unwrap()
    }

    fn query() -> Frame {
        Frame::features(vec![
            ("x".to_string(), vec![1.5, 11.0, 5.0]),
            ("y".to_string(), vec![0.0, 0.0, 0.0]),
        ])
        .unwrap()
    }

    #[test]
    fn round_trip_jungle_identical_predictions() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("jungle.bin");

        let model: Model = JungleConfig::new(5, 6)
            .unwrap()
            .with_seed(42)
            .fit_classifier(&training_frame())
            .unwrap()
            .into();

        model.save(&model_path).unwrap();
        let loaded = Model::load(&model_path).unwrap();

        assert_eq!(loaded.kind(), "classification jungle");
        assert_eq!(loaded.n_trees(), 5);
        assert_eq!(
            model.predict(&query()).unwrap(),
            loaded.predict(&query()).unwrap()
        );
    }

    #[test]
    fn round_trip_regression_tree() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("tree.bin");
        let frame = Frame::regression(
            vec![("x".to_string(), vec![1.0, 2.0, 3.0, 4.0])],
            vec![1.0, 1.0, 9.0, 9.0],
        )
        .unwrap();
        let model: Model = TreeConfig::new(2).fit_regressor(&frame).unwrap().into();

        model.save(&model_path).unwrap();
        let loaded = Model::load(&model_path).unwrap();
        assert_eq!(loaded.feature_names(), ["x".to_string()]);
        assert_eq!(
            model.predict(&frame).unwrap(),
            loaded.predict(&frame).unwrap()
        );
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = Model::load(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, JungleError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"not a valid bincode file").unwrap();
        let err = Model::load(&path).unwrap_err();
        assert!(matches!(err, JungleError::DeserializeModel { .. }));
    }

    #[test]
    fn version_mismatch_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.bin");
        let tree = TreeConfig::new(1).fit_classifier(&training_frame()).unwrap();
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION + 1,
            n_trees: 1,
            feature_names: tree.feature_names().to_vec(),
            model: tree.into(),
        };
        std::fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();
        let err = Model::load(&path).unwrap_err();
        assert!(matches!(
            err,
            JungleError::IncompatibleModelVersion { found: 2, .. }
        ));
    }
}
