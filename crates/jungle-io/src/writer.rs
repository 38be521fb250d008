//! JSON artifact writer for model predictions.

use std::fs;
use std::path::{Path, PathBuf};

use jungle_tree::Predictions;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, IoError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Writes prediction results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_predictions.json`.
pub struct PredictionWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl PredictionWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write predictions to `{experiment}_predictions.json` and return its path.
    ///
    /// `model_kind` is recorded verbatim, e.g. `"classification jungle"`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::EncodeJson`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip_all, fields(n_rows = predictions.len()))]
    pub fn write(&self, model_kind: &str, predictions: &Predictions) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_predictions.json", self.experiment.as_str()));

        let artifact = PredictionArtifact {
            experiment: self.experiment.as_str(),
            model_kind,
            n_rows: predictions.len(),
            predictions: match predictions {
                Predictions::Labels(labels) => PredictionValues::Labels(labels),
                Predictions::Values(values) => PredictionValues::Values(values),
            },
        };

        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::EncodeJson {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "predictions written");
        Ok(path)
    }
}

// Shadow structs for JSON shape.

#[derive(Serialize)]
struct PredictionArtifact<'a> {
    experiment: &'a str,
    model_kind: &'a str,
    n_rows: usize,
    predictions: PredictionValues<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum PredictionValues<'a> {
    Labels(&'a [String]),
    Values(&'a [f64]),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn experiment_name_valid() {
        for name in ["run1", "run-1", "run_1", "ABC-def_123"] {
            assert!(ExperimentName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn experiment_name_invalid() {
        for name in ["", "run 1", "run/1", "run.1", "../escape"] {
            let err = ExperimentName::new(name).unwrap_err();
            assert!(matches!(err, IoError::InvalidExperimentName { .. }));
        }
    }

    #[test]
    fn writes_label_predictions() {
        let dir = TempDir::new().unwrap();
        let writer = PredictionWriter::new(dir.path(), ExperimentName::new("exp").unwrap()).unwrap();
        let predictions = Predictions::Labels(vec!["A".to_string(), "B".to_string()]);
        let path = writer.write("classification tree", &predictions).unwrap();

        assert_eq!(path, dir.path().join("exp_predictions.json"));
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["experiment"], "exp");
        assert_eq!(json["model_kind"], "classification tree");
        assert_eq!(json["n_rows"], 2);
        assert_eq!(json["predictions"], serde_json::json!(["A", "B"]));
    }

    #[test]
    fn writes_value_predictions_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let writer = PredictionWriter::new(&nested, ExperimentName::new("reg").unwrap()).unwrap();
        let path = writer
            .write("regression jungle", &Predictions::Values(vec![1.5, 2.0]))
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["predictions"], serde_json::json!([1.5, 2.0]));
    }
}
