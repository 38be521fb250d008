//! CSV table reader with full input validation.

use std::path::{Path, PathBuf};

use jungle_tree::Frame;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads a header-first CSV file into a [`Frame`].
///
/// Expected CSV format:
/// - Header row required; every column is named
/// - `feature1,feature2,...,target` (the target may sit at any position)
/// - All rows must have the same number of columns
///
/// Feature cells must parse as finite `f64`. Target cells are kept as strings
/// for classification and parsed as finite `f64` for regression.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::MissingTargetColumn`] | Target not configured, or not in the header |
/// | [`IoError::NoFeatureColumns`] | No columns besides the target |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Numeric cell is NaN, Inf, or unparseable |
/// | [`IoError::InvalidTable`] | Header repeats a column name |
pub struct FrameReader {
    path: PathBuf,
    target: Option<String>,
}

/// Cells of one CSV file, split into feature columns and an optional target.
struct RawTable {
    feature_names: Vec<String>,
    columns: Vec<Vec<f64>>,
    target: Option<Vec<String>>,
}

impl FrameReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            target: None,
        }
    }

    /// Name the target column.
    #[must_use]
    pub fn with_target(mut self, column: impl Into<String>) -> Self {
        self.target = Some(column.into());
        self
    }

    /// Read a classification table; target cells are class labels.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_labels(&self) -> Result<Frame<String>, IoError> {
        let raw = self.read_raw(true)?;
        let labels = self.required_target(raw.target)?;
        info!(
            n_rows = labels.len(),
            n_features = raw.feature_names.len(),
            "classification table loaded"
        );
        Frame::classification(named(raw.feature_names, raw.columns), labels)
            .map_err(|e| self.invalid(e))
    }

    /// Read a regression table; target cells must be finite numbers.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_responses(&self) -> Result<Frame<f64>, IoError> {
        let raw = self.read_raw(true)?;
        let target = self.required_target(raw.target)?;
        let column = self.target.clone().unwrap_or_default();
        let responses = target
            .iter()
            .enumerate()
            .map(|(row_index, cell)| self.parse_cell(cell, row_index, &column))
            .collect::<Result<Vec<f64>, _>>()?;
        info!(
            n_rows = responses.len(),
            n_features = raw.feature_names.len(),
            "regression table loaded"
        );
        Frame::regression(named(raw.feature_names, raw.columns), responses)
            .map_err(|e| self.invalid(e))
    }

    /// Read feature columns only, for prediction.
    ///
    /// A configured target column is skipped when present and ignored when absent.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_features(&self) -> Result<Frame, IoError> {
        let raw = self.read_raw(false)?;
        info!(
            n_features = raw.feature_names.len(),
            "feature table loaded"
        );
        Frame::features(named(raw.feature_names, raw.columns)).map_err(|e| self.invalid(e))
    }

    fn read_raw(&self, target_required: bool) -> Result<RawTable, IoError> {
        // 1. Open file (FileNotFound on failure)
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // 2. flexible(true) lets our InconsistentRowLength check fire instead
        // of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        // 3. Header: locate the target and name the feature columns
        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected_cols = header.len();
        let target_index = match &self.target {
            Some(name) => header.iter().position(|h| h == name),
            None => None,
        };
        if target_required && target_index.is_none() {
            return Err(self.missing_target());
        }
        let feature_names: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != target_index)
            .map(|(_, h)| h.to_string())
            .collect();
        if feature_names.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        debug!(expected_cols, ?target_index, "read CSV header");

        // 4. Iterate rows with validation
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); feature_names.len()];
        let mut target = target_index.map(|_| Vec::new());
        let mut n_rows = 0usize;

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let mut feature = 0;
            for (col_index, cell) in record.iter().enumerate() {
                if Some(col_index) == target_index {
                    if let Some(target) = target.as_mut() {
                        target.push(cell.to_string());
                    }
                    continue;
                }
                let value = self.parse_cell(cell, row_index, &feature_names[feature])?;
                columns[feature].push(value);
                feature += 1;
            }
            n_rows += 1;
        }

        // 5. Check for empty dataset
        if n_rows == 0 {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        Ok(RawTable {
            feature_names,
            columns,
            target,
        })
    }

    fn parse_cell(&self, raw: &str, row_index: usize, column: &str) -> Result<f64, IoError> {
        let non_finite = || IoError::NonFiniteValue {
            path: self.path.clone(),
            row_index,
            column: column.to_string(),
            raw: raw.to_string(),
        };
        let value: f64 = raw.parse().map_err(|_| non_finite())?;
        if !value.is_finite() {
            return Err(non_finite());
        }
        Ok(value)
    }

    fn required_target(&self, target: Option<Vec<String>>) -> Result<Vec<String>, IoError> {
        target.ok_or_else(|| self.missing_target())
    }

    fn missing_target(&self) -> IoError {
        IoError::MissingTargetColumn {
            path: self.path.clone(),
            column: self.target.clone().unwrap_or_default(),
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn invalid(&self, e: jungle_tree::JungleError) -> IoError {
        IoError::InvalidTable {
            path: self.path.clone(),
            source: e,
        }
    }
}

fn named(names: Vec<String>, columns: Vec<Vec<f64>>) -> Vec<(String, Vec<f64>)> {
    names.into_iter().zip(columns).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jungle_tree::{FeatureTable, LabelTable, ResponseTable};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_valid_labels() {
        let csv = "area,species,slope\n100.0,oak,0.05\n200.0,pine,0.10\n150.0,oak,0.08\n";
        let f = write_csv(csv);
        let frame = FrameReader::new(f.path())
            .with_target("species")
            .read_labels()
            .unwrap();
        assert_eq!(frame.n_rows(), 3);
        assert_eq!(frame.feature_names(), ["area", "slope"]);
        assert_eq!(frame.label(1).unwrap(), "pine");
        assert!((frame.value(2, "slope").unwrap() - 0.08).abs() < f64::EPSILON);
        assert_eq!(frame.distinct_labels(), vec!["oak", "pine"]);
    }

    #[test]
    fn read_valid_responses() {
        let csv = "x,y\n1,2.5\n2,4.5\n";
        let f = write_csv(csv);
        let frame = FrameReader::new(f.path())
            .with_target("y")
            .read_responses()
            .unwrap();
        assert!((frame.response(1).unwrap() - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn features_skip_present_target() {
        let csv = "x,label\n1,a\n2,b\n";
        let f = write_csv(csv);
        let frame = FrameReader::new(f.path())
            .with_target("label")
            .read_features()
            .unwrap();
        assert_eq!(frame.feature_names(), ["x"]);
        assert_eq!(frame.n_rows(), 2);
    }

    #[test]
    fn features_without_target() {
        let csv = "x,z\n1,3\n2,4\n";
        let f = write_csv(csv);
        let frame = FrameReader::new(f.path())
            .with_target("label")
            .read_features()
            .unwrap();
        assert_eq!(frame.feature_names(), ["x", "z"]);
    }

    #[test]
    fn missing_target_error() {
        let csv = "x,z\n1,3\n";
        let f = write_csv(csv);
        let err = FrameReader::new(f.path())
            .with_target("label")
            .read_labels()
            .unwrap_err();
        assert!(matches!(err, IoError::MissingTargetColumn { .. }));

        let err = FrameReader::new(f.path()).read_responses().unwrap_err();
        assert!(matches!(err, IoError::MissingTargetColumn { .. }));
    }

    #[test]
    fn empty_dataset_error() {
        let f = write_csv("x,label\n");
        let err = FrameReader::new(f.path())
            .with_target("label")
            .read_labels()
            .unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn no_feature_columns_error() {
        let f = write_csv("label\na\nb\n");
        let err = FrameReader::new(f.path())
            .with_target("label")
            .read_labels()
            .unwrap_err();
        assert!(matches!(err, IoError::NoFeatureColumns { .. }));
    }

    #[test]
    fn inconsistent_row_length_error() {
        let f = write_csv("x,z,label\n1,2,a\n3,b\n");
        let err = FrameReader::new(f.path())
            .with_target("label")
            .read_labels()
            .unwrap_err();
        assert!(matches!(
            err,
            IoError::InconsistentRowLength {
                row_index: 1,
                expected: 3,
                got: 2,
                ..
            }
        ));
    }

    #[test]
    fn non_finite_feature_error() {
        let f = write_csv("x,label\nNaN,a\n");
        let err = FrameReader::new(f.path())
            .with_target("label")
            .read_labels()
            .unwrap_err();
        assert!(matches!(err, IoError::NonFiniteValue { ref column, .. } if column == "x"));
    }

    #[test]
    fn unparseable_response_error() {
        let f = write_csv("x,y\n1,abc\n");
        let err = FrameReader::new(f.path())
            .with_target("y")
            .read_responses()
            .unwrap_err();
        assert!(matches!(err, IoError::NonFiniteValue { ref column, .. } if column == "y"));
    }

    #[test]
    fn duplicate_header_error() {
        let f = write_csv("x,x,label\n1,2,a\n");
        let err = FrameReader::new(f.path())
            .with_target("label")
            .read_labels()
            .unwrap_err();
        assert!(matches!(err, IoError::InvalidTable { .. }));
    }

    #[test]
    fn file_not_found_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = FrameReader::new(&dir.path().join("missing.csv"))
            .read_features()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
