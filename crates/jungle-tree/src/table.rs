//! Tabular data access: the traits trees read from, and an in-memory frame.

use std::collections::{HashMap, HashSet};

use crate::error::JungleError;

/// Column-oriented access to named numeric feature columns.
///
/// Rows are addressed by zero-based index and columns by name. Trees never
/// mutate a table; they only read cells during growth and prediction.
pub trait FeatureTable {
    /// Number of rows in the table.
    fn n_rows(&self) -> usize;

    /// Names of the feature columns, in column order. The target is not included.
    fn feature_names(&self) -> &[String];

    /// Numeric value at `row` in the feature column `column`.
    ///
    /// # Errors
    ///
    /// [`JungleError::UnknownColumn`] or [`JungleError::RowOutOfRange`].
    fn value(&self, row: usize, column: &str) -> Result<f64, JungleError>;
}

/// A table whose target column holds class labels.
pub trait LabelTable: FeatureTable {
    /// Class label of `row`.
    ///
    /// # Errors
    ///
    /// [`JungleError::RowOutOfRange`] when `row` is outside the table.
    fn label(&self, row: usize) -> Result<&str, JungleError>;

    /// Distinct labels in first-seen row order.
    fn distinct_labels(&self) -> Vec<String>;
}

/// A table whose target column holds continuous values.
pub trait ResponseTable: FeatureTable {
    /// Target value of `row`.
    ///
    /// # Errors
    ///
    /// [`JungleError::RowOutOfRange`] when `row` is outside the table.
    fn response(&self, row: usize) -> Result<f64, JungleError>;
}

/// In-memory column-oriented table.
///
/// `T` is the target type: `String` for classification, `f64` for
/// regression, and `()` for prediction-only frames without a target.
#[derive(Debug, Clone)]
pub struct Frame<T = ()> {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    lookup: HashMap<String, usize>,
    targets: Vec<T>,
}

impl<T> Frame<T> {
    fn build(columns: Vec<(String, Vec<f64>)>, targets: Vec<T>) -> Result<Self, JungleError> {
        let n_rows = targets.len();
        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        let mut lookup = HashMap::with_capacity(columns.len());

        for (name, column) in columns {
            if column.len() != n_rows {
                return Err(JungleError::ColumnLengthMismatch {
                    name,
                    expected: n_rows,
                    got: column.len(),
                });
            }
            if let Some(row) = column.iter().position(|v| !v.is_finite()) {
                return Err(JungleError::NonFiniteValue { column: name, row });
            }
            if lookup.insert(name.clone(), names.len()).is_some() {
                return Err(JungleError::DuplicateColumn { name });
            }
            names.push(name);
            values.push(column);
        }

        Ok(Self {
            names,
            columns: values,
            lookup,
            targets,
        })
    }

    /// Borrow a feature column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.lookup.get(name).map(|&i| self.columns[i].as_slice())
    }

    /// Borrow the target column.
    #[must_use]
    pub fn targets(&self) -> &[T] {
        &self.targets
    }

    fn check_row(&self, row: usize) -> Result<(), JungleError> {
        if row >= self.targets.len() {
            return Err(JungleError::RowOutOfRange {
                row,
                n_rows: self.targets.len(),
            });
        }
        Ok(())
    }
}

impl Frame<()> {
    /// Build a prediction-only frame from named feature columns.
    ///
    /// The row count is taken from the first column.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`JungleError::ColumnLengthMismatch`] | columns differ in length |
    /// | [`JungleError::DuplicateColumn`] | two columns share a name |
    /// | [`JungleError::NonFiniteValue`] | a value is NaN or infinite |
    pub fn features(columns: Vec<(String, Vec<f64>)>) -> Result<Self, JungleError> {
        let n_rows = columns.first().map_or(0, |(_, c)| c.len());
        Self::build(columns, vec![(); n_rows])
    }
}

impl Frame<String> {
    /// Build a classification frame from feature columns and one label per row.
    ///
    /// # Errors
    ///
    /// Same as [`Frame::features`], with lengths checked against `labels`.
    pub fn classification(
        columns: Vec<(String, Vec<f64>)>,
        labels: Vec<String>,
    ) -> Result<Self, JungleError> {
        Self::build(columns, labels)
    }
}

impl Frame<f64> {
    /// Build a regression frame from feature columns and one response per row.
    ///
    /// # Errors
    ///
    /// Same as [`Frame::features`], plus [`JungleError::NonFiniteValue`] for a
    /// non-finite response.
    pub fn regression(
        columns: Vec<(String, Vec<f64>)>,
        responses: Vec<f64>,
    ) -> Result<Self, JungleError> {
        if let Some(row) = responses.iter().position(|v| !v.is_finite()) {
            return Err(JungleError::NonFiniteValue {
                column: "target".to_string(),
                row,
            });
        }
        Self::build(columns, responses)
    }
}

impl<T> FeatureTable for Frame<T> {
    fn n_rows(&self) -> usize {
        self.targets.len()
    }

    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn value(&self, row: usize, column: &str) -> Result<f64, JungleError> {
        let col = self
            .lookup
            .get(column)
            .ok_or_else(|| JungleError::UnknownColumn {
                name: column.to_string(),
            })?;
        self.check_row(row)?;
        Ok(self.columns[*col][row])
    }
}

impl LabelTable for Frame<String> {
    fn label(&self, row: usize) -> Result<&str, JungleError> {
        self.check_row(row)?;
        Ok(&self.targets[row])
    }

    fn distinct_labels(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.targets
            .iter()
            .filter(|label| seen.insert(label.as_str()))
            .cloned()
            .collect()
    }
}

impl ResponseTable for Frame<f64> {
    fn response(&self, row: usize) -> Result<f64, JungleError> {
        self.check_row(row)?;
        Ok(self.targets[row])
    }
}
