use std::path::PathBuf;

/// Errors from tree growth, jungle training, prediction, and model persistence.
#[derive(Debug, thiserror::Error)]
pub enum JungleError {
    /// Returned when the minimum split fraction is outside (0.0, 1.0].
    #[error("min_split_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidMinSplitFraction {
        /// The rejected fraction.
        fraction: f64,
    },

    /// Returned when a jungle is configured with zero trees.
    #[error("tree_count must be at least 1, got {tree_count}")]
    InvalidTreeCount {
        /// The rejected tree count.
        tree_count: usize,
    },

    /// Returned when a jungle is configured with an empty bootstrap sample.
    #[error("bootstrap_size must be at least 1, got {bootstrap_size}")]
    InvalidBootstrapSize {
        /// The rejected bootstrap size.
        bootstrap_size: usize,
    },

    /// Returned when a jungle's bootstrap sample is larger than the training table.
    #[error("bootstrap_size {requested} exceeds the {available} rows of the training table")]
    BootstrapTooLarge {
        /// Requested bootstrap sample size.
        requested: usize,
        /// Rows available in the table.
        available: usize,
    },

    /// Returned when the sampler is asked for more distinct items than exist.
    #[error("cannot draw {requested} distinct items from a population of {available}")]
    InsufficientRows {
        /// Number of items requested.
        requested: usize,
        /// Size of the population.
        available: usize,
    },

    /// Returned when an impurity computation yields a negative value.
    #[error("impurity must be non-negative, got {value}")]
    NegativeImpurity {
        /// The offending impurity value.
        value: f64,
    },

    /// Returned when a statistic is requested over zero rows.
    #[error("{statistic} requested over an empty row subset")]
    EmptySubset {
        /// Name of the statistic that was requested.
        statistic: &'static str,
    },

    /// Returned when the training table has zero rows.
    #[error("training table has zero rows")]
    EmptyTable,

    /// Returned when the table has zero feature columns.
    #[error("table has zero feature columns")]
    NoFeatures,

    /// Returned when a column name is not present in the table.
    #[error("unknown column \"{name}\"")]
    UnknownColumn {
        /// The requested column name.
        name: String,
    },

    /// Returned when a row index is outside the table.
    #[error("row {row} is out of range for a table with {n_rows} rows")]
    RowOutOfRange {
        /// The requested row.
        row: usize,
        /// Number of rows in the table.
        n_rows: usize,
    },

    /// Returned when a frame column has a different length from the others.
    #[error("column \"{name}\" has {got} values, expected {expected}")]
    ColumnLengthMismatch {
        /// The offending column name.
        name: String,
        /// Expected number of values.
        expected: usize,
        /// Actual number of values.
        got: usize,
    },

    /// Returned when two frame columns share a name.
    #[error("duplicate column \"{name}\"")]
    DuplicateColumn {
        /// The duplicated column name.
        name: String,
    },

    /// Returned when a feature or target value is NaN or infinite.
    #[error("non-finite value in column \"{column}\" at row {row}")]
    NonFiniteValue {
        /// Column holding the value.
        column: String,
        /// Zero-based row of the value.
        row: usize,
    },

    /// Returned when aggregation is asked to combine zero trees.
    #[error("cannot aggregate predictions from an empty ensemble")]
    EmptyEnsemble,

    /// Returned when per-tree prediction lists differ in length.
    #[error("prediction list of tree {index} has {got} entries, expected {expected}")]
    PredictionLengthMismatch {
        /// Index of the tree whose list is off.
        index: usize,
        /// Expected number of entries.
        expected: usize,
        /// Actual number of entries.
        got: usize,
    },

    /// Returned when a metric receives different numbers of predictions and targets.
    #[error("{predicted} predictions for {actual} targets")]
    TargetLengthMismatch {
        /// Number of predictions.
        predicted: usize,
        /// Number of known targets.
        actual: usize,
    },

    /// Returned when a metric is computed over zero predictions.
    #[error("metric requested over an empty dataset")]
    EmptyDataset,

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}
