/// Errors from tree induction, resampling, and ensemble operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when the keep count is zero or exceeds n_trees.
    #[error("keep must be in [1, {n_trees}], got {keep}")]
    InvalidKeepCount {
        /// The invalid keep value provided.
        keep: usize,
        /// The configured number of trees.
        n_trees: usize,
    },

    /// Returned when a fold count is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when max_attributes is zero or exceeds the attribute count.
    #[error("max_attributes is {max_attributes}, but must be in [1, {n_attributes}]")]
    InvalidMaxAttributes {
        /// The requested max_attributes value.
        max_attributes: usize,
        /// The number of splittable attributes in the table.
        n_attributes: usize,
    },

    /// Returned when the header has no attribute column in front of the target.
    #[error("header needs at least one attribute and a target column, got {n_columns} columns")]
    HeaderTooShort {
        /// Number of columns in the header.
        n_columns: usize,
    },

    /// Returned when a table or fold has zero rows.
    #[error("table has zero rows")]
    EmptyTable,

    /// Returned when a row has a different number of values than the header.
    #[error("row {row_index} has {got} values, expected {expected}")]
    ArityMismatch {
        /// The expected number of values (header length).
        expected: usize,
        /// The actual number of values in the row.
        got: usize,
        /// The zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when an instance to classify is shorter than the attribute count.
    #[error("instance has {got} values, need at least {expected}")]
    InstanceTooShort {
        /// The number of attributes the tree was trained on.
        expected: usize,
        /// The number of values in the instance.
        got: usize,
    },

    /// Returned when the mean leaf policy meets a non-numeric target.
    #[error("row {row_index} has non-numeric target {value}")]
    NonNumericTarget {
        /// The zero-based index of the offending row.
        row_index: usize,
        /// Rendered form of the offending target value.
        value: String,
    },

    /// Returned when a class label is not a positive integer.
    #[error("row {row_index} has target {value}, expected a class label >= 1")]
    InvalidClassLabel {
        /// The zero-based index of the offending row.
        row_index: usize,
        /// Rendered form of the offending target value.
        value: String,
    },

    /// Returned when a forest with no trees is asked to vote.
    #[error("forest has no trees")]
    EmptyForest,

    /// Returned when a table has fewer rows than requested folds.
    #[error("table has {n_rows} rows, need at least {n_folds} to build folds")]
    TooFewRowsForFolds {
        /// Number of rows in the table.
        n_rows: usize,
        /// The requested number of folds.
        n_folds: usize,
    },
}
