//! k-fold cross-validation of single decision trees.

use tracing::{debug, info, instrument};

use crate::confusion::ConfusionMatrix;
use crate::error::TreeError;
use crate::resample::{StratifiedKFold, contiguous_folds, hold_out};
use crate::table::Table;
use crate::tree::{DecisionTreeConfig, LeafPolicy};

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter        | Default |
/// |------------------|---------|
/// | `seed`           | 42      |
/// | `max_attributes` | `None`  |
/// | `shuffle`        | `false` |
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
    max_attributes: Option<usize>,
    shuffle: bool,
}

/// Mean absolute error of score trees over contiguous folds.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MaeReport {
    /// Mean absolute error on each held-out fold.
    pub fold_errors: Vec<f64>,
    /// Mean absolute error over every held-out row.
    pub mean_absolute_error: f64,
    /// Number of folds.
    pub n_folds: usize,
    /// Total number of rows.
    pub n_rows: usize,
}

/// Summed confusion matrices of class trees over stratified folds.
#[derive(Debug, Clone)]
pub struct ConfusionReport {
    /// Accuracy on each held-out fold.
    pub fold_accuracies: Vec<f64>,
    /// Matrix summed across all folds.
    pub confusion_matrix: ConfusionMatrix,
    /// Number of folds.
    pub n_folds: usize,
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, TreeError> {
        if n_folds < 2 {
            return Err(TreeError::InvalidFoldCount { n_folds });
        }
        Ok(Self {
            n_folds,
            seed: 42,
            max_attributes: None,
            shuffle: false,
        })
    }

    /// Set the base seed; fold `i` trains with `seed + i`.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Limit each split to a random subset of informative attributes.
    #[must_use]
    pub fn with_max_attributes(mut self, max_attributes: Option<usize>) -> Self {
        self.max_attributes = max_attributes;
        self
    }

    /// Shuffle rows within each class before stratified fold assignment.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    fn tree_config(&self, fold: usize, leaf_policy: LeafPolicy) -> DecisionTreeConfig {
        DecisionTreeConfig::new()
            .with_leaf_policy(leaf_policy)
            .with_max_attributes(self.max_attributes)
            .with_seed(self.seed.wrapping_add(fold as u64))
    }

    /// Contiguous k-fold evaluation of score trees.
    ///
    /// Each fold in turn is held out; a [`LeafPolicy::Mean`] tree trained on
    /// the remaining folds predicts it.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::TooFewRowsForFolds`] | Fewer rows than folds |
    /// | [`TreeError::NonNumericTarget`] | A target is not numeric |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_rows = table.len()))]
    pub fn mean_absolute_error(&self, table: &Table) -> Result<MaeReport, TreeError> {
        let folds = contiguous_folds(table, self.n_folds)?;

        let mut fold_errors = Vec::with_capacity(self.n_folds);
        let mut total_error = 0.0;
        let mut n_scored = 0usize;

        for fold in 0..self.n_folds {
            let split = hold_out(folds.clone(), fold);
            let tree = self.tree_config(fold, LeafPolicy::Mean).fit(&split.remainder)?;
            let errors = tree.absolute_errors(&split.test)?;

            let fold_sum: f64 = errors.iter().sum();
            let fold_mae = fold_sum / errors.len() as f64;
            debug!(fold, mae = fold_mae, n_test = errors.len(), "fold completed");

            fold_errors.push(fold_mae);
            total_error += fold_sum;
            n_scored += errors.len();
        }

        let mean_absolute_error = total_error / n_scored as f64;
        info!(mean_absolute_error, "cross-validation complete");

        Ok(MaeReport {
            fold_errors,
            mean_absolute_error,
            n_folds: self.n_folds,
            n_rows: table.len(),
        })
    }

    /// Stratified k-fold evaluation of class trees.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyTable`] | Zero rows |
    /// | [`TreeError::InvalidClassLabel`] | A target is not an integer class >= 1 |
    /// | [`TreeError::TooFewRowsForFolds`] | Fewer rows than folds |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_rows = table.len()))]
    pub fn confusion(&self, table: &Table) -> Result<ConfusionReport, TreeError> {
        let n_classes = table.n_classes()?;
        let mut splitter = StratifiedKFold::new(self.n_folds)?;
        if self.shuffle {
            splitter = splitter.with_shuffle(self.seed);
        }
        let folds = splitter.split(table)?;

        let mut fold_accuracies = Vec::with_capacity(self.n_folds);
        let mut confusion_matrix = ConfusionMatrix::new(n_classes);

        for fold in 0..self.n_folds {
            let split = hold_out(folds.clone(), fold);
            let tree = self.tree_config(fold, LeafPolicy::Majority).fit(&split.remainder)?;
            let matrix = crate::forest::evaluate_tree(&tree, &split.test, n_classes)?;

            debug!(fold, accuracy = matrix.accuracy(), "fold completed");
            fold_accuracies.push(matrix.accuracy());
            confusion_matrix += &matrix;
        }

        info!(accuracy = confusion_matrix.accuracy(), "cross-validation complete");

        Ok(ConfusionReport {
            fold_accuracies,
            confusion_matrix,
            n_folds: self.n_folds,
        })
    }
}
