//! Training result types for the bagged ensemble.

use crate::confusion::ConfusionMatrix;
use crate::forest::Forest;

/// Result of forest training.
///
/// Contains the fitted forest and the ensemble confusion matrix: the sum of
/// every tree's out-of-bag matrix.
#[derive(Debug, Clone)]
pub struct ForestResult {
    forest: Forest,
    confusion_matrix: ConfusionMatrix,
}

impl ForestResult {
    /// Create a new training result.
    pub(crate) fn new(forest: Forest, confusion_matrix: ConfusionMatrix) -> Self {
        Self {
            forest,
            confusion_matrix,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> Forest {
        self.forest
    }

    /// Summed out-of-bag confusion matrix.
    #[must_use]
    pub fn confusion_matrix(&self) -> &ConfusionMatrix {
        &self.confusion_matrix
    }
}

/// Result of a stratified holdout run.
#[derive(Debug, Clone)]
pub struct HoldoutReport {
    result: ForestResult,
    test_matrix: ConfusionMatrix,
    n_test: usize,
}

impl HoldoutReport {
    pub(crate) fn new(result: ForestResult, test_matrix: ConfusionMatrix, n_test: usize) -> Self {
        Self {
            result,
            test_matrix,
            n_test,
        }
    }

    /// Training result on the non-held-out rows.
    #[must_use]
    pub fn result(&self) -> &ForestResult {
        &self.result
    }

    /// Confusion matrix of the forest vote over the held-out fold.
    #[must_use]
    pub fn test_matrix(&self) -> &ConfusionMatrix {
        &self.test_matrix
    }

    /// Number of rows in the held-out fold.
    #[must_use]
    pub fn n_test(&self) -> usize {
        self.n_test
    }
}
