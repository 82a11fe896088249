//! Configuration builder for bagged ensemble training.

use crate::error::TreeError;
use crate::resample::RemainderPolicy;
use crate::result::{ForestResult, HoldoutReport};
use crate::table::Table;

/// Configuration for bagged forest training.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter          | Default   |
/// |--------------------|-----------|
/// | `max_attributes`   | `None`    |
/// | `remainder_policy` | `ByIndex` |
/// | `seed`             | 42        |
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) keep: usize,
    pub(crate) max_attributes: Option<usize>,
    pub(crate) remainder_policy: RemainderPolicy,
    pub(crate) seed: u64,
}

impl ForestConfig {
    /// Create a config that trains `n_trees` trees and ranks the best `keep`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::InvalidTreeCount`] | `n_trees` is zero |
    /// | [`TreeError::InvalidKeepCount`] | `keep` is zero or exceeds `n_trees` |
    pub fn new(n_trees: usize, keep: usize) -> Result<Self, TreeError> {
        if n_trees == 0 {
            return Err(TreeError::InvalidTreeCount { n_trees });
        }
        if keep == 0 || keep > n_trees {
            return Err(TreeError::InvalidKeepCount { keep, n_trees });
        }
        Ok(Self {
            n_trees,
            keep,
            max_attributes: None,
            remainder_policy: RemainderPolicy::ByIndex,
            seed: 42,
        })
    }

    // --- Setters ---

    /// Limit each split to a random subset of informative attributes.
    #[must_use]
    pub fn with_max_attributes(mut self, max_attributes: Option<usize>) -> Self {
        self.max_attributes = max_attributes;
        self
    }

    /// Set how the bootstrap remainder is computed.
    #[must_use]
    pub fn with_remainder_policy(mut self, remainder_policy: RemainderPolicy) -> Self {
        self.remainder_policy = remainder_policy;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return how many top-ranked trees [`crate::Forest::best_kept`] reports.
    #[must_use]
    pub fn keep(&self) -> usize {
        self.keep
    }

    /// Return the per-split attribute limit, if set.
    #[must_use]
    pub fn max_attributes(&self) -> Option<usize> {
        self.max_attributes
    }

    /// Return the bootstrap remainder policy.
    #[must_use]
    pub fn remainder_policy(&self) -> RemainderPolicy {
        self.remainder_policy
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a forest on bootstrap samples of `table`, scoring each tree on
    /// its out-of-bag rows.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                           |
    /// |-------------------------------------|------------------------------------------------|
    /// | [`TreeError::EmptyTable`]           | `table` has no rows                            |
    /// | [`TreeError::InvalidClassLabel`]    | a target is not an integer class >= 1          |
    /// | [`TreeError::InvalidMaxAttributes`] | `max_attributes` is outside [1, n_attributes]  |
    pub fn fit(&self, table: &Table) -> Result<ForestResult, TreeError> {
        let n_classes = table.n_classes()?;
        crate::forest::train(self, table, n_classes)
    }

    /// Hold out the last of `n_folds` stratified folds, train on the rest,
    /// and score the forest's majority vote on the held-out fold.
    ///
    /// # Errors
    ///
    /// Everything [`ForestConfig::fit`] returns, plus
    /// [`TreeError::InvalidFoldCount`] and [`TreeError::TooFewRowsForFolds`].
    pub fn evaluate_holdout(&self, table: &Table, n_folds: usize) -> Result<HoldoutReport, TreeError> {
        crate::forest::evaluate_holdout(self, table, n_folds)
    }
}
