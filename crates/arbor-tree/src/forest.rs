//! Bagged ensemble training over bootstrap samples.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::config::ForestConfig;
use crate::confusion::ConfusionMatrix;
use crate::error::TreeError;
use crate::resample::{bootstrap, compute_stratified};
use crate::result::{ForestResult, HoldoutReport};
use crate::table::Table;
use crate::tree::{DecisionTree, DecisionTreeConfig, LeafPolicy};

/// A trained tree and how it scored on its out-of-bag rows.
#[derive(Debug, Clone)]
pub struct ForestMember {
    pub(crate) tree: DecisionTree,
    pub(crate) validation: ConfusionMatrix,
}

impl ForestMember {
    /// Borrow the tree.
    #[must_use]
    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    /// Confusion matrix over the tree's out-of-bag rows.
    #[must_use]
    pub fn validation(&self) -> &ConfusionMatrix {
        &self.validation
    }

    /// Accuracy over the out-of-bag rows; 0.0 when none were scored.
    #[must_use]
    pub fn validation_accuracy(&self) -> f64 {
        self.validation.accuracy()
    }
}

/// A bagged ensemble of decision trees.
///
/// Every trained tree is retained. `keep` only controls how many of them
/// [`Forest::best_kept`] reports.
#[derive(Debug, Clone)]
pub struct Forest {
    pub(crate) keep: usize,
    pub(crate) members: Vec<ForestMember>,
}

impl Forest {
    /// Create an empty forest that reports its best `keep` trees.
    #[must_use]
    pub fn new(keep: usize) -> Self {
        Self {
            keep,
            members: Vec::new(),
        }
    }

    /// Append a trained tree with its validation matrix.
    pub fn add_tree(&mut self, tree: DecisionTree, validation: ConfusionMatrix) {
        self.members.push(ForestMember { tree, validation });
    }

    /// All members in training order.
    #[must_use]
    pub fn members(&self) -> &[ForestMember] {
        &self.members
    }

    /// Iterate over the trees in training order.
    pub fn trees(&self) -> impl Iterator<Item = &DecisionTree> {
        self.members.iter().map(|m| &m.tree)
    }

    /// The configured keep count.
    #[must_use]
    pub fn keep(&self) -> usize {
        self.keep
    }

    /// The `m` members with the highest validation accuracy, best first.
    ///
    /// Equal accuracies keep training order.
    #[must_use]
    pub fn best(&self, m: usize) -> Vec<&ForestMember> {
        let mut ranked: Vec<&ForestMember> = self.members.iter().collect();
        ranked.sort_by(|a, b| b.validation_accuracy().total_cmp(&a.validation_accuracy()));
        ranked.truncate(m);
        ranked
    }

    /// The best `keep` members.
    #[must_use]
    pub fn best_kept(&self) -> Vec<&ForestMember> {
        self.best(self.keep)
    }
}

/// Score `tree` on every row of `table`.
///
/// Predictions that are not a class in `1..=n_classes` are skipped.
///
/// # Errors
///
/// Returns [`TreeError::InstanceTooShort`] when a row is shorter than the
/// tree's attribute count.
pub fn evaluate_tree(
    tree: &DecisionTree,
    table: &Table,
    n_classes: usize,
) -> Result<ConfusionMatrix, TreeError> {
    let mut matrix = ConfusionMatrix::new(n_classes);
    let mut skipped = 0usize;
    for row in table.rows() {
        let predicted = tree.classify_row(row)?;
        if !matrix.record(row.target(), predicted) {
            skipped += 1;
        }
    }
    if skipped > 0 {
        debug!(skipped, "unresolved predictions skipped");
    }
    Ok(matrix)
}

/// Train the bagged ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_rows = table.len()))]
pub(crate) fn train(
    config: &ForestConfig,
    table: &Table,
    n_classes: usize,
) -> Result<ForestResult, TreeError> {
    if table.is_empty() {
        return Err(TreeError::EmptyTable);
    }

    info!(
        n_trees = config.n_trees,
        n_rows = table.len(),
        n_attributes = table.header().n_attributes(),
        n_classes,
        "training forest"
    );

    // Generate per-tree seeds from master RNG.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let mut forest = Forest::new(config.keep);
    let mut confusion_matrix = ConfusionMatrix::new(n_classes);

    for (tree_index, seed) in tree_seeds.into_iter().enumerate() {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let bag = bootstrap(table, config.remainder_policy, &mut rng);

        let tree = DecisionTreeConfig::new()
            .with_leaf_policy(LeafPolicy::Majority)
            .with_max_attributes(config.max_attributes)
            .with_seed(rng.r#gen())
            .fit(&bag.sample)?;

        let validation = evaluate_tree(&tree, &bag.remainder, n_classes)?;
        confusion_matrix += &validation;

        debug!(
            tree_index,
            n_validation = bag.remainder.len(),
            accuracy = validation.accuracy(),
            "tree trained"
        );
        forest.add_tree(tree, validation);
    }

    info!(
        accuracy = confusion_matrix.accuracy(),
        n_scored = confusion_matrix.total(),
        "forest training complete"
    );

    Ok(ForestResult::new(forest, confusion_matrix))
}

/// Stratified holdout, bagging on the remainder, majority-vote test scoring.
#[instrument(skip_all, fields(n_folds = n_folds, n_rows = table.len()))]
pub(crate) fn evaluate_holdout(
    config: &ForestConfig,
    table: &Table,
    n_folds: usize,
) -> Result<HoldoutReport, TreeError> {
    let n_classes = table.n_classes()?;
    let holdout = compute_stratified(table, n_folds)?;
    debug!(
        n_test = holdout.test.len(),
        n_remainder = holdout.remainder.len(),
        "holdout split"
    );

    let result = train(config, &holdout.remainder, n_classes)?;

    let mut test_matrix = ConfusionMatrix::new(n_classes);
    for row in holdout.test.rows() {
        let predicted = result.forest().classify_row(row)?;
        test_matrix.record(row.target(), &predicted);
    }

    info!(
        test_accuracy = test_matrix.accuracy(),
        n_test = holdout.test.len(),
        "holdout evaluation complete"
    );

    Ok(HoldoutReport::new(result, test_matrix, holdout.test.len()))
}
