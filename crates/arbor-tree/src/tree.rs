use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    TreeError,
    node::Node,
    split::{best_of, informative_attributes, sample_candidates},
    table::{Row, Table, Value, group_by, majority_vote, mean_target, unanimous_target},
};

/// How a leaf resolves rows whose targets still disagree once no attribute
/// can split them further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeafPolicy {
    /// Most frequent target; the first-encountered value wins ties.
    #[default]
    Majority,
    /// Arithmetic mean of numeric targets.
    Mean,
}

impl LeafPolicy {
    /// Resolve a non-empty row set to a single prediction.
    fn resolve(self, rows: &[&Row]) -> Result<Value, TreeError> {
        let value = match self {
            LeafPolicy::Majority => majority_vote(rows),
            LeafPolicy::Mean => mean_target(rows)?.map(Value::real),
        };
        value.ok_or(TreeError::EmptyTable)
    }
}

/// Configuration for a single entropy-driven decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter        | Default                          |
/// |------------------|----------------------------------|
/// | `leaf_policy`    | `Majority`                       |
/// | `max_attributes` | `None` (every informative column) |
/// | `seed`           | 42                               |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) leaf_policy: LeafPolicy,
    pub(crate) max_attributes: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            leaf_policy: LeafPolicy::Majority,
            max_attributes: None,
            seed: 42,
        }
    }

    /// Set how exhausted leaves and unseen values resolve.
    #[must_use]
    pub fn with_leaf_policy(mut self, leaf_policy: LeafPolicy) -> Self {
        self.leaf_policy = leaf_policy;
        self
    }

    /// Limit each split to a random subset of informative attributes.
    ///
    /// `None` evaluates every attribute that still has more than one value.
    #[must_use]
    pub fn with_max_attributes(mut self, max_attributes: Option<usize>) -> Self {
        self.max_attributes = max_attributes;
        self
    }

    /// Set the random seed used for attribute subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the leaf policy.
    #[must_use]
    pub fn leaf_policy(&self) -> LeafPolicy {
        self.leaf_policy
    }

    /// Return the per-split attribute limit, if set.
    #[must_use]
    pub fn max_attributes(&self) -> Option<usize> {
        self.max_attributes
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Induce a tree over `table`.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                              |
    /// |-------------------------------------|---------------------------------------------------|
    /// | [`TreeError::EmptyTable`]           | `table` has no rows                               |
    /// | [`TreeError::InvalidMaxAttributes`] | `max_attributes` is outside [1, n_attributes]     |
    /// | [`TreeError::NonNumericTarget`]     | `Mean` policy and a categorical target            |
    #[instrument(skip_all, fields(n_rows = table.len()))]
    pub fn fit(&self, table: &Table) -> Result<DecisionTree, TreeError> {
        if table.is_empty() {
            return Err(TreeError::EmptyTable);
        }
        let n_attributes = table.header().n_attributes();

        if let Some(m) = self.max_attributes
            && (m == 0 || m > n_attributes)
        {
            return Err(TreeError::InvalidMaxAttributes {
                max_attributes: m,
                n_attributes,
            });
        }

        if self.leaf_policy == LeafPolicy::Mean {
            // Surfaces the offending row index against the whole table.
            mean_target(table.rows())?;
        }

        let rows: Vec<&Row> = table.rows().iter().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let root = build_node(&rows, n_attributes, self, &mut rng)?;

        debug!(
            n_nodes = root.n_nodes(),
            depth = root.depth(),
            "decision tree built"
        );

        Ok(DecisionTree {
            root,
            n_attributes,
            leaf_policy: self.leaf_policy,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively partition `rows` until each leaf is unanimous or no attribute
/// can split it further.
///
/// Each call either reaches unanimity or partitions on a column with more
/// than one value, which is unanimous inside every child. Depth is therefore
/// bounded by the attribute count.
fn build_node(
    rows: &[&Row],
    n_attributes: usize,
    config: &DecisionTreeConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Node, TreeError> {
    debug_assert!(!rows.is_empty(), "branches are only created for observed values");
    let n_rows = rows.len();

    if unanimous_target(rows) {
        return Ok(Node::Leaf {
            value: rows[0].target().clone(),
            n_rows,
        });
    }

    let mut candidates = informative_attributes(rows, n_attributes);
    if let Some(m) = config.max_attributes {
        sample_candidates(&mut candidates, m, rng);
    }

    let Some(best) = best_of(rows, &candidates) else {
        return Ok(Node::Leaf {
            value: config.leaf_policy.resolve(rows)?,
            n_rows,
        });
    };

    let mut branches = BTreeMap::new();
    for (value, part) in group_by(rows, best.attribute.index()) {
        let child = build_node(&part, n_attributes, config, rng)?;
        branches.insert(value.clone(), child);
    }

    Ok(Node::Split {
        attribute: best.attribute,
        gain: best.gain,
        branches,
        fallback: config.leaf_policy.resolve(rows)?,
        n_rows,
    })
}

/// A fitted decision tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    pub(crate) root: Node,
    pub(crate) n_attributes: usize,
    pub(crate) leaf_policy: LeafPolicy,
}

impl DecisionTree {
    /// Predict the target for a single instance.
    ///
    /// Only the first `n_attributes` values are read; a trailing target
    /// placeholder is allowed and ignored. Unseen attribute values resolve
    /// through the fallback of the split where they diverge.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InstanceTooShort`] when `instance.len() < n_attributes`.
    pub fn classify(&self, instance: &[Value]) -> Result<&Value, TreeError> {
        if instance.len() < self.n_attributes {
            return Err(TreeError::InstanceTooShort {
                expected: self.n_attributes,
                got: instance.len(),
            });
        }
        Ok(self.root.classify(instance))
    }

    /// Predict the target for a table row.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InstanceTooShort`] when the row is too short.
    pub fn classify_row(&self, row: &Row) -> Result<&Value, TreeError> {
        self.classify(row.values())
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Return the number of attributes the tree was trained on.
    #[must_use]
    pub fn n_attributes(&self) -> usize {
        self.n_attributes
    }

    /// Return the leaf policy the tree was trained with.
    #[must_use]
    pub fn leaf_policy(&self) -> LeafPolicy {
        self.leaf_policy
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.root.n_nodes()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    /// Return the maximum depth of the tree. A lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}
