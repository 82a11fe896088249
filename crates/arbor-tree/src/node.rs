use std::collections::BTreeMap;
use std::fmt;

use crate::table::{Row, Value};

/// Zero-based attribute column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeIndex(usize);

impl AttributeIndex {
    /// Create a new attribute index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AttributeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shannon entropy (base 2) of a class distribution.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Entropy(f64);

impl Entropy {
    /// Create a new entropy value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw entropy in bits.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Entropy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node of an induced tree.
///
/// Each split owns its children outright. Branches exist only for attribute
/// values observed in the rows that reached the split.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An interior node partitioning on one attribute.
    Split {
        /// Attribute the rows were partitioned on.
        attribute: AttributeIndex,
        /// Information gain of this partition.
        gain: f64,
        /// One child per observed attribute value.
        branches: BTreeMap<Value, Node>,
        /// Resolution used for values never seen during training.
        fallback: Value,
        /// Number of training rows that reached this node.
        n_rows: usize,
    },
    /// A terminal node.
    Leaf {
        /// The resolved prediction.
        value: Value,
        /// Number of training rows in this leaf.
        n_rows: usize,
    },
}

impl Node {
    /// Return the number of training rows that reached this node.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        match self {
            Node::Split { n_rows, .. } | Node::Leaf { n_rows, .. } => *n_rows,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Follow branches for `instance` down to a resolved value.
    ///
    /// A split whose attribute value was never seen during training answers
    /// with its fallback instead of descending.
    ///
    /// # Panics
    ///
    /// Panics when `instance` is shorter than a split attribute index;
    /// [`crate::DecisionTree::classify`] checks the length first.
    #[must_use]
    pub fn classify(&self, instance: &[Value]) -> &Value {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value, .. } => return value,
                Node::Split {
                    attribute,
                    branches,
                    fallback,
                    ..
                } => match branches.get(&instance[attribute.index()]) {
                    Some(child) => node = child,
                    None => return fallback,
                },
            }
        }
    }

    /// Classify a training row by its attribute values.
    #[must_use]
    pub fn classify_row(&self, row: &Row) -> &Value {
        self.classify(row.values())
    }

    /// Count every node in this subtree, including itself.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { branches, .. } => 1 + branches.values().map(Node::n_nodes).sum::<usize>(),
        }
    }

    /// Count the leaves in this subtree.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { branches, .. } => branches.values().map(Node::n_leaves).sum(),
        }
    }

    /// Depth of this subtree; a lone leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { branches, .. } => {
                1 + branches.values().map(Node::depth).max().unwrap_or(0)
            }
        }
    }
}
