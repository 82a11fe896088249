//! Entropy decision trees: induce, classify, resample, and bag.
//!
//! Provides ID3-style decision trees over categorical attributes with
//! information-gain splits, a bagged ensemble trained on bootstrap samples,
//! stratified and contiguous k-fold resampling, and confusion-matrix
//! reporting with one-vs-rest statistics.

mod config;
mod confusion;
mod error;
mod eval;
mod forest;
mod node;
mod predict;
mod resample;
mod result;
mod split;
mod table;
mod tree;

pub use config::ForestConfig;
pub use confusion::{BinaryCounts, ClassMetrics, ConfusionMatrix};
pub use error::TreeError;
pub use eval::{ConfusionReport, CrossValidation, MaeReport};
pub use forest::{Forest, ForestMember, evaluate_tree};
pub use node::{AttributeIndex, Entropy, Node};
pub use resample::{
    Bootstrap, Holdout, RemainderPolicy, StratifiedKFold, bootstrap, compute_stratified,
    contiguous_folds, stratify,
};
pub use result::{ForestResult, HoldoutReport};
pub use split::{BestSplit, entropy, info_gain, max_gain};
pub use table::{
    Header, Row, Table, Value, group_by, group_by_target, majority_vote, mean_target, unanimous,
    unanimous_target, unique, unique_column,
};
pub use tree::{DecisionTree, DecisionTreeConfig, LeafPolicy};
