//! Entropy and information-gain evaluation of candidate splits.

use std::borrow::Borrow;
use std::collections::HashMap;

use rand::Rng;

use crate::node::{AttributeIndex, Entropy};
use crate::table::{Header, Row, Value, group_by, unanimous};

/// Shannon entropy (base 2) of the target distribution in `rows`.
///
/// Returns 0 for a unanimous or empty row set.
#[must_use]
pub fn entropy<R: Borrow<Row>>(rows: &[R]) -> Entropy {
    if rows.is_empty() {
        return Entropy::new(0.0);
    }
    // Counts in first-seen order keep the sum reproducible.
    let mut slots: HashMap<&Value, usize> = HashMap::new();
    let mut counts: Vec<usize> = Vec::new();
    for r in rows {
        let target = r.borrow().target();
        match slots.get(target) {
            Some(&slot) => counts[slot] += 1,
            None => {
                slots.insert(target, counts.len());
                counts.push(1);
            }
        }
    }
    let n = rows.len() as f64;
    let value = -counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p.log2()
        })
        .sum::<f64>();
    // A unanimous set yields -0.0.
    Entropy::new(value.max(0.0))
}

/// Entropy of `rows` minus the size-weighted entropy of the partitions
/// induced by column `attribute`.
///
/// Returns 0 for an empty row set.
#[must_use]
pub fn info_gain<R: Borrow<Row>>(rows: &[R], attribute: usize) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let n = rows.len() as f64;
    let remaining: f64 = group_by(rows, attribute)
        .iter()
        .map(|(_, part)| entropy(part).value() * (part.len() as f64 / n))
        .sum();
    (entropy(rows).value() - remaining).max(0.0)
}

/// The attribute chosen for a split and its information gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestSplit {
    /// Attribute to partition on.
    pub attribute: AttributeIndex,
    /// Information gain achieved by the partition.
    pub gain: f64,
}

/// Attribute with the highest information gain, or `None` when every
/// attribute column in `rows` is unanimous.
///
/// Unanimous columns are never candidates. Exact ties go to the lowest
/// attribute index.
#[must_use]
pub fn max_gain<R: Borrow<Row>>(rows: &[R], header: &Header) -> Option<BestSplit> {
    let candidates = informative_attributes(rows, header.n_attributes());
    best_of(rows, &candidates)
}

/// Attribute columns with more than one distinct value in `rows`.
pub(crate) fn informative_attributes<R: Borrow<Row>>(rows: &[R], n_attributes: usize) -> Vec<usize> {
    (0..n_attributes).filter(|&i| !unanimous(rows, i)).collect()
}

/// Highest-gain attribute among `candidates`, lowest index on ties.
pub(crate) fn best_of<R: Borrow<Row>>(rows: &[R], candidates: &[usize]) -> Option<BestSplit> {
    let mut best: Option<BestSplit> = None;
    for &attribute in candidates {
        let gain = info_gain(rows, attribute);
        let better = match best {
            None => true,
            Some(b) => gain > b.gain || (gain == b.gain && attribute < b.attribute.index()),
        };
        if better {
            best = Some(BestSplit {
                attribute: AttributeIndex::new(attribute),
                gain,
            });
        }
    }
    best
}

/// Keep a random subset of at most `take` candidates, preserving their
/// relative order.
pub(crate) fn sample_candidates(candidates: &mut Vec<usize>, take: usize, rng: &mut impl Rng) {
    if candidates.len() <= take {
        return;
    }
    let n = candidates.len();
    // Partial Fisher-Yates over the first `take` positions.
    for i in 0..take {
        let j = rng.gen_range(i..n);
        candidates.swap(i, j);
    }
    candidates.truncate(take);
    candidates.sort_unstable();
}
