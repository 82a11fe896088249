//! Bootstrap sampling and fold construction.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::TreeError;
use crate::table::{Row, Table, group_by_target};

/// How the bootstrap remainder decides that a row was not sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemainderPolicy {
    /// A source row is left over when its position was never drawn.
    /// Duplicate rows count as distinct occurrences.
    #[default]
    ByIndex,
    /// A source row is left over when no equal row was drawn. Unsampled
    /// duplicates of a sampled row are excluded too.
    ByValue,
}

/// A bootstrap training sample and its out-of-bag remainder.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    /// `n` rows drawn uniformly with replacement.
    pub sample: Table,
    /// Source rows absent from the sample, in source order.
    pub remainder: Table,
}

/// Draw `table.len()` rows with replacement and collect the rows left out.
#[must_use]
pub fn bootstrap(table: &Table, policy: RemainderPolicy, rng: &mut impl Rng) -> Bootstrap {
    let n = table.len();
    let rows = table.rows();
    let mut in_bag = vec![false; n];
    let mut sample = Vec::with_capacity(n);
    for _ in 0..n {
        let idx = rng.gen_range(0..n);
        in_bag[idx] = true;
        sample.push(rows[idx].clone());
    }

    let remainder: Vec<Row> = match policy {
        RemainderPolicy::ByIndex => rows
            .iter()
            .zip(&in_bag)
            .filter(|&(_, &bagged)| !bagged)
            .map(|(r, _)| r.clone())
            .collect(),
        RemainderPolicy::ByValue => {
            let drawn: HashSet<&Row> = sample.iter().collect();
            rows.iter().filter(|r| !drawn.contains(r)).cloned().collect()
        }
    };

    debug!(
        n_rows = n,
        n_remainder = remainder.len(),
        "bootstrap sample drawn"
    );

    let header = table.header().clone();
    Bootstrap {
        sample: Table::from_parts(header.clone(), sample),
        remainder: Table::from_parts(header, remainder),
    }
}

fn check_folds(n_rows: usize, n_folds: usize) -> Result<(), TreeError> {
    if n_folds < 2 {
        return Err(TreeError::InvalidFoldCount { n_folds });
    }
    if n_rows < n_folds {
        return Err(TreeError::TooFewRowsForFolds { n_rows, n_folds });
    }
    Ok(())
}

/// Stratified fold builder.
///
/// Rows are grouped by target, then dealt round-robin across folds. The
/// dealing cursor carries over between groups so fold sizes differ by at
/// most one.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_folds: usize,
    shuffle_seed: Option<u64>,
}

impl StratifiedKFold {
    /// Create a builder for `n_folds` folds without shuffling.
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
            shuffle_seed: None,
        })
    }

    /// Shuffle rows within each class before dealing them out.
    #[must_use]
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Partition `table` into stratified folds.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::TooFewRowsForFolds`] when `table` has fewer rows
    /// than folds.
    pub fn split(&self, table: &Table) -> Result<Vec<Table>, TreeError> {
        check_folds(table.len(), self.n_folds)?;

        let mut rng = self.shuffle_seed.map(ChaCha8Rng::seed_from_u64);

        let mut folds: Vec<Vec<Row>> = vec![Vec::new(); self.n_folds];
        let mut cursor = 0usize;
        for mut group in group_by_target(table.rows()) {
            if let Some(rng) = rng.as_mut() {
                group.shuffle(rng);
            }
            for row in group {
                folds[cursor].push(row.clone());
                cursor = (cursor + 1) % self.n_folds;
            }
        }

        let header = table.header();
        Ok(folds
            .into_iter()
            .map(|rows| Table::from_parts(header.clone(), rows))
            .collect())
    }
}

/// Stratify `table` into `n_folds` folds without shuffling.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`TreeError::InvalidFoldCount`] | `n_folds` < 2 |
/// | [`TreeError::TooFewRowsForFolds`] | Fewer rows than folds |
pub fn stratify(table: &Table, n_folds: usize) -> Result<Vec<Table>, TreeError> {
    StratifiedKFold::new(n_folds)?.split(table)
}

/// A held-out test fold and the training remainder.
#[derive(Debug, Clone)]
pub struct Holdout {
    /// The last stratified fold.
    pub test: Table,
    /// Every other fold merged in fold order.
    pub remainder: Table,
}

/// Hold out the last stratified fold; merge all the others into the remainder.
///
/// # Errors
///
/// Same conditions as [`stratify`].
pub fn compute_stratified(table: &Table, n_folds: usize) -> Result<Holdout, TreeError> {
    let folds = stratify(table, n_folds)?;
    Ok(hold_out(folds, n_folds - 1))
}

/// Split `folds` into the fold at `held_out` and the merge of the rest.
pub(crate) fn hold_out(folds: Vec<Table>, held_out: usize) -> Holdout {
    debug_assert!(held_out < folds.len());
    let header = folds[held_out].header().clone();
    let mut test = Vec::new();
    let mut remainder = Vec::new();
    for (i, fold) in folds.into_iter().enumerate() {
        if i == held_out {
            test = fold.into_rows();
        } else {
            remainder.extend(fold.into_rows());
        }
    }
    Holdout {
        test: Table::from_parts(header.clone(), test),
        remainder: Table::from_parts(header, remainder),
    }
}

/// Cut `table` into `n_folds` consecutive slices; the first `n mod k` folds
/// get one extra row.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`TreeError::InvalidFoldCount`] | `n_folds` < 2 |
/// | [`TreeError::TooFewRowsForFolds`] | Fewer rows than folds |
pub fn contiguous_folds(table: &Table, n_folds: usize) -> Result<Vec<Table>, TreeError> {
    check_folds(table.len(), n_folds)?;
    let base = table.len() / n_folds;
    let extra = table.len() % n_folds;
    let mut folds = Vec::with_capacity(n_folds);
    let mut lower = 0usize;
    for i in 0..n_folds {
        let upper = lower + base + usize::from(i < extra);
        folds.push(Table::from_parts(
            table.header().clone(),
            table.rows()[lower..upper].to_vec(),
        ));
        lower = upper;
    }
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::class_table;
    use crate::table::{Header, Value};

    /// `n` distinct rows with classes cycling through `1..=n_classes`.
    fn labelled(n: usize, n_classes: i64) -> Table {
        let header = Header::new(vec!["id".into(), "class".into()]).unwrap();
        let rows = (0..n)
            .map(|i| {
                Row::new(vec![
                    Value::category(format!("r{i}")),
                    Value::Integer(i as i64 % n_classes + 1),
                ])
            })
            .collect();
        Table::new(header, rows).unwrap()
    }

    fn sorted(rows: &[Row]) -> Vec<String> {
        let mut out: Vec<String> = rows.iter().map(|r| format!("{:?}", r.values())).collect();
        out.sort();
        out
    }

    #[test]
    fn bootstrap_sample_size_matches_input() {
        let table = labelled(25, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let b = bootstrap(&table, RemainderPolicy::ByIndex, &mut rng);
        assert_eq!(b.sample.len(), 25);
    }

    #[test]
    fn bootstrap_remainder_disjoint_from_sample() {
        let table = labelled(40, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let b = bootstrap(&table, RemainderPolicy::ByIndex, &mut rng);
        for row in b.remainder.rows() {
            assert!(!b.sample.rows().contains(row));
        }
        assert!(b.remainder.len() < table.len());
    }

    #[test]
    fn bootstrap_is_deterministic_per_seed() {
        let table = labelled(30, 2);
        let a = bootstrap(&table, RemainderPolicy::ByIndex, &mut ChaCha8Rng::seed_from_u64(9));
        let b = bootstrap(&table, RemainderPolicy::ByIndex, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a.sample, b.sample);
        assert_eq!(a.remainder, b.remainder);
    }

    #[test]
    fn by_value_remainder_drops_duplicates_of_sampled_rows() {
        // Twenty copies of one row plus one distinct row: any draw that
        // samples a copy empties the duplicate set under ByValue.
        let same: (&[&str], i64) = (&["same"], 1);
        let mut spec = vec![same; 20];
        spec.push((&["other"], 2));
        let table = class_table(&["a", "class"], &spec);
        let mut found_difference = false;
        for seed in 0..16 {
            let by_index =
                bootstrap(&table, RemainderPolicy::ByIndex, &mut ChaCha8Rng::seed_from_u64(seed));
            let by_value =
                bootstrap(&table, RemainderPolicy::ByValue, &mut ChaCha8Rng::seed_from_u64(seed));
            assert_eq!(by_index.sample, by_value.sample);
            assert!(by_value.remainder.len() <= by_index.remainder.len());
            assert!(
                by_value
                    .remainder
                    .rows()
                    .iter()
                    .all(|r| r.values()[0] != Value::from("same"))
            );
            found_difference |= by_value.remainder.len() < by_index.remainder.len();
        }
        assert!(found_difference);
    }

    #[test]
    fn stratified_fold_sizes_differ_by_at_most_one() {
        for (n, k) in [(10, 3), (17, 4), (9, 9), (100, 7)] {
            let table = labelled(n, 3);
            let folds = stratify(&table, k).unwrap();
            assert_eq!(folds.len(), k);
            let sizes: Vec<usize> = folds.iter().map(Table::len).collect();
            let max = sizes.iter().max().unwrap();
            let min = sizes.iter().min().unwrap();
            assert!(max - min <= 1, "n={n} k={k} sizes={sizes:?}");
        }
    }

    #[test]
    fn stratified_folds_cover_every_row() {
        let table = labelled(23, 4);
        let folds = stratify(&table, 5).unwrap();
        let merged: Vec<Row> = folds.into_iter().flat_map(Table::into_rows).collect();
        assert_eq!(sorted(&merged), sorted(table.rows()));
    }

    #[test]
    fn stratified_folds_balance_classes() {
        let table = labelled(30, 3);
        let folds = stratify(&table, 5).unwrap();
        for fold in &folds {
            for class in 1..=3 {
                let count = fold
                    .rows()
                    .iter()
                    .filter(|r| r.target() == &Value::Integer(class))
                    .count();
                assert_eq!(count, 2);
            }
        }
    }

    #[test]
    fn shuffled_folds_still_cover_every_row() {
        let table = labelled(21, 3);
        let folds = StratifiedKFold::new(4)
            .unwrap()
            .with_shuffle(11)
            .split(&table)
            .unwrap();
        let merged: Vec<Row> = folds.into_iter().flat_map(Table::into_rows).collect();
        assert_eq!(sorted(&merged), sorted(table.rows()));
    }

    #[test]
    fn compute_stratified_merges_all_other_folds() {
        let table = labelled(30, 3);
        let holdout = compute_stratified(&table, 5).unwrap();
        assert_eq!(holdout.test.len(), 6);
        assert_eq!(holdout.remainder.len(), 24);
        let mut merged = holdout.remainder.rows().to_vec();
        merged.extend_from_slice(holdout.test.rows());
        assert_eq!(sorted(&merged), sorted(table.rows()));
    }

    #[test]
    fn contiguous_folds_front_load_extra_rows() {
        let table = labelled(11, 2);
        let folds = contiguous_folds(&table, 4).unwrap();
        let sizes: Vec<usize> = folds.iter().map(Table::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 2]);
        assert_eq!(folds[0].rows()[0], table.rows()[0]);
        assert_eq!(folds[3].rows()[1], table.rows()[10]);
    }

    #[test]
    fn fold_count_validation() {
        let table = labelled(3, 2);
        assert!(matches!(stratify(&table, 1), Err(TreeError::InvalidFoldCount { n_folds: 1 })));
        assert!(matches!(
            contiguous_folds(&table, 4),
            Err(TreeError::TooFewRowsForFolds { n_rows: 3, n_folds: 4 })
        ));
    }
}
