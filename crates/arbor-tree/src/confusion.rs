//! Confusion matrices and one-vs-rest classification statistics.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::table::Value;

/// A square grid of counts over 1-based class labels.
///
/// Entry `as_rows()[actual - 1][predicted - 1]` counts rows of class
/// `actual` predicted as `predicted`. Matrices add elementwise, so folds and
/// ensemble members can be aggregated in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassMetrics {
    /// The 1-based class label.
    pub class: usize,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true rows for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true rows in this class.
    pub support: usize,
}

/// True/false positive/negative counts of a binary decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BinaryCounts {
    /// True positives.
    pub tp: usize,
    /// True negatives.
    pub tn: usize,
    /// False positives.
    pub fp: usize,
    /// False negatives.
    pub fn_: usize,
}

impl BinaryCounts {
    /// Total number of decisions.
    #[must_use]
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// (tp + tn) / total, or 0.0 when there are no decisions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.tp + self.tn) as f64 / total as f64
        }
    }

    /// sqrt(p_correct * p_incorrect / total), or 0.0 when there are no decisions.
    #[must_use]
    pub fn standard_error(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        let correct = (self.tp + self.tn) as f64 / n;
        let incorrect = (self.fp + self.fn_) as f64 / n;
        (correct * incorrect / n).sqrt()
    }
}

impl Add for BinaryCounts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            tp: self.tp + other.tp,
            tn: self.tn + other.tn,
            fp: self.fp + other.fp,
            fn_: self.fn_ + other.fn_,
        }
    }
}

impl fmt::Display for BinaryCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "         |-------------------------------------|";
        let BinaryCounts { tp, tn, fp, fn_ } = *self;
        writeln!(f, "                        Predicted")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "         |       |    Yes  |    No   |  Total  |")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "         |   Yes |  {tp:>5}  |  {fn_:>5}  |  {:>5}  |", tp + fn_)?;
        writeln!(f, "  Actual |-------------------------------------|")?;
        writeln!(f, "         |   No  |  {fp:>5}  |  {tn:>5}  |  {:>5}  |", fp + tn)?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "         | Total |  {:>5}  |  {:>5}  |  {:>5}  |",
            tp + fp,
            fn_ + tn,
            self.total()
        )?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;
        writeln!(f, "              Accuracy     : {:.5}", self.accuracy())?;
        writeln!(f, "              Standard Err : {:.5}", self.standard_error())
    }
}

impl ConfusionMatrix {
    /// Create an all-zero matrix for `n_classes` classes.
    #[must_use]
    pub fn new(n_classes: usize) -> Self {
        Self {
            matrix: vec![vec![0usize; n_classes]; n_classes],
            n_classes,
        }
    }

    /// Build a matrix from explicit rows.
    ///
    /// Returns `None` unless `rows` is square.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<usize>>) -> Option<Self> {
        let n_classes = rows.len();
        rows.iter()
            .all(|r| r.len() == n_classes)
            .then_some(Self {
                matrix: rows,
                n_classes,
            })
    }

    /// Count one prediction.
    ///
    /// Returns `false` and records nothing when either label is not a class
    /// in `1..=n_classes`; that is how an unresolved prediction is skipped.
    pub fn record(&mut self, actual: &Value, predicted: &Value) -> bool {
        match (
            actual.class_index(self.n_classes),
            predicted.class_index(self.n_classes),
        ) {
            (Some(a), Some(p)) => {
                self.matrix[a][p] += 1;
                true
            }
            _ => false,
        }
    }

    /// Count for a 1-based `(actual, predicted)` pair; 0 when out of range.
    #[must_use]
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual == 0 || predicted == 0 {
            return 0;
        }
        self.matrix
            .get(actual - 1)
            .and_then(|row| row.get(predicted - 1))
            .copied()
            .unwrap_or(0)
    }

    /// Total number of recorded predictions.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flat_map(|row| row.iter()).sum()
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// One-vs-rest counts for the 1-based `class`.
    ///
    /// Out-of-range classes produce counts with every decision a true negative.
    #[must_use]
    pub fn one_vs_rest(&self, class: usize) -> BinaryCounts {
        let total = self.total();
        if class == 0 || class > self.n_classes {
            return BinaryCounts {
                tn: total,
                ..BinaryCounts::default()
            };
        }
        let c = class - 1;
        let tp = self.matrix[c][c];
        let fn_ = self.matrix[c].iter().sum::<usize>() - tp;
        let fp = self.matrix.iter().map(|row| row[c]).sum::<usize>() - tp;
        BinaryCounts {
            tp,
            tn: total - tp - fp - fn_,
            fp,
            fn_,
        }
    }

    /// Sum of the one-vs-rest counts over every class.
    #[must_use]
    pub fn pooled(&self) -> BinaryCounts {
        (1..=self.n_classes)
            .map(|c| self.one_vs_rest(c))
            .fold(BinaryCounts::default(), Add::add)
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (1..=self.n_classes)
            .map(|class| {
                let BinaryCounts { tp, fp, fn_, .. } = self.one_vs_rest(class);
                let support = tp + fn_;
                let precision = if tp + fp == 0 {
                    0.0
                } else {
                    tp as f64 / (tp + fp) as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Grow to `n_classes`, padding with zeros.
    fn widen(&mut self, n_classes: usize) {
        if n_classes <= self.n_classes {
            return;
        }
        for row in &mut self.matrix {
            row.resize(n_classes, 0);
        }
        self.matrix.resize(n_classes, vec![0; n_classes]);
        self.n_classes = n_classes;
    }
}

/// Elementwise sum; a smaller matrix is zero-padded to the larger size.
impl AddAssign<&ConfusionMatrix> for ConfusionMatrix {
    fn add_assign(&mut self, other: &ConfusionMatrix) {
        self.widen(other.n_classes);
        for (row, other_row) in self.matrix.iter_mut().zip(&other.matrix) {
            for (cell, &v) in row.iter_mut().zip(other_row) {
                *cell += v;
            }
        }
    }
}

impl AddAssign for ConfusionMatrix {
    fn add_assign(&mut self, other: ConfusionMatrix) {
        *self += &other;
    }
}

impl Add for ConfusionMatrix {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += &other;
        self
    }
}

impl Sum for ConfusionMatrix {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ConfusionMatrix::new(0), Add::add)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for j in 0..=self.n_classes {
            write!(f, "{j:>4}")?;
        }
        writeln!(f)?;

        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "{:>4}", i + 1)?;
            for val in row {
                write!(f, "{val:>4}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> ConfusionMatrix {
        // Actual rows, predicted columns.
        ConfusionMatrix::from_rows(vec![vec![2, 1, 0], vec![0, 2, 1], vec![1, 0, 2]]).unwrap()
    }

    #[test]
    fn record_skips_unresolved_predictions() {
        let mut cm = ConfusionMatrix::new(4);
        assert!(cm.record(&Value::Integer(2), &Value::Integer(3)));
        assert!(!cm.record(&Value::Integer(2), &Value::Integer(0)));
        assert!(!cm.record(&Value::Integer(2), &Value::Integer(-1)));
        assert!(!cm.record(&Value::Integer(2), &Value::real(2.5)));
        assert!(!cm.record(&Value::Integer(7), &Value::Integer(1)));
        assert_eq!(cm.total(), 1);
        assert_eq!(cm.get(2, 3), 1);
    }

    #[test]
    fn known_confusion_matrix() {
        let cm = sample_matrix();
        let metrics = cm.class_metrics();
        assert!((metrics[0].precision - 2.0 / 3.0).abs() < 1e-10);
        assert!((metrics[0].recall - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(metrics[0].support, 3);
        assert_eq!(metrics[0].class, 1);
        assert!((cm.accuracy() - 6.0 / 9.0).abs() < 1e-10);
    }

    #[test]
    fn one_vs_rest_counts() {
        let cm = sample_matrix();
        let c1 = cm.one_vs_rest(1);
        assert_eq!(c1, BinaryCounts { tp: 2, tn: 5, fp: 1, fn_: 1 });
        assert_eq!(c1.total(), cm.total());
    }

    #[test]
    fn pooled_counts_sum_classes() {
        let cm = sample_matrix();
        let pooled = cm.pooled();
        assert_eq!(pooled.tp, 6);
        assert_eq!(pooled.fp, 3);
        assert_eq!(pooled.fn_, 3);
        assert_eq!(pooled.total(), 3 * cm.total());
    }

    #[test]
    fn accuracy_and_standard_error() {
        let counts = BinaryCounts { tp: 30, tn: 50, fp: 10, fn_: 10 };
        assert!((counts.accuracy() - 0.8).abs() < 1e-12);
        let expected = (0.8_f64 * 0.2 / 100.0).sqrt();
        assert!((counts.standard_error() - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_counts_do_not_divide_by_zero() {
        let counts = BinaryCounts::default();
        assert_eq!(counts.accuracy(), 0.0);
        assert_eq!(counts.standard_error(), 0.0);
        assert_eq!(ConfusionMatrix::new(3).accuracy(), 0.0);
    }

    #[test]
    fn addition_is_order_independent() {
        let a = sample_matrix();
        let b = ConfusionMatrix::from_rows(vec![vec![1, 0, 0], vec![0, 0, 4], vec![2, 2, 0]]).unwrap();
        let c = ConfusionMatrix::from_rows(vec![vec![0, 5, 0], vec![1, 1, 1], vec![0, 0, 9]]).unwrap();
        let left = (a.clone() + b.clone()) + c.clone();
        let right = a.clone() + (b.clone() + c.clone());
        let swapped = c + a + b;
        assert_eq!(left, right);
        assert_eq!(left, swapped);
        assert_eq!(left.get(3, 3), 11);
    }

    #[test]
    fn sum_widens_smaller_matrices() {
        let small = ConfusionMatrix::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap();
        let total: ConfusionMatrix = vec![small, sample_matrix()].into_iter().sum();
        assert_eq!(total.n_classes(), 3);
        assert_eq!(total.get(1, 1), 3);
        assert_eq!(total.get(3, 3), 2);
    }

    #[test]
    fn from_rows_rejects_non_square() {
        assert!(ConfusionMatrix::from_rows(vec![vec![1, 2]]).is_none());
    }

    #[test]
    fn display_formatting() {
        let cm = ConfusionMatrix::from_rows(vec![vec![3, 1], vec![0, 2]]).unwrap();
        let output = format!("{cm}");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "   0   1   2");
        assert_eq!(lines[1], "   1   3   1");
        assert_eq!(lines[2], "   2   0   2");
    }

    #[test]
    fn binary_report_mentions_accuracy() {
        let counts = BinaryCounts { tp: 1, tn: 1, fp: 0, fn_: 0 };
        let output = format!("{counts}");
        assert!(output.contains("Accuracy     : 1.00000"));
        assert!(output.contains("Standard Err : 0.00000"));
    }
}
