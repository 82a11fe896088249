//! Fold trailing score columns of a raw table into a single target.

use arbor_tree::{Header, Row, Table, Value};
use tracing::{debug, instrument};

use crate::IoError;
use crate::domain::RawTable;

/// Default name of the derived target column.
pub const DEFAULT_TARGET_NAME: &str = "AvgScore";

/// How the trailing score columns become the target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAggregation {
    /// Mean of the scores, as a real target.
    Mean,
    /// Quartile (1..=4) of the summed scores across all rows, as an integer class.
    Quartile,
}

/// Derives a [`Table`] from a [`RawTable`].
///
/// The last `n_score_columns` raw columns are aggregated into the target;
/// every other column becomes a categorical attribute.
///
/// # Defaults
///
/// | Parameter     | Default    |
/// |---------------|------------|
/// | `target_name` | `AvgScore` |
#[derive(Debug, Clone)]
pub struct TargetSpec {
    n_score_columns: usize,
    aggregation: TargetAggregation,
    target_name: String,
}

impl TargetSpec {
    /// Aggregate the last `n_score_columns` columns with `aggregation`.
    #[must_use]
    pub fn new(n_score_columns: usize, aggregation: TargetAggregation) -> Self {
        Self {
            n_score_columns,
            aggregation,
            target_name: DEFAULT_TARGET_NAME.to_string(),
        }
    }

    /// Set the derived target column name.
    #[must_use]
    pub fn with_target_name(mut self, target_name: impl Into<String>) -> Self {
        self.target_name = target_name.into();
        self
    }

    /// Return the aggregation method.
    #[must_use]
    pub fn aggregation(&self) -> TargetAggregation {
        self.aggregation
    }

    /// Build the derived table.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::InvalidScoreColumns`] | `n_score_columns` is zero or leaves no attribute |
    /// | [`IoError::NonNumericScore`] | A score cell is not a finite number |
    #[instrument(skip_all, fields(n_score_columns = self.n_score_columns, aggregation = ?self.aggregation))]
    pub fn apply(&self, raw: &RawTable) -> Result<Table, IoError> {
        let n_columns = raw.columns().len();
        if self.n_score_columns == 0 || self.n_score_columns >= n_columns {
            return Err(IoError::InvalidScoreColumns {
                n_score_columns: self.n_score_columns,
                n_columns,
            });
        }
        let n_attributes = n_columns - self.n_score_columns;

        let mut scores: Vec<f64> = Vec::with_capacity(raw.n_records());
        for (row_index, record) in raw.records().iter().enumerate() {
            let mut sum = 0.0;
            for (col_index, raw_cell) in record.iter().enumerate().skip(n_attributes) {
                let score: f64 = raw_cell
                    .parse()
                    .ok()
                    .filter(|v: &f64| v.is_finite())
                    .ok_or_else(|| IoError::NonNumericScore {
                        row_index,
                        col_index,
                        raw: raw_cell.clone(),
                    })?;
                sum += score;
            }
            scores.push(sum);
        }

        let targets: Vec<Value> = match self.aggregation {
            TargetAggregation::Mean => scores
                .iter()
                .map(|&sum| Value::real(sum / self.n_score_columns as f64))
                .collect(),
            TargetAggregation::Quartile => {
                let [q1, q2, q3] = quartiles(&scores);
                debug!(q1, q2, q3, "quartile cut points");
                scores
                    .iter()
                    .map(|&s| Value::Integer(quartile_class(s, q1, q2, q3)))
                    .collect()
            }
        };

        let mut columns: Vec<String> = raw.columns()[..n_attributes].to_vec();
        columns.push(self.target_name.clone());
        let header = Header::new(columns)?;

        let rows = raw
            .records()
            .iter()
            .zip(targets)
            .map(|(record, target)| {
                let mut values: Vec<Value> = record[..n_attributes]
                    .iter()
                    .map(|cell| Value::category(cell.as_str()))
                    .collect();
                values.push(target);
                Row::new(values)
            })
            .collect();

        Ok(Table::new(header, rows)?)
    }
}

fn quartile_class(score: f64, q1: f64, q2: f64, q3: f64) -> i64 {
    if score < q1 {
        1
    } else if score < q2 {
        2
    } else if score < q3 {
        3
    } else {
        4
    }
}

/// Sample quantile with linear interpolation between closest ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let frac = pos - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

fn quartiles(values: &[f64]) -> [f64; 3] {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    [0.25, 0.5, 0.75].map(|q| quantile(&sorted, q))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(records: &[[&str; 4]]) -> RawTable {
        RawTable::new(
            ["gender", "math", "reading", "writing"].map(String::from).to_vec(),
            records
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&sorted, 0.25) - 1.75).abs() < 1e-12);
        assert!((quantile(&sorted, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile(&sorted, 0.75) - 3.25).abs() < 1e-12);
        assert!((quantile(&[5.0], 0.5) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn mean_target_is_real() {
        let raw = raw(&[["female", "72", "72", "74"], ["male", "47", "57", "44"]]);
        let table = TargetSpec::new(3, TargetAggregation::Mean).apply(&raw).unwrap();
        assert_eq!(table.header().columns(), &["gender", "AvgScore"]);
        assert_eq!(table.rows()[0].target(), &Value::real(218.0 / 3.0));
        assert_eq!(table.rows()[1].values()[0], Value::from("male"));
    }

    #[test]
    fn quartile_buckets() {
        // Sums 10, 20, 30, 40 give q1 = 17.5, q2 = 25, q3 = 32.5.
        let raw = raw(&[
            ["a", "10", "0", "0"],
            ["b", "20", "0", "0"],
            ["c", "30", "0", "0"],
            ["d", "40", "0", "0"],
        ]);
        let table = TargetSpec::new(3, TargetAggregation::Quartile)
            .with_target_name("band")
            .apply(&raw)
            .unwrap();
        let classes: Vec<&Value> = table.rows().iter().map(Row::target).collect();
        assert_eq!(
            classes,
            [&Value::Integer(1), &Value::Integer(2), &Value::Integer(3), &Value::Integer(4)]
        );
        assert_eq!(table.header().target_name(), "band");
        assert_eq!(table.n_classes().unwrap(), 4);
    }

    #[test]
    fn equal_scores_land_in_top_bucket() {
        let raw = raw(&[["a", "5", "5", "5"], ["b", "5", "5", "5"]]);
        let table = TargetSpec::new(3, TargetAggregation::Quartile).apply(&raw).unwrap();
        assert!(table.rows().iter().all(|r| r.target() == &Value::Integer(4)));
    }

    #[test]
    fn rejects_bad_score_column_count() {
        let raw = raw(&[["a", "1", "2", "3"]]);
        for n in [0, 4, 5] {
            let err = TargetSpec::new(n, TargetAggregation::Mean).apply(&raw).unwrap_err();
            assert!(matches!(err, IoError::InvalidScoreColumns { .. }));
        }
    }

    #[test]
    fn rejects_non_numeric_score() {
        let raw = raw(&[["a", "1", "x", "3"]]);
        let err = TargetSpec::new(3, TargetAggregation::Mean).apply(&raw).unwrap_err();
        assert!(matches!(
            err,
            IoError::NonNumericScore { row_index: 0, col_index: 2, .. }
        ));
    }
}
