//! Prediction methods for trained trees and the ensemble.

use crate::error::TreeError;
use crate::forest::Forest;
use crate::table::{Row, Table, Value, plurality};
use crate::tree::DecisionTree;

impl DecisionTree {
    /// Classify every row of `table`, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InstanceTooShort`] when a row is shorter than the
    /// attribute count.
    pub fn classify_table<'a>(&'a self, table: &Table) -> Result<Vec<&'a Value>, TreeError> {
        table.rows().iter().map(|row| self.classify_row(row)).collect()
    }

    /// Absolute difference between each row's numeric target and the
    /// tree's numeric prediction.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::NonNumericTarget`] | a target or a prediction is a category |
    /// | [`TreeError::InstanceTooShort`] | a row is shorter than the attribute count |
    pub fn absolute_errors(&self, table: &Table) -> Result<Vec<f64>, TreeError> {
        let mut errors = Vec::with_capacity(table.len());
        for (row_index, row) in table.rows().iter().enumerate() {
            let predicted = self.classify_row(row)?;
            let (Some(actual), Some(estimate)) = (row.target().as_f64(), predicted.as_f64()) else {
                let offending = if row.target().as_f64().is_none() { row.target() } else { predicted };
                return Err(TreeError::NonNumericTarget {
                    row_index,
                    value: offending.to_string(),
                });
            };
            errors.push((actual - estimate).abs());
        }
        Ok(errors)
    }
}

impl Forest {
    /// Classify an instance by majority vote over every member tree.
    ///
    /// The earliest tree's prediction wins a tied vote.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyForest`] | the forest has no trees |
    /// | [`TreeError::InstanceTooShort`] | `instance` is shorter than a tree's attribute count |
    pub fn classify(&self, instance: &[Value]) -> Result<Value, TreeError> {
        let votes = self
            .trees()
            .map(|tree| tree.classify(instance))
            .collect::<Result<Vec<_>, _>>()?;
        plurality(votes).ok_or(TreeError::EmptyForest)
    }

    /// Classify a row by majority vote, ignoring its target.
    ///
    /// # Errors
    ///
    /// See [`Forest::classify`].
    pub fn classify_row(&self, row: &Row) -> Result<Value, TreeError> {
        self.classify(row.values())
    }

    /// Classify every row of `table` by majority vote.
    ///
    /// # Errors
    ///
    /// See [`Forest::classify`].
    pub fn classify_table(&self, table: &Table) -> Result<Vec<Value>, TreeError> {
        table.rows().iter().map(|row| self.classify_row(row)).collect()
    }
}
