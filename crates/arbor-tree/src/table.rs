//! In-memory tables of categorical rows and the helpers that slice them.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use ordered_float::OrderedFloat;

use crate::error::TreeError;

/// A single cell: a categorical token or a numeric label.
///
/// Values order by variant first, then payload, so any mix of values can key
/// a sorted branch map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// A categorical token such as `"female"` or `"group B"`.
    Category(String),
    /// A discrete integer label, typically a 1-based class.
    Integer(i64),
    /// A continuous score.
    Real(OrderedFloat<f64>),
}

impl Value {
    /// Create a categorical value.
    pub fn category(token: impl Into<String>) -> Self {
        Value::Category(token.into())
    }

    /// Create a real-valued score.
    #[must_use]
    pub fn real(value: f64) -> Self {
        Value::Real(OrderedFloat(value))
    }

    /// Return the numeric payload, or `None` for categories.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Category(_) => None,
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(r.into_inner()),
        }
    }

    /// Map a 1-based class label to a zero-based index below `n_classes`.
    ///
    /// Returns `None` for categories, reals, zero, negatives, and labels
    /// beyond `n_classes`; callers treat that as "no prediction".
    #[must_use]
    pub fn class_index(&self, n_classes: usize) -> Option<usize> {
        match self {
            Value::Integer(label) if *label >= 1 => {
                let idx = usize::try_from(*label - 1).ok()?;
                (idx < n_classes).then_some(idx)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Category(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{}", r.into_inner()),
        }
    }
}

impl From<&str> for Value {
    fn from(token: &str) -> Self {
        Value::Category(token.to_string())
    }
}

impl From<i64> for Value {
    fn from(label: i64) -> Self {
        Value::Integer(label)
    }
}

impl From<f64> for Value {
    fn from(score: f64) -> Self {
        Value::real(score)
    }
}

/// Ordered column names; the last column is the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header(Vec<String>);

impl Header {
    /// Create a header from column names.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::HeaderTooShort`] when fewer than two columns are given.
    pub fn new(columns: Vec<String>) -> Result<Self, TreeError> {
        if columns.len() < 2 {
            return Err(TreeError::HeaderTooShort {
                n_columns: columns.len(),
            });
        }
        Ok(Self(columns))
    }

    /// Number of columns including the target.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; a valid header has at least two columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of splittable attribute columns (everything but the target).
    #[must_use]
    pub fn n_attributes(&self) -> usize {
        self.0.len() - 1
    }

    /// Name of the target column.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.0[self.0.len() - 1]
    }

    /// All column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.0
    }

    /// Index of the first column called `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|c| c == name)
    }
}

/// One record; the last value is the class or score.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row(Vec<Value>);

impl Row {
    /// Wrap a vector of values.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// The target value (last column).
    ///
    /// # Panics
    ///
    /// Panics on an empty row; [`Table::new`] rejects those.
    #[must_use]
    pub fn target(&self) -> &Value {
        &self.0[self.0.len() - 1]
    }

    /// Value at a column index.
    #[must_use]
    pub fn get(&self, col: usize) -> Option<&Value> {
        self.0.get(col)
    }

    /// All values in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Number of values in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when the row holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// A header plus rows of matching arity. Duplicate rows are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    header: Header,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table, checking every row against the header length.
    ///
    /// Zero rows are accepted here; operations that need data reject empty
    /// tables themselves.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::ArityMismatch`] for the first row whose length
    /// differs from the header.
    pub fn new(header: Header, rows: Vec<Row>) -> Result<Self, TreeError> {
        let expected = header.len();
        if let Some((row_index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected)
        {
            return Err(TreeError::ArityMismatch {
                expected,
                got: row.len(),
                row_index,
            });
        }
        Ok(Self { header, rows })
    }

    /// Build a table from rows already known to match `header`.
    pub(crate) fn from_parts(header: Header, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == header.len()));
        Self { header, rows }
    }

    /// The column header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Rows in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consume the table and return its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of classes, taken as the largest 1-based integer label.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyTable`] | Zero rows |
    /// | [`TreeError::InvalidClassLabel`] | A target is not an integer >= 1 |
    pub fn n_classes(&self) -> Result<usize, TreeError> {
        if self.rows.is_empty() {
            return Err(TreeError::EmptyTable);
        }
        let mut n_classes = 0usize;
        for (row_index, row) in self.rows.iter().enumerate() {
            let label = match row.target() {
                Value::Integer(label) if *label >= 1 => usize::try_from(*label).ok(),
                _ => None,
            };
            let Some(label) = label else {
                return Err(TreeError::InvalidClassLabel {
                    row_index,
                    value: row.target().to_string(),
                });
            };
            n_classes = n_classes.max(label);
        }
        Ok(n_classes)
    }
}

/// Distinct values in first-seen order.
pub fn unique<'a, I>(values: I) -> Vec<&'a Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut seen: HashSet<&Value> = HashSet::new();
    let mut out = Vec::new();
    for v in values {
        if seen.insert(v) {
            out.push(v);
        }
    }
    out
}

/// Distinct values of column `col`, in first-seen order.
pub fn unique_column<R: Borrow<Row>>(rows: &[R], col: usize) -> Vec<&Value> {
    unique(rows.iter().map(|r| &r.borrow().values()[col]))
}

/// `true` when every row shares one value in column `col`.
pub fn unanimous<R: Borrow<Row>>(rows: &[R], col: usize) -> bool {
    let mut iter = rows.iter().map(|r| &r.borrow().values()[col]);
    match iter.next() {
        Some(first) => iter.all(|v| v == first),
        None => true,
    }
}

/// `true` when every row shares one target value.
pub fn unanimous_target<R: Borrow<Row>>(rows: &[R]) -> bool {
    let mut iter = rows.iter().map(|r| r.borrow().target());
    match iter.next() {
        Some(first) => iter.all(|v| v == first),
        None => true,
    }
}

/// Most frequent target value; the first-encountered value wins ties.
///
/// Returns `None` for an empty slice.
pub fn majority_vote<R: Borrow<Row>>(rows: &[R]) -> Option<Value> {
    plurality(rows.iter().map(|r| r.borrow().target()))
}

/// Most frequent value in an iterator; the first-encountered value wins ties.
pub(crate) fn plurality<'a, I>(values: I) -> Option<Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut slots: HashMap<&Value, usize> = HashMap::new();
    let mut counts: Vec<(&Value, usize)> = Vec::new();
    for v in values {
        match slots.get(v) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(v, counts.len());
                counts.push((v, 1));
            }
        }
    }
    let mut best: Option<(&Value, usize)> = None;
    for (v, c) in counts {
        if best.is_none_or(|(_, bc)| c > bc) {
            best = Some((v, c));
        }
    }
    best.map(|(v, _)| v.clone())
}

/// Arithmetic mean of the numeric targets.
///
/// Returns `Ok(None)` for an empty slice.
///
/// # Errors
///
/// Returns [`TreeError::NonNumericTarget`] when a target is categorical;
/// `row_index` is relative to `rows`.
pub fn mean_target<R: Borrow<Row>>(rows: &[R]) -> Result<Option<f64>, TreeError> {
    if rows.is_empty() {
        return Ok(None);
    }
    let mut sum = 0.0;
    for (row_index, row) in rows.iter().enumerate() {
        let target = row.borrow().target();
        sum += target.as_f64().ok_or_else(|| TreeError::NonNumericTarget {
            row_index,
            value: target.to_string(),
        })?;
    }
    Ok(Some(sum / rows.len() as f64))
}

/// Partition rows by the value in column `col`.
///
/// Groups appear in first-seen order and keep the input order of their rows.
pub fn group_by<'a, R: Borrow<Row>>(rows: &'a [R], col: usize) -> Vec<(&'a Value, Vec<&'a Row>)> {
    let mut slots: HashMap<&Value, usize> = HashMap::new();
    let mut groups: Vec<(&Value, Vec<&Row>)> = Vec::new();
    for r in rows {
        let row = r.borrow();
        let key = &row.values()[col];
        match slots.get(key) {
            Some(&slot) => groups[slot].1.push(row),
            None => {
                slots.insert(key, groups.len());
                groups.push((key, vec![row]));
            }
        }
    }
    groups
}

/// Partition rows by target value, in first-seen order.
pub fn group_by_target<'a, R: Borrow<Row>>(rows: &'a [R]) -> Vec<Vec<&'a Row>> {
    match rows.first() {
        Some(first) => {
            let target_col = first.borrow().len() - 1;
            group_by(rows, target_col).into_iter().map(|(_, g)| g).collect()
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{Header, Row, Table, Value};

    /// Build a table from string attributes and integer class labels.
    pub(crate) fn class_table(columns: &[&str], rows: &[(&[&str], i64)]) -> Table {
        let header = Header::new(columns.iter().map(|c| c.to_string()).collect()).unwrap();
        let rows = rows
            .iter()
            .map(|(attrs, class)| {
                let mut values: Vec<Value> = attrs.iter().map(|&a| Value::from(a)).collect();
                values.push(Value::Integer(*class));
                Row::new(values)
            })
            .collect();
        Table::new(header, rows).unwrap()
    }
}
