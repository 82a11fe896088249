//! Domain types for arbor-io.

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw CSV contents: trimmed header names and trimmed string cells.
///
/// Produced by [`TableReader`](crate::TableReader). Every record has
/// `columns.len()` cells.
#[derive(Debug, Clone)]
pub struct RawTable {
    columns: Vec<String>,
    records: Vec<Vec<String>>,
}

impl RawTable {
    pub(crate) fn new(columns: Vec<String>, records: Vec<Vec<String>>) -> Self {
        debug_assert!(records.iter().all(|r| r.len() == columns.len()));
        Self { columns, records }
    }

    /// Return the header names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Return the data records.
    #[must_use]
    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    /// Return the number of data records.
    #[must_use]
    pub fn n_records(&self) -> usize {
        self.records.len()
    }
}
