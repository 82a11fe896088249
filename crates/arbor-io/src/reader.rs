//! CSV table reader with row-shape validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::RawTable;

/// Reads a headed CSV file into a [`RawTable`].
///
/// Every cell is kept as a string with surrounding whitespace and stray
/// double quotes removed; typing happens in
/// [`TargetAggregation`](crate::TargetAggregation).
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
pub struct TableReader {
    path: PathBuf,
}

fn clean(cell: &str) -> String {
    cell.trim().trim_matches('"').to_string()
}

impl TableReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<RawTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that short rows surface as InconsistentRowLength.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;
        let columns: Vec<String> = header.iter().map(clean).collect();
        let expected = columns.len();
        debug!(expected, "read CSV header");

        let mut records = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }
            records.push(record.iter().map(clean).collect());
        }

        if records.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(n_records = records.len(), n_columns = expected, "table loaded");
        Ok(RawTable::new(columns, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_quoted_cells() {
        let csv = "\"gender\",\"lunch\",\"math\"\n\"female\",\"standard\",\"72\"\n\"male\", \"free/reduced\" ,\"47\"\n";
        let f = write_csv(csv);
        let raw = TableReader::new(f.path()).read().unwrap();
        assert_eq!(raw.columns(), &["gender", "lunch", "math"]);
        assert_eq!(raw.n_records(), 2);
        assert_eq!(raw.records()[0], vec!["female", "standard", "72"]);
        assert_eq!(raw.records()[1][1], "free/reduced");
    }

    #[test]
    fn insertion_order_preserved() {
        let csv = "a,s\nzzz,1\naaa,2\nmmm,3\n";
        let f = write_csv(csv);
        let raw = TableReader::new(f.path()).read().unwrap();
        let firsts: Vec<&str> = raw.records().iter().map(|r| r[0].as_str()).collect();
        assert_eq!(firsts, ["zzz", "aaa", "mmm"]);
    }

    #[test]
    fn error_file_not_found() {
        let result = TableReader::new(Path::new("/nonexistent/file.csv")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_empty_dataset() {
        let f = write_csv("a,b,c\n");
        let result = TableReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_inconsistent_row_length() {
        let f = write_csv("a,b,c\nx,1,2\ny,1\n");
        let result = TableReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::InconsistentRowLength { row_index: 1, expected: 3, got: 2, .. })
        ));
    }
}
