//! File I/O, target aggregation, and report serialization for arbor.

mod aggregate;
mod domain;
mod error;
mod reader;
mod writer;

pub use aggregate::{DEFAULT_TARGET_NAME, TargetAggregation, TargetSpec};
pub use domain::{ExperimentName, RawTable};
pub use error::IoError;
pub use reader::TableReader;
pub use writer::ReportWriter;
