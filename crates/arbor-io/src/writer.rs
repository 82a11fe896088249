//! JSON result writer for cross-validation and forest reports.

use std::fs;
use std::path::{Path, PathBuf};

use arbor_tree::{BinaryCounts, ClassMetrics, ConfusionMatrix, HoldoutReport, MaeReport};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes evaluation reports to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_kfold.json` and
/// `{experiment}_forest.json`.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Path of the k-fold report.
    #[must_use]
    pub fn kfold_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_kfold.json", self.experiment.as_str()))
    }

    /// Path of the forest report.
    #[must_use]
    pub fn forest_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_forest.json", self.experiment.as_str()))
    }

    /// Write a score-tree cross-validation report to `{experiment}_kfold.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | The report cannot be rendered |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all)]
    pub fn write_kfold(&self, report: &MaeReport) -> Result<PathBuf, IoError> {
        let path = self.kfold_path();
        let artifact = KfoldArtifact {
            experiment: self.experiment.as_str(),
            report,
        };
        write_json(&path, &artifact)?;
        info!(path = %path.display(), "k-fold report written");
        Ok(path)
    }

    /// Write a forest holdout report to `{experiment}_forest.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | The report cannot be rendered |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all)]
    pub fn write_forest(&self, report: &HoldoutReport) -> Result<PathBuf, IoError> {
        let path = self.forest_path();
        let forest = report.result().forest();

        let best_trees = forest
            .best_kept()
            .into_iter()
            .map(|member| TreeEntry {
                validation_accuracy: member.validation_accuracy(),
                n_validation: member.validation().total(),
                n_nodes: member.tree().n_nodes(),
                depth: member.tree().depth(),
            })
            .collect();

        let artifact = ForestArtifact {
            experiment: self.experiment.as_str(),
            n_trees: forest.members().len(),
            keep: forest.keep(),
            n_test: report.n_test(),
            ensemble: MatrixEntry::new(report.result().confusion_matrix()),
            test: MatrixEntry::new(report.test_matrix()),
            best_trees,
        };
        write_json(&path, &artifact)?;
        info!(path = %path.display(), "forest report written");
        Ok(path)
    }
}

fn write_json<T: Serialize>(path: &Path, artifact: &T) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, &json).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct KfoldArtifact<'a> {
    experiment: &'a str,
    #[serde(flatten)]
    report: &'a MaeReport,
}

#[derive(Serialize)]
struct ForestArtifact<'a> {
    experiment: &'a str,
    n_trees: usize,
    keep: usize,
    n_test: usize,
    ensemble: MatrixEntry<'a>,
    test: MatrixEntry<'a>,
    best_trees: Vec<TreeEntry>,
}

#[derive(Serialize)]
struct MatrixEntry<'a> {
    confusion_matrix: &'a [Vec<usize>],
    accuracy: f64,
    pooled: BinaryCounts,
    standard_error: f64,
    class_metrics: Vec<ClassMetrics>,
}

impl<'a> MatrixEntry<'a> {
    fn new(matrix: &'a ConfusionMatrix) -> Self {
        let pooled = matrix.pooled();
        Self {
            confusion_matrix: matrix.as_rows(),
            accuracy: matrix.accuracy(),
            pooled,
            standard_error: pooled.standard_error(),
            class_metrics: matrix.class_metrics(),
        }
    }
}

#[derive(Serialize)]
struct TreeEntry {
    validation_accuracy: f64,
    n_validation: usize,
    n_nodes: usize,
    depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_tree::{CrossValidation, ForestConfig, Header, Row, Table, Value};
    use tempfile::TempDir;

    fn class_table() -> Table {
        let header = Header::new(vec!["a".into(), "class".into()]).unwrap();
        let rows = (0..30)
            .map(|i| {
                let class = (i % 3 + 1) as i64;
                Row::new(vec![Value::category(format!("g{class}")), Value::Integer(class)])
            })
            .collect();
        Table::new(header, rows).unwrap()
    }

    fn score_table() -> Table {
        let header = Header::new(vec!["a".into(), "AvgScore".into()]).unwrap();
        let rows = (0..20)
            .map(|i| {
                let level = i % 2;
                Row::new(vec![Value::category(format!("l{level}")), Value::real(50.0 + level as f64)])
            })
            .collect();
        Table::new(header, rows).unwrap()
    }

    fn read(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn write_kfold_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("cv_run".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), experiment).unwrap();

        let report = CrossValidation::new(4).unwrap().mean_absolute_error(&score_table()).unwrap();
        let path = writer.write_kfold(&report).unwrap();
        assert_eq!(path, dir.path().join("cv_run_kfold.json"));

        let content = read(&path);
        assert_eq!(content["experiment"], "cv_run");
        assert_eq!(content["n_folds"], 4);
        assert_eq!(content["n_rows"], 20);
        assert_eq!(content["fold_errors"].as_array().unwrap().len(), 4);
        assert!(content["mean_absolute_error"].is_number());
    }

    #[test]
    fn write_forest_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("bagging".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), experiment).unwrap();

        let report = ForestConfig::new(4, 2)
            .unwrap()
            .evaluate_holdout(&class_table(), 3)
            .unwrap();
        let path = writer.write_forest(&report).unwrap();

        let content = read(&path);
        assert_eq!(content["experiment"], "bagging");
        assert_eq!(content["n_trees"], 4);
        assert_eq!(content["keep"], 2);
        assert_eq!(content["n_test"], 10);
        assert_eq!(content["best_trees"].as_array().unwrap().len(), 2);
        assert_eq!(content["ensemble"]["confusion_matrix"].as_array().unwrap().len(), 3);
        assert!(content["test"]["pooled"]["tp"].is_number());
        assert_eq!(content["test"]["class_metrics"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let experiment = ExperimentName::new("nested_test".into()).unwrap();
        let writer = ReportWriter::new(&nested, experiment).unwrap();

        let report = CrossValidation::new(2).unwrap().mean_absolute_error(&score_table()).unwrap();
        writer.write_kfold(&report).unwrap();
        assert!(nested.join("nested_test_kfold.json").exists());
    }
}
