//! End-to-end integration tests: CSV -> aggregate -> evaluate -> JSON.

use std::fs;
use std::path::Path;

use arbor_io::{ExperimentName, ReportWriter, TableReader, TargetAggregation, TargetSpec};
use arbor_tree::{CrossValidation, ForestConfig, Value};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn kfold_round_trip() {
    // 1. Read CSV
    let raw = TableReader::new(&fixture_path("students_40.csv"))
        .read()
        .expect("fixture should parse");
    assert_eq!(raw.n_records(), 40);
    assert_eq!(raw.columns().len(), 8);

    // 2. Mean of the three score columns
    let table = TargetSpec::new(3, TargetAggregation::Mean).apply(&raw).unwrap();
    assert_eq!(table.header().n_attributes(), 5);
    assert_eq!(table.header().target_name(), "AvgScore");
    assert!(matches!(table.rows()[0].target(), Value::Real(_)));
    assert_eq!(table.rows()[0].values()[0], Value::from("female"));

    // 3. Ten-fold score-tree cross-validation
    let report = CrossValidation::new(10).unwrap().mean_absolute_error(&table).unwrap();
    assert_eq!(report.fold_errors.len(), 10);
    assert!(report.mean_absolute_error.is_finite());
    assert!(report.mean_absolute_error >= 0.0);

    // 4. Write JSON artifact and read it back
    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("kfold_rt".into()).unwrap();
    let writer = ReportWriter::new(dir.path(), experiment).unwrap();
    let path = writer.write_kfold(&report).unwrap();

    let content = read_json(&path);
    assert_eq!(content["experiment"], "kfold_rt");
    assert_eq!(content["n_rows"], 40);
    let mae = content["mean_absolute_error"].as_f64().unwrap();
    assert!((mae - report.mean_absolute_error).abs() < 1e-9);
}

#[test]
fn forest_round_trip() {
    let raw = TableReader::new(&fixture_path("students_40.csv"))
        .read()
        .expect("fixture should parse");

    // Quartile classes over the summed scores
    let table = TargetSpec::new(3, TargetAggregation::Quartile).apply(&raw).unwrap();
    assert_eq!(table.n_classes().unwrap(), 4);

    let config = ForestConfig::new(4, 2)
        .unwrap()
        .with_seed(42)
        .with_max_attributes(Some(3));
    let report = config.evaluate_holdout(&table, 3).unwrap();

    // 40 rows dealt round-robin into three folds; the last holds 13.
    assert_eq!(report.n_test(), 13);
    assert_eq!(report.test_matrix().total(), 13);
    assert_eq!(report.result().forest().members().len(), 4);

    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("forest_rt".into()).unwrap();
    let writer = ReportWriter::new(dir.path(), experiment).unwrap();
    let path = writer.write_forest(&report).unwrap();
    assert_eq!(path, dir.path().join("forest_rt_forest.json"));

    let content = read_json(&path);
    assert_eq!(content["n_trees"], 4);
    assert_eq!(content["best_trees"].as_array().unwrap().len(), 2);
    let grid = content["ensemble"]["confusion_matrix"].as_array().unwrap();
    assert_eq!(grid.len(), 4);
    let scored: u64 = grid
        .iter()
        .flat_map(|row| row.as_array().unwrap())
        .map(|c| c.as_u64().unwrap())
        .sum();
    assert_eq!(scored as usize, report.result().confusion_matrix().total());
}

#[test]
fn same_seed_same_report() {
    let raw = TableReader::new(&fixture_path("students_40.csv")).read().unwrap();
    let table = TargetSpec::new(3, TargetAggregation::Quartile).apply(&raw).unwrap();
    let config = ForestConfig::new(3, 1).unwrap().with_seed(9);
    let a = config.evaluate_holdout(&table, 3).unwrap();
    let b = config.evaluate_holdout(&table, 3).unwrap();
    assert_eq!(a.test_matrix(), b.test_matrix());
    assert_eq!(a.result().confusion_matrix(), b.result().confusion_matrix());
}
