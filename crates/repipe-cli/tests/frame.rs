//! CSV input and feature export.

use std::fs;

use ndarray::array;
use repipe_cli::frame::{read_frame, write_features};
use repipe_pipeline::{FieldValue, SparseMatrix};
use tempfile::TempDir;

#[test]
fn read_frame_uses_header_row() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("input.csv");
    fs::write(&path, "title,price\nred shoe,12\nblue hat,7\n").unwrap();

    let df = read_frame(&path).unwrap();

    assert_eq!(df.height(), 2);
    let names: Vec<&str> = df.get_column_names().iter().map(|name| name.as_str()).collect();
    assert_eq!(names, vec!["title", "price"]);
}

#[test]
fn read_frame_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = read_frame(&dir.path().join("absent.csv")).unwrap_err();
    assert!(format!("{err:#}").contains("absent.csv"));
}

#[test]
fn write_features_expands_matrices() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("features.csv");
    let features = vec![
        FieldValue::text(["a", "b"]),
        FieldValue::Matrix(array![[1.0, 0.5], [0.0, 2.0]]),
        FieldValue::Numeric(vec![Some(3.0), None]),
    ];

    let rows = write_features(&path, &features).unwrap();

    assert_eq!(rows, 2);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "f0,f1_0,f1_1,f2\na,1,0.5,3\nb,0,2,\n"
    );
}

#[test]
fn write_features_densifies_sparse_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sparse.csv");
    let sparse = SparseMatrix::from_rows(vec![vec![(1, 1.0)], vec![(0, 1.0)]], 2).unwrap();

    write_features(&path, &[FieldValue::Sparse(sparse)]).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "f0_0,f0_1\n0,1\n1,0\n"
    );
}

#[test]
fn write_features_rejects_ragged_features() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ragged.csv");
    let features = vec![FieldValue::text(["a", "b"]), FieldValue::text(["c"])];

    let err = write_features(&path, &features).unwrap_err();
    assert!(err.to_string().contains("row counts"));
}
