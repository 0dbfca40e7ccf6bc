use std::fs;
use std::path::Path;

use rust_xlsxwriter::Workbook;
use tempfile::tempdir;
use xlsx_merger::ToolError;
use xlsx_merger::consolidate::{self, DEFAULT_OUTPUT_NAME};
use xlsx_merger::io::excel_read;
use xlsx_merger::model::CellValue;
use xlsx_merger::options::{HeaderPolicy, MergeOptions, SchemaMismatchPolicy};

enum Cell {
    Text(&'static str),
    Number(f64),
    Blank,
}

use Cell::{Blank, Number, Text};

fn write_fixture(path: &Path, headers: &[&str], rows: &[Vec<Cell>]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("fixture folder created");
    }
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .expect("header written");
    }
    for (row_idx, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            let row_num = (row_idx + 1) as u32;
            match cell {
                Text(value) => {
                    worksheet
                        .write_string(row_num, col as u16, *value)
                        .expect("cell written");
                }
                Number(value) => {
                    worksheet
                        .write_number(row_num, col as u16, *value)
                        .expect("cell written");
                }
                Blank => {}
            }
        }
    }
    workbook.save(path).expect("fixture saved");
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn text(value: &str) -> CellValue {
    CellValue::from(value)
}

#[test]
fn merges_score_sheets_across_subfolders() {
    let temp_dir = tempdir().expect("temporary directory");
    let root = temp_dir.path().join("scores");
    write_fixture(
        &root.join("a_math.xlsx"),
        &["class", "name", "math"],
        &[vec![Number(1.0), Text("Ann"), Number(90.0)]],
    );
    write_fixture(
        &root.join("science").join("b_science.xlsx"),
        &["class ", "name", "science"],
        &[
            vec![Number(1.0), Text("Ann"), Number(85.0)],
            vec![Number(2.0), Text("Bo"), Number(70.0)],
        ],
    );

    let outcome = consolidate::merge_folder(&root, &keys(&["class", "name"]), &MergeOptions::default())
        .expect("folder merged");

    let table = &outcome.table;
    assert_eq!(table.columns(), ["class", "name", "math", "science"]);
    assert_eq!(
        table.rows(),
        [
            vec![
                CellValue::Number(1.0),
                text("Ann"),
                CellValue::Number(90.0),
                CellValue::Number(85.0),
            ],
            vec![
                CellValue::Number(2.0),
                text("Bo"),
                CellValue::Missing,
                CellValue::Number(70.0),
            ],
        ]
    );
    assert_eq!(outcome.merged_files.len(), 2);
    assert!(outcome.skipped.is_empty());

    let output = consolidate::resolve_output_path(temp_dir.path(), None);
    consolidate::write_table(table, &output).expect("merged workbook written");
    assert_eq!(output.file_name().and_then(|n| n.to_str()), Some(DEFAULT_OUTPUT_NAME));

    let restored = excel_read::read_table(&output, HeaderPolicy::StripAll).expect("output read");
    assert_eq!(restored.columns(), table.columns());
    assert_eq!(restored.rows(), table.rows());
}

#[test]
fn missing_key_column_aborts_without_touching_output() {
    let temp_dir = tempdir().expect("temporary directory");
    let root = temp_dir.path().join("input");
    write_fixture(
        &root.join("a.xlsx"),
        &["class", "name", "math"],
        &[vec![Number(1.0), Text("Ann"), Number(90.0)]],
    );
    write_fixture(
        &root.join("b.xlsx"),
        &["class", "science"],
        &[vec![Number(1.0), Number(85.0)]],
    );

    let output = temp_dir.path().join("merged.xlsx");
    fs::write(&output, b"previous run").expect("existing output written");

    let result = consolidate::merge_folder(&root, &keys(&["class", "name"]), &MergeOptions::default())
        .and_then(|outcome| consolidate::write_table(&outcome.table, &output));

    match result {
        Err(ToolError::SchemaMismatch { path, missing }) => {
            assert_eq!(path, root.join("b.xlsx"));
            assert_eq!(missing, vec!["name"]);
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
    assert_eq!(fs::read(&output).expect("output still present"), b"previous run");
}

#[test]
fn skip_policy_leaves_out_tables_without_keys() {
    let temp_dir = tempdir().expect("temporary directory");
    let root = temp_dir.path();
    write_fixture(&root.join("a.xlsx"), &["id", "x"], &[vec![Number(1.0), Text("a")]]);
    write_fixture(&root.join("b.xlsx"), &["other", "y"], &[vec![Number(1.0), Text("b")]]);

    let options = MergeOptions {
        on_schema_mismatch: SchemaMismatchPolicy::Skip,
        ..MergeOptions::default()
    };
    let outcome = consolidate::merge_folder(root, &keys(&["id"]), &options).expect("merged");

    assert_eq!(outcome.table.columns(), ["id", "x"]);
    assert_eq!(outcome.merged_files, vec![root.join("a.xlsx")]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].path, root.join("b.xlsx"));
}

#[test]
fn empty_folder_reports_no_input() {
    let temp_dir = tempdir().expect("temporary directory");
    fs::write(temp_dir.path().join("notes.txt"), b"not a spreadsheet").expect("file written");

    let error = consolidate::merge_folder(temp_dir.path(), &keys(&["id"]), &MergeOptions::default())
        .unwrap_err();

    assert!(matches!(error, ToolError::NoInput { root: Some(_) }));
}

#[test]
fn corrupt_spreadsheets_are_skipped() {
    let temp_dir = tempdir().expect("temporary directory");
    let root = temp_dir.path();
    fs::write(root.join("a_broken.xlsx"), b"definitely not a zip archive").expect("file written");
    write_fixture(&root.join("b.xlsx"), &["id", "x"], &[vec![Number(1.0), Text("b")]]);

    let outcome =
        consolidate::merge_folder(root, &keys(&["id"]), &MergeOptions::default()).expect("merged");

    assert_eq!(outcome.table.row_count(), 1);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].path, root.join("a_broken.xlsx"));
}

#[test]
fn only_corrupt_spreadsheets_report_no_input() {
    let temp_dir = tempdir().expect("temporary directory");
    fs::write(temp_dir.path().join("broken.xlsx"), b"garbage").expect("file written");

    let error = consolidate::merge_folder(temp_dir.path(), &keys(&["id"]), &MergeOptions::default())
        .unwrap_err();

    assert!(matches!(error, ToolError::NoInput { .. }));
}

#[test]
fn header_only_file_still_contributes_columns() {
    let temp_dir = tempdir().expect("temporary directory");
    let root = temp_dir.path();
    write_fixture(&root.join("a.xlsx"), &["id", "x"], &[vec![Number(1.0), Text("a")]]);
    write_fixture(&root.join("b.xlsx"), &["id", "y"], &[]);

    let outcome =
        consolidate::merge_folder(root, &keys(&["id"]), &MergeOptions::default()).expect("merged");

    assert_eq!(outcome.table.columns(), ["id", "x", "y"]);
    assert_eq!(
        outcome.table.rows(),
        [vec![CellValue::Number(1.0), text("a"), CellValue::Missing]]
    );
}

#[test]
fn colliding_columns_are_reported_and_kept() {
    let temp_dir = tempdir().expect("temporary directory");
    let root = temp_dir.path();
    write_fixture(&root.join("term1.xlsx"), &["id", "score"], &[vec![Number(1.0), Number(10.0)]]);
    write_fixture(&root.join("term2.xlsx"), &["id", "score"], &[vec![Number(1.0), Blank]]);

    let outcome =
        consolidate::merge_folder(root, &keys(&["id"]), &MergeOptions::default()).expect("merged");

    assert_eq!(outcome.table.columns(), ["id", "score", "score_term2"]);
    assert_eq!(
        outcome.table.rows(),
        [vec![CellValue::Number(1.0), CellValue::Number(10.0), CellValue::Missing]]
    );
    assert_eq!(outcome.renames.len(), 1);
    assert_eq!(outcome.renames[0].renamed, "score_term2");
}

#[test]
fn previous_output_is_excluded_from_discovery() {
    let temp_dir = tempdir().expect("temporary directory");
    let root = temp_dir.path();
    write_fixture(&root.join("a.xlsx"), &["id", "x"], &[vec![Number(1.0), Text("a")]]);
    let output = consolidate::resolve_output_path(root, Some("merged"));
    write_fixture(&output, &["id", "x"], &[vec![Number(1.0), Text("stale")]]);

    let options = MergeOptions {
        exclude: vec![output.clone()],
        ..MergeOptions::default()
    };
    let outcome = consolidate::merge_folder(root, &keys(&["id"]), &options).expect("merged");

    assert_eq!(outcome.merged_files, vec![root.join("a.xlsx")]);
    assert_eq!(outcome.table.columns(), ["id", "x"]);
}

#[test]
fn reference_columns_are_normalised() {
    let temp_dir = tempdir().expect("temporary directory");
    let reference = temp_dir.path().join("reference.xlsx");
    write_fixture(&reference, &[" class ", "student name", "math"], &[]);

    let stripped = consolidate::list_reference_columns(&reference, HeaderPolicy::StripAll)
        .expect("columns listed");
    let trimmed =
        consolidate::list_reference_columns(&reference, HeaderPolicy::Trim).expect("columns listed");

    assert_eq!(stripped, vec!["class", "studentname", "math"]);
    assert_eq!(trimmed, vec!["class", "student name", "math"]);
}

#[test]
fn missing_reference_file_is_a_load_error() {
    let temp_dir = tempdir().expect("temporary directory");
    let error = consolidate::list_reference_columns(
        &temp_dir.path().join("absent.xlsx"),
        HeaderPolicy::StripAll,
    )
    .unwrap_err();

    assert!(matches!(error, ToolError::Load { .. }));
}

#[test]
fn unwritable_output_is_a_write_error() {
    let temp_dir = tempdir().expect("temporary directory");
    let root = temp_dir.path().join("input");
    write_fixture(&root.join("a.xlsx"), &["id"], &[vec![Number(1.0)]]);
    let outcome =
        consolidate::merge_folder(&root, &keys(&["id"]), &MergeOptions::default()).expect("merged");

    let output = temp_dir.path().join("missing-folder").join("merged.xlsx");
    let error = consolidate::write_table(&outcome.table, &output).unwrap_err();

    assert!(matches!(error, ToolError::Write { .. }));
    assert!(!output.exists());
}
