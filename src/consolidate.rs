use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::error::{Result, ToolError};
use crate::io::discover::discover_files;
use crate::io::excel_read;
use crate::io::excel_write;
use crate::merge::merge_tables;
use crate::model::{ColumnRename, Table};
use crate::options::{HeaderPolicy, MergeOptions, SchemaMismatchPolicy, normalize_key_columns};

/// File name used when the caller does not choose one.
pub const DEFAULT_OUTPUT_NAME: &str = "merged_Excel.xlsx";

/// A discovered file that did not take part in the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a folder merge produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub table: Table,
    pub renames: Vec<ColumnRename>,
    /// Files folded into `table`, in merge order.
    pub merged_files: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

/// Lists the normalised header of a reference spreadsheet so the caller can
/// offer its columns as merge keys.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn list_reference_columns(path: &Path, policy: HeaderPolicy) -> Result<Vec<String>> {
    let columns = excel_read::read_columns(path, policy)?;
    info!(column_count = columns.len(), "read reference columns");
    Ok(columns)
}

/// Discovers every spreadsheet under `root` and outer-joins them on `keys`.
///
/// Files that fail to load are logged and skipped. Files lacking a key column
/// abort the merge or are skipped according to
/// [`MergeOptions::on_schema_mismatch`]. Nothing is returned unless the whole
/// merge succeeds.
#[instrument(level = "info", skip_all, fields(root = %root.display()))]
pub fn merge_folder(root: &Path, keys: &[String], options: &MergeOptions) -> Result<MergeOutcome> {
    let keys = normalize_key_columns(keys, options.header_policy)?;
    let files = discover_files(root, options)?;
    info!(file_count = files.len(), keys = ?keys, "discovered spreadsheets");

    let mut tables = Vec::with_capacity(files.len());
    let mut merged_files = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();

    for path in files {
        let table = match excel_read::read_table(&path, options.header_policy) {
            Ok(table) => table,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable spreadsheet");
                skipped.push(SkippedFile {
                    path,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let missing = table.missing_columns(&keys);
        if !missing.is_empty() {
            let err = ToolError::SchemaMismatch {
                path: path.clone(),
                missing,
            };
            match options.on_schema_mismatch {
                SchemaMismatchPolicy::Abort => return Err(err),
                SchemaMismatchPolicy::Skip => {
                    warn!(path = %path.display(), error = %err, "skipping spreadsheet without key columns");
                    skipped.push(SkippedFile {
                        path,
                        reason: err.to_string(),
                    });
                    continue;
                }
            }
        }

        tables.push(table);
        merged_files.push(path);
    }

    if tables.is_empty() {
        return Err(ToolError::NoInput {
            root: Some(root.to_path_buf()),
        });
    }

    let result = merge_tables(tables, &keys)?;
    info!(
        merged = merged_files.len(),
        skipped = skipped.len(),
        renamed = result.renames.len(),
        "folder merge complete"
    );

    Ok(MergeOutcome {
        table: result.table,
        renames: result.renames,
        merged_files,
        skipped,
    })
}

/// Persists a merged table as an `.xlsx` workbook at `output`.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub fn write_table(table: &Table, output: &Path) -> Result<()> {
    excel_write::write_table(output, table)?;
    info!(
        row_count = table.row_count(),
        column_count = table.column_count(),
        "wrote merged workbook"
    );
    Ok(())
}

/// Joins the output folder with the chosen file name, falling back to
/// [`DEFAULT_OUTPUT_NAME`] and appending `.xlsx` when the name lacks it.
pub fn resolve_output_path(output_dir: &Path, name: Option<&str>) -> PathBuf {
    let name = name.map(str::trim).filter(|name| !name.is_empty());
    let file_name = match name {
        Some(name) if name.to_ascii_lowercase().ends_with(".xlsx") => name.to_string(),
        Some(name) => format!("{name}.xlsx"),
        None => DEFAULT_OUTPUT_NAME.to_string(),
    };
    output_dir.join(file_name)
}
