use std::collections::HashSet;
use std::path::Path;

use calamine::{DataType, Range, Reader, open_workbook_auto};
use tracing::{debug, warn};

use crate::error::{Result, ToolError};
use crate::model::{CellValue, Table};
use crate::options::HeaderPolicy;

/// Loads the first worksheet of a spreadsheet into a [`Table`].
///
/// The first row of the used range is the header row; its cells are
/// normalised with `policy`. Rows in which every cell is empty are dropped.
/// The workbook format is chosen from the file extension.
pub fn read_table(path: &Path, policy: HeaderPolicy) -> Result<Table> {
    if !path.is_file() {
        return Err(ToolError::load(path, "file does not exist"));
    }

    let range = read_first_sheet(path)?;
    let mut rows = range.rows();

    let raw_headers: Vec<String> = match rows.next() {
        Some(first_row) => first_row.iter().map(cell_to_header).collect(),
        None => Vec::new(),
    };
    let columns = normalize_headers(path, raw_headers, policy);

    let mut table = Table::new(source_label(path), columns);
    for row in rows {
        let cells: Vec<CellValue> = row.iter().map(cell_to_value).collect();
        if cells.iter().all(CellValue::is_missing) {
            continue;
        }
        table.push_row(cells);
    }

    debug!(
        path = %path.display(),
        column_count = table.column_count(),
        row_count = table.row_count(),
        "loaded spreadsheet"
    );
    Ok(table)
}

/// Returns the normalised header row of a spreadsheet.
pub fn read_columns(path: &Path, policy: HeaderPolicy) -> Result<Vec<String>> {
    let table = read_table(path, policy)?;
    Ok(table.columns().to_vec())
}

fn read_first_sheet(path: &Path) -> Result<Range<DataType>> {
    let mut workbook = open_workbook_auto(path).map_err(|err| ToolError::load(path, err))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ToolError::load(path, "workbook contains no worksheets"))?;

    let range_result = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| ToolError::load(path, format!("missing sheet '{sheet_name}'")))?;
    range_result.map_err(|err| ToolError::load(path, err))
}

/// Canonicalises header cells and makes them unique within one table.
///
/// Blank headers become `column{N}` (1-based position); repeated names get
/// `.1`, `.2`, ... appended to later occurrences.
pub(crate) fn normalize_headers(
    path: &Path,
    raw: Vec<String>,
    policy: HeaderPolicy,
) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut columns = Vec::with_capacity(raw.len());

    for (index, header) in raw.iter().enumerate() {
        let mut name = policy.normalize(header);
        if name.is_empty() {
            name = format!("column{}", index + 1);
            warn!(path = %path.display(), column = %name, "blank header cell");
        }

        if used.contains(&name) {
            let base = name.clone();
            let mut counter = 1;
            while used.contains(&name) {
                name = format!("{base}.{counter}");
                counter += 1;
            }
            warn!(path = %path.display(), original = %base, renamed = %name, "duplicate header");
        }

        used.insert(name.clone());
        columns.push(name);
    }

    columns
}

fn source_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn cell_to_header(cell: &DataType) -> String {
    match cell {
        DataType::String(value) => value.clone(),
        DataType::Float(value) => value.to_string(),
        DataType::Int(value) => value.to_string(),
        DataType::Bool(value) => value.to_string(),
        DataType::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::DateTime(serial) => CellValue::DateTime(*serial),
        DataType::Empty => CellValue::Missing,
        other => CellValue::Text(other.to_string()),
    }
}
