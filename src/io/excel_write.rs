use std::io::Write;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tempfile::NamedTempFile;

use crate::error::{Result, ToolError};
use crate::model::{CellValue, Table};

/// Name of the single worksheet holding the merged table.
pub const MERGED_SHEET: &str = "Merged";

const DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Writes the table to `path` as an `.xlsx` workbook.
///
/// The workbook is rendered in memory, written to a temporary file next to
/// `path` and renamed into place, so a failed write never leaves a truncated
/// file behind and never touches an existing file at `path`.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let bytes = render_workbook(table).map_err(|err| ToolError::write(path, err))?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(parent).map_err(|err| ToolError::write(path, err))?;
    staged
        .write_all(&bytes)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|err| ToolError::write(path, err))?;
    staged
        .persist(path)
        .map_err(|err| ToolError::write(path, err.error))?;

    Ok(())
}

fn render_workbook(table: &Table) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(MERGED_SHEET)?;

    for (col_idx, header) in table.columns().iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, header)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let excel_col = col_idx as u16;
            match cell {
                CellValue::Text(value) => {
                    worksheet.write_string(excel_row, excel_col, value)?;
                }
                CellValue::Number(value) => {
                    worksheet.write_number(excel_row, excel_col, *value)?;
                }
                CellValue::Bool(value) => {
                    worksheet.write_boolean(excel_row, excel_col, *value)?;
                }
                CellValue::DateTime(serial) => {
                    worksheet.write_number_with_format(excel_row, excel_col, *serial, &date_format)?;
                }
                CellValue::Missing => {}
            }
        }
    }

    if table.column_count() > 0 {
        let col_end = (table.column_count() as u16).saturating_sub(1);
        worksheet.autofilter(0, 0, table.row_count() as u32, col_end)?;
        worksheet.set_freeze_panes(1, 0)?;
    }

    workbook.save_to_buffer()
}
