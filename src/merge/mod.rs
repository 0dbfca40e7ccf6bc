//! Progressive full outer join of tables on a shared set of key columns.
//!
//! Output ordering is fixed rather than inherited from a hash map:
//!
//! * rows: every accumulator row in order, each followed in place by its
//!   matches from the right table (in right-table order); then the right rows
//!   that matched nothing, in their original order;
//! * columns: the accumulator's columns, then the right table's non-key
//!   columns in right-table order.
//!
//! A right-hand non-key column whose name is already taken is renamed to
//! `{name}_{source}` (then `_2`, `_3`, ... until unique) and the rename is
//! reported. Existing columns are never overwritten.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{Result, ToolError};
use crate::model::{CellValue, ColumnRename, Table};

/// Result of joining or merging tables.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    pub table: Table,
    /// Collision renames applied, in the order they happened.
    pub renames: Vec<ColumnRename>,
}

/// Hashable form of a key cell. Only cells that can take part in a match have
/// one: `Missing` and NaN never compare equal to anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Text(String),
    Number(u64),
    Bool(bool),
    DateTime(u64),
}

impl KeyPart {
    fn from_cell(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Text(value) => Some(KeyPart::Text(value.clone())),
            CellValue::Number(value) => float_bits(*value).map(KeyPart::Number),
            CellValue::Bool(value) => Some(KeyPart::Bool(*value)),
            CellValue::DateTime(value) => float_bits(*value).map(KeyPart::DateTime),
            CellValue::Missing => None,
        }
    }
}

fn float_bits(value: f64) -> Option<u64> {
    if value.is_nan() {
        return None;
    }
    // -0.0 and 0.0 must hash alike.
    let value = if value == 0.0 { 0.0 } else { value };
    Some(value.to_bits())
}

fn row_key(row: &[CellValue], indices: &[usize]) -> Option<Vec<KeyPart>> {
    indices
        .iter()
        .map(|&index| KeyPart::from_cell(&row[index]))
        .collect()
}

/// Fails with [`ToolError::SchemaMismatch`] unless `table` has every key column.
pub fn ensure_keys(table: &Table, keys: &[String]) -> Result<()> {
    let missing = table.missing_columns(keys);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ToolError::SchemaMismatch {
            path: PathBuf::from(&table.source),
            missing,
        })
    }
}

fn key_indices(table: &Table, keys: &[String]) -> Result<Vec<usize>> {
    ensure_keys(table, keys)?;
    Ok(keys
        .iter()
        .filter_map(|key| table.column_index(key))
        .collect())
}

/// Performs one full outer join of `left` (the accumulator) and `right` on
/// `keys`. Both tables must contain every key column.
pub fn join_tables(left: &Table, right: &Table, keys: &[String]) -> Result<MergeResult> {
    let left_keys = key_indices(left, keys)?;
    let right_keys = key_indices(right, keys)?;

    let mut columns: Vec<String> = left.columns().to_vec();
    let mut taken: HashSet<String> = columns.iter().cloned().collect();
    let mut renames = Vec::new();
    let mut carried: Vec<usize> = Vec::new();

    for (index, name) in right.columns().iter().enumerate() {
        if right_keys.contains(&index) {
            continue;
        }
        let assigned = if taken.contains(name) {
            let renamed = unique_name(&taken, name, &right.source);
            renames.push(ColumnRename {
                source: right.source.clone(),
                original: name.clone(),
                renamed: renamed.clone(),
            });
            renamed
        } else {
            name.clone()
        };
        taken.insert(assigned.clone());
        columns.push(assigned);
        carried.push(index);
    }

    let mut right_index: HashMap<Vec<KeyPart>, Vec<usize>> = HashMap::new();
    for (row_idx, row) in right.rows().iter().enumerate() {
        if let Some(key) = row_key(row, &right_keys) {
            right_index.entry(key).or_default().push(row_idx);
        }
    }

    let mut table = Table::new(left.source.clone(), columns);
    let mut matched = vec![false; right.row_count()];

    for left_row in left.rows() {
        let matches = row_key(left_row, &left_keys).and_then(|key| right_index.get(&key));
        match matches {
            Some(right_rows) => {
                for &right_idx in right_rows {
                    matched[right_idx] = true;
                    let right_row = &right.rows()[right_idx];
                    let mut cells = left_row.clone();
                    cells.extend(carried.iter().map(|&index| right_row[index].clone()));
                    table.push_row(cells);
                }
            }
            None => {
                let mut cells = left_row.clone();
                cells.extend(std::iter::repeat_n(CellValue::Missing, carried.len()));
                table.push_row(cells);
            }
        }
    }

    for (right_idx, right_row) in right.rows().iter().enumerate() {
        if matched[right_idx] {
            continue;
        }
        let mut cells = vec![CellValue::Missing; left.column_count()];
        for (&left_idx, &key_idx) in left_keys.iter().zip(&right_keys) {
            cells[left_idx] = right_row[key_idx].clone();
        }
        cells.extend(carried.iter().map(|&index| right_row[index].clone()));
        table.push_row(cells);
    }

    debug!(
        left = %left.source,
        right = %right.source,
        row_count = table.row_count(),
        column_count = table.column_count(),
        rename_count = renames.len(),
        "joined tables"
    );

    Ok(MergeResult { table, renames })
}

fn unique_name(taken: &HashSet<String>, name: &str, source: &str) -> String {
    let base = format!("{name}_{source}");
    if !taken.contains(&base) {
        return base;
    }
    let mut counter = 2;
    loop {
        let candidate = format!("{base}_{counter}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Folds `tables` into one table by repeated [`join_tables`], starting from
/// the first table. A single table is returned unchanged once its keys are
/// validated.
pub fn merge_tables(tables: Vec<Table>, keys: &[String]) -> Result<MergeResult> {
    if keys.is_empty() {
        return Err(ToolError::InvalidKeys(
            "at least one key column is required".into(),
        ));
    }

    let table_count = tables.len();
    let mut remaining = tables.into_iter();
    let mut accumulator = remaining.next().ok_or(ToolError::NoInput { root: None })?;
    ensure_keys(&accumulator, keys)?;

    let mut renames = Vec::new();
    for table in remaining {
        let step = join_tables(&accumulator, &table, keys)?;
        accumulator = step.table;
        renames.extend(step.renames);
    }

    info!(
        table_count,
        row_count = accumulator.row_count(),
        column_count = accumulator.column_count(),
        "merged tables"
    );

    Ok(MergeResult {
        table: accumulator,
        renames,
    })
}
