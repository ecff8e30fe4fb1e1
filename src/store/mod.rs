//! Remote table store capability. Rows and columns are 1-based; row 1 is the header.
//!
//! The data-access layer only talks to a store through [`RemoteTableStore`], so the
//! backing service is injected by the caller (and mocked in tests).

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;

/// One record: column name to scalar value, in column order.
pub type Row = serde_json::Map<String, Value>;

#[async_trait]
pub trait RemoteTableStore: Send + Sync {
    /// Every used row, header first. Trailing empty cells may be omitted per row.
    async fn get_all_values(&self, table: &str) -> Result<Vec<Vec<Value>>, StoreError>;

    /// First row, or empty when the table has no header yet.
    async fn header(&self, table: &str) -> Result<Vec<String>, StoreError>;

    /// Insert `rows` so the first lands at `at_row`; later rows shift down.
    async fn insert_rows(&self, table: &str, at_row: usize, rows: Vec<Vec<Value>>) -> Result<(), StoreError>;

    /// Overwrite a whole row starting at column 1.
    async fn update_row(&self, table: &str, row: usize, values: Vec<Value>) -> Result<(), StoreError>;

    async fn update_cell(&self, table: &str, row: usize, col: usize, value: Value) -> Result<(), StoreError>;

    async fn delete_row(&self, table: &str, row: usize) -> Result<(), StoreError>;

    /// Create the worksheet if absent. Returns true when it was created.
    async fn ensure_table(&self, table: &str) -> Result<bool, StoreError>;
}

/// Worksheet contents shared by the in-process stores.
pub(crate) type Sheets = std::collections::BTreeMap<String, Vec<Vec<Value>>>;

pub(crate) fn sheet<'a>(sheets: &'a Sheets, table: &str) -> Result<&'a Vec<Vec<Value>>, StoreError> {
    sheets
        .get(table)
        .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
}

pub(crate) fn sheet_mut<'a>(sheets: &'a mut Sheets, table: &str) -> Result<&'a mut Vec<Vec<Value>>, StoreError> {
    sheets
        .get_mut(table)
        .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
}

fn check_index(what: &str, index: usize) -> Result<usize, StoreError> {
    index
        .checked_sub(1)
        .ok_or_else(|| StoreError::Request(format!("{} index is 1-based, got 0", what)))
}

/// Spreadsheet semantics over a plain grid, shared by [`MemoryStore`] and [`FileStore`].
pub(crate) mod grid {
    use super::*;

    pub fn header(rows: &[Vec<Value>]) -> Vec<String> {
        rows.first()
            .map(|r| r.iter().map(crate::coerce::stringify).collect())
            .unwrap_or_default()
    }

    pub fn insert_rows(grid: &mut Vec<Vec<Value>>, at_row: usize, rows: Vec<Vec<Value>>) -> Result<(), StoreError> {
        let at = check_index("row", at_row)?;
        // Writing past the end leaves blank rows in between, as a spreadsheet would.
        while grid.len() < at {
            grid.push(Vec::new());
        }
        for (i, r) in rows.into_iter().enumerate() {
            grid.insert(at + i, r);
        }
        Ok(())
    }

    pub fn update_row(grid: &mut Vec<Vec<Value>>, row: usize, values: Vec<Value>) -> Result<(), StoreError> {
        let r = check_index("row", row)?;
        while grid.len() <= r {
            grid.push(Vec::new());
        }
        let target = &mut grid[r];
        for (i, v) in values.into_iter().enumerate() {
            if target.len() <= i {
                target.resize(i + 1, Value::String(String::new()));
            }
            target[i] = v;
        }
        Ok(())
    }

    pub fn update_cell(grid: &mut Vec<Vec<Value>>, row: usize, col: usize, value: Value) -> Result<(), StoreError> {
        let r = check_index("row", row)?;
        let c = check_index("column", col)?;
        while grid.len() <= r {
            grid.push(Vec::new());
        }
        let target = &mut grid[r];
        if target.len() <= c {
            target.resize(c + 1, Value::String(String::new()));
        }
        target[c] = value;
        Ok(())
    }

    pub fn delete_row(grid: &mut Vec<Vec<Value>>, row: usize) -> Result<(), StoreError> {
        let r = check_index("row", row)?;
        if r >= grid.len() {
            return Err(StoreError::Request(format!("row {} out of range ({} rows)", row, grid.len())));
        }
        grid.remove(r);
        Ok(())
    }

    /// Drop trailing rows with no content so the used range matches what a sheet reports.
    pub fn used(rows: &[Vec<Value>]) -> Vec<Vec<Value>> {
        let last = rows
            .iter()
            .rposition(|r| r.iter().any(|v| !crate::coerce::is_blank(Some(v))))
            .map(|i| i + 1)
            .unwrap_or(0);
        rows[..last].to_vec()
    }
}
