//! In-process store. Used by tests and by `SHEETBASE_STORE=memory` runs.

use super::{grid, sheet, sheet_mut, RemoteTableStore, Sheets};
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    sheets: Mutex<Sheets>,
    /// Remaining calls that fail with a transient error before the store answers again.
    fail_next: AtomicU32,
    calls: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one worksheet. `rows` includes the header.
    pub async fn with_table(self, table: &str, rows: Vec<Vec<Value>>) -> Self {
        self.sheets.lock().await.insert(table.to_string(), rows);
        self
    }

    /// Make the next `n` calls fail with [`StoreError::Transient`].
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Calls received, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Successful mutating calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw grid of a worksheet, header included.
    pub async fn snapshot(&self, table: &str) -> Option<Vec<Vec<Value>>> {
        self.sheets.lock().await.get(table).cloned()
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StoreError::Transient("rate limit exceeded".into()));
        }
        Ok(())
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteTableStore for MemoryStore {
    async fn get_all_values(&self, table: &str) -> Result<Vec<Vec<Value>>, StoreError> {
        self.enter()?;
        let sheets = self.sheets.lock().await;
        Ok(grid::used(sheet(&sheets, table)?))
    }

    async fn header(&self, table: &str) -> Result<Vec<String>, StoreError> {
        self.enter()?;
        let sheets = self.sheets.lock().await;
        Ok(grid::header(sheet(&sheets, table)?))
    }

    async fn insert_rows(&self, table: &str, at_row: usize, rows: Vec<Vec<Value>>) -> Result<(), StoreError> {
        self.enter()?;
        let mut sheets = self.sheets.lock().await;
        grid::insert_rows(sheet_mut(&mut sheets, table)?, at_row, rows)?;
        self.wrote();
        Ok(())
    }

    async fn update_row(&self, table: &str, row: usize, values: Vec<Value>) -> Result<(), StoreError> {
        self.enter()?;
        let mut sheets = self.sheets.lock().await;
        grid::update_row(sheet_mut(&mut sheets, table)?, row, values)?;
        self.wrote();
        Ok(())
    }

    async fn update_cell(&self, table: &str, row: usize, col: usize, value: Value) -> Result<(), StoreError> {
        self.enter()?;
        let mut sheets = self.sheets.lock().await;
        grid::update_cell(sheet_mut(&mut sheets, table)?, row, col, value)?;
        self.wrote();
        Ok(())
    }

    async fn delete_row(&self, table: &str, row: usize) -> Result<(), StoreError> {
        self.enter()?;
        let mut sheets = self.sheets.lock().await;
        grid::delete_row(sheet_mut(&mut sheets, table)?, row)?;
        self.wrote();
        Ok(())
    }

    async fn ensure_table(&self, table: &str) -> Result<bool, StoreError> {
        self.enter()?;
        let mut sheets = self.sheets.lock().await;
        if sheets.contains_key(table) {
            return Ok(false);
        }
        sheets.insert(table.to_string(), Vec::new());
        self.wrote();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn grid_operations() {
        let store = MemoryStore::new().with_table("t", vec![vec![json!("A"), json!("B")]]).await;
        store.insert_rows("t", 2, vec![vec![json!(1), json!(2)], vec![json!(3)]]).await.unwrap();
        store.update_cell("t", 3, 2, json!(4)).await.unwrap();
        store.delete_row("t", 2).await.unwrap();
        let rows = store.get_all_values("t").await.unwrap();
        assert_eq!(rows, vec![vec![json!("A"), json!("B")], vec![json!(3), json!(4)]]);
        assert_eq!(store.header("t").await.unwrap(), vec!["A", "B"]);
        assert_eq!(store.write_count(), 3);
    }

    #[tokio::test]
    async fn missing_table_and_injected_failures() {
        let store = MemoryStore::new();
        assert!(matches!(store.header("nope").await, Err(StoreError::TableNotFound(_))));
        assert!(store.ensure_table("nope").await.unwrap());
        assert!(!store.ensure_table("nope").await.unwrap());
        store.fail_next(2);
        assert!(store.header("nope").await.unwrap_err().is_transient());
        assert!(store.header("nope").await.unwrap_err().is_transient());
        assert!(store.header("nope").await.unwrap().is_empty());
        assert_eq!(store.call_count(), 6);
    }
}
