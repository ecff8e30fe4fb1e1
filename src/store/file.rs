//! JSON-file store: all worksheets in one document, rewritten after every write.

use super::{grid, sheet, sheet_mut, RemoteTableStore, Sheets};
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub struct FileStore {
    path: PathBuf,
    sheets: Mutex<Sheets>,
}

impl FileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let sheets = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => Sheets::new(),
            Ok(text) => serde_json::from_str::<Sheets>(&text)
                .map_err(|e| StoreError::Io(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "store file not found, starting empty");
                Sheets::new()
            }
            Err(e) => return Err(StoreError::Io(format!("{}: {}", path.display(), e))),
        };
        Ok(FileStore {
            path,
            sheets: Mutex::new(sheets),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write to a sibling temp file, then rename over the target.
    async fn persist(&self, sheets: &Sheets) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(sheets).map_err(|e| StoreError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| StoreError::Transient(format!("write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Transient(format!("rename to {}: {}", self.path.display(), e)))?;
        Ok(())
    }

    /// Apply `edit` to a copy of `table` and keep the copy only once it is on disk.
    /// A failed write leaves the grid untouched.
    async fn commit<F>(&self, table: &str, edit: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<Vec<Value>>) -> Result<(), StoreError> + Send,
    {
        let mut sheets = self.sheets.lock().await;
        let mut next = sheets.clone();
        edit(sheet_mut(&mut next, table)?)?;
        self.persist(&next).await?;
        *sheets = next;
        Ok(())
    }
}

#[async_trait]
impl RemoteTableStore for FileStore {
    async fn get_all_values(&self, table: &str) -> Result<Vec<Vec<Value>>, StoreError> {
        let sheets = self.sheets.lock().await;
        Ok(grid::used(sheet(&sheets, table)?))
    }

    async fn header(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let sheets = self.sheets.lock().await;
        Ok(grid::header(sheet(&sheets, table)?))
    }

    async fn insert_rows(&self, table: &str, at_row: usize, rows: Vec<Vec<Value>>) -> Result<(), StoreError> {
        self.commit(table, |cells| grid::insert_rows(cells, at_row, rows)).await
    }

    async fn update_row(&self, table: &str, row: usize, values: Vec<Value>) -> Result<(), StoreError> {
        self.commit(table, |cells| grid::update_row(cells, row, values)).await
    }

    async fn update_cell(&self, table: &str, row: usize, col: usize, value: Value) -> Result<(), StoreError> {
        self.commit(table, |cells| grid::update_cell(cells, row, col, value)).await
    }

    async fn delete_row(&self, table: &str, row: usize) -> Result<(), StoreError> {
        self.commit(table, |cells| grid::delete_row(cells, row)).await
    }

    async fn ensure_table(&self, table: &str) -> Result<bool, StoreError> {
        let mut sheets = self.sheets.lock().await;
        if sheets.contains_key(table) {
            return Ok(false);
        }
        let mut next = sheets.clone();
        next.insert(table.to_string(), Vec::new());
        self.persist(&next).await?;
        *sheets = next;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn survives_reopen() {
        let path = std::env::temp_dir().join(format!("sheetbase-{}.json", uuid::Uuid::new_v4()));
        {
            let store = FileStore::open(&path).await.unwrap();
            assert!(store.ensure_table("menus").await.unwrap());
            store.insert_rows("menus", 1, vec![vec![json!("ID"), json!("Name")]]).await.unwrap();
            store.insert_rows("menus", 2, vec![vec![json!("m1"), json!("Finance")]]).await.unwrap();
        }
        let reopened = FileStore::open(&path).await.unwrap();
        let rows = reopened.get_all_values("menus").await.unwrap();
        assert_eq!(rows[1], vec![json!("m1"), json!("Finance")]);
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn failed_persist_leaves_rows_in_place() {
        use crate::config::{ColumnType, TableSchema};
        use crate::filter::Filter;
        use crate::retry::RetryPolicy;
        use crate::service::TableService;
        use std::sync::Arc;

        let path = std::env::temp_dir().join(format!("sheetbase-{}.json", uuid::Uuid::new_v4()));
        let schema = TableSchema::new()
            .column("ID", ColumnType::Id)
            .column("Name", ColumnType::Text);
        let store = Arc::new(FileStore::open(&path).await.unwrap());
        let service = TableService::new(store.clone(), RetryPolicy::immediate(3));
        service.ensure_tables(&[("t", schema.clone())]).await.unwrap();
        let rows = ["r1", "r2", "r3"]
            .iter()
            .map(|id| {
                let mut r = crate::store::Row::new();
                r.insert("ID".into(), json!(id));
                r.insert("Name".into(), json!(format!("name {}", id)));
                r
            })
            .collect::<Vec<_>>();
        service.insert("t", rows, &schema).await.unwrap();
        let before = store.get_all_values("t").await.unwrap();
        assert_eq!(before.len(), 4);

        // A directory where the temp file goes makes every write fail.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::create_dir(&tmp).await.unwrap();

        let err = service.delete("t", &Filter::eq("ID", "r1"), &schema).await.unwrap_err();
        assert!(matches!(err, StoreError::RemoteUnavailable { attempts: 3, .. }));
        let mut extra = crate::store::Row::new();
        extra.insert("ID".into(), json!("r4"));
        assert!(service.insert("t", extra, &schema).await.is_err());
        assert_eq!(store.get_all_values("t").await.unwrap(), before);

        tokio::fs::remove_dir(&tmp).await.unwrap();
        assert_eq!(service.delete("t", &Filter::eq("ID", "r1"), &schema).await.unwrap(), 1);
        let after = FileStore::open(&path).await.unwrap().get_all_values("t").await.unwrap();
        assert_eq!(after, vec![before[0].clone(), before[2].clone(), before[3].clone()]);
        let _ = tokio::fs::remove_file(&path).await;
    }
}
