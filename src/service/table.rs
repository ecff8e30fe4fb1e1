//! Tabular data access over a [`RemoteTableStore`]: select, insert, update, delete.
//!
//! Every individual store call goes through [`with_retry`]. A failed multi-step
//! operation is not rolled back: an insert that fails after its header write leaves
//! the new header columns behind.
//!
//! Header offsets used by update and delete are read once per call. A concurrent
//! insert that appends header columns, or a concurrent delete that shifts rows, can
//! make them stale before the cell writes land. Nothing here guards against that.

use crate::coerce::{self, coerce_row, stringify, Direction};
use crate::config::{tables, ColumnType, TableSchema, ID_COLUMN};
use crate::error::StoreError;
use crate::filter::Filter;
use crate::id::generate_id;
use crate::retry::{with_retry, RetryPolicy};
use crate::store::{RemoteTableStore, Row};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of [`TableService::select`]: the column list survives even when there are no rows.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// First row whose `column` stringifies to `value`.
    pub fn find(&self, column: &str, value: &str) -> Option<&Row> {
        self.rows
            .iter()
            .find(|r| r.get(column).map(stringify).as_deref() == Some(value))
    }
}

/// One row or a batch, for [`TableService::insert`].
pub struct RowBatch(pub Vec<Row>);

impl From<Row> for RowBatch {
    fn from(row: Row) -> Self {
        RowBatch(vec![row])
    }
}

impl From<Vec<Row>> for RowBatch {
    fn from(rows: Vec<Row>) -> Self {
        RowBatch(rows)
    }
}

/// Rows matched by a filter, plus the header lookups needed to write them.
struct Located {
    header: Vec<String>,
    /// lowercase name -> real header name
    by_lower: HashMap<String, String>,
    /// 0-based positions among the data rows (sheet row = position + 2)
    matches: Vec<usize>,
}

impl Located {
    fn column_index(&self, table: &str, name: &str) -> Result<(String, usize), StoreError> {
        let real = self
            .by_lower
            .get(&name.trim().to_lowercase())
            .ok_or_else(|| StoreError::UnknownColumn {
                table: table.to_string(),
                column: name.to_string(),
            })?;
        let idx = self
            .header
            .iter()
            .position(|h| h == real)
            .ok_or_else(|| StoreError::UnknownColumn {
                table: table.to_string(),
                column: name.to_string(),
            })?;
        Ok((real.clone(), idx + 1))
    }
}

#[derive(Clone)]
pub struct TableService {
    store: Arc<dyn RemoteTableStore>,
    policy: RetryPolicy,
}

impl TableService {
    pub fn new(store: Arc<dyn RemoteTableStore>, policy: RetryPolicy) -> Self {
        TableService { store, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Read every row of `table`, numero100 columns scaled down for display.
    pub async fn select(&self, table: &str, schema: &TableSchema) -> Result<RowSet, StoreError> {
        let values = self.all_values(table).await?;
        let mut iter = values.into_iter();
        let header: Vec<String> = iter
            .next()
            .map(|h| h.iter().map(|v| stringify(v).trim().to_string()).collect())
            .unwrap_or_default();
        let data: Vec<Vec<Value>> = iter.collect();

        if header.iter().all(|h| h.is_empty()) || data.is_empty() {
            tracing::debug!(table = %table, "select: empty table");
            return Ok(RowSet {
                columns: schema.column_names(),
                rows: Vec::new(),
            });
        }

        let mut columns = header.clone();
        for name in schema.column_names() {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }

        let mut rows = Vec::with_capacity(data.len());
        for cells in data {
            let mut row = Row::new();
            for (i, name) in header.iter().enumerate() {
                if name.is_empty() {
                    continue;
                }
                let v = cells.get(i).cloned().unwrap_or_else(empty);
                row.insert(name.clone(), v);
            }
            for col in &schema.columns {
                if !row.contains_key(&col.name) {
                    row.insert(col.name.clone(), empty());
                }
            }
            coerce_row(&mut row, schema, Direction::Read);
            rows.push(row);
        }
        tracing::debug!(table = %table, rows = rows.len(), "select");
        Ok(RowSet { columns, rows })
    }

    /// Append rows, assigning ids to rows without one and growing the header as needed.
    /// Returns the ids written, in input order.
    pub async fn insert(
        &self,
        table: &str,
        rows: impl Into<RowBatch>,
        schema: &TableSchema,
    ) -> Result<Vec<String>, StoreError> {
        let RowBatch(mut rows) = rows.into();
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter_mut().enumerate() {
            if coerce::is_blank(row.get(ID_COLUMN)) {
                row.insert(ID_COLUMN.to_string(), Value::String(generate_id(&(i + 1).to_string())));
            }
            ids.push(row.get(ID_COLUMN).map(stringify).unwrap_or_default());
            coerce_row(row, schema, Direction::Write);
        }

        let mut incoming: Vec<String> = Vec::new();
        for row in &rows {
            for k in row.keys() {
                if !incoming.contains(k) {
                    incoming.push(k.clone());
                }
            }
        }

        let existing = self.header(table).await?;
        let header = if existing.iter().all(|h| h.is_empty()) {
            let header = incoming;
            let cells = header.iter().cloned().map(Value::String).collect::<Vec<_>>();
            with_retry(&self.policy, "insert_header", || {
                self.store.insert_rows(table, 1, vec![cells.clone()])
            })
            .await?;
            tracing::debug!(table = %table, columns = header.len(), "insert: wrote header");
            header
        } else {
            let mut header = existing;
            let before = header.len();
            for c in incoming {
                if !header.contains(&c) {
                    header.push(c);
                }
            }
            if header.len() > before {
                let cells = header.iter().cloned().map(Value::String).collect::<Vec<_>>();
                with_retry(&self.policy, "update_header", || {
                    self.store.update_row(table, 1, cells.clone())
                })
                .await?;
                tracing::debug!(table = %table, added = header.len() - before, "insert: header grew");
            }
            header
        };

        let lines: Vec<Vec<Value>> = rows
            .iter()
            .map(|r| header.iter().map(|h| r.get(h).cloned().unwrap_or_else(empty)).collect())
            .collect();
        let at_row = self.all_values(table).await?.len() + 1;
        with_retry(&self.policy, "insert_rows", || {
            self.store.insert_rows(table, at_row, lines.clone())
        })
        .await?;
        tracing::debug!(table = %table, rows = ids.len(), at_row, "insert");
        Ok(ids)
    }

    /// Write `values` into `columns` of every row matching `filter`. Returns rows matched.
    pub async fn update(
        &self,
        table: &str,
        columns: &[&str],
        values: &[Value],
        filter: &Filter,
        schema: &TableSchema,
    ) -> Result<usize, StoreError> {
        if columns.len() != values.len() {
            return Err(StoreError::ArgumentMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }
        let Some(located) = self.locate(table, filter, schema).await? else {
            return Ok(0);
        };

        let mut targets = Vec::with_capacity(columns.len());
        for (name, value) in columns.iter().zip(values) {
            let (real, col) = located.column_index(table, name)?;
            let stored = match schema.type_of(&real) {
                Some(t) => coerce::coerce(value, t, Direction::Write),
                None => value.clone(),
            };
            targets.push((col, stored));
        }
        if located.matches.is_empty() {
            return Ok(0);
        }

        for &pos in &located.matches {
            let sheet_row = pos + 2;
            for (col, value) in &targets {
                with_retry(&self.policy, "update_cell", || {
                    self.store.update_cell(table, sheet_row, *col, value.clone())
                })
                .await?;
            }
        }
        tracing::debug!(table = %table, filter = %filter, rows = located.matches.len(), "update");
        Ok(located.matches.len())
    }

    /// Remove every row matching `filter`, bottom-up. Returns rows removed.
    pub async fn delete(&self, table: &str, filter: &Filter, schema: &TableSchema) -> Result<usize, StoreError> {
        let Some(located) = self.locate(table, filter, schema).await? else {
            return Ok(0);
        };
        for &pos in located.matches.iter().rev() {
            let sheet_row = pos + 2;
            with_retry(&self.policy, "delete_row", || self.store.delete_row(table, sheet_row)).await?;
        }
        tracing::debug!(table = %table, filter = %filter, rows = located.matches.len(), "delete");
        Ok(located.matches.len())
    }

    /// Whether `user_id` holds a permission row for the feature named `feature_name`.
    /// An unknown feature is simply not permitted.
    pub async fn verify_permission(&self, user_id: &str, feature_name: &str) -> Result<bool, StoreError> {
        let features = self.select(tables::FEATURES, &crate::config::features_schema()).await?;
        let Some(feature) = features.find("Name", feature_name) else {
            return Ok(false);
        };
        let feature_id = feature.get(ID_COLUMN).map(stringify).unwrap_or_default();
        if feature_id.is_empty() {
            return Ok(false);
        }
        let permissions = self
            .select(tables::PERMISSIONS, &crate::config::permissions_schema())
            .await?;
        Ok(permissions.rows.iter().any(|p| {
            p.get("UserID").map(stringify).as_deref() == Some(user_id)
                && p.get("FeatureID").map(stringify) == Some(feature_id.clone())
        }))
    }

    /// Create missing worksheets and give header-less ones the schema's header.
    pub async fn ensure_tables(&self, schemas: &[(&str, TableSchema)]) -> Result<(), StoreError> {
        for (table, schema) in schemas {
            let created = with_retry(&self.policy, "ensure_table", || self.store.ensure_table(table)).await?;
            let header = self.header(table).await?;
            if header.iter().all(|h| h.is_empty()) {
                let cells: Vec<Value> = schema.column_names().into_iter().map(Value::String).collect();
                with_retry(&self.policy, "insert_header", || {
                    self.store.insert_rows(table, 1, vec![cells.clone()])
                })
                .await?;
            }
            if created {
                tracing::info!(table = %table, "created worksheet");
            }
        }
        Ok(())
    }

    async fn all_values(&self, table: &str) -> Result<Vec<Vec<Value>>, StoreError> {
        with_retry(&self.policy, "get_all_values", || self.store.get_all_values(table)).await
    }

    async fn header(&self, table: &str) -> Result<Vec<String>, StoreError> {
        with_retry(&self.policy, "header", || self.store.header(table)).await
    }

    /// Resolve the filter against the current sheet. `None` when there are no data rows.
    async fn locate(&self, table: &str, filter: &Filter, schema: &TableSchema) -> Result<Option<Located>, StoreError> {
        let values = self.all_values(table).await?;
        if values.len() < 2 {
            return Ok(None);
        }
        let header: Vec<String> = values[0].iter().map(|v| stringify(v).trim().to_string()).collect();
        let by_lower: HashMap<String, String> = header
            .iter()
            .filter(|h| !h.is_empty())
            .map(|h| (h.to_lowercase(), h.clone()))
            .collect();
        let mut located = Located {
            header,
            by_lower,
            matches: Vec::new(),
        };
        let (real, col) = located.column_index(table, &filter.column)?;

        // numero100 targets are given in display units; compare in stored units.
        let target = match schema.type_of(&real) {
            Some(ColumnType::Number100) => stringify(&coerce::coerce(
                &Value::String(filter.value.clone()),
                ColumnType::Number100,
                Direction::Write,
            )),
            _ => filter.value.clone(),
        };

        for (pos, cells) in values[1..].iter().enumerate() {
            let cell = cells.get(col - 1).map(stringify).unwrap_or_default();
            if filter.op.matches(&cell, &target) {
                located.matches.push(pos);
            }
        }
        Ok(Some(located))
    }
}

fn empty() -> Value {
    Value::String(String::new())
}
