//! Startup: open the configured store, create missing tables and the first admin.

use crate::config::{Settings, StoreKind};
use crate::error::StoreError;
use crate::state::AppState;
use crate::store::{FileStore, MemoryStore, RemoteTableStore};
use std::sync::Arc;

pub async fn open_store(settings: &Settings) -> Result<Arc<dyn RemoteTableStore>, StoreError> {
    Ok(match &settings.store {
        StoreKind::Memory => {
            tracing::info!("using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StoreKind::File(path) => {
            tracing::info!(path = %path, "using file store");
            Arc::new(FileStore::open(path).await?)
        }
    })
}

/// Create the tables the page model needs and, if configured, the first admin user.
pub async fn bootstrap(state: &AppState) -> Result<(), StoreError> {
    let mut schemas: Vec<(&str, _)> = crate::config::builtin_tables();
    for (table, schema) in state.model.tables() {
        if !schemas.iter().any(|(t, _)| *t == table) {
            schemas.push((table, schema));
        }
    }
    state.tables.ensure_tables(&schemas).await?;
    if let Some((email, password)) = &state.settings.bootstrap_admin {
        state.access.bootstrap_admin(email, password).await?;
    }
    Ok(())
}
