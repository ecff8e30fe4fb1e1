//! Shared application state for all routes.

use crate::access::AccessControl;
use crate::config::{PageModel, Settings};
use crate::notify::Notifier;
use crate::service::TableService;
use crate::session::SessionStore;
use crate::store::RemoteTableStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub tables: Arc<TableService>,
    pub access: Arc<AccessControl>,
    pub sessions: SessionStore,
    pub model: Arc<PageModel>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RemoteTableStore>,
        model: PageModel,
        settings: Settings,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let tables = Arc::new(TableService::new(store, settings.retry.clone()));
        let access = Arc::new(AccessControl::new(tables.clone(), settings.admin_ids.clone(), notifier));
        AppState {
            tables,
            access,
            sessions: SessionStore::new(),
            model: Arc::new(model),
            settings: Arc::new(settings),
        }
    }
}
