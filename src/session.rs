//! In-memory sessions keyed by an opaque token.

use crate::access::Identity;
use crate::store::Row;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Per-session state that outlives a single request.
#[derive(Clone, Debug, Serialize)]
pub struct SessionContext {
    pub identity: Identity,
    /// Last name searched on the clients page.
    pub client_search: Option<String>,
    /// Client row loaded for editing, cleared by the next save.
    pub editing_client: Option<Row>,
}

impl SessionContext {
    pub fn new(identity: Identity) -> Self {
        SessionContext {
            identity,
            client_search: None,
            editing_client: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, SessionContext>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session. `None` when the session map is poisoned and nothing was stored.
    pub fn create(&self, identity: Identity) -> Option<String> {
        let token = uuid::Uuid::new_v4().to_string();
        let mut map = self.inner.write().ok()?;
        map.insert(token.clone(), SessionContext::new(identity));
        Some(token)
    }

    pub fn get(&self, token: &str) -> Option<SessionContext> {
        self.inner.read().ok().and_then(|m| m.get(token).cloned())
    }

    /// Apply `f` to the session under `token`. Returns false when there is none.
    pub fn update<F>(&self, token: &str, f: F) -> bool
    where
        F: FnOnce(&mut SessionContext),
    {
        match self.inner.write() {
            Ok(mut map) => match map.get_mut(token) {
                Some(ctx) => {
                    f(ctx);
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    pub fn remove(&self, token: &str) -> bool {
        self.inner.write().map(|mut m| m.remove(token).is_some()).unwrap_or(false)
    }
}
