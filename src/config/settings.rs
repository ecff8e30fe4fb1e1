//! Runtime settings from environment variables. Invalid numbers fall back to defaults.

use crate::retry::{Backoff, RetryPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS};
use std::time::Duration;

pub const DEFAULT_STORE: &str = "sheetbase.json";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_ADMIN_IDS: &str = "1,ADMIN";

/// Where rows live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    File(String),
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub store: StoreKind,
    pub bind: String,
    pub retry: RetryPolicy,
    /// Identities that bypass permission checks.
    pub admin_ids: Vec<String>,
    /// First admin user, created at startup when both are set and the users table is empty.
    pub bootstrap_admin: Option<(String, String)>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            store: StoreKind::File(DEFAULT_STORE.into()),
            bind: DEFAULT_BIND.into(),
            retry: RetryPolicy::default(),
            admin_ids: split_list(DEFAULT_ADMIN_IDS),
            bootstrap_admin: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] over an arbitrary source.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let positive = |key: &str, default: u64| {
            non_empty(key)
                .and_then(|raw| raw.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };

        let store = match non_empty("SHEETBASE_STORE") {
            Some(s) if s.eq_ignore_ascii_case("memory") => StoreKind::Memory,
            Some(path) => StoreKind::File(path),
            None => StoreKind::File(DEFAULT_STORE.into()),
        };
        let backoff = match non_empty("SHEETBASE_RETRY_BACKOFF").map(|s| s.parse::<Backoff>()) {
            Some(Ok(b)) => b,
            Some(Err(e)) => {
                tracing::warn!("{}, using exponential", e);
                Backoff::Exponential
            }
            None => Backoff::Exponential,
        };
        let retry = RetryPolicy {
            max_attempts: positive("SHEETBASE_RETRY_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS as u64).min(u32::MAX as u64)
                as u32,
            base_delay: Duration::from_millis(positive("SHEETBASE_RETRY_BASE_DELAY_MS", DEFAULT_BASE_DELAY_MS)),
            max_delay: Duration::from_millis(positive("SHEETBASE_RETRY_MAX_DELAY_MS", DEFAULT_MAX_DELAY_MS)),
            backoff,
        };
        let admin_ids = split_list(&non_empty("SHEETBASE_ADMIN_IDS").unwrap_or_else(|| DEFAULT_ADMIN_IDS.into()));
        let bootstrap_admin = match (
            non_empty("SHEETBASE_BOOTSTRAP_ADMIN_EMAIL"),
            non_empty("SHEETBASE_BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        };

        Settings {
            store,
            bind: non_empty("SHEETBASE_BIND").unwrap_or_else(|| DEFAULT_BIND.into()),
            retry,
            admin_ids,
            bootstrap_admin,
        }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.iter().any(|a| a == user_id)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let s = Settings::from_lookup(lookup(&[]));
        assert_eq!(s.store, StoreKind::File(DEFAULT_STORE.into()));
        assert_eq!(s.retry.max_attempts, 15);
        assert_eq!(s.retry.backoff, Backoff::Exponential);
        assert!(s.is_admin("1") && s.is_admin("ADMIN") && !s.is_admin("2"));
        assert!(s.bootstrap_admin.is_none());
    }

    #[test]
    fn overrides_and_fallbacks() {
        let s = Settings::from_lookup(lookup(&[
            ("SHEETBASE_STORE", "memory"),
            ("SHEETBASE_RETRY_MAX_ATTEMPTS", "10"),
            ("SHEETBASE_RETRY_BASE_DELAY_MS", "not-a-number"),
            ("SHEETBASE_RETRY_BACKOFF", "fixed"),
            ("SHEETBASE_ADMIN_IDS", " root , ,boss"),
            ("SHEETBASE_BOOTSTRAP_ADMIN_EMAIL", "admin@example.com"),
            ("SHEETBASE_BOOTSTRAP_ADMIN_PASSWORD", "secret"),
        ]));
        assert_eq!(s.store, StoreKind::Memory);
        assert_eq!(s.retry.max_attempts, 10);
        assert_eq!(s.retry.base_delay, Duration::from_millis(DEFAULT_BASE_DELAY_MS));
        assert_eq!(s.retry.backoff, Backoff::Fixed);
        assert_eq!(s.admin_ids, vec!["root", "boss"]);
        assert_eq!(s.bootstrap_admin, Some(("admin@example.com".into(), "secret".into())));
    }
}
