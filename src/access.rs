//! Login, permission checks and password reset against the users/permissions tables.
//!
//! Passwords are stored as SHA-256 hex digests and compared in constant time.

use crate::coerce::stringify;
use crate::config::{permissions_schema, tables, users_schema, ID_COLUMN};
use crate::error::{AccessError, AuthError, StoreError};
use crate::filter::Filter;
use crate::notify::{Message, Notifier};
use crate::service::TableService;
use crate::store::Row;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

const TEMP_PASSWORD_LEN: usize = 10;

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Authenticated user as carried in a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Identity {
    fn from_row(row: &Row) -> Self {
        let field = |k: &str| row.get(k).map(stringify).unwrap_or_default();
        Identity {
            id: field(ID_COLUMN),
            name: field("Name"),
            email: field("Email").trim().to_lowercase(),
        }
    }
}

/// Feature IDs an identity may open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Allowed {
    All,
    Only(HashSet<String>),
}

impl Allowed {
    pub fn permits(&self, feature_id: &str) -> bool {
        match self {
            Allowed::All => true,
            Allowed::Only(ids) => ids.contains(feature_id),
        }
    }
}

pub struct AccessControl {
    tables: Arc<TableService>,
    admin_ids: Vec<String>,
    notifier: Arc<dyn Notifier>,
}

impl AccessControl {
    pub fn new(tables: Arc<TableService>, admin_ids: Vec<String>, notifier: Arc<dyn Notifier>) -> Self {
        AccessControl {
            tables,
            admin_ids,
            notifier,
        }
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        self.admin_ids.iter().any(|a| *a == identity.id)
    }

    async fn find_user(&self, email: &str) -> Result<Option<Row>, StoreError> {
        let wanted = email.trim().to_lowercase();
        let users = self.tables.select(tables::USERS, &users_schema()).await?;
        Ok(users.rows.into_iter().find(|u| {
            u.get("Email")
                .map(|e| stringify(e).trim().to_lowercase() == wanted)
                .unwrap_or(false)
        }))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AccessError> {
        let user = self.find_user(email).await?.ok_or(AuthError::UnknownUser)?;
        let stored = user.get("Password").map(stringify).unwrap_or_default();
        if !constant_time_eq(stored.as_bytes(), hash_password(password).as_bytes()) {
            tracing::info!(email = %email.trim(), "login rejected");
            return Err(AuthError::WrongPassword.into());
        }
        let identity = Identity::from_row(&user);
        tracing::info!(user = %identity.id, "login");
        Ok(identity)
    }

    /// Raw permission rows held by `identity`.
    pub async fn permissions_of(&self, identity: &Identity) -> Result<Vec<Row>, StoreError> {
        let rows = self.tables.select(tables::PERMISSIONS, &permissions_schema()).await?;
        Ok(rows
            .rows
            .into_iter()
            .filter(|p| p.get("UserID").map(stringify).as_deref() == Some(identity.id.as_str()))
            .collect())
    }

    pub async fn allowed_features(&self, identity: &Identity) -> Result<Allowed, StoreError> {
        if self.is_admin(identity) {
            return Ok(Allowed::All);
        }
        let ids = self
            .permissions_of(identity)
            .await?
            .iter()
            .filter_map(|p| p.get("FeatureID").map(stringify))
            .filter(|id| !id.is_empty())
            .collect();
        Ok(Allowed::Only(ids))
    }

    pub async fn can_access(&self, identity: &Identity, feature_name: &str) -> Result<bool, StoreError> {
        if self.is_admin(identity) {
            return Ok(true);
        }
        self.tables.verify_permission(&identity.id, feature_name).await
    }

    /// Mail a random password to the user registered under `email`, then store its hash.
    /// Unknown addresses are not reported to the caller. The stored password only changes
    /// once the mail has gone out.
    pub async fn reset_password(&self, email: &str) -> Result<(), AccessError> {
        let Some(user) = self.find_user(email).await? else {
            tracing::info!(email = %email.trim(), "password reset for unknown address");
            return Ok(());
        };
        let identity = Identity::from_row(&user);
        let temp: String = uuid::Uuid::new_v4().simple().to_string().chars().take(TEMP_PASSWORD_LEN).collect();
        let message = Message {
            to: identity.email.clone(),
            subject: "Password reset".into(),
            body: format!("Hello {},\n\nYour temporary password is: {}\n", identity.name, temp),
        };
        if let Err(e) = self.notifier.send(message).await {
            tracing::error!(user = %identity.id, error = %e, "password reset mail failed");
            return Err(e.into());
        }
        self.tables
            .update(
                tables::USERS,
                &["Password"],
                &[Value::String(hash_password(&temp))],
                &Filter::eq(ID_COLUMN, identity.id.clone()),
                &users_schema(),
            )
            .await?;
        tracing::info!(user = %identity.id, "password reset");
        Ok(())
    }

    /// Create the first admin (ID `1`) when the users table has no rows.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<bool, StoreError> {
        let users = self.tables.select(tables::USERS, &users_schema()).await?;
        if !users.is_empty() {
            return Ok(false);
        }
        let mut row = Row::new();
        row.insert(ID_COLUMN.into(), Value::String("1".into()));
        row.insert("Name".into(), Value::String("Administrator".into()));
        row.insert("Email".into(), Value::String(email.trim().to_lowercase()));
        row.insert("Password".into(), Value::String(hash_password(password)));
        self.tables.insert(tables::USERS, row, &users_schema()).await?;
        tracing::info!("bootstrapped admin user");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_lowercase_sha256_hex() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn constant_time_compare() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }

    #[test]
    fn allowed_permits() {
        assert!(Allowed::All.permits("x"));
        let only = Allowed::Only(["f1".to_string()].into_iter().collect());
        assert!(only.permits("f1") && !only.permits("f2"));
    }
}
