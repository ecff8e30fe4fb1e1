//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures of the remote table store and of the data-access layer on top of it.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Rate limiting or transient connectivity. Retried by [`crate::retry::with_retry`].
    #[error("transient remote error: {0}")]
    Transient(String),
    /// Retry budget exhausted.
    #[error("remote store unavailable: {op} failed after {attempts} attempts ({last})")]
    RemoteUnavailable {
        op: String,
        attempts: u32,
        last: String,
    },
    /// Non-transient rejection from the remote store (malformed request and the like).
    #[error("remote store rejected request: {0}")]
    Request(String),
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("unsupported filter operator: {0}")]
    UnsupportedOperator(String),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("{columns} columns but {values} values")]
    ArgumentMismatch { columns: usize, values: usize },
    #[error("store io: {0}")]
    Io(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("user not found")]
    UnknownUser,
    #[error("wrong password")]
    WrongPassword,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("access to '{0}' not allowed")]
    Forbidden(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("delivery to {to} failed: {reason}")]
    Delivery { to: String, reason: String },
    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}

/// Failures of [`crate::access::AccessControl`].
#[derive(Error, Debug)]
pub enum AccessError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl From<AccessError> for AppError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::Auth(e) => AppError::Auth(e),
            AccessError::Store(e) => AppError::Store(e),
            AccessError::Notify(e) => AppError::Notify(e),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Store(e) => match e {
                StoreError::RemoteUnavailable { .. } | StoreError::Transient(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "remote_unavailable")
                }
                StoreError::UnsupportedOperator(_)
                | StoreError::InvalidFilter(_)
                | StoreError::ArgumentMismatch { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
                StoreError::TableNotFound(_) => (StatusCode::INTERNAL_SERVER_ERROR, "table_not_found"),
                StoreError::UnknownColumn { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "unknown_column"),
                StoreError::Request(_) | StoreError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            },
            AppError::Auth(e) => match e {
                AuthError::UnknownUser | AuthError::WrongPassword => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
                AuthError::NotLoggedIn => (StatusCode::UNAUTHORIZED, "not_logged_in"),
                AuthError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            },
            AppError::Notify(_) => (StatusCode::BAD_GATEWAY, "notify_failed"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
