//! Sheetbase: spreadsheet-backed tabular data access with session login,
//! per-feature permissions and form-style CRUD pages served over HTTP.

pub mod access;
pub mod bootstrap;
pub mod coerce;
pub mod config;
pub mod error;
pub mod extractors;
pub mod filter;
pub mod handlers;
pub mod id;
pub mod notify;
pub mod response;
pub mod retry;
pub mod routes;
pub mod service;
pub mod session;
pub mod state;
pub mod store;

pub use access::{hash_password, AccessControl, Allowed, Identity};
pub use bootstrap::{bootstrap, open_store};
pub use config::{builtin_pages, validate, ColumnType, PageModel, Settings, StoreKind, TableSchema};
pub use error::{AccessError, AppError, AuthError, ConfigError, NotifyError, StoreError};
pub use filter::{Filter, FilterOp};
pub use id::generate_id;
pub use notify::{Message, Notifier, RecordingNotifier, TracingNotifier};
pub use retry::{with_retry, Backoff, RetryPolicy};
pub use routes::app;
pub use service::{RowSet, TableService};
pub use session::{SessionContext, SessionStore};
pub use state::AppState;
pub use store::{FileStore, MemoryStore, RemoteTableStore, Row};
