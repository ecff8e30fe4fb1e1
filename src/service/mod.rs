//! Data access and form validation services.

mod table;
mod validation;
pub use table::{RowBatch, RowSet, TableService};
pub use validation::{parse_date, RequestValidator};
