pub mod session;

pub use session::{Session, SESSION_TOKEN_HEADER};
