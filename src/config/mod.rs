pub mod pages;
pub mod schema;
pub mod settings;
pub mod validator;

pub use pages::*;
pub use schema::*;
pub use settings::*;
pub use validator::*;
