mod auth;
mod common;
mod pages;

pub use auth::auth_routes;
pub use common::common_routes;
pub use pages::{nav_routes, page_routes};

use crate::state::AppState;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body.
pub const BODY_LIMIT: usize = 64 * 1024;

/// Full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes())
        .merge(auth_routes())
        .merge(page_routes())
        .merge(nav_routes())
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(BODY_LIMIT)))
        .with_state(state)
}
