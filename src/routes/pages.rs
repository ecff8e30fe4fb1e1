//! Page routes. Handlers resolve the page from the path segment against the page model.

use crate::handlers::nav::{navigation, permissions};
use crate::handlers::pages::{create, delete as delete_handler, grant, list, read, update};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/pages/permissions/grant", post(grant))
        .route("/pages/:path_segment", get(list).post(create))
        .route(
            "/pages/:path_segment/:id",
            get(read).patch(update).delete(delete_handler),
        )
}

pub fn nav_routes() -> Router<AppState> {
    Router::new()
        .route("/nav", get(navigation))
        .route("/nav/permissions", get(permissions))
}
