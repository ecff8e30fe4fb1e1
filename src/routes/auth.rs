use crate::handlers::auth::{login, logout, me, reset};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/reset", post(reset))
        .route("/auth/me", get(me))
}
