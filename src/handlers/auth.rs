//! Login, logout, password reset and the current session.

use crate::error::AppError;
use crate::extractors::Session;
use crate::response::{success_one_ok, with_status};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ResetBody {
    pub email: String,
}

pub async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> Result<impl IntoResponse, AppError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::Validation("email and password are required".into()));
    }
    let identity = state.access.login(&body.email, &body.password).await?;
    let admin = state.access.is_admin(&identity);
    let token = state
        .sessions
        .create(identity.clone())
        .ok_or_else(|| AppError::Internal("session store unavailable".into()))?;
    Ok(success_one_ok(json!({ "token": token, "user": identity, "admin": admin })))
}

pub async fn logout(State(state): State<AppState>, session: Session) -> StatusCode {
    state.sessions.remove(&session.token);
    tracing::info!(user = %session.context.identity.id, "logout");
    StatusCode::NO_CONTENT
}

/// Always answers 202 so callers cannot probe which addresses are registered.
pub async fn reset(State(state): State<AppState>, Json(body): Json<ResetBody>) -> Result<impl IntoResponse, AppError> {
    if body.email.trim().is_empty() {
        return Err(AppError::Validation("email is required".into()));
    }
    state.access.reset_password(&body.email).await?;
    Ok(with_status(
        StatusCode::ACCEPTED,
        json!({ "status": "if the address is registered, a temporary password was sent" }),
    ))
}

pub async fn me(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let admin = state.access.is_admin(&session.context.identity);
    success_one_ok(json!({
        "user": session.context.identity,
        "admin": admin,
        "client_search": session.context.client_search,
        "editing_client": session.context.editing_client,
    }))
}
