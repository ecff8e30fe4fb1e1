//! Resolve the caller's session from the `X-Session-Token` header.

use crate::error::{AppError, AuthError};
use crate::session::SessionContext;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

pub const SESSION_TOKEN_HEADER: &str = "X-Session-Token";

/// A logged-in caller. Rejects with 401 when the header is missing or the token is unknown.
#[derive(Clone, Debug)]
pub struct Session {
    pub token: String,
    pub context: SessionContext,
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(SESSION_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::NotLoggedIn)?;
        let context = state.sessions.get(&token).ok_or(AuthError::NotLoggedIn)?;
        Ok(Session { token, context })
    }
}
