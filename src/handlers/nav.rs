//! Shell navigation: the menu tree the caller may open and their permission rows.

use crate::access::Allowed;
use crate::coerce::stringify;
use crate::config::{features_schema, tables, ID_COLUMN};
use crate::error::AppError;
use crate::extractors::Session;
use crate::response::{success_many, success_one_ok};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, response::Response};

pub async fn navigation(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse, AppError> {
    let allowed = state.access.allowed_features(&session.context.identity).await?;
    let areas = match &allowed {
        Allowed::All => state.model.navigation(|_| true),
        Allowed::Only(_) => {
            let features = state.tables.select(tables::FEATURES, &features_schema()).await?;
            state.model.navigation(|page| {
                features
                    .find("Name", &page.feature)
                    .and_then(|f| f.get(ID_COLUMN).map(stringify))
                    .map(|id| allowed.permits(&id))
                    .unwrap_or(false)
            })
        }
    };
    Ok(success_many(areas))
}

pub async fn permissions(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let identity = &session.context.identity;
    if state.access.is_admin(identity) {
        return Ok(success_one_ok("all").into_response());
    }
    let rows = state.access.permissions_of(identity).await?;
    Ok(success_many(rows).into_response())
}
