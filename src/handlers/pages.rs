//! Page handlers: list, read, create, update and delete rows of the table behind a page.
//!
//! Every request is checked against the caller's permissions for the page's feature.
//! Page-specific normalisation lives in [`prepare`] and runs before validation.

use crate::coerce::stringify;
use crate::config::{tables, Operation, PageSpec, ID_COLUMN};
use crate::error::{AppError, AuthError};
use crate::extractors::Session;
use crate::filter::Filter;
use crate::id::generate_id;
use crate::response::{success_many, success_one, success_one_ok, with_status};
use crate::service::{parse_date, RequestValidator};
use crate::state::AppState;
use crate::store::Row;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

pub const PASSWORD_CONFIRMATION: &str = "PasswordConfirmation";
const DISPLAY_DATE: &str = "%d/%m/%Y";

async fn authorize<'a>(
    state: &'a AppState,
    session: &Session,
    segment: &str,
    op: Operation,
) -> Result<&'a PageSpec, AppError> {
    let page = state
        .model
        .page_by_path(segment)
        .ok_or_else(|| AppError::NotFound(segment.to_string()))?;
    if !page.allows(op) {
        return Err(AppError::BadRequest(format!("{} not allowed on {}", op.name(), page.path_segment)));
    }
    if !state.access.can_access(&session.context.identity, &page.feature).await? {
        tracing::info!(user = %session.context.identity.id, page = %page.path_segment, "access denied");
        return Err(AuthError::Forbidden(page.title.clone()).into());
    }
    Ok(page)
}

fn body_to_row(value: Value) -> Result<Row, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn strip_sensitive(page: &PageSpec, mut row: Row) -> Row {
    row.retain(|k, _| !page.sensitive_columns.contains(k));
    row
}

fn reject_unknown(page: &PageSpec, row: &Row) -> Result<(), AppError> {
    match row.keys().find(|k| !page.schema.contains(k)) {
        Some(k) => Err(AppError::Validation(format!("unknown field {}", k))),
        None => Ok(()),
    }
}

/// Passwords are kept verbatim.
fn trim_strings(row: &mut Row) {
    for (k, v) in row.iter_mut() {
        if k == "Password" || k == PASSWORD_CONFIRMATION {
            continue;
        }
        if let Value::String(s) = v {
            let t = s.trim();
            if t.len() != s.len() {
                *s = t.to_string();
            }
        }
    }
}

/// Page-specific normalisation. `full` is true for creates.
fn prepare(page: &PageSpec, row: &mut Row, full: bool) -> Result<(), AppError> {
    trim_strings(row);
    match page.table.as_str() {
        tables::USERS => {
            if let Some(Value::String(email)) = row.get_mut("Email") {
                *email = email.to_lowercase();
            }
            let confirmation = row.remove(PASSWORD_CONFIRMATION);
            if let Some(password) = row.get("Password") {
                if confirmation.as_ref() != Some(password) {
                    return Err(AppError::Validation("password confirmation does not match".into()));
                }
            }
        }
        tables::CLIENTS => {
            if let Some(Value::String(date)) = row.get_mut("BirthDate") {
                if !date.is_empty() {
                    let parsed = parse_date(date).ok_or_else(|| {
                        AppError::Validation("BirthDate must be a date (dd/mm/yyyy, mm/dd/yyyy or yyyy-mm-dd)".into())
                    })?;
                    *date = parsed.format(DISPLAY_DATE).to_string();
                }
            }
            if full {
                row.insert(
                    "RegisteredAt".into(),
                    Value::String(chrono::Local::now().date_naive().format(DISPLAY_DATE).to_string()),
                );
            } else {
                row.remove("RegisteredAt");
            }
        }
        _ => {}
    }
    Ok(())
}

/// Checks that need the store: references and duplicates.
async fn check_references(state: &AppState, page: &PageSpec, row: &Row, exclude_id: Option<&str>) -> Result<(), AppError> {
    match page.table.as_str() {
        tables::FEATURES => {
            if let Some(menu_id) = row.get("MenuID").map(stringify) {
                let menus = state.tables.select(tables::MENUS, &crate::config::menus_schema()).await?;
                if menus.find(ID_COLUMN, &menu_id).is_none() {
                    return Err(AppError::Validation(format!("menu {} does not exist", menu_id)));
                }
            }
        }
        tables::USERS => {
            if let Some(email) = row.get("Email").map(stringify) {
                let users = state.tables.select(&page.table, &page.schema).await?;
                let taken = users.rows.iter().any(|u| {
                    u.get("Email").map(|e| stringify(e).trim().to_lowercase()) == Some(email.clone())
                        && u.get(ID_COLUMN).map(stringify).as_deref() != exclude_id
                });
                if taken {
                    return Err(AppError::Conflict(format!("email {} already registered", email)));
                }
            }
        }
        tables::PERMISSIONS => {
            let user = row.get("UserID").map(stringify).unwrap_or_default();
            let feature = row.get("FeatureID").map(stringify).unwrap_or_default();
            let existing = state.tables.select(&page.table, &page.schema).await?;
            if has_grant(&existing.rows, &user, &feature) {
                return Err(AppError::Conflict(format!("user {} already has feature {}", user, feature)));
            }
        }
        _ => {}
    }
    Ok(())
}

fn has_grant(rows: &[Row], user: &str, feature: &str) -> bool {
    rows.iter().any(|p| {
        p.get("UserID").map(stringify).as_deref() == Some(user)
            && p.get("FeatureID").map(stringify).as_deref() == Some(feature)
    })
}

fn hash_password_field(row: &mut Row) {
    if let Some(Value::String(p)) = row.get_mut("Password") {
        *p = crate::access::hash_password(p);
    }
}

pub async fn list(
    State(state): State<AppState>,
    session: Session,
    Path(segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let page = authorize(&state, &session, &segment, Operation::List).await?;
    let mut search: Vec<(String, String)> = params
        .into_iter()
        .filter(|(k, _)| page.schema.contains(k) && !page.sensitive_columns.contains(k))
        .map(|(k, v)| (k, v.trim().to_lowercase()))
        .collect();

    if page.table == tables::CLIENTS {
        let name_param = search.iter().find(|(k, _)| k == "Name").map(|(_, v)| v.clone());
        match name_param {
            Some(name) => {
                let remembered = Some(name).filter(|n| !n.is_empty());
                state.sessions.update(&session.token, |ctx| ctx.client_search = remembered);
            }
            None => {
                if let Some(name) = session.context.client_search.clone() {
                    search.push(("Name".into(), name));
                }
            }
        }
    }
    search.retain(|(_, v)| !v.is_empty());

    let set = state.tables.select(&page.table, &page.schema).await?;
    let rows: Vec<Row> = set
        .rows
        .into_iter()
        .filter(|r| {
            search.iter().all(|(k, needle)| {
                r.get(k)
                    .map(|v| stringify(v).to_lowercase().contains(needle.as_str()))
                    .unwrap_or(false)
            })
        })
        .map(|r| strip_sensitive(page, r))
        .collect();
    Ok(success_many(rows))
}

pub async fn read(
    State(state): State<AppState>,
    session: Session,
    Path((segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let page = authorize(&state, &session, &segment, Operation::Read).await?;
    let set = state.tables.select(&page.table, &page.schema).await?;
    let row = set
        .find(ID_COLUMN, &id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(id.clone()))?;
    if page.table == tables::CLIENTS {
        let editing = row.clone();
        state.sessions.update(&session.token, |ctx| ctx.editing_client = Some(editing));
    }
    Ok(success_one_ok(strip_sensitive(page, row)))
}

pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Path(segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let page = authorize(&state, &session, &segment, Operation::Create).await?;
    let mut row = body_to_row(body)?;
    row.remove(ID_COLUMN);
    prepare(page, &mut row, true)?;
    reject_unknown(page, &row)?;
    RequestValidator::validate(&row, &page.validation)?;
    check_references(&state, page, &row, None).await?;
    hash_password_field(&mut row);

    row.insert(ID_COLUMN.into(), Value::String(generate_id(&page.id_tag)));
    state.tables.insert(&page.table, row.clone(), &page.schema).await?;
    tracing::info!(user = %session.context.identity.id, page = %page.path_segment, "created row");
    Ok(success_one(strip_sensitive(page, row)))
}

pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path((segment, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let page = authorize(&state, &session, &segment, Operation::Update).await?;
    let mut row = body_to_row(body)?;
    row.remove(ID_COLUMN);
    prepare(page, &mut row, false)?;
    reject_unknown(page, &row)?;
    if row.is_empty() {
        return Err(AppError::BadRequest("nothing to update".into()));
    }
    RequestValidator::validate_partial(&row, &page.validation)?;
    check_references(&state, page, &row, Some(&id)).await?;
    hash_password_field(&mut row);

    let columns: Vec<&str> = row.keys().map(String::as_str).collect();
    let values: Vec<Value> = row.values().cloned().collect();
    let n = state
        .tables
        .update(&page.table, &columns, &values, &Filter::eq(ID_COLUMN, id.clone()), &page.schema)
        .await?;
    if n == 0 {
        return Err(AppError::NotFound(id));
    }
    if page.table == tables::CLIENTS {
        state.sessions.update(&session.token, |ctx| ctx.editing_client = None);
    }
    tracing::info!(user = %session.context.identity.id, page = %page.path_segment, id = %id, "updated row");

    let set = state.tables.select(&page.table, &page.schema).await?;
    let updated = set.find(ID_COLUMN, &id).cloned().unwrap_or_default();
    Ok(success_one_ok(strip_sensitive(page, updated)))
}

pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    Path((segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let page = authorize(&state, &session, &segment, Operation::Delete).await?;
    let n = state
        .tables
        .delete(&page.table, &Filter::eq(ID_COLUMN, id.clone()), &page.schema)
        .await?;
    if n == 0 {
        return Err(AppError::NotFound(id));
    }
    tracing::info!(user = %session.context.identity.id, page = %page.path_segment, id = %id, "deleted row");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct GrantBody {
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "FeatureIDs")]
    pub feature_ids: Vec<String>,
}

/// Grant one user several features. Grants the user already holds are skipped and reported.
pub async fn grant(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<GrantBody>,
) -> Result<impl IntoResponse, AppError> {
    let page = authorize(&state, &session, "permissions", Operation::Create).await?;
    let user_id = body.user_id.trim().to_string();
    if user_id.is_empty() || body.feature_ids.iter().all(|f| f.trim().is_empty()) {
        return Err(AppError::Validation("UserID and at least one feature are required".into()));
    }

    let users = state.tables.select(tables::USERS, &crate::config::users_schema()).await?;
    if users.find(ID_COLUMN, &user_id).is_none() {
        return Err(AppError::Validation(format!("user {} does not exist", user_id)));
    }
    let features = state.tables.select(tables::FEATURES, &crate::config::features_schema()).await?;
    let existing = state.tables.select(&page.table, &page.schema).await?;

    let mut granted: Vec<Row> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();
    for feature_id in body.feature_ids.iter().map(|f| f.trim()).filter(|f| !f.is_empty()) {
        if features.find(ID_COLUMN, feature_id).is_none() {
            return Err(AppError::Validation(format!("feature {} does not exist", feature_id)));
        }
        if has_grant(&existing.rows, &user_id, feature_id) || has_grant(&granted, &user_id, feature_id) {
            skipped.push(feature_id.to_string());
            continue;
        }
        let mut row = Row::new();
        row.insert(ID_COLUMN.into(), Value::String(generate_id(&page.id_tag)));
        row.insert("UserID".into(), Value::String(user_id.clone()));
        row.insert("FeatureID".into(), Value::String(feature_id.to_string()));
        granted.push(row);
    }

    if !granted.is_empty() {
        state.tables.insert(&page.table, granted.clone(), &page.schema).await?;
    }
    tracing::info!(user = %user_id, granted = granted.len(), skipped = skipped.len(), "granted features");
    let status = if granted.is_empty() { StatusCode::OK } else { StatusCode::CREATED };
    Ok(with_status(status, json!({ "granted": granted, "skipped": skipped })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::is_blank;
    use crate::config::builtin_pages;

    fn row(v: Value) -> Row {
        body_to_row(v).unwrap()
    }

    #[test]
    fn users_need_matching_confirmation() {
        let model = builtin_pages();
        let users = model.page_by_path("users").unwrap();
        let mut r = row(json!({"Email": " Ana@Example.COM ", "Password": "x", "PasswordConfirmation": "y"}));
        assert!(matches!(prepare(users, &mut r, true), Err(AppError::Validation(_))));

        let mut r = row(json!({"Email": " Ana@Example.COM ", "Password": "x", "PasswordConfirmation": "x"}));
        prepare(users, &mut r, true).unwrap();
        assert_eq!(r["Email"], json!("ana@example.com"));
        assert!(!r.contains_key(PASSWORD_CONFIRMATION));
    }

    #[test]
    fn clients_birth_date_normalised_and_stamped() {
        let model = builtin_pages();
        let clients = model.page_by_path("clients").unwrap();
        let mut r = row(json!({"Name": "Ana", "BirthDate": "1990-12-31"}));
        prepare(clients, &mut r, true).unwrap();
        assert_eq!(r["BirthDate"], json!("31/12/1990"));
        assert!(!is_blank(r.get("RegisteredAt")));

        let mut r = row(json!({"BirthDate": "31.12.1990", "RegisteredAt": "01/01/2000"}));
        assert!(prepare(clients, &mut r, false).is_err());
    }

    #[test]
    fn unknown_fields_rejected_and_sensitive_stripped() {
        let model = builtin_pages();
        let users = model.page_by_path("users").unwrap();
        assert!(reject_unknown(users, &row(json!({"Nope": 1}))).is_err());
        let out = strip_sensitive(users, row(json!({"Name": "Ana", "Password": "h"})));
        assert!(!out.contains_key("Password"));
    }
}
