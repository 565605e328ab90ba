//! Generic CRUD handlers over a [`Resource`] table.
//!
//! Keys are natural and never generated. Updates address a row by its path
//! key; key fields in the body must match the path.

use axum::{
    extract::{OriginalUri, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{Map, Value};

use crate::db::DbPool;
use crate::http::extract::{JsonObject, KeyPath, QueryParams};
use crate::http::pagination::{Page, PageLinks, PageQuery, PageWindow};
use crate::http::response::{ApiError, FieldErrors, NON_FIELD_ERRORS};
use crate::http::server::AppState;
use crate::models::fields::{self, display_value, Field, Mode};
use crate::models::Resource;
use crate::resources::store::{self, Filter};

/// What a validated payload is for.
#[derive(Debug, Clone, Copy)]
enum Intent<'a> {
    Create,
    Update { key: &'a [Value] },
}

pub async fn list<R: Resource>(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<Page<R>>, ApiError> {
    let links = PageLinks::from_request(
        &uri,
        &headers,
        state.config.pagination.public_base_url.as_deref(),
    );
    paginate::<R>(&state, None, &query, &links).await.map(Json)
}

/// Count, resolve the requested page and fetch it.
pub(crate) async fn paginate<R: Resource>(
    state: &AppState,
    filter: Option<&Filter>,
    query: &PageQuery,
    links: &PageLinks,
) -> Result<Page<R>, ApiError> {
    let count = store::count::<R>(&state.db, filter).await?;
    let window = PageWindow::resolve(query, count, state.config.pagination.page_size)?;
    let rows = store::fetch_page::<R>(&state.db, filter, window.limit(), window.offset()).await?;
    Ok(links.envelope(window, count, rows))
}

pub async fn retrieve<R: Resource>(
    State(state): State<AppState>,
    KeyPath(key): KeyPath<R::Key>,
) -> Result<Json<R>, ApiError> {
    store::fetch_one::<R>(&state.db, &R::key_values(&key))
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

pub async fn create<R: Resource>(
    State(state): State<AppState>,
    JsonObject(payload): JsonObject,
) -> Result<(StatusCode, Json<R>), ApiError> {
    let row = validate::<R>(&state.db, payload, Mode::Full, Intent::Create).await?;
    let key: Vec<Value> = R::KEY
        .iter()
        .map(|name| row.get(*name).cloned().unwrap_or(Value::Null))
        .collect();

    if R::KEY.len() > 1 && store::exists(&state.db, R::TABLE, &R::key_fields(), &key).await? {
        return Err(ApiError::Validation(FieldErrors::single(
            NON_FIELD_ERRORS,
            format!("The fields {} must make a unique set.", R::KEY.join(", ")),
        )));
    }

    store::insert::<R>(&state.db, &row).await?;
    tracing::info!(table = R::TABLE, key = ?key, "Row created");

    let created = store::fetch_one::<R>(&state.db, &key)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("{} row vanished after insert", R::TABLE)))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update<R: Resource>(
    State(state): State<AppState>,
    KeyPath(key): KeyPath<R::Key>,
    JsonObject(payload): JsonObject,
) -> Result<Json<R>, ApiError> {
    save::<R>(&state.db, R::key_values(&key), payload, Mode::Full)
        .await
        .map(Json)
}

pub async fn partial_update<R: Resource>(
    State(state): State<AppState>,
    KeyPath(key): KeyPath<R::Key>,
    JsonObject(payload): JsonObject,
) -> Result<Json<R>, ApiError> {
    save::<R>(&state.db, R::key_values(&key), payload, Mode::Partial)
        .await
        .map(Json)
}

pub async fn destroy<R: Resource>(
    State(state): State<AppState>,
    KeyPath(key): KeyPath<R::Key>,
) -> Result<StatusCode, ApiError> {
    let key = R::key_values(&key);
    if store::delete::<R>(&state.db, &key).await? == 0 {
        return Err(ApiError::not_found());
    }
    tracing::info!(table = R::TABLE, key = ?key, "Row deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a full or partial update to the row at `key`.
async fn save<R: Resource>(
    db: &DbPool,
    key: Vec<Value>,
    payload: Map<String, Value>,
    mode: Mode,
) -> Result<R, ApiError> {
    let existing = store::fetch_one::<R>(db, &key)
        .await?
        .ok_or_else(ApiError::not_found)?;
    let changes = validate::<R>(db, payload, mode, Intent::Update { key: &key }).await?;

    let mut row = match serde_json::to_value(&existing) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };
    row.extend(changes);

    if store::update::<R>(db, &key, &row).await? == 0 {
        return Err(ApiError::not_found());
    }
    tracing::info!(table = R::TABLE, key = ?key, mode = ?mode, "Row updated");

    store::fetch_one::<R>(db, &key)
        .await?
        .ok_or_else(ApiError::not_found)
}

/// Field validation, then key and reference checks against the database.
async fn validate<R: Resource>(
    db: &DbPool,
    mut payload: Map<String, Value>,
    mode: Mode,
    intent: Intent<'_>,
) -> Result<Map<String, Value>, ApiError> {
    if let Intent::Update { key } = intent {
        for (name, value) in R::KEY.iter().zip(key) {
            payload
                .entry(name.to_string())
                .or_insert_with(|| value.clone());
        }
    }

    let row = fields::validate_payload(R::FIELDS, &payload, mode).map_err(ApiError::Validation)?;
    let mut errors = FieldErrors::new();

    match intent {
        Intent::Update { key } => {
            for (field, current) in R::key_fields().into_iter().zip(key) {
                let current = fields::normalize(field, current).unwrap_or_else(|_| current.clone());
                if row.get(field.name) != Some(&current) {
                    errors.add(field.name, "This field cannot be changed.");
                }
            }
        }
        Intent::Create if R::KEY.len() == 1 => {
            let name = R::KEY[0];
            let value = row.get(name).cloned().unwrap_or(Value::Null);
            if store::exists(db, R::TABLE, &R::key_fields(), &[value]).await? {
                errors.add(name, format!("{} with this {} already exists.", R::NAME, name));
            }
        }
        Intent::Create => {}
    }

    check_references(db, R::FIELDS, &row, &mut errors).await?;
    errors.into_result()?;
    Ok(row)
}

/// Every non-null foreign key must name an existing row.
async fn check_references(
    db: &DbPool,
    fields: &[Field],
    row: &Map<String, Value>,
    errors: &mut FieldErrors,
) -> Result<(), ApiError> {
    for field in fields {
        let (Some(target), Some(value)) = (field.references, row.get(field.name)) else {
            continue;
        };
        if value.is_null() || errors.contains(field.name) {
            continue;
        }
        let column = Field {
            column: target.column,
            ..*field
        };
        if !store::exists(db, target.table, &[&column], std::slice::from_ref(value)).await? {
            errors.add(
                field.name,
                format!("Invalid pk \"{}\" - object does not exist.", display_value(value)),
            );
        }
    }
    Ok(())
}
