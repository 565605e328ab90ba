//! SQL for resource tables, generated from their field lists.
//!
//! Identifiers come from the static field tables only; every value is bound.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteArguments;
use sqlx::Arguments;

use crate::db::DbPool;
use crate::http::response::ApiError;
use crate::models::{Field, FieldKind, Resource};

/// Rows whose `field` equals `value`.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: &'static Field,
    pub value: Value,
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident)
}

fn column_list(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| quote(field.column))
        .collect::<Vec<_>>()
        .join(", ")
}

fn key_clause<R: Resource>() -> String {
    R::key_fields()
        .iter()
        .map(|field| format!("{} = ?", quote(field.column)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn order_clause<R: Resource>() -> String {
    R::key_fields()
        .iter()
        .map(|field| quote(field.column))
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_filter(filter: Option<&Filter>) -> String {
    filter
        .map(|f| format!(" WHERE {} = ?", quote(f.field.column)))
        .unwrap_or_default()
}

/// Bind a normalised JSON value as the column's storage type.
fn bind(args: &mut SqliteArguments<'_>, field: &Field, value: &Value) -> Result<(), ApiError> {
    let bound = match value {
        Value::Null => args.add(None::<String>),
        Value::Bool(b) => args.add(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => args.add(i),
            None => args.add(n.to_string()),
        },
        Value::String(s) if field.kind == FieldKind::Binary => {
            let bytes = BASE64
                .decode(s)
                .map_err(|e| ApiError::Internal(format!("{}: {}", field.name, e)))?;
            args.add(bytes)
        }
        Value::String(s) => args.add(s.clone()),
        other => args.add(other.to_string()),
    };
    bound.map_err(|e| ApiError::Internal(format!("cannot bind {}: {}", field.name, e)))
}

fn bind_key<R: Resource>(args: &mut SqliteArguments<'_>, key: &[Value]) -> Result<(), ApiError> {
    for (field, value) in R::key_fields().into_iter().zip(key) {
        bind(args, field, value)?;
    }
    Ok(())
}

fn bind_i64(args: &mut SqliteArguments<'_>, value: i64) -> Result<(), ApiError> {
    args.add(value)
        .map_err(|e| ApiError::Internal(format!("cannot bind integer: {}", e)))
}

pub async fn count<R: Resource>(pool: &DbPool, filter: Option<&Filter>) -> Result<i64, ApiError> {
    let sql = format!("SELECT COUNT(*) FROM {}{}", quote(R::TABLE), where_filter(filter));
    let mut args = SqliteArguments::default();
    if let Some(f) = filter {
        bind(&mut args, f.field, &f.value)?;
    }
    Ok(sqlx::query_scalar_with::<_, i64, _>(&sql, args)
        .fetch_one(pool)
        .await?)
}

/// One page of rows in key order.
pub async fn fetch_page<R: Resource>(
    pool: &DbPool,
    filter: Option<&Filter>,
    limit: i64,
    offset: i64,
) -> Result<Vec<R>, ApiError> {
    let sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT ? OFFSET ?",
        column_list(R::FIELDS),
        quote(R::TABLE),
        where_filter(filter),
        order_clause::<R>(),
    );
    let mut args = SqliteArguments::default();
    if let Some(f) = filter {
        bind(&mut args, f.field, &f.value)?;
    }
    bind_i64(&mut args, limit)?;
    bind_i64(&mut args, offset)?;

    Ok(sqlx::query_as_with::<_, R, _>(&sql, args)
        .fetch_all(pool)
        .await?)
}

pub async fn fetch_one<R: Resource>(pool: &DbPool, key: &[Value]) -> Result<Option<R>, ApiError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {}",
        column_list(R::FIELDS),
        quote(R::TABLE),
        key_clause::<R>(),
    );
    let mut args = SqliteArguments::default();
    bind_key::<R>(&mut args, key)?;

    Ok(sqlx::query_as_with::<_, R, _>(&sql, args)
        .fetch_optional(pool)
        .await?)
}

/// Whether a row with `columns = values` exists in `table`.
pub async fn exists(
    pool: &DbPool,
    table: &str,
    columns: &[&Field],
    values: &[Value],
) -> Result<bool, ApiError> {
    let clause = columns
        .iter()
        .map(|field| format!("{} = ?", quote(field.column)))
        .collect::<Vec<_>>()
        .join(" AND ");
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {})", quote(table), clause);
    let mut args = SqliteArguments::default();
    for (field, value) in columns.iter().zip(values) {
        bind(&mut args, field, value)?;
    }

    let found = sqlx::query_scalar_with::<_, i64, _>(&sql, args).fetch_one(pool).await?;
    Ok(found != 0)
}

/// Insert a full row. Missing fields are stored as NULL.
pub async fn insert<R: Resource>(pool: &DbPool, row: &Map<String, Value>) -> Result<(), ApiError> {
    let placeholders = vec!["?"; R::FIELDS.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(R::TABLE),
        column_list(R::FIELDS),
        placeholders,
    );
    let mut args = SqliteArguments::default();
    for field in R::FIELDS {
        bind(&mut args, field, row.get(field.name).unwrap_or(&Value::Null))?;
    }

    sqlx::query_with(&sql, args).execute(pool).await?;
    Ok(())
}

/// Overwrite the non-key columns of one row. Returns rows affected.
pub async fn update<R: Resource>(
    pool: &DbPool,
    key: &[Value],
    row: &Map<String, Value>,
) -> Result<u64, ApiError> {
    let columns: Vec<&Field> = R::FIELDS
        .iter()
        .filter(|field| !R::KEY.contains(&field.name))
        .collect();
    let assignments = columns
        .iter()
        .map(|field| format!("{} = ?", quote(field.column)))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        quote(R::TABLE),
        assignments,
        key_clause::<R>(),
    );
    let mut args = SqliteArguments::default();
    for field in &columns {
        bind(&mut args, field, row.get(field.name).unwrap_or(&Value::Null))?;
    }
    bind_key::<R>(&mut args, key)?;

    Ok(sqlx::query_with(&sql, args).execute(pool).await?.rows_affected())
}

/// Delete one row. Returns rows affected.
pub async fn delete<R: Resource>(pool: &DbPool, key: &[Value]) -> Result<u64, ApiError> {
    let sql = format!("DELETE FROM {} WHERE {}", quote(R::TABLE), key_clause::<R>());
    let mut args = SqliteArguments::default();
    bind_key::<R>(&mut args, key)?;

    Ok(sqlx::query_with(&sql, args).execute(pool).await?.rows_affected())
}
