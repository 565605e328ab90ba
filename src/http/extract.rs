//! Extractors that answer with [`ApiError`] bodies instead of axum's
//! plain-text rejections.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::http::response::{ApiError, FieldErrors, NON_FIELD_ERRORS};

/// Row key taken from the path. A key that does not parse is a plain 404.
#[derive(Debug, Clone)]
pub struct KeyPath<K>(pub K);

impl<S, K> FromRequestParts<S> for KeyPath<K>
where
    K: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<K>::from_request_parts(parts, state)
            .await
            .map(|Path(key)| KeyPath(key))
            .map_err(|rejection| {
                tracing::debug!(error = %rejection, "Unparseable key in path");
                ApiError::not_found()
            })
    }
}

/// Query string parameters. A string that does not deserialize is a 400.
#[derive(Debug, Clone, Default)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(params)| QueryParams(params))
            .map_err(|rejection| {
                ApiError::Validation(FieldErrors::single(NON_FIELD_ERRORS, rejection.body_text()))
            })
    }
}

/// A JSON object body.
#[derive(Debug, Clone, Default)]
pub struct JsonObject(pub Map<String, Value>);

impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))?;

        match value {
            Value::Object(map) => Ok(JsonObject(map)),
            other => Err(ApiError::Validation(FieldErrors::single(
                NON_FIELD_ERRORS,
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type_name(&other)
                ),
            ))),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
