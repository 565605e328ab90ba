//! Bearer-token authentication for protected routes.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::auth::{tokens::TokenType, users, AuthUser};
use crate::http::response::ApiError;
use crate::http::server::AppState;

const BEARER: &str = "Bearer";

/// Token from `Authorization: Bearer <token>`.
///
/// No header, or another scheme, means no credentials were sent.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::NotAuthenticated)?
        .to_str()
        .map_err(|_| ApiError::AuthenticationFailed("Invalid authorization header."))?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme == BEARER => Ok(token),
        (Some(scheme), _, _) if scheme == BEARER => Err(ApiError::AuthenticationFailed(
            "Authorization header must contain two space-delimited values",
        )),
        _ => Err(ApiError::NotAuthenticated),
    }
}

/// Reject the request unless it carries a valid access token of an active user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;
    let claims = state.tokens.verify(token, TokenType::Access)?;

    let user = users::find_active(&state.db, claims.user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = claims.user_id, "Token for unknown or inactive user");
            ApiError::InvalidToken
        })?;

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        username: user.username,
    });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(ApiError::NotAuthenticated)
        ));
        assert!(matches!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(ApiError::NotAuthenticated)
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer")),
            Err(ApiError::AuthenticationFailed(_))
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer a b")),
            Err(ApiError::AuthenticationFailed(_))
        ));
    }
}
