//! Login, signup, token refresh, logout and profile endpoints.

use axum::{body::Bytes, extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::tokens::{TokenPair, TokenType};
use crate::auth::{blacklist, users, AuthUser};
use crate::auth::users::{NewUser, UserProfile};
use crate::http::extract::JsonObject;
use crate::http::response::{ApiError, FieldErrors, NON_FIELD_ERRORS};
use crate::http::server::AppState;
use crate::security::rate_limit::Decision;

const USERNAME_MAX: usize = 150;
const NAME_MAX: usize = 150;
const EMAIL_MAX: usize = 254;
const PASSWORD_MIN: usize = 8;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    pub user: UserProfile,
}

/// Non-blank string field, recording the usual errors otherwise.
fn required_str(body: &JsonObject, name: &str, errors: &mut FieldErrors) -> Option<String> {
    match body.0.get(name) {
        None | Some(Value::Null) => {
            errors.add(name, "This field is required.");
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add(name, "This field may not be blank.");
            None
        }
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            errors.add(name, "Not a valid string.");
            None
        }
    }
}

fn valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Exchange credentials for a token pair.
pub async fn login(
    State(state): State<AppState>,
    body: JsonObject,
) -> Result<Json<LoginResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    let username = required_str(&body, "username", &mut errors);
    let password = required_str(&body, "password", &mut errors);
    errors.into_result()?;
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ApiError::Internal("login fields missing after validation".to_string()));
    };

    let invalid = || {
        ApiError::Validation(FieldErrors::single(NON_FIELD_ERRORS, "Invalid credentials"))
    };
    let user = users::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| {
            tracing::info!(username = %username, "Login for unknown user");
            invalid()
        })?;
    if !users::verify_password(password, user.password.clone()).await? || !user.is_active {
        tracing::info!(user_id = user.id, "Login rejected");
        return Err(invalid());
    }

    users::record_login(&state.db, user.id).await?;
    let TokenPair { access, refresh } = state.tokens.issue_pair(user.id)?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        access,
        refresh,
        user: UserProfile::from(&user),
    }))
}

/// Create an account.
pub async fn signup(
    State(state): State<AppState>,
    body: JsonObject,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let mut errors = FieldErrors::new();
    let username = required_str(&body, "username", &mut errors);
    let email = required_str(&body, "email", &mut errors);
    let first_name = required_str(&body, "first_name", &mut errors);
    let last_name = required_str(&body, "last_name", &mut errors);
    let password = required_str(&body, "password", &mut errors);
    let password_confirm = required_str(&body, "password_confirm", &mut errors);

    if let Some(username) = &username {
        if username.chars().count() > USERNAME_MAX {
            errors.add(
                "username",
                format!("Ensure this field has no more than {} characters.", USERNAME_MAX),
            );
        } else if !valid_username(username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        } else if users::username_taken(&state.db, username).await? {
            errors.add("username", "A user with that username already exists.");
        }
    }
    if let Some(email) = &email {
        if email.chars().count() > EMAIL_MAX || !valid_email(email.trim()) {
            errors.add("email", "Enter a valid email address.");
        }
    }
    for (name, value) in [("first_name", &first_name), ("last_name", &last_name)] {
        if value.as_ref().is_some_and(|v| v.chars().count() > NAME_MAX) {
            errors.add(
                name,
                format!("Ensure this field has no more than {} characters.", NAME_MAX),
            );
        }
    }
    if let Some(password) = &password {
        if password.chars().count() < PASSWORD_MIN {
            errors.add(
                "password",
                format!("Ensure this field has at least {} characters.", PASSWORD_MIN),
            );
        }
    }
    errors.into_result()?;

    let (Some(username), Some(email), Some(first_name), Some(last_name), Some(password), Some(confirm)) =
        (username, email, first_name, last_name, password, password_confirm)
    else {
        return Err(ApiError::Internal("signup fields missing after validation".to_string()));
    };
    if password != confirm {
        return Err(ApiError::Validation(FieldErrors::single(
            "password_confirm",
            "Passwords don't match",
        )));
    }

    let user = users::create_user(
        &state.db,
        NewUser {
            username,
            email: email.trim().to_string(),
            first_name,
            last_name,
            password,
        },
        state.config.auth.bcrypt_cost,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully",
            user: UserProfile::from(&user),
        }),
    ))
}

/// Rotate a refresh token: revoke it and issue a new pair.
pub async fn refresh(
    State(state): State<AppState>,
    body: JsonObject,
) -> Result<Json<TokenPair>, ApiError> {
    let mut errors = FieldErrors::new();
    let token = required_str(&body, "refresh", &mut errors);
    errors.into_result()?;
    let token = token.ok_or(ApiError::InvalidToken)?;

    let claims = state.tokens.verify(&token, TokenType::Refresh)?;
    if !blacklist::revoke(&state.db, &claims).await? {
        tracing::warn!(user_id = claims.user_id, jti = %claims.jti, "Revoked refresh token presented");
        return Err(ApiError::InvalidToken);
    }
    if users::find_active(&state.db, claims.user_id).await?.is_none() {
        return Err(ApiError::InvalidToken);
    }

    let pair = state.tokens.issue_pair(claims.user_id)?;
    tracing::debug!(user_id = claims.user_id, "Refresh token rotated");
    Ok(Json(pair))
}

/// Revoke the caller's refresh token.
///
/// Any body without a usable `refresh` string counts as missing the token.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let token = body
        .get("refresh")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::BadRequest("Refresh token is required"))?;

    let claims = state
        .tokens
        .verify(token, TokenType::Refresh)
        .map_err(|_| ApiError::BadRequest("Invalid token"))?;
    if claims.user_id != user.id || !blacklist::revoke(&state.db, &claims).await? {
        return Err(ApiError::BadRequest("Invalid token"));
    }

    tracing::info!(user_id = user.id, "User logged out");
    Ok(Json(json!({ "message": "Successfully logged out" })))
}

/// Profile of the authenticated user.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = users::find_active(&state.db, user.id)
        .await?
        .ok_or(ApiError::InvalidToken)?;
    Ok(Json(UserProfile::from(&user)))
}

/// Report the caller's quota under the demo scope.
pub async fn rate_limit_demo(decision: Option<Extension<Decision>>) -> Json<Value> {
    match decision {
        Some(Extension(decision)) => Json(json!({
            "message": "Rate limit demo endpoint",
            "scope": "demo",
            "limit": decision.limit,
            "remaining": decision.remaining,
            "window_seconds": decision.window.as_secs(),
            "reset": decision.reset_at(),
        })),
        None => Json(json!({
            "message": "Rate limit demo endpoint",
            "scope": "demo",
            "throttled": false,
        })),
    }
}
