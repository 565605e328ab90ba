//! User accounts and password hashing.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::DbPool;
use crate::http::response::ApiError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// bcrypt hash.
    pub password: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Public view of a user. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_active: user.is_active,
            date_joined: user.date_joined,
        }
    }
}

/// Validated signup data.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password, is_active, date_joined, last_login";

pub async fn find_by_username(pool: &DbPool, username: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM auth_users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM auth_users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// The user behind a token, if it still exists and is active.
pub async fn find_active(pool: &DbPool, id: i64) -> Result<Option<User>, ApiError> {
    Ok(find_by_id(pool, id).await?.filter(|user| user.is_active))
}

pub async fn username_taken(pool: &DbPool, username: &str) -> Result<bool, ApiError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM auth_users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(found > 0)
}

/// Hash the password and store the account.
pub async fn create_user(pool: &DbPool, new_user: NewUser, cost: u32) -> Result<User, ApiError> {
    let hash = hash_password(new_user.password, cost).await?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO auth_users (username, email, first_name, last_name, password, is_active, date_joined) \
         VALUES (?, ?, ?, ?, ?, 1, ?) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(hash)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User created");
    Ok(user)
}

pub async fn record_login(pool: &DbPool, id: i64) -> Result<(), ApiError> {
    sqlx::query("UPDATE auth_users SET last_login = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// bcrypt on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("hashing failed: {}", e)))
}

/// Check a password against a stored hash. A malformed hash never matches.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {}", e)))?;
    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is unreadable");
            Ok(false)
        }
    }
}
