//! Revoked refresh tokens, keyed by `jti`.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::auth::tokens::Claims;
use crate::db::DbPool;
use crate::http::response::ApiError;

/// Revoke a token. Returns false if it was already revoked.
pub async fn revoke(pool: &DbPool, claims: &Claims) -> Result<bool, ApiError> {
    let result = sqlx::query(
        "INSERT INTO token_blacklist (jti, user_id, expires_at, created_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT (jti) DO NOTHING",
    )
    .bind(&claims.jti)
    .bind(claims.user_id)
    .bind(claims.exp)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Forget revocations of tokens that have expired anyway.
pub async fn purge_expired(pool: &DbPool) -> Result<u64, ApiError> {
    let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < ?")
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Periodically purge expired revocations until `shutdown` fires.
pub fn spawn_purge(
    pool: DbPool,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => match purge_expired(&pool).await {
                    Ok(0) => {}
                    Ok(purged) => tracing::debug!(purged, "Purged expired token revocations"),
                    Err(e) => tracing::warn!(error = %e, "Token blacklist purge failed"),
                },
                _ = shutdown.recv() => break,
            }
        }
    })
}
