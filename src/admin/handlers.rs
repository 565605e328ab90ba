//! Operational endpoints: service status and the opt-in debug delay.

use std::time::Duration;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::http::extract::QueryParams;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub database: &'static str,
    pub throttle_enabled: bool,
    pub throttle_tracked_keys: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let database_up = db::ping(&state.db).await;

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if database_up { "operational" } else { "degraded" },
        database: if database_up { "ok" } else { "unavailable" },
        throttle_enabled: state.limiter.is_enabled(),
        throttle_tracked_keys: state.limiter.tracked_keys(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct DelayQuery {
    #[serde(default)]
    pub seconds: Option<u64>,
}

#[derive(Serialize)]
pub struct DelayReport {
    pub requested_seconds: u64,
    pub slept_seconds: u64,
}

/// Sleep for the requested time, capped by `debug.max_delay_secs`.
pub async fn debug_delay(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<DelayQuery>,
) -> Json<DelayReport> {
    let requested = query.seconds.unwrap_or(0);
    let slept = requested.min(state.config.debug.max_delay_secs);

    tracing::debug!(requested, slept, "Debug delay");
    tokio::time::sleep(Duration::from_secs(slept)).await;

    Json(DelayReport {
        requested_seconds: requested,
        slept_seconds: slept,
    })
}
