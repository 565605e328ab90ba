//! Operational endpoints: service status, and a delay hook when debugging.

pub mod handlers;

use axum::{routing::get, Router};

use crate::http::server::AppState;
use self::handlers::*;

/// Routes under `/classic-models/api`.
pub fn router(state: &AppState) -> Router<AppState> {
    let router = Router::new().route("/status/", get(get_status));

    if state.config.debug.enabled {
        tracing::warn!(
            max_delay_secs = state.config.debug.max_delay_secs,
            "Debug delay route enabled"
        );
        router.route("/debug/delay/", get(debug_delay))
    } else {
        router
    }
}
