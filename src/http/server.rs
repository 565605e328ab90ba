//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, timeout, limits, metrics)
//! - Bind the server to a listener and drain on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::auth::{self, blacklist, TokenService};
use crate::config::ApiConfig;
use crate::db::DbPool;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::{method_not_allowed_fallback, not_found_fallback};
use crate::lifecycle::Shutdown;
use crate::observability::{metrics, tracing::http_trace_layer};
use crate::security::headers::security_header_layers;
use crate::security::limits::body_limit_layers;
use crate::security::rate_limit::RateLimiter;
use crate::{admin, resources};

pub const RESOURCES_PREFIX: &str = "/classic-models/api/v1/classicmodels";
pub const AUTH_PREFIX: &str = "/classic-models/api/auth";
pub const OPS_PREFIX: &str = "/classic-models/api";

/// Revoked tokens past their expiry are dropped this often.
const BLACKLIST_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<ApiConfig>,
    pub tokens: Arc<TokenService>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: ApiConfig, db: DbPool) -> Self {
        Self {
            db,
            tokens: Arc::new(TokenService::new(&config.auth)),
            limiter: Arc::new(RateLimiter::from_config(&config.throttle)),
            config: Arc::new(config),
        }
    }
}

/// HTTP server for the API.
pub struct ApiServer {
    router: Router,
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(&state);
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: &AppState) -> Router {
        let config = &state.config;

        let mut router = Router::new()
            .nest(RESOURCES_PREFIX, resources::router(state))
            .nest(AUTH_PREFIX, auth::router(state))
            .nest(OPS_PREFIX, admin::router(state))
            .fallback(not_found_fallback)
            .method_not_allowed_fallback(method_not_allowed_fallback)
            .with_state(state.clone())
            .layer(middleware::from_fn(metrics::track_metrics));

        if config.security.enable_headers {
            for layer in security_header_layers() {
                router = router.layer(layer);
            }
        }

        let (default_limit, body_limit) = body_limit_layers(&config.security);
        router
            .layer(default_limit)
            .layer(body_limit)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(http_trace_layer())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = self.state.limiter.clone().spawn_sweeper(
            Duration::from_secs(self.state.config.throttle.sweep_interval_secs),
            shutdown.subscribe(),
        );
        let purger = blacklist::spawn_purge(
            self.state.db.clone(),
            BLACKLIST_PURGE_INTERVAL,
            shutdown.subscribe(),
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.notified())
            .await;

        // Background tasks stop on the same signal; make sure they see it
        // even when serving failed.
        shutdown.trigger();
        let _ = sweeper.await;
        let _ = purger.await;

        result?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
