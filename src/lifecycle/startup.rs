//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order (database, metrics, router)
//! - Bind the listener and begin accepting traffic
//! - Close the pool once the server has drained
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::auth::users::{self, NewUser};
use crate::config::ApiConfig;
use crate::db::{self, DbError};
use crate::http::response::ApiError;
use crate::http::{ApiServer, AppState};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("invalid metrics address: {0}")]
    MetricsAddress(String),

    #[error("{0}")]
    Api(#[from] ApiError),
}

/// Run the API until SIGINT/SIGTERM.
pub async fn serve(config: ApiConfig) -> Result<(), StartupError> {
    let pool = db::connect(&config.database).await?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    let address = config.listener.bind_address.clone();
    let state = AppState::new(config, pool.clone());
    tracing::info!(
        throttle_enabled = state.limiter.is_enabled(),
        page_size = state.config.pagination.page_size,
        request_timeout_secs = state.config.timeouts.request_secs,
        "Configuration loaded"
    );
    let server = ApiServer::new(state);

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let result = server.run(listener, shutdown).await;
    pool.close().await;
    result.map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Outcome of [`create_demo_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoUser {
    Created,
    AlreadyExists,
}

/// Create the demo account unless the username is taken.
pub async fn create_demo_user(
    config: &ApiConfig,
    username: &str,
    password: &str,
    email: &str,
) -> Result<DemoUser, StartupError> {
    let pool = db::connect(&config.database).await?;

    let outcome = if users::username_taken(&pool, username).await? {
        DemoUser::AlreadyExists
    } else {
        users::create_user(
            &pool,
            NewUser {
                username: username.to_string(),
                email: email.to_string(),
                first_name: "Demo".to_string(),
                last_name: "User".to_string(),
                password: password.to_string(),
            },
            config.auth.bcrypt_cost,
        )
        .await?;
        DemoUser::Created
    };

    pool.close().await;
    Ok(outcome)
}
