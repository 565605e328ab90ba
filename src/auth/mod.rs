//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! login/ ──▶ users.rs (bcrypt check) ──▶ tokens.rs (access + refresh pair)
//! refresh/ ──▶ tokens.rs (verify) ──▶ blacklist.rs (revoke old) ──▶ new pair
//! protected route ──▶ middleware.rs (Bearer access token) ──▶ AuthUser extension
//! ```
//!
//! # Design Decisions
//! - Stateless access tokens; only revoked refresh tokens are stored
//! - Failures never say whether the user or the password was wrong

pub mod blacklist;
pub mod handlers;
pub mod middleware;
pub mod tokens;
pub mod users;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::http::server::AppState;
use crate::security::rate_limit::{throttle_middleware, Scope, Throttle};

pub use middleware::require_auth;
pub use tokens::{Claims, TokenPair, TokenService, TokenType};

/// The authenticated caller, set by [`require_auth`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Routes under `/classic-models/api/auth`.
pub fn router(state: &AppState) -> Router<AppState> {
    let limiter = &state.limiter;

    Router::new()
        .route(
            "/login/",
            post(handlers::login).route_layer(from_fn_with_state(
                Throttle::scoped(limiter.clone(), Scope::Login),
                throttle_middleware,
            )),
        )
        .route(
            "/signup/",
            post(handlers::signup).route_layer(from_fn_with_state(
                Throttle::scoped(limiter.clone(), Scope::Register),
                throttle_middleware,
            )),
        )
        .route(
            "/refresh/",
            post(handlers::refresh).route_layer(from_fn_with_state(
                Throttle::scoped(limiter.clone(), Scope::TokenRefresh),
                throttle_middleware,
            )),
        )
        .route(
            "/logout/",
            post(handlers::logout)
                .route_layer(from_fn_with_state(
                    Throttle::scoped(limiter.clone(), Scope::Logout),
                    throttle_middleware,
                ))
                .route_layer(from_fn_with_state(state.clone(), require_auth)),
        )
        .route(
            "/me/",
            get(handlers::me)
                .route_layer(from_fn_with_state(
                    Throttle::scoped(limiter.clone(), Scope::CurrentUser),
                    throttle_middleware,
                ))
                .route_layer(from_fn_with_state(state.clone(), require_auth)),
        )
        .route(
            "/rate-limit-demo/",
            get(handlers::rate_limit_demo).route_layer(from_fn_with_state(
                Throttle::scoped(limiter.clone(), Scope::Demo),
                throttle_middleware,
            )),
        )
}
