//! Sliding-window rate limiting with per-scope quotas.
//!
//! Every throttled request is counted against a `(scope, identity)` window.
//! The identity is the authenticated user id for user scopes and the client
//! address for anonymous scopes (and for user scopes without a user).

use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, State},
    http::{HeaderMap, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::auth::AuthUser;
use crate::config::{ThrottleConfig, ThrottleRates};
use crate::http::response::ApiError;
use crate::observability::metrics;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// A named rate-limit bucket with its own limit and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Login,
    Register,
    TokenRefresh,
    Logout,
    CurrentUser,
    Read,
    Write,
    Burst,
    Demo,
}

/// What a scope partitions its counters by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    /// Always the client address.
    Anonymous,
    /// The authenticated user, falling back to the client address.
    User,
}

impl Scope {
    pub const ALL: [Scope; 9] = [
        Scope::Login,
        Scope::Register,
        Scope::TokenRefresh,
        Scope::Logout,
        Scope::CurrentUser,
        Scope::Read,
        Scope::Write,
        Scope::Burst,
        Scope::Demo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Login => "login",
            Scope::Register => "register",
            Scope::TokenRefresh => "token_refresh",
            Scope::Logout => "logout",
            Scope::CurrentUser => "current_user",
            Scope::Read => "read",
            Scope::Write => "write",
            Scope::Burst => "burst",
            Scope::Demo => "demo",
        }
    }

    pub fn identity_kind(self) -> IdentityKind {
        match self {
            Scope::Login | Scope::Register | Scope::Demo => IdentityKind::Anonymous,
            _ => IdentityKind::User,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CRUD action on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

/// Which throttle scope covers each action.
pub const ACTION_SCOPES: [(Action, Scope); 6] = [
    (Action::List, Scope::Read),
    (Action::Retrieve, Scope::Read),
    (Action::Create, Scope::Write),
    (Action::Update, Scope::Write),
    (Action::PartialUpdate, Scope::Write),
    (Action::Destroy, Scope::Write),
];

impl Action {
    /// Classify a request. `detail` is true for routes addressing one row.
    pub fn classify(method: &Method, detail: bool) -> Option<Action> {
        match (method, detail) {
            (&Method::GET | &Method::HEAD, false) => Some(Action::List),
            (&Method::GET | &Method::HEAD, true) => Some(Action::Retrieve),
            (&Method::POST, _) => Some(Action::Create),
            (&Method::PUT, _) => Some(Action::Update),
            (&Method::PATCH, _) => Some(Action::PartialUpdate),
            (&Method::DELETE, _) => Some(Action::Destroy),
            _ => None,
        }
    }

    pub fn scope(self) -> Scope {
        ACTION_SCOPES
            .iter()
            .find(|(action, _)| *action == self)
            .map(|(_, scope)| *scope)
            .unwrap_or(Scope::Read)
    }
}

/// `N` requests per `window`, written `"N/period"` in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThrottleRate {
    pub limit: u32,
    pub window: Duration,
}

impl ThrottleRate {
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }

    pub const fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    pub const fn per_hour(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60 * 60))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid throttle rate {0:?}, expected \"N/period\" with period s, m, h or d")]
pub struct ParseRateError(String);

impl FromStr for ThrottleRate {
    type Err = ParseRateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRateError(s.to_string());
        let (count, period) = s.split_once('/').ok_or_else(err)?;
        let limit: u32 = count.trim().parse().map_err(|_| err())?;
        let secs = match period.trim() {
            "s" | "sec" | "second" => 1,
            "m" | "min" | "minute" => 60,
            "h" | "hour" => 60 * 60,
            "d" | "day" => 24 * 60 * 60,
            _ => return Err(err()),
        };
        Ok(Self::new(limit, Duration::from_secs(secs)))
    }
}

impl TryFrom<String> for ThrottleRate {
    type Error = ParseRateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ThrottleRate> for String {
    fn from(rate: ThrottleRate) -> Self {
        rate.to_string()
    }
}

impl fmt::Display for ThrottleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.window.as_secs();
        let period = match secs {
            86_400 => "day".to_string(),
            3_600 => "hour".to_string(),
            60 => "min".to_string(),
            1 => "sec".to_string(),
            other => return write!(f, "{}/{}s", self.limit, other),
        };
        write!(f, "{}/{}", self.limit, period)
    }
}

/// Outcome of one check against a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    /// Quota left after this request.
    pub remaining: u32,
    pub window: Duration,
    /// Time until the oldest counted request leaves the window. Set on rejection.
    pub retry_after: Option<Duration>,
}

impl Decision {
    /// Unix timestamp at which a fresh window would start.
    pub fn reset_at(&self) -> u64 {
        (SystemTime::now() + self.window)
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    /// Whole seconds to wait, rounded up and never zero.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after.map(|wait| {
            let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            secs.max(1)
        })
    }

    /// Write the quota headers onto a response.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset_at()));
        if let Some(secs) = self.retry_after_secs() {
            headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(secs));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("counter store is full ({0} tracked windows)")]
    Capacity(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    pub scope: Scope,
    pub identity: String,
}

impl WindowKey {
    pub fn new(scope: Scope, identity: impl Into<String>) -> Self {
        Self {
            scope,
            identity: identity.into(),
        }
    }
}

/// Timestamps of admitted requests, oldest first.
#[derive(Debug)]
struct Window {
    hits: VecDeque<Instant>,
    span: Duration,
}

impl Window {
    fn new(span: Duration) -> Self {
        Self {
            hits: VecDeque::new(),
            span,
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.hits.front() {
            if now.saturating_duration_since(oldest) >= self.span {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Minimum spacing of the sweeps a full store runs on the request path.
const INLINE_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// In-memory sliding-window counters.
///
/// Each key's window is mutated under its shard lock, so the count and the
/// append happen as one step. New keys reserve a slot from `tracked` first,
/// so the store never holds more than `max_keys` windows.
pub struct SlidingWindowStore {
    windows: DashMap<WindowKey, Window>,
    max_keys: usize,
    tracked: AtomicUsize,
    created: Instant,
    /// Milliseconds after `created` before which a full store may not sweep again.
    next_sweep_ms: AtomicU64,
}

impl SlidingWindowStore {
    pub fn new(max_keys: usize) -> Self {
        Self {
            windows: DashMap::new(),
            max_keys,
            tracked: AtomicUsize::new(0),
            created: Instant::now(),
            next_sweep_ms: AtomicU64::new(0),
        }
    }

    /// Count the request against `key` and record it if admitted.
    pub fn check_and_record(
        &self,
        key: WindowKey,
        rate: ThrottleRate,
        now: Instant,
    ) -> Result<Decision, StoreError> {
        match self.record(&key, rate, now) {
            Err(StoreError::Capacity(_)) if self.claim_sweep(now) => {
                self.sweep(now);
                self.record(&key, rate, now)
            }
            other => other,
        }
    }

    /// Count one request against several windows. It is recorded in all of
    /// them, or in none if any window rejects it.
    ///
    /// Returns the scope that decided: the first to reject, otherwise the
    /// one with the least quota left. `None` when `keys` is empty.
    pub fn check_all(
        &self,
        keys: &[(WindowKey, ThrottleRate)],
        now: Instant,
    ) -> Result<Option<(Scope, Decision)>, StoreError> {
        let mut admitted: Vec<&WindowKey> = Vec::with_capacity(keys.len());
        let mut tightest: Option<(Scope, Decision)> = None;

        for (key, rate) in keys {
            let decision = match self.check_and_record(key.clone(), *rate, now) {
                Ok(decision) => decision,
                Err(e) => {
                    self.release(&admitted, now);
                    return Err(e);
                }
            };
            if !decision.allowed {
                self.release(&admitted, now);
                return Ok(Some((key.scope, decision)));
            }
            admitted.push(key);
            if tightest.map_or(true, |(_, best)| decision.remaining < best.remaining) {
                tightest = Some((key.scope, decision));
            }
        }
        Ok(tightest)
    }

    fn record(&self, key: &WindowKey, rate: ThrottleRate, now: Instant) -> Result<Decision, StoreError> {
        let mut window = match self.windows.get_mut(key) {
            Some(window) => window,
            None => {
                if !self.reserve_slot() {
                    return Err(StoreError::Capacity(self.max_keys));
                }
                match self.windows.entry(key.clone()) {
                    // Lost the race to another request for the same key
                    Entry::Occupied(entry) => {
                        self.tracked.fetch_sub(1, Ordering::AcqRel);
                        entry.into_ref()
                    }
                    Entry::Vacant(entry) => entry.insert(Window::new(rate.window)),
                }
            }
        };
        window.span = rate.window;
        window.prune(now);

        let count = u32::try_from(window.hits.len()).unwrap_or(u32::MAX);
        if count < rate.limit {
            window.hits.push_back(now);
            return Ok(Decision {
                allowed: true,
                limit: rate.limit,
                remaining: rate.limit - count - 1,
                window: rate.window,
                retry_after: None,
            });
        }

        let oldest = window.hits.front().copied().unwrap_or(now);
        Ok(Decision {
            allowed: false,
            limit: rate.limit,
            remaining: rate.limit.saturating_sub(count),
            window: rate.window,
            retry_after: Some((oldest + rate.window).saturating_duration_since(now)),
        })
    }

    /// Take back the hits recorded at `at` for requests rejected elsewhere.
    fn release(&self, keys: &[&WindowKey], at: Instant) {
        for key in keys {
            if let Some(mut window) = self.windows.get_mut(*key) {
                if let Some(pos) = window.hits.iter().rposition(|&hit| hit == at) {
                    window.hits.remove(pos);
                }
            }
        }
    }

    fn reserve_slot(&self) -> bool {
        self.tracked
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_keys).then_some(n + 1)
            })
            .is_ok()
    }

    /// True for at most one caller per [`INLINE_SWEEP_INTERVAL`].
    fn claim_sweep(&self, now: Instant) -> bool {
        let at = millis(now.saturating_duration_since(self.created));
        let next = self.next_sweep_ms.load(Ordering::Acquire);
        at >= next
            && self
                .next_sweep_ms
                .compare_exchange(
                    next,
                    at.saturating_add(millis(INLINE_SWEEP_INTERVAL)),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
    }

    /// Drop expired timestamps and empty windows. Returns the windows removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.windows.retain(|_, window| {
            window.prune(now);
            let live = !window.hits.is_empty();
            if !live {
                removed += 1;
            }
            live
        });
        self.tracked.fetch_sub(removed, Ordering::AcqRel);
        removed
    }

    pub fn tracked(&self) -> usize {
        self.tracked.load(Ordering::Acquire)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Scoped rate limiter shared by all throttle layers.
pub struct RateLimiter {
    store: SlidingWindowStore,
    rates: ThrottleRates,
    enabled: bool,
    fail_open: bool,
    trust_forwarded_for: bool,
}

impl RateLimiter {
    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self {
            store: SlidingWindowStore::new(config.max_tracked_keys),
            rates: config.rates.clone(),
            enabled: config.enabled,
            fail_open: config.fail_open,
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn rate(&self, scope: Scope) -> ThrottleRate {
        self.rates.for_scope(scope)
    }

    /// Count one request against each `(scope, identity)` pair, all or nothing.
    pub fn check_all(
        &self,
        checks: &[(Scope, String)],
    ) -> Result<Option<(Scope, Decision)>, StoreError> {
        let keys: Vec<_> = checks
            .iter()
            .map(|(scope, identity)| (WindowKey::new(*scope, identity.as_str()), self.rate(*scope)))
            .collect();
        self.store.check_all(&keys, Instant::now())
    }

    pub fn tracked_keys(&self) -> usize {
        self.store.tracked()
    }

    /// Periodically prune expired windows until shutdown.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.store.sweep(Instant::now());
                        metrics::record_tracked_windows(self.store.tracked());
                        if removed > 0 {
                            tracing::debug!(removed, tracked = self.store.tracked(), "Swept expired throttle windows");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }

    /// Resolve the counter identity for a request under `scope`.
    fn identity(&self, scope: Scope, request: &Request<Body>) -> String {
        if scope.identity_kind() == IdentityKind::User {
            if let Some(user) = request.extensions().get::<AuthUser>() {
                return format!("user:{}", user.id);
            }
        }
        format!("ip:{}", self.client_ip(request))
    }

    fn client_ip(&self, request: &Request<Body>) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = forwarded {
                return ip.to_string();
            }
        }
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Which requests a throttle layer counts.
#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Every request.
    Always(Scope),
    /// Every request, against all of these scopes at once.
    Stacked(&'static [Scope]),
    /// Only requests whose action maps to this scope.
    Action(Scope),
}

/// State for one throttle layer.
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<RateLimiter>,
    rule: Rule,
}

impl Throttle {
    /// Count every request routed through the layer against `scope`.
    pub fn scoped(limiter: Arc<RateLimiter>, scope: Scope) -> Self {
        Self {
            limiter,
            rule: Rule::Always(scope),
        }
    }

    /// Count every request against each of `scopes`. A request rejected by
    /// one scope is not counted by the others.
    pub fn stacked(limiter: Arc<RateLimiter>, scopes: &'static [Scope]) -> Self {
        Self {
            limiter,
            rule: Rule::Stacked(scopes),
        }
    }

    /// Count only requests whose action maps to `scope`; pass others through.
    pub fn for_actions(limiter: Arc<RateLimiter>, scope: Scope) -> Self {
        Self {
            limiter,
            rule: Rule::Action(scope),
        }
    }

    fn scopes_for(&self, request: &Request<Body>) -> Vec<Scope> {
        match self.rule {
            Rule::Always(scope) => vec![scope],
            Rule::Stacked(scopes) => scopes.to_vec(),
            Rule::Action(scope) => {
                let detail = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|path| path.as_str().contains('{'))
                    .unwrap_or(false);
                Action::classify(request.method(), detail)
                    .filter(|action| action.scope() == scope)
                    .map(|_| vec![scope])
                    .unwrap_or_default()
            }
        }
    }
}

/// Middleware function for scoped rate limiting.
pub async fn throttle_middleware(
    State(throttle): State<Throttle>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !throttle.limiter.is_enabled() {
        return next.run(request).await;
    }
    let checks: Vec<(Scope, String)> = throttle
        .scopes_for(&request)
        .into_iter()
        .map(|scope| (scope, throttle.limiter.identity(scope, &request)))
        .collect();
    let Some((_, identity)) = checks.first() else {
        return next.run(request).await;
    };
    let identity = identity.clone();

    let (scope, decision) = match throttle.limiter.check_all(&checks) {
        Ok(Some(decided)) => decided,
        Ok(None) => return next.run(request).await,
        Err(e) if throttle.limiter.fail_open => {
            tracing::warn!(client = %identity, error = %e, "Throttle store unavailable, admitting request");
            return next.run(request).await;
        }
        Err(e) => {
            tracing::error!(client = %identity, error = %e, "Throttle store unavailable, rejecting request");
            for (scope, _) in &checks {
                metrics::record_throttled(scope.as_str());
            }
            return ApiError::Throttled { wait_secs: None }.into_response();
        }
    };

    if !decision.allowed {
        tracing::warn!(scope = %scope, client = %identity, "Rate limit exceeded");
        metrics::record_throttled(scope.as_str());
        let mut response = ApiError::Throttled {
            wait_secs: decision.retry_after_secs(),
        }
        .into_response();
        decision.apply_headers(response.headers_mut());
        return response;
    }

    request.extensions_mut().insert(decision);
    let mut response = next.run(request).await;
    decision.apply_headers(response.headers_mut());
    response
}
