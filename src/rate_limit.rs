//! Distributed sliding-window rate limiting.
//!
//! Every check is one atomic round trip to the shared store, so concurrent
//! requests on any number of server instances can never push more than `rate`
//! admissions through a single window.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::auth::{ClientIpHeader, extract_client_ip};
use crate::store::{SharedStore, StoreError};

/// Default per-IP limit: 100 requests
pub const DEFAULT_IP_RATE: u64 = 100;

/// Default per-IP window: 1 second
pub const DEFAULT_IP_INTERVAL: Duration = Duration::from_secs(1);

/// What to do when the store cannot answer a rate-limit check.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Reject the request (protects downstream services)
    #[default]
    FailClosed,
    /// Let the request through (favours availability)
    FailOpen,
}

/// A rate and the trailing window it applies to.
#[derive(Debug, Clone, Copy)]
pub struct WindowPolicy {
    pub rate: u64,
    pub interval: Duration,
}

impl WindowPolicy {
    pub fn new(rate: u64, interval: Duration) -> Result<Self, RateLimitError> {
        if interval.as_millis() == 0 {
            return Err(RateLimitError::InvalidWindow);
        }
        Ok(Self { rate, interval })
    }
}

/// Errors from a rate-limit check. Being limited is not an error; it is the
/// `true` result of [`SlidingWindowLimiter::limit`].
#[derive(Debug)]
pub enum RateLimitError {
    /// The store could not run the check
    StoreUnavailable(StoreError),
    /// Window shorter than one millisecond
    InvalidWindow,
    /// System time error
    TimeError,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitError::StoreUnavailable(e) => write!(f, "Rate limit check failed: {}", e),
            RateLimitError::InvalidWindow => write!(f, "Rate limit window must be at least 1ms"),
            RateLimitError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for RateLimitError {}

pub struct SlidingWindowLimiter {
    store: SharedStore,
}

impl SlidingWindowLimiter {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Record one call for `key` at the current wall-clock time.
    /// Returns `true` if the call is over the limit and was not recorded.
    pub async fn limit(
        &self,
        key: &str,
        rate: u64,
        interval: Duration,
    ) -> Result<bool, RateLimitError> {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| RateLimitError::TimeError)?
            .as_millis() as u64;
        self.limit_at(key, rate, interval, now_ms).await
    }

    /// Same as [`limit`](Self::limit) with an explicit timestamp in Unix milliseconds.
    pub async fn limit_at(
        &self,
        key: &str,
        rate: u64,
        interval: Duration,
        now_ms: u64,
    ) -> Result<bool, RateLimitError> {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        if interval_ms == 0 {
            return Err(RateLimitError::InvalidWindow);
        }

        self.store
            .slide_window(key, interval_ms, rate, now_ms)
            .await
            .map_err(RateLimitError::StoreUnavailable)
    }
}

/// Configuration for the per-client-IP middleware.
pub struct IpRateLimit {
    pub limiter: SlidingWindowLimiter,
    pub policy: WindowPolicy,
    pub on_store_failure: FailurePolicy,
    pub ip_header: Option<ClientIpHeader>,
    /// Key prefix; keys look like `ip:<addr>`
    pub prefix: String,
}

impl IpRateLimit {
    pub fn new(
        store: SharedStore,
        policy: WindowPolicy,
        on_store_failure: FailurePolicy,
        ip_header: Option<ClientIpHeader>,
    ) -> Self {
        Self {
            limiter: SlidingWindowLimiter::new(store),
            policy,
            on_store_failure,
            ip_header,
            prefix: "ip".to_string(),
        }
    }

    fn key(&self, ip: &str) -> String {
        format!("{}:{}", self.prefix, ip)
    }
}

/// Middleware limiting requests per client IP.
pub async fn rate_limit_by_ip(
    State(config): State<Arc<IpRateLimit>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = match extract_client_ip(&request, config.ip_header) {
        Ok(ip) => ip,
        Err(_) => {
            return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
        }
    };

    let key = config.key(&ip);
    let result = config
        .limiter
        .limit(&key, config.policy.rate, config.policy.interval)
        .await;

    match result {
        Ok(false) => next.run(request).await,
        Ok(true) => {
            tracing::debug!(key = %key, "Request rate limited");
            too_many_requests(config.policy.interval)
        }
        Err(e) => match config.on_store_failure {
            FailurePolicy::FailOpen => {
                tracing::warn!(key = %key, error = %e, "Rate limit check failed, letting request through");
                next.run(request).await
            }
            FailurePolicy::FailClosed => {
                tracing::error!(key = %key, error = %e, "Rate limit check failed, rejecting request");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable. Please retry.",
                )
                    .into_response()
            }
        },
    }
}

fn too_many_requests(interval: Duration) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        "Too many requests. Please try again later.",
    )
        .into_response();

    let retry_after = interval.as_secs_f64().ceil().max(1.0) as u64;
    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(RETRY_AFTER, value);
    }
    response
}
