/// Request rate limiting
///
/// Three tiers picked from what the request carries (the admin API, a bearer
/// token, nothing). Each tier keeps one bucket per client: the peer IP when
/// known, else the device id header.
use crate::{
    api::middleware::extract_device_id,
    config::RateLimitConfig,
    context::AppContext,
    error::{DistimError, DistimResult},
};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota,
    RateLimiter as GovernorLimiter,
};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

type KeyedLimiter = GovernorLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Path prefix of the admin API
const ADMIN_PREFIX: &str = "/api/admin";

/// Which limiter a request is charged against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateTier {
    Anonymous,
    Authenticated,
    Admin,
}

impl RateTier {
    pub fn for_request(path: &str, has_auth_header: bool) -> Self {
        match (path.starts_with(ADMIN_PREFIX), has_auth_header) {
            (true, true) => RateTier::Admin,
            (_, true) => RateTier::Authenticated,
            _ => RateTier::Anonymous,
        }
    }
}

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    anonymous: Arc<KeyedLimiter>,
    authenticated: Arc<KeyedLimiter>,
    admin: Arc<KeyedLimiter>,
    anonymous_rps: u32,
    authenticated_rps: u32,
    admin_rps: u32,
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

fn quota(rps: u32, burst: u32) -> Quota {
    Quota::per_second(non_zero(rps)).allow_burst(non_zero(burst))
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let burst = config.burst_size;

        Self {
            enabled: config.enabled,
            anonymous: Arc::new(GovernorLimiter::keyed(quota(config.anonymous_rps, burst / 5))),
            authenticated: Arc::new(GovernorLimiter::keyed(quota(config.authenticated_rps, burst))),
            admin: Arc::new(GovernorLimiter::keyed(quota(
                config.admin_rps,
                burst.saturating_mul(2),
            ))),
            anonymous_rps: config.anonymous_rps,
            authenticated_rps: config.authenticated_rps,
            admin_rps: config.admin_rps,
        }
    }

    fn limiter(&self, tier: RateTier) -> &KeyedLimiter {
        match tier {
            RateTier::Anonymous => &self.anonymous,
            RateTier::Authenticated => &self.authenticated,
            RateTier::Admin => &self.admin,
        }
    }

    /// Charge one request from `client` to a tier
    pub fn check(&self, tier: RateTier, client: &str) -> DistimResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.limiter(tier)
            .check_key(&client.to_string())
            .map_err(|_| DistimError::RateLimitExceeded {
                retry_after: Duration::from_secs(1),
            })
    }

    /// Forget clients whose buckets are full again
    pub fn prune(&self) {
        for tier in [RateTier::Anonymous, RateTier::Authenticated, RateTier::Admin] {
            let limiter = self.limiter(tier);
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    /// Requests per second allowed for a tier
    pub fn limit(&self, tier: RateTier) -> u32 {
        match tier {
            RateTier::Anonymous => self.anonymous_rps,
            RateTier::Authenticated => self.authenticated_rps,
            RateTier::Admin => self.admin_rps,
        }
    }
}

/// Bucket key of the caller
pub fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    match extract_device_id(request.headers()) {
        Ok(Some(device)) => format!("device:{}", device),
        _ => "unknown".to_string(),
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let tier = RateTier::for_request(
        request.uri().path(),
        request.headers().contains_key(AUTHORIZATION),
    );

    let client = client_key(&request);

    if let Err(e) = ctx.rate_limiter.check(tier, &client) {
        tracing::debug!("Rate limit hit on {:?} tier by {}", tier, client);
        let mut response = e.into_response();
        response
            .headers_mut()
            .insert("Retry-After", HeaderValue::from_static("1"));
        return response;
    }

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        "X-RateLimit-Limit",
        HeaderValue::from(ctx.rate_limiter.limit(tier)),
    );
    response
}
