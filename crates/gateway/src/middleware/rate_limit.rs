//! Per-address rate limiting using the governor token bucket

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use tenderdesk_common::{config::RateLimitConfig, errors::AppError, metrics};

/// Rate limiter keyed by caller address
pub type IpRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Create a limiter allowing `per_minute` requests per address
pub fn create_rate_limiter(per_minute: u32) -> Arc<IpRateLimiter> {
    let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute)))
}

/// Limiter attached to one route; `None` lets every request through
#[derive(Clone)]
pub struct RouteLimiter {
    route: &'static str,
    limiter: Option<Arc<IpRateLimiter>>,
}

impl RouteLimiter {
    pub fn new(route: &'static str, per_minute: u32, enabled: bool) -> Self {
        Self {
            route,
            limiter: enabled.then(|| create_rate_limiter(per_minute)),
        }
    }

    /// Drop buckets that have fully refilled
    pub fn retain_recent(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.retain_recent();
        }
    }
}

/// Limiters for the unauthenticated account endpoints
#[derive(Clone)]
pub struct RateLimits {
    pub register: RouteLimiter,
    pub login: RouteLimiter,
}

impl RateLimits {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            register: RouteLimiter::new("register", config.register_per_minute, config.enabled),
            login: RouteLimiter::new("login", config.login_per_minute, config.enabled),
        }
    }

    pub fn retain_recent(&self) {
        self.register.retain_recent();
        self.login.retain_recent();
    }
}

/// Rate limiting middleware
pub async fn limit_by_address(
    State(route): State<RouteLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(limiter) = &route.limiter else {
        return Ok(next.run(request).await);
    };

    let ip = client_ip(&request);
    match limiter.check_key(&ip) {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(route = route.route, client = %ip, "Rate limit exceeded");
            metrics::record_rate_limited(route.route);
            Err(AppError::RateLimited)
        }
    }
}

/// Peer address, or the unspecified address when the server runs without connect info
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_quota() {
        let limiter = create_rate_limiter(2);
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiter.check_key(&a).is_ok());
        assert!(limiter.check_key(&a).is_ok());
        assert!(limiter.check_key(&a).is_err());
        assert!(limiter.check_key(&b).is_ok());
    }

    #[test]
    fn test_zero_quota_is_clamped() {
        let limiter = create_rate_limiter(0);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert!(limiter.check_key(&ip).is_ok());
        assert!(limiter.check_key(&ip).is_err());
    }

    #[test]
    fn test_disabled_route_has_no_limiter() {
        let route = RouteLimiter::new("login", 10, false);
        assert!(route.limiter.is_none());
        route.retain_recent();
    }
}
