//! Rate Limiting Middleware
//!
//! Sliding-window rate limiting for the `/api` surface. A Redis sorted set
//! shares the window across instances; without Redis each process keeps its
//! own window in memory.

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicI64, Ordering};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use redis::aio::ConnectionManager;

use crate::config::RateLimitSettings;
use crate::shared::error::ErrorResponse;
use crate::startup::AppState;

const KEY_PREFIX: &str = "rl:api";

/// Rate limit status for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed in the current window
    pub limit: u32,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Unix timestamp when the rate limit resets
    pub reset_at: i64,
    /// Seconds until a new request will be accepted
    pub retry_after: u64,
}

enum WindowStore {
    Redis(ConnectionManager),
    Memory {
        windows: DashMap<String, VecDeque<i64>>,
        last_sweep_ms: AtomicI64,
    },
}

/// Sliding-window rate limiter.
///
/// Every accepted request is recorded with its timestamp in milliseconds.
/// Entries older than the window are dropped before counting, so the limit
/// applies to any `window_seconds` span rather than to fixed buckets.
pub struct RateLimiter {
    store: WindowStore,
    requests_per_window: u32,
    window_seconds: u64,
}

impl RateLimiter {
    /// Limiter shared through Redis.
    pub fn redis(redis: ConnectionManager, settings: &RateLimitSettings) -> Self {
        Self {
            store: WindowStore::Redis(redis),
            requests_per_window: settings.requests_per_window,
            window_seconds: settings.window_seconds,
        }
    }

    /// Limiter local to this process.
    pub fn in_memory(settings: &RateLimitSettings) -> Self {
        Self {
            store: WindowStore::Memory {
                windows: DashMap::new(),
                last_sweep_ms: AtomicI64::new(0),
            },
            requests_per_window: settings.requests_per_window,
            window_seconds: settings.window_seconds,
        }
    }

    /// Check if a request should be allowed.
    ///
    /// Returns `Ok(RateLimitInfo)` if allowed, `Err(RateLimitInfo)` if rate limited.
    pub async fn check(&self, identifier: &str) -> Result<RateLimitInfo, RateLimitInfo> {
        self.check_at(identifier, chrono::Utc::now().timestamp_millis())
            .await
    }

    async fn check_at(&self, identifier: &str, now_ms: i64) -> Result<RateLimitInfo, RateLimitInfo> {
        let window_ms = (self.window_seconds * 1000) as i64;
        let reset_at = (now_ms / 1000) + self.window_seconds as i64;
        let limit = self.requests_per_window;

        let (allowed, count, retry_ms) = match &self.store {
            WindowStore::Redis(redis) => {
                match self.check_redis(redis.clone(), identifier, now_ms, window_ms).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        // A broken Redis must not take the API down with it
                        tracing::error!("Rate limiter Redis error: {}", e);
                        return Ok(RateLimitInfo {
                            limit,
                            remaining: 1,
                            reset_at,
                            retry_after: 0,
                        });
                    }
                }
            }
            WindowStore::Memory {
                windows,
                last_sweep_ms,
            } => {
                let outcome = {
                    let mut window = windows.entry(identifier.to_string()).or_default();
                    while window.front().is_some_and(|&t| t <= now_ms - window_ms) {
                        window.pop_front();
                    }

                    let count = window.len() as u32;
                    if count < limit {
                        window.push_back(now_ms);
                        (true, count + 1, 0)
                    } else {
                        let oldest = window.front().copied().unwrap_or(now_ms);
                        (false, count, oldest + window_ms - now_ms)
                    }
                };
                sweep_idle(windows, last_sweep_ms, now_ms, window_ms);
                outcome
            }
        };

        let info = RateLimitInfo {
            limit,
            remaining: limit.saturating_sub(count),
            reset_at,
            retry_after: if allowed {
                0
            } else {
                ((retry_ms.max(0) as f64) / 1000.0).ceil() as u64
            },
        };

        if allowed {
            Ok(info)
        } else {
            Err(info)
        }
    }

    async fn check_redis(
        &self,
        mut conn: ConnectionManager,
        identifier: &str,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<(bool, u32, i64), redis::RedisError> {
        let key = format!("{}:{}", KEY_PREFIX, identifier);

        // Executed atomically so concurrent requests see a consistent count
        let script = redis::Script::new(
            r#"
            local key = KEYS[1]
            local now_ms = tonumber(ARGV[1])
            local window_start = tonumber(ARGV[2])
            local max_requests = tonumber(ARGV[3])
            local window_seconds = tonumber(ARGV[4])

            redis.call('ZREMRANGEBYSCORE', key, '-inf', window_start)
            local current_count = redis.call('ZCARD', key)

            if current_count < max_requests then
                local member = now_ms .. ':' .. math.random(1000000)
                redis.call('ZADD', key, now_ms, member)
                redis.call('EXPIRE', key, window_seconds + 1)
                return {1, current_count + 1, 0}
            else
                local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
                local retry_after = 0
                if oldest and #oldest >= 2 then
                    retry_after = oldest[2] + (window_seconds * 1000) - now_ms
                end
                return {0, current_count, retry_after}
            end
            "#,
        );

        let result: Vec<i64> = script
            .key(&key)
            .arg(now_ms)
            .arg(now_ms - window_ms)
            .arg(self.requests_per_window as i64)
            .arg(self.window_seconds as i64)
            .invoke_async(&mut conn)
            .await?;

        let allowed = result.first().copied() == Some(1);
        let count = result.get(1).copied().unwrap_or(0).max(0) as u32;
        let retry_ms = result.get(2).copied().unwrap_or(0);

        Ok((allowed, count, retry_ms))
    }
}

/// Forget clients whose newest request has left the window. Runs at most
/// once per window length.
fn sweep_idle(
    windows: &DashMap<String, VecDeque<i64>>,
    last_sweep_ms: &AtomicI64,
    now_ms: i64,
    window_ms: i64,
) {
    let last = last_sweep_ms.load(Ordering::Relaxed);
    if now_ms - last < window_ms
        || last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
    {
        return;
    }

    let before = windows.len();
    windows.retain(|_, window| window.back().is_some_and(|&t| t > now_ms - window_ms));
    let removed = before.saturating_sub(windows.len());
    if removed > 0 {
        tracing::debug!(removed, "Dropped idle rate limit windows");
    }
}

/// Identify the client behind a request.
///
/// Priority: first hop of `X-Forwarded-For`, then `X-Real-IP`, then the
/// socket address. Header values that are not IP addresses are ignored.
fn extract_identifier(headers: &HeaderMap, client_ip: Option<IpAddr>) -> String {
    if let Some(forwarded_for) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first_ip) = forwarded_for.split(',').next() {
            let ip = first_ip.trim();
            if ip.parse::<IpAddr>().is_ok() {
                return format!("ip:{}", ip);
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let ip = real_ip.trim();
        if ip.parse::<IpAddr>().is_ok() {
            return format!("ip:{}", ip);
        }
    }

    match client_ip {
        Some(ip) => format!("ip:{}", ip),
        None => {
            tracing::warn!("Could not determine client identifier for rate limiting");
            "ip:unknown".to_string()
        }
    }
}

/// Socket address recorded by `into_make_service_with_connect_info`, absent
/// when the router is driven without a listener.
fn client_ip(request: &Request) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
}

/// Rate limiting middleware for the API routes.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let identifier = extract_identifier(request.headers(), client_ip(&request));

    match state.rate_limiter.check(&identifier).await {
        Ok(info) => {
            let mut response = next.run(request).await;
            add_rate_limit_headers(response.headers_mut(), &info);
            response
        }
        Err(info) => {
            tracing::warn!(identifier = %identifier, "Rate limit exceeded");
            create_rate_limit_response(info)
        }
    }
}

fn add_rate_limit_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(info.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(info.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(info.reset_at));
}

/// Create a 429 Too Many Requests response.
fn create_rate_limit_response(info: RateLimitInfo) -> Response {
    let body = ErrorResponse::new("Too many requests, please try again later");
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(info.retry_after));
    add_rate_limit_headers(
        response.headers_mut(),
        &RateLimitInfo {
            remaining: 0,
            ..info
        },
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    impl RateLimiter {
        fn tracked_clients(&self) -> usize {
            match &self.store {
                WindowStore::Memory { windows, .. } => windows.len(),
                WindowStore::Redis(_) => 0,
            }
        }
    }

    fn limiter(requests_per_window: u32) -> RateLimiter {
        RateLimiter::in_memory(&RateLimitSettings {
            requests_per_window,
            window_seconds: 600,
        })
    }

    #[tokio::test]
    async fn test_limit_reached_within_window() {
        let limiter = limiter(2);
        let now = 1_700_000_000_000;

        assert_eq!(limiter.check_at("ip:1.1.1.1", now).await.unwrap().remaining, 1);
        assert_eq!(limiter.check_at("ip:1.1.1.1", now + 10).await.unwrap().remaining, 0);

        let denied = limiter.check_at("ip:1.1.1.1", now + 1000).await.unwrap_err();
        assert_eq!(denied.retry_after, 599);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = limiter(1);
        let now = 1_700_000_000_000;

        limiter.check_at("ip:1.1.1.1", now).await.unwrap();
        assert!(limiter.check_at("ip:1.1.1.1", now + 599_999).await.is_err());
        assert!(limiter.check_at("ip:1.1.1.1", now + 600_000).await.is_ok());
    }

    #[tokio::test]
    async fn test_idle_clients_are_forgotten() {
        let limiter = limiter(5);
        let now = 1_700_000_000_000;

        for i in 0..500 {
            limiter.check_at(&format!("ip:10.0.{}.{}", i / 256, i % 256), now).await.unwrap();
        }
        assert_eq!(limiter.tracked_clients(), 500);

        // An hour later a single request clears every expired window
        limiter.check_at("ip:192.0.2.1", now + 3_600_000).await.unwrap();
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[tokio::test]
    async fn test_active_clients_survive_sweep() {
        let limiter = limiter(5);
        let now = 1_700_000_000_000;

        limiter.check_at("ip:1.1.1.1", now).await.unwrap();
        limiter.check_at("ip:2.2.2.2", now + 300_000).await.unwrap();
        limiter.check_at("ip:3.3.3.3", now + 700_000).await.unwrap();

        // 1.1.1.1 expired, 2.2.2.2 is still inside its window
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_client_ip_from_connect_info() {
        let mut request = Request::new(axum::body::Body::empty());
        assert_eq!(client_ip(&request), None);

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 4242))));
        assert_eq!(client_ip(&request), Some(IpAddr::from([192, 0, 2, 10])));
    }

    #[tokio::test]
    async fn test_clients_counted_separately() {
        let limiter = limiter(1);
        let now = 1_700_000_000_000;

        limiter.check_at("ip:1.1.1.1", now).await.unwrap();
        assert!(limiter.check_at("ip:2.2.2.2", now).await.is_ok());
    }

    #[test_case(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")], "ip:203.0.113.7" ; "first forwarded hop")]
    #[test_case(&[("x-forwarded-for", "garbage"), ("x-real-ip", "198.51.100.2")], "ip:198.51.100.2" ; "real ip when forwarded is invalid")]
    #[test_case(&[], "ip:127.0.0.1" ; "socket address")]
    fn test_identifier(headers: &[(&'static str, &'static str)], expected: &str) {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_static(value));
        }
        let socket = Some(IpAddr::from([127, 0, 0, 1]));
        assert_eq!(extract_identifier(&map, socket), expected);
    }

    #[test]
    fn test_rejection_headers() {
        let response = create_rate_limit_response(RateLimitInfo {
            limit: 100,
            remaining: 3,
            reset_at: 1_700_000_600,
            retry_after: 42,
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
        assert_eq!(response.headers()["X-RateLimit-Remaining"], "0");
        assert_eq!(response.headers()["X-RateLimit-Limit"], "100");
    }
}
