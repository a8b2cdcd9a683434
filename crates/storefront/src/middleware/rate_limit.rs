//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Provides rate limiters for the endpoint groups that write:
//! - `auth_rate_limiter`: Strict limits for login and registration (~10/min)
//! - `mutation_rate_limiter`: Relaxed limits for cart and checkout (~100/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

// =============================================================================
// Client IP key extractor
// =============================================================================

/// Cloudflare's real client IP header, checked first.
const CLOUDFLARE_IP_HEADER: &str = "cf-connecting-ip";

/// Single-IP proxy headers checked after `X-Forwarded-For`.
const FALLBACK_IP_HEADERS: [&str; 2] = ["x-real-ip", "fly-client-ip"];

/// Key extractor that trusts common proxy headers, then falls back to the
/// socket peer address.
///
/// Any client can send these headers, so the storefront must sit behind a
/// proxy that overwrites or strips them. Exposed directly, a client can pick
/// a fresh key per request.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

/// Client IP from proxy headers, if any are present and parseable.
#[must_use]
pub fn ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    if let Some(ip) = header_ip(CLOUDFLARE_IP_HEADER) {
        return Some(ip);
    }

    // First IP in the X-Forwarded-For chain is the original client
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    FALLBACK_IP_HEADERS.iter().find_map(|name| header_ip(name))
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        ip_from_headers(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Render limiter rejections as the storefront's error page.
fn rejection_response(error: GovernorError) -> Response {
    match error {
        GovernorError::TooManyRequests { wait_time, .. } => {
            tracing::warn!(wait_time, "Rate limit exceeded");
            AppError::RateLimited(wait_time).into_response()
        }
        GovernorError::UnableToExtractKey => {
            AppError::Internal("no client address for rate limiting".to_string()).into_response()
        }
        other @ GovernorError::Other { .. } => Response::from(other),
    }
}

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
/// This slows down credential stuffing against login/registration.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config)).error_handler(rejection_response)
}

/// Create rate limiter for cart and checkout writes: ~100 requests per
/// minute per IP.
///
/// Configuration: 1 request per second (replenish), burst of 50.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(1)` and `burst_size(50)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn mutation_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config)).error_handler(rejection_response)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::http::header::{CONTENT_TYPE, RETRY_AFTER};
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request_with(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/cart/add");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let req = request_with(&[
            ("x-forwarded-for", "10.0.0.1"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        assert_eq!(
            ClientIpKeyExtractor.extract(&req).ok(),
            "203.0.113.7".parse().ok()
        );
    }

    #[test]
    fn test_first_forwarded_for_entry() {
        let req = request_with(&[("x-forwarded-for", "198.51.100.2, 10.0.0.1")]);
        assert_eq!(
            ClientIpKeyExtractor.extract(&req).ok(),
            "198.51.100.2".parse().ok()
        );
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut req = request_with(&[]);
        let peer: SocketAddr = "192.0.2.10:54321".parse().unwrap_or_else(|e| panic!("{e}"));
        req.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(ClientIpKeyExtractor.extract(&req).ok(), Some(peer.ip()));
    }

    #[test]
    fn test_too_many_requests_renders_error_page() {
        let response = rejection_response(GovernorError::TooManyRequests {
            wait_time: 4,
            headers: None,
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()),
            Some("4")
        );
        assert!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("text/html"))
        );
    }

    #[test]
    fn test_missing_key_is_server_error() {
        let response = rejection_response(GovernorError::UnableToExtractKey);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_no_source_is_an_error() {
        let req = request_with(&[("x-real-ip", "not-an-ip")]);
        assert!(ClientIpKeyExtractor.extract(&req).is_err());
    }
}
