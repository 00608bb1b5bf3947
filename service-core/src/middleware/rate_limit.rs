use crate::error::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

/// Rate limiter keyed by IP address
pub type IpRateLimiter = Arc<RateLimiter<SocketAddr, DashMapStateStore<SocketAddr>, DefaultClock>>;

/// Create a keyed rate limiter (by IP) allowing `attempts` per `window_seconds`.
pub fn create_ip_rate_limiter(attempts: u32, window_seconds: u64) -> IpRateLimiter {
    let attempts = attempts.max(1);
    let window_ms = window_seconds.max(1) * 1000;
    let period = Duration::from_millis((window_ms / attempts as u64).max(1));
    let quota = Quota::with_period(period)
        .expect("period is non-zero")
        .allow_burst(NonZeroU32::new(attempts).expect("attempts is guaranteed to be non-zero"));

    Arc::new(RateLimiter::dashmap(quota))
}

fn client_addr(request: &Request) -> Option<SocketAddr> {
    let forwarded_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<std::net::IpAddr>().ok());

    if let Some(ip) = forwarded_ip {
        return Some(SocketAddr::new(ip, 0));
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<SocketAddr>>()
        .map(|axum::extract::ConnectInfo(addr)| SocketAddr::new(addr.ip(), 0))
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(limiter): State<IpRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match client_addr(&request) {
        Some(addr) => match limiter.check_key(&addr) {
            Ok(_) => Ok(next.run(request).await),
            Err(negative) => {
                let wait_time = negative.wait_time_from(DefaultClock::default().now());
                tracing::warn!(ip = %addr.ip(), "Rate limit exceeded");
                Err(AppError::TooManyRequests(
                    "Too many requests from this IP. Please try again later.".to_string(),
                    Some(wait_time.as_secs().max(1)),
                ))
            }
        },
        None => {
            tracing::warn!("Could not determine IP for rate limiting");
            Ok(next.run(request).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router, body::Body, http, http::StatusCode, middleware::from_fn_with_state, routing::post,
    };
    use tower::ServiceExt;

    fn request(ip: &str) -> http::Request<Body> {
        http::Request::builder()
            .method("POST")
            .uri("/signin")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_blocks_after_burst() {
        let limiter = create_ip_rate_limiter(2, 60);
        let app = Router::new()
            .route("/signin", post(|| async { "ok" }))
            .layer(from_fn_with_state(limiter, ip_rate_limit_middleware));

        for _ in 0..2 {
            let res = app.clone().oneshot(request("10.0.0.1")).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = app.clone().oneshot(request("10.0.0.1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(res.headers().contains_key(axum::http::header::RETRY_AFTER));

        // A different client has its own bucket.
        let res = app.oneshot(request("10.0.0.2")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
