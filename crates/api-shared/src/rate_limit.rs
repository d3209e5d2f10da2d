//! Per-IP rate limiting as an axum middleware.

use crate::client_ip::client_ip;
use crate::envelope::{ApiFailure, Envelopes};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use booking_core::{BookingError, RateLimiter};
use std::sync::Arc;

/// Middleware state: the shared limiter plus the envelope builder for 429 bodies.
#[derive(Clone)]
pub struct RateLimitGuard {
    pub limiter: Arc<RateLimiter>,
    pub envelopes: Envelopes,
}

impl RateLimitGuard {
    pub fn new(limiter: Arc<RateLimiter>, envelopes: Envelopes) -> Self {
        Self { limiter, envelopes }
    }
}

/// Admit or reject a request before any validation or EHR work happens.
pub async fn rate_limit_middleware(
    State(guard): State<RateLimitGuard>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(request.headers());
    let decision = guard.limiter.check(&ip);
    if !decision.allowed {
        tracing::warn!(
            client_ip = %ip,
            path = %request.uri().path(),
            retry_after_secs = decision.retry_after_secs,
            "rate limit exceeded"
        );
        return guard.envelopes.error(ApiFailure::from(BookingError::RateLimitExceeded {
            retry_after_secs: decision.retry_after_secs,
        }));
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use booking_core::{ManualClock, RateLimitSettings, RuntimeEnvironment};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(clock: Arc<ManualClock>) -> Router {
        let limiter = Arc::new(RateLimiter::new(
            RateLimitSettings {
                max_requests: 2,
                window: Duration::from_secs(60),
            },
            clock,
        ));
        let guard = RateLimitGuard::new(limiter, Envelopes::new(RuntimeEnvironment::Development));
        Router::new()
            .route("/", get(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(guard, rate_limit_middleware))
    }

    fn request(ip: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri("/")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_third_request_is_rejected() {
        let clock = Arc::new(ManualClock::new(0));
        let app = app(clock);

        for _ in 0..2 {
            let res = app.clone().oneshot(request("1.1.1.1")).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        let res = app.clone().oneshot(request("1.1.1.1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get("retry-after").unwrap(), "60");

        let other = app.oneshot(request("2.2.2.2")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_window_reset_admits_again() {
        let clock = Arc::new(ManualClock::new(0));
        let app = app(clock.clone());

        for _ in 0..3 {
            app.clone().oneshot(request("1.1.1.1")).await.unwrap();
        }
        clock.advance_ms(60_000);
        let res = app.oneshot(request("1.1.1.1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
