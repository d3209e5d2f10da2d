//! CORS for every booking response.
//!
//! [`cors_layer`] answers `OPTIONS` itself with `200` and the preflight headers, before rate
//! limiting or validation run, so browser preflight never counts against a client's window.
//! Regular responses only get the origin from `CorsLayer`; [`response_headers`] supplies the
//! rest of the set so success and error envelopes carry the same headers as preflight.

use axum::http::{
    header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_MAX_AGE,
        AUTHORIZATION, CONTENT_TYPE,
    },
    HeaderName, HeaderValue, Method,
};
use booking_core::BookingConfig;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const ALLOW_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];
pub const ALLOW_HEADERS: [HeaderName; 2] = [CONTENT_TYPE, AUTHORIZATION];
/// Preflight cache lifetime: 24 hours.
pub const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86_400);

/// CORS layer for the booking router.
///
/// Outside production any origin is allowed (`*`). In production only origins on the
/// `ALLOWED_ORIGINS` list are echoed back; other origins get no allow-origin header.
pub fn cors_layer(config: &BookingConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allow_origin(config))
        .allow_methods(ALLOW_METHODS)
        .allow_headers(ALLOW_HEADERS)
        .max_age(PREFLIGHT_MAX_AGE)
}

fn allow_origin(config: &BookingConfig) -> AllowOrigin {
    if !config.is_production() {
        return AllowOrigin::any();
    }
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) if origin != "*" => Some(value),
            _ => {
                tracing::warn!(origin = %origin, "ignoring unusable entry in ALLOWED_ORIGINS");
                None
            }
        })
        .collect();
    AllowOrigin::list(origins)
}

/// Headers `CorsLayer` only sets on preflight, in the same format, for regular responses.
pub fn response_headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET,POST,OPTIONS"),
        ),
        (
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("content-type,authorization"),
        ),
        (ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header::ACCESS_CONTROL_ALLOW_ORIGIN, header::ORIGIN, Request, StatusCode},
        routing::get,
        Router,
    };
    use booking_core::RuntimeEnvironment;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn production(origins: &[&str]) -> BookingConfig {
        BookingConfig::new(None)
            .with_environment(RuntimeEnvironment::Production)
            .with_allowed_origins(origins.iter().map(|o| o.to_string()).collect())
    }

    fn app(config: &BookingConfig, hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/ping",
                get(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "pong"
                    }
                }),
            )
            .layer(cors_layer(config))
    }

    fn request(method: &str, origin: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri("/ping");
        if let Some(origin) = origin {
            builder = builder.header(ORIGIN, origin);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_wildcard_outside_production() {
        let config = BookingConfig::new(None).with_allowed_origins(vec!["https://ignored.example".into()]);
        let response = app(&config, Arc::default())
            .oneshot(request("GET", Some("https://evil.example")))
            .await
            .unwrap();
        assert_eq!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    }

    #[tokio::test]
    async fn test_production_echoes_listed_origin_only() {
        let config = production(&["https://fibroids.example.org", "https://www.example.org"]);
        let listed = app(&config, Arc::default())
            .oneshot(request("GET", Some("https://www.example.org")))
            .await
            .unwrap();
        assert_eq!(
            listed.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://www.example.org"
        );

        let unlisted = app(&config, Arc::default())
            .oneshot(request("GET", Some("https://evil.example")))
            .await
            .unwrap();
        assert!(unlisted.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_wildcard_entry_is_not_a_production_origin() {
        let config = production(&["*", "https://www.example.org"]);
        let response = app(&config, Arc::default())
            .oneshot(request("GET", Some("https://evil.example")))
            .await
            .unwrap();
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_preflight_is_answered_without_reaching_routes() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = app(&BookingConfig::new(None), hits.clone())
            .oneshot(request("OPTIONS", Some("https://a.example")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let headers = response.headers();
        for (name, value) in response_headers() {
            assert_eq!(headers.get(&name), Some(&value), "{name}");
        }
    }
}
