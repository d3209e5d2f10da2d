use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use booking_core::{
    BookingConfig, BookingError, Credentials, HarmonyGateway, ManualClock, SlotQuery,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const START_MS: i64 = 1_700_000_000_000;

#[derive(Clone, Default)]
struct FakeHarmony {
    token_calls: Arc<AtomicUsize>,
    api_calls: Arc<AtomicUsize>,
    token_status: Arc<AtomicU16>,
    api_status: Arc<AtomicU16>,
    last_query: Arc<Mutex<HashMap<String, String>>>,
}

async fn token(State(fake): State<FakeHarmony>, headers: HeaderMap) -> Response {
    let n = fake.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    // base64("client-id:client-secret")
    let basic_ok = headers.get("authorization").and_then(|v| v.to_str().ok())
        == Some("Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=");
    let pair_ok = headers.get("client_id").and_then(|v| v.to_str().ok()) == Some("client-id")
        && headers.get("client_key").and_then(|v| v.to_str().ok()) == Some("client-secret");
    let forced = fake.token_status.load(Ordering::SeqCst);
    if forced != 0 {
        let status = StatusCode::from_u16(forced).unwrap();
        return (status, "invalid_client").into_response();
    }
    if !basic_ok || !pair_ok {
        return (StatusCode::UNAUTHORIZED, "bad credential headers").into_response();
    }
    Json(json!({"access_token": format!("tok-{n}"), "expires_in": 3600, "token_type": "Bearer"}))
        .into_response()
}

fn api_failure(fake: &FakeHarmony) -> Option<Response> {
    fake.api_calls.fetch_add(1, Ordering::SeqCst);
    match fake.api_status.load(Ordering::SeqCst) {
        0 => None,
        code => Some((StatusCode::from_u16(code).unwrap(), "vendor exploded").into_response()),
    }
}

async fn visit_reasons(State(fake): State<FakeHarmony>, headers: HeaderMap) -> Response {
    if let Some(failure) = api_failure(&fake) {
        return failure;
    }
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    Json(json!([{"id": 1, "name": "New patient", "bearer": bearer}])).into_response()
}

async fn slots(
    State(fake): State<FakeHarmony>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(failure) = api_failure(&fake) {
        return failure;
    }
    *fake.last_query.lock().unwrap() = query;
    Json(json!({"data": []})).into_response()
}

async fn appointments(State(fake): State<FakeHarmony>, Json(body): Json<Value>) -> Response {
    if let Some(failure) = api_failure(&fake) {
        return failure;
    }
    Json(json!({"id": "A1", "echo": body})).into_response()
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(2)).await;
    "too late"
}

async fn spawn_fake(fake: FakeHarmony) -> String {
    let app = Router::new()
        .route("/oauth2/token", post(token))
        .route("/visit_reasons", get(visit_reasons))
        .route("/available_slots/by_provider", get(slots))
        .route("/appointments", post(appointments))
        .route("/slow", get(slow))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(base_url: &str) -> BookingConfig {
    BookingConfig::new(Some(Credentials::new(
        "client-id",
        "client-secret",
        base_url,
    )))
}

async fn gateway(fake: &FakeHarmony) -> (HarmonyGateway, Arc<ManualClock>) {
    let base_url = spawn_fake(fake.clone()).await;
    let clock = Arc::new(ManualClock::new(START_MS));
    let gateway = HarmonyGateway::new(&config(&base_url), clock.clone()).unwrap();
    (gateway, clock)
}

#[tokio::test]
async fn test_token_is_cached_within_validity_window() {
    let fake = FakeHarmony::default();
    let (gateway, clock) = gateway(&fake).await;

    let first = gateway.access_token(false).await.unwrap();
    clock.advance_ms(60_000);
    let second = gateway.access_token(false).await.unwrap();

    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.value, second.value);
    assert_eq!(first.expires_at_ms, START_MS + 3_300_000);
}

#[tokio::test]
async fn test_token_refreshes_after_buffered_expiry() {
    let fake = FakeHarmony::default();
    let (gateway, clock) = gateway(&fake).await;

    let first = gateway.access_token(false).await.unwrap();
    clock.set_ms(first.expires_at_ms);
    let second = gateway.access_token(false).await.unwrap();

    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 2);
    assert_ne!(first.value, second.value);
}

#[tokio::test]
async fn test_force_refresh_always_exchanges() {
    let fake = FakeHarmony::default();
    let (gateway, _clock) = gateway(&fake).await;

    gateway.access_token(false).await.unwrap();
    let forced = gateway.access_token(true).await.unwrap();

    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 2);
    assert_eq!(forced.value, "tok-2");
}

#[tokio::test]
async fn test_failed_exchange_is_not_cached() {
    let fake = FakeHarmony::default();
    fake.token_status.store(401, Ordering::SeqCst);
    let (gateway, _clock) = gateway(&fake).await;

    let err = gateway.access_token(false).await.unwrap_err();
    match err {
        BookingError::AuthFailed { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid_client");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    fake.token_status.store(0, Ordering::SeqCst);
    gateway.access_token(false).await.unwrap();
    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_cache_misses_share_one_exchange() {
    let fake = FakeHarmony::default();
    let (gateway, _clock) = gateway(&fake).await;

    let (a, b, c) = tokio::join!(
        gateway.access_token(false),
        gateway.access_token(false),
        gateway.access_token(false)
    );

    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.unwrap().value, b.unwrap().value);
    assert_eq!(c.unwrap().value, "tok-1");
}

#[tokio::test]
async fn test_call_presents_bearer_token() {
    let fake = FakeHarmony::default();
    let (gateway, _clock) = gateway(&fake).await;

    let reasons = gateway.visit_reasons().await.unwrap();
    assert_eq!(reasons[0]["bearer"], "Bearer tok-1");
}

#[tokio::test]
async fn test_auth_failure_propagates_from_call() {
    let fake = FakeHarmony::default();
    fake.token_status.store(403, Ordering::SeqCst);
    let (gateway, _clock) = gateway(&fake).await;

    let err = gateway.visit_reasons().await.unwrap_err();
    assert!(matches!(err, BookingError::AuthFailed { status: 403, .. }));
    assert_eq!(fake.api_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_vendor_error_carries_status_and_body() {
    let fake = FakeHarmony::default();
    fake.api_status.store(503, Ordering::SeqCst);
    let (gateway, _clock) = gateway(&fake).await;

    let err = gateway
        .book_appointment(&json!({"patient_id": "p1"}))
        .await
        .unwrap_err();
    match err {
        BookingError::Gateway { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "vendor exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fake.api_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_vendor_401_drops_cached_token_without_retry() {
    let fake = FakeHarmony::default();
    fake.api_status.store(401, Ordering::SeqCst);
    let (gateway, _clock) = gateway(&fake).await;

    let err = gateway.visit_reasons().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(fake.api_calls.load(Ordering::SeqCst), 1);

    fake.api_status.store(0, Ordering::SeqCst);
    gateway.visit_reasons().await.unwrap();
    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_slot_query_parameters_are_forwarded() {
    let fake = FakeHarmony::default();
    let (gateway, _clock) = gateway(&fake).await;

    let query = SlotQuery {
        provider_id: "1234567890".into(),
        location_id: "L1".into(),
        start_date: "2025-01-10".parse().unwrap(),
        end_date: "2025-01-12".parse().unwrap(),
    };
    gateway.provider_slots(&query).await.unwrap();

    let seen = fake.last_query.lock().unwrap().clone();
    assert_eq!(seen.get("provider_id").map(String::as_str), Some("1234567890"));
    assert_eq!(seen.get("location_id").map(String::as_str), Some("L1"));
    assert_eq!(seen.get("start_date").map(String::as_str), Some("2025-01-10"));
    assert_eq!(seen.get("end_date").map(String::as_str), Some("2025-01-12"));
}

#[tokio::test]
async fn test_booking_body_is_sent_as_json() {
    let fake = FakeHarmony::default();
    let (gateway, _clock) = gateway(&fake).await;

    let reply = gateway
        .book_appointment(&json!({"patient_id": "p1", "duration": 30}))
        .await
        .unwrap();
    assert_eq!(reply["id"], "A1");
    assert_eq!(reply["echo"]["duration"], 30);
}

#[tokio::test]
async fn test_slow_vendor_times_out() {
    let fake = FakeHarmony::default();
    let base_url = spawn_fake(fake.clone()).await;
    let cfg = config(&base_url).with_request_timeout(Duration::from_millis(200));
    let gateway = HarmonyGateway::new(&cfg, Arc::new(ManualClock::new(START_MS))).unwrap();

    let err = gateway
        .call(reqwest::Method::GET, "/slow", &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Timeout));
}

#[tokio::test]
async fn test_unreachable_vendor_is_internal_error() {
    let cfg = config("http://127.0.0.1:9");
    let gateway = HarmonyGateway::new(&cfg, Arc::new(ManualClock::new(START_MS))).unwrap();

    let err = gateway.visit_reasons().await.unwrap_err();
    assert!(matches!(err, BookingError::Internal(_) | BookingError::Timeout));
}
