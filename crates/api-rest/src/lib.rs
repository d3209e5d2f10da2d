//! # API REST
//!
//! REST API for the appointment booking proxy.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation
//! - Middleware ordering: tracing, then CORS (which answers `OPTIONS`), then per-IP rate
//!   limiting on the booking routes only
//!
//! Uses `api-shared` for envelopes and middleware, and `booking-core` for everything that
//! talks to the EHR.

#![warn(rust_2018_idioms)]

pub mod handlers;
pub mod schemas;
pub mod state;

pub use state::AppState;

use api_shared::{cors_layer, rate_limit_middleware, ErrorBody, HealthRes, HealthService};
use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use handlers::{appointments, auth, doctors, patients, visit_reasons};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        auth::access_token,
        doctors::list_doctors,
        doctors::available_dates,
        doctors::slots,
        appointments::book_appointment,
        patients::create_patient,
        patients::search_patients,
        visit_reasons::list_visit_reasons,
    ),
    components(schemas(
        HealthRes,
        ErrorBody,
        schemas::AccessTokenData,
        schemas::AccessTokenRes,
        schemas::DoctorsRes,
        schemas::AvailableDatesRes,
        schemas::DateRange,
        schemas::SlotsRes,
        schemas::BookingReq,
        schemas::BookingRes,
        schemas::PatientCreateReq,
        schemas::PatientCreateRes,
        schemas::PatientSearchReq,
        schemas::PatientsRes,
        schemas::VisitReasonsRes,
        booking_core::Doctor,
        booking_core::Patient,
        booking_core::VisitReason,
        booking_core::AvailableDate,
        booking_core::AppointmentSlot,
        booking_core::SlotType,
    ))
)]
pub struct ApiDoc;

/// Build the full router for the booking proxy.
pub fn router(state: AppState) -> Router {
    let booking = Router::new()
        .route("/auth/access-token", post(auth::access_token))
        .route("/doctors", get(doctors::list_doctors))
        .route("/doctors/available-dates", get(doctors::available_dates))
        .route("/doctors/slots", get(doctors::slots))
        .route("/doctors/appointments", post(appointments::book_appointment))
        .route("/patients", post(patients::create_patient))
        .route("/patients/search", post(patients::search_patients))
        .route("/visit-reasons", get(visit_reasons::list_visit_reasons))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limit_guard(),
            rate_limit_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(booking)
        .with_state(state.clone());
    for (name, value) in api_shared::cors::response_headers() {
        app = app.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }

    app.layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Liveness only; not rate limited and never calls the EHR.
#[axum::debug_handler]
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

/// Serve the generated OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
