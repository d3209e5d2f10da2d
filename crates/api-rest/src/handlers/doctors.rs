//! Doctor listing and availability.

use super::{invalid_format, query_object, reject, relabel};
use crate::schemas::{AvailableDatesRes, DateRange, DoctorsRes, SlotsRes};
use crate::AppState;
use api_shared::{ApiFailure, ErrorBody};
use axum::{
    extract::{Query, State},
    response::Response,
};
use booking_core::{
    models::{extract_list, normalize_list},
    slots::{raw_slots_from_response, retain_future_dates, retain_future_slots},
    validation::{
        field_as_string, parse_days_requested, parse_query_date, validate,
        AVAILABLE_DATES_REQUIRED_PARAMS, SLOTS_REQUIRED_PARAMS,
    },
    BookingError, Doctor, SlotQuery,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DoctorsQuery {
    /// Specialty code; defaults to the configured code.
    pub specialty: Option<String>,
}

#[utoipa::path(
    get,
    path = "/doctors",
    params(DoctorsQuery),
    responses(
        (status = 200, description = "Doctors for the specialty", body = DoctorsRes),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 500, description = "Configuration error or EHR failure", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<AppState>,
    Query(query): Query<DoctorsQuery>,
) -> Response {
    match fetch_doctors(&state, query).await {
        Ok(res) => state.envelopes.success(&res),
        Err(failure) => reject(&state, "Doctors fetch", failure),
    }
}

async fn fetch_doctors(state: &AppState, query: DoctorsQuery) -> Result<DoctorsRes, ApiFailure> {
    let specialty = query
        .specialty
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(state.config.specialty_code());

    let reply = state
        .gateway
        .providers_by_specialty(specialty)
        .await
        .map_err(|e| relabel(e, "DOCTORS_FETCH_FAILED", "Failed to fetch doctors"))?;
    let items = extract_list(&reply).ok_or_else(|| {
        ApiFailure::from(BookingError::InvalidResponse {
            code: "DOCTORS_FETCH_FAILED",
            message: "provider list missing from EHR response".into(),
        })
    })?;

    let data = normalize_list(items, Doctor::from_record);
    Ok(DoctorsRes {
        count: data.len(),
        data,
    })
}

#[utoipa::path(
    get,
    path = "/doctors/available-dates",
    params(
        ("provider_id" = String, Query, description = "Provider NPI"),
        ("noOfDays" = Option<u32>, Query, description = "Days to look ahead (default 30, max 90)")
    ),
    responses(
        (status = 200, description = "Dates with future availability", body = AvailableDatesRes),
        (status = 400, description = "Missing or invalid parameters", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody)
    )
)]
/// Dates on which a provider has open slots, grouped in the facility timezone.
#[axum::debug_handler]
pub async fn available_dates(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match fetch_available_dates(&state, query_object(params)).await {
        Ok(res) => state.envelopes.success(&res),
        Err(failure) => reject(&state, "Available dates", failure),
    }
}

async fn fetch_available_dates(
    state: &AppState,
    params: Map<String, Value>,
) -> Result<AvailableDatesRes, ApiFailure> {
    validate(&params, AVAILABLE_DATES_REQUIRED_PARAMS).into_result("MISSING_PARAMETERS")?;
    let provider_id = field_as_string(&params, "provider_id").unwrap_or_default();
    let days = parse_days_requested(field_as_string(&params, "noOfDays").as_deref())?;

    let reply = state.gateway.next_available_slots(&provider_id, days).await?;
    let raw = raw_slots_from_response(&reply).ok_or_else(|| invalid_format("slot list"))?;
    let data = retain_future_dates(state.formatter.group_slots_by_date(&raw), state.now());

    Ok(AvailableDatesRes {
        count: data.len(),
        data,
        provider_id,
        days_requested: days,
    })
}

#[utoipa::path(
    get,
    path = "/doctors/slots",
    params(
        ("provider_id" = String, Query, description = "Provider NPI"),
        ("location_id" = String, Query, description = "Facility location"),
        ("start_date" = String, Query, description = "First date, YYYY-MM-DD"),
        ("end_date" = String, Query, description = "Last date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Future slots in the date range", body = SlotsRes),
        (status = 400, description = "Missing or invalid parameters", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody)
    )
)]
/// Bookable slots for a provider at a location over an inclusive date range.
#[axum::debug_handler]
pub async fn slots(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match fetch_slots(&state, query_object(params)).await {
        Ok(res) => state.envelopes.success(&res),
        Err(failure) => reject(&state, "Slots", failure),
    }
}

async fn fetch_slots(state: &AppState, params: Map<String, Value>) -> Result<SlotsRes, ApiFailure> {
    validate(&params, SLOTS_REQUIRED_PARAMS).into_result("MISSING_PARAMETERS")?;
    let field = |name: &str| field_as_string(&params, name).unwrap_or_default();

    let query = SlotQuery {
        provider_id: field("provider_id"),
        location_id: field("location_id"),
        start_date: parse_query_date("start_date", &field("start_date"))?,
        end_date: parse_query_date("end_date", &field("end_date"))?,
    };
    if query.start_date > query.end_date {
        return Err(BookingError::InvalidInput {
            code: "INVALID_PARAMETERS",
            message: "start_date must not be after end_date".into(),
        }
        .into());
    }

    let reply = state.gateway.provider_slots(&query).await?;
    let raw = raw_slots_from_response(&reply).ok_or_else(|| invalid_format("slot list"))?;
    let data = retain_future_slots(state.formatter.slots(&raw), state.now());

    Ok(SlotsRes {
        count: data.len(),
        data,
        date_range: DateRange {
            start: query.start_date.format("%Y-%m-%d").to_string(),
            end: query.end_date.format("%Y-%m-%d").to_string(),
        },
        provider_id: query.provider_id,
        location_id: query.location_id,
    })
}
