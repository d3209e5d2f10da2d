//! Patient create and search, relayed to the EHR.

use super::{body_object, invalid_format, reject};
use crate::schemas::{PatientCreateReq, PatientCreateRes, PatientSearchReq, PatientsRes};
use crate::AppState;
use api_shared::{ApiFailure, ErrorBody};
use axum::{body::Bytes, extract::State, response::Response};
use booking_core::{
    models::{extract_list, normalize_list},
    requests::{created_patient_id, prepare_patient_create, prepare_patient_search},
    BookingError, Patient,
};

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientCreateReq,
    responses(
        (status = 200, description = "Patient created in the EHR", body = PatientCreateRes),
        (status = 400, description = "Validation error or unexpected EHR reply", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub async fn create_patient(State(state): State<AppState>, body: Bytes) -> Response {
    match create(&state, &body).await {
        Ok(res) => state.envelopes.success(&res),
        Err(failure) => reject(&state, "Create patient", failure),
    }
}

async fn create(state: &AppState, body: &Bytes) -> Result<PatientCreateRes, ApiFailure> {
    let payload = body_object(body)?;
    let patient = prepare_patient_create(&payload)?;

    let reply = state.gateway.create_patient(&patient).await?;
    let patient_id = created_patient_id(&reply).ok_or_else(|| BookingError::InvalidResponse {
        code: "INVALID_RESPONSE",
        message: "patient_id missing from EHR response".into(),
    })?;
    tracing::info!(patient_id = %patient_id, "patient created");

    Ok(PatientCreateRes {
        data: reply,
        patient_id,
    })
}

#[utoipa::path(
    post,
    path = "/patients/search",
    request_body = PatientSearchReq,
    responses(
        (status = 200, description = "Matching patients", body = PatientsRes),
        (status = 400, description = "Validation error or unexpected EHR reply", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub async fn search_patients(State(state): State<AppState>, body: Bytes) -> Response {
    match search(&state, &body).await {
        Ok(res) => state.envelopes.success(&res),
        Err(failure) => reject(&state, "Search patients", failure),
    }
}

async fn search(state: &AppState, body: &Bytes) -> Result<PatientsRes, ApiFailure> {
    let payload = body_object(body)?;
    let criteria = prepare_patient_search(&payload)?;

    let reply = state.gateway.search_patients(&criteria).await?;
    let items = extract_list(&reply).ok_or_else(|| invalid_format("patient list"))?;
    let data = normalize_list(items, Patient::from_record);

    Ok(PatientsRes {
        count: data.len(),
        data,
    })
}
