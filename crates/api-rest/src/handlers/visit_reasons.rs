use super::{invalid_format, reject};
use crate::schemas::VisitReasonsRes;
use crate::AppState;
use api_shared::{ApiFailure, ErrorBody};
use axum::{extract::State, response::Response};
use booking_core::{
    models::{extract_list, normalize_list},
    VisitReason,
};

#[utoipa::path(
    get,
    path = "/visit-reasons",
    responses(
        (status = 200, description = "Visit reasons defined in the EHR", body = VisitReasonsRes),
        (status = 400, description = "Unexpected EHR reply", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub async fn list_visit_reasons(State(state): State<AppState>) -> Response {
    match fetch(&state).await {
        Ok(res) => state.envelopes.success(&res),
        Err(failure) => reject(&state, "Visit reasons", failure),
    }
}

async fn fetch(state: &AppState) -> Result<VisitReasonsRes, ApiFailure> {
    let reply = state.gateway.visit_reasons().await?;
    let items = extract_list(&reply).ok_or_else(|| invalid_format("visit reason list"))?;
    let data = normalize_list(items, VisitReason::from_record);
    Ok(VisitReasonsRes {
        count: data.len(),
        data,
    })
}
