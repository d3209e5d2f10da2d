use super::{body_object, reject, relabel};
use crate::schemas::{BookingReq, BookingRes};
use crate::AppState;
use api_shared::{ApiFailure, ErrorBody};
use axum::{body::Bytes, extract::State, response::Response};
use booking_core::requests::{appointment_id, prepare_booking};

#[utoipa::path(
    post,
    path = "/doctors/appointments",
    request_body = BookingReq,
    responses(
        (status = 200, description = "Appointment confirmed", body = BookingRes),
        (status = 400, description = "Missing required fields or invalid duration", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 500, description = "Booking failed", body = ErrorBody)
    )
)]
/// Book an appointment slot in the EHR.
///
/// The payload is validated in full before any EHR call. Vendor failures are reported as
/// `BOOKING_ERROR` with the vendor's status.
#[axum::debug_handler]
pub async fn book_appointment(State(state): State<AppState>, body: Bytes) -> Response {
    match book(&state, &body).await {
        Ok(res) => state.envelopes.success(&res),
        Err(failure) => reject(&state, "Book appointment", failure),
    }
}

async fn book(state: &AppState, body: &Bytes) -> Result<BookingRes, ApiFailure> {
    let payload = body_object(body)?;
    let booking = prepare_booking(&payload)?;

    let reply = state
        .gateway
        .book_appointment(&booking)
        .await
        .map_err(|e| relabel(e, "BOOKING_ERROR", "Failed to book appointment"))?;

    let appointment_id = appointment_id(&reply);
    match appointment_id.as_deref() {
        Some(id) => tracing::info!(appointment_id = id, "appointment booked"),
        None => tracing::warn!("appointment booked but EHR reply carried no appointment id"),
    }

    Ok(BookingRes {
        appointment_id,
        status: "confirmed".into(),
        message: "Appointment booked successfully".into(),
        details: reply,
    })
}
