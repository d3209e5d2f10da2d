//! Preparation of inbound booking and patient payloads for the EHR.
//!
//! Each `prepare_*` function runs the endpoint's required-field check first, so a
//! rejected payload never reaches the gateway, then normalises the fields the vendor is
//! strict about. The reply helpers pull identifiers out of the vendor's loosely shaped
//! responses.

use crate::constants::DEFAULT_VISIT_REASON_CODE;
use crate::models::first_string;
use crate::validation::{
    field_as_string, normalize_date_of_birth, parse_duration_minutes, validate, validate_email,
    BOOKING_REQUIRED_FIELDS, PATIENT_CREATE_REQUIRED_FIELDS, PATIENT_SEARCH_REQUIRED_FIELDS,
};
use crate::BookingResult;
use serde_json::{Map, Value};

/// Optional booking fields forwarded as empty strings when the caller leaves them out.
pub const BOOKING_OPTIONAL_FIELDS: &[&str] = &[
    "insurance_provider",
    "insurance_member_id",
    "insurance_group_number",
    "patient_address",
    "patient_address_city",
    "patient_address_state",
    "patient_address_zip",
    "notes",
];

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn set_default(payload: &mut Map<String, Value>, field: &str, default: Value) {
    if is_blank(payload.get(field)) {
        payload.insert(field.to_string(), default);
    }
}

/// Validate a booking request and build the body sent to `POST /appointments`.
///
/// `duration` is normalised to whole minutes. `schedulable_resource_id` falls back to the
/// provider, `visit_reason_code` to the new-patient code, and the remaining optional
/// fields to `""`.
pub fn prepare_booking(payload: &Map<String, Value>) -> BookingResult<Value> {
    validate(payload, BOOKING_REQUIRED_FIELDS).into_result("MISSING_REQUIRED_FIELDS")?;

    let mut body = payload.clone();
    let minutes = parse_duration_minutes(payload.get("duration").unwrap_or(&Value::Null))?;
    body.insert("duration".into(), Value::from(minutes));

    let provider = payload.get("provider_id").cloned().unwrap_or(Value::Null);
    set_default(&mut body, "schedulable_resource_id", provider);
    set_default(
        &mut body,
        "visit_reason_code",
        Value::String(DEFAULT_VISIT_REASON_CODE.into()),
    );
    for field in BOOKING_OPTIONAL_FIELDS {
        set_default(&mut body, field, Value::String(String::new()));
    }

    Ok(Value::Object(body))
}

/// Appointment id from a booking reply: `id`, `appointment_id` or `data.id`.
pub fn appointment_id(reply: &Value) -> Option<String> {
    first_string(reply, &["id", "appointment_id"])
        .or_else(|| reply.get("data").and_then(|d| first_string(d, &["id", "appointment_id"])))
}

/// Validate a patient-create request and build the body sent to `POST /patients`.
pub fn prepare_patient_create(payload: &Map<String, Value>) -> BookingResult<Value> {
    validate(payload, PATIENT_CREATE_REQUIRED_FIELDS).into_result("VALIDATION_ERROR")?;

    let mut body = payload.clone();
    for field in PATIENT_CREATE_REQUIRED_FIELDS {
        if let Some(value) = field_as_string(payload, field) {
            body.insert((*field).to_string(), Value::String(value));
        }
    }

    let dob = field_as_string(payload, "date_of_birth").unwrap_or_default();
    body.insert(
        "date_of_birth".into(),
        Value::String(normalize_date_of_birth(&dob)?),
    );
    let email = field_as_string(payload, "email_address").unwrap_or_default();
    validate_email(&email)?;

    Ok(Value::Object(body))
}

/// Patient id assigned by the EHR: `patient_id`, `id`, or either under `data`.
pub fn created_patient_id(reply: &Value) -> Option<String> {
    const KEYS: &[&str] = &["patient_id", "id"];
    first_string(reply, KEYS).or_else(|| reply.get("data").and_then(|d| first_string(d, KEYS)))
}

/// Validate a patient-search request and build the body sent to `POST /patients/search`.
pub fn prepare_patient_search(payload: &Map<String, Value>) -> BookingResult<Value> {
    validate(payload, PATIENT_SEARCH_REQUIRED_FIELDS).into_result("VALIDATION_ERROR")?;

    let mut body = Map::new();
    for field in PATIENT_SEARCH_REQUIRED_FIELDS {
        if let Some(value) = field_as_string(payload, field) {
            body.insert((*field).to_string(), Value::String(value));
        }
    }
    let dob = field_as_string(payload, "date_of_birth").unwrap_or_default();
    body.insert(
        "date_of_birth".into(),
        Value::String(normalize_date_of_birth(&dob)?),
    );

    Ok(Value::Object(body))
}
