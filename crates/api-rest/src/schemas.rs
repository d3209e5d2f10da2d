//! Request and response bodies for the booking endpoints.
//!
//! Request bodies are read as loose JSON objects so that missing fields can be reported
//! together; the request types here describe them for the OpenAPI document. Success bodies
//! are merged into the `{ "success": true, ... }` envelope by
//! [`api_shared::Envelopes::success`].

use booking_core::{AppointmentSlot, AvailableDate, Doctor, Patient, VisitReason};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenData {
    pub access_token: String,
    pub token_type: String,
    /// Seconds the token remains usable.
    pub expires_in: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenRes {
    pub data: AccessTokenData,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DoctorsRes {
    pub data: Vec<Doctor>,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDatesRes {
    pub data: Vec<AvailableDate>,
    pub count: usize,
    pub provider_id: String,
    pub days_requested: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotsRes {
    pub data: Vec<AppointmentSlot>,
    pub count: usize,
    pub provider_id: String,
    pub location_id: String,
    pub date_range: DateRange,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingRes {
    pub appointment_id: Option<String>,
    pub status: String,
    pub message: String,
    /// The EHR's booking reply.
    #[schema(value_type = Object)]
    pub details: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientCreateRes {
    #[schema(value_type = Object)]
    pub data: Value,
    pub patient_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientsRes {
    pub data: Vec<Patient>,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VisitReasonsRes {
    pub data: Vec<VisitReason>,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingReq {
    pub patient_id: String,
    /// ISO 8601 start of the chosen slot.
    pub start_time: String,
    /// Minutes, as a number or numeric string.
    #[schema(value_type = u32)]
    pub duration: Value,
    pub provider_id: String,
    pub visit_reason_id: String,
    pub location_id: String,
    pub schedulable_resource_id: Option<String>,
    pub visit_reason_code: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_member_id: Option<String>,
    pub insurance_group_number: Option<String>,
    pub patient_address: Option<String>,
    pub patient_address_city: Option<String>,
    pub patient_address_state: Option<String>,
    pub patient_address_zip: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientCreateReq {
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD` or `MM/DD/YYYY`.
    pub date_of_birth: String,
    pub email_address: String,
    pub phone_number: String,
    pub gender: String,
    pub provider_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientSearchReq {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
}
