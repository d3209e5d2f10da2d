//! Wire models for EHR-owned entities relayed by the proxy.
//!
//! The vendor is loose about field names and types (ids arrive as numbers or strings,
//! lists arrive bare or wrapped). Records are normalised here into stable shapes before
//! they reach clients. Nothing in this module is ever stored.

use crate::constants::LIST_WRAPPER_KEYS;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Return the list inside a vendor response.
///
/// Accepts a bare JSON array, or an object wrapping the array under one of
/// [`LIST_WRAPPER_KEYS`]. Anything else yields `None`.
pub fn extract_list(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => LIST_WRAPPER_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array)),
        _ => None,
    }
}

/// First non-empty value among `keys`, rendered as a string.
pub fn first_string(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// A provider offered for booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Doctor {
    pub provider_id: String,
    pub npi: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub specialty: Option<String>,
    pub location_id: Option<String>,
}

impl Doctor {
    /// Normalise a vendor provider record. Records without any id are skipped.
    pub fn from_record(record: &Value) -> Option<Self> {
        let provider_id = first_string(record, &["provider_id", "providerId", "id", "npi"])?;
        let first_name = first_string(record, &["first_name", "firstName"]).unwrap_or_default();
        let last_name = first_string(record, &["last_name", "lastName"]).unwrap_or_default();
        let display_name = first_string(record, &["display_name", "full_name", "name"])
            .unwrap_or_else(|| format!("Dr. {first_name} {last_name}").trim().to_string());

        Some(Self {
            provider_id,
            npi: first_string(record, &["npi", "NPI"]),
            first_name,
            last_name,
            display_name,
            specialty: first_string(record, &["specialty", "speciality", "specialty_name"]),
            location_id: first_string(record, &["location_id", "locationId"]),
        })
    }
}

/// A patient record as returned by the EHR. The proxy never stores these.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub email_address: String,
    pub phone_number: String,
    pub gender: String,
    pub provider_id: Option<String>,
}

impl Patient {
    pub fn from_record(record: &Value) -> Option<Self> {
        let text = |keys: &[&str]| first_string(record, keys).unwrap_or_default();
        Some(Self {
            patient_id: first_string(record, &["patient_id", "patientId", "id"])?,
            first_name: text(&["first_name", "firstName"]),
            last_name: text(&["last_name", "lastName"]),
            date_of_birth: text(&["date_of_birth", "dob", "dateOfBirth"]),
            email_address: text(&["email_address", "email"]),
            phone_number: text(&["phone_number", "phone"]),
            gender: text(&["gender", "sex"]),
            provider_id: first_string(record, &["provider_id", "providerId"]),
        })
    }
}

/// An EHR-defined reason for a visit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VisitReason {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub duration: Option<String>,
}

impl VisitReason {
    pub fn from_record(record: &Value) -> Option<Self> {
        let id = first_string(record, &["id", "visit_reason_id", "visitReasonId"])?;
        Some(Self {
            name: first_string(record, &["name", "description", "reason"])
                .unwrap_or_else(|| id.clone()),
            code: first_string(record, &["code", "visit_reason_code"]),
            duration: first_string(record, &["duration", "default_duration"]),
            id,
        })
    }
}

/// Normalise every record of a vendor list with `f`, skipping records it rejects.
pub fn normalize_list<T>(items: &[Value], f: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    items.iter().filter_map(f).collect()
}
