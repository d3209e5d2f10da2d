//! Input validation utilities.
//!
//! Every endpoint declares a fixed set of required fields. [`validate`] checks a parsed
//! JSON object (request body or query string) against that set before any EHR call is made.
//! The remaining helpers normalise individual fields the vendor is strict about.

use crate::constants::{DEFAULT_AVAILABILITY_DAYS, MAX_AVAILABILITY_DAYS};
use crate::{BookingError, BookingResult};
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Required fields for `POST /doctors/appointments`.
pub const BOOKING_REQUIRED_FIELDS: &[&str] = &[
    "patient_id",
    "start_time",
    "duration",
    "provider_id",
    "visit_reason_id",
    "location_id",
];

/// Required fields for `POST /patients`.
pub const PATIENT_CREATE_REQUIRED_FIELDS: &[&str] = &[
    "first_name",
    "last_name",
    "date_of_birth",
    "email_address",
    "phone_number",
    "gender",
];

/// Required fields for `POST /patients/search`.
pub const PATIENT_SEARCH_REQUIRED_FIELDS: &[&str] =
    &["first_name", "last_name", "date_of_birth", "gender"];

/// Required query parameters for `GET /doctors/available-dates`.
pub const AVAILABLE_DATES_REQUIRED_PARAMS: &[&str] = &["provider_id"];

/// Required query parameters for `GET /doctors/slots`.
pub const SLOTS_REQUIRED_PARAMS: &[&str] = &["provider_id", "location_id", "start_date", "end_date"];

/// Result of checking a payload against a required-field set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub missing_fields: Vec<String>,
}

impl ValidationResult {
    pub fn ok(&self) -> bool {
        self.missing_fields.is_empty()
    }

    /// Missing field names joined for display.
    pub fn display_missing(&self) -> String {
        self.missing_fields.join(", ")
    }

    /// Convert into a `Result`, tagging failures with the endpoint's error code.
    pub fn into_result(self, code: &'static str) -> BookingResult<()> {
        if self.ok() {
            Ok(())
        } else {
            Err(BookingError::Validation {
                code,
                missing: self.missing_fields,
            })
        }
    }
}

/// Check `payload` for every field in `required`.
///
/// A field is missing when it is absent, `null`, or a string that is empty after trimming.
/// Missing names are reported in the order `required` lists them.
pub fn validate(payload: &Map<String, Value>, required: &[&str]) -> ValidationResult {
    let missing_fields = required
        .iter()
        .filter(|field| is_missing(payload.get(**field)))
        .map(|field| field.to_string())
        .collect();
    ValidationResult { missing_fields }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Read a field as a trimmed string; numbers are rendered, other types yield `None`.
pub fn field_as_string(payload: &Map<String, Value>, field: &str) -> Option<String> {
    match payload.get(field)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse an appointment duration in minutes from a number or numeric string.
pub fn parse_duration_minutes(value: &Value) -> BookingResult<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    match parsed {
        Some(minutes) if minutes > 0 => Ok(minutes),
        _ => Err(BookingError::InvalidInput {
            code: "INVALID_DURATION",
            message: "duration must be a positive number of minutes".into(),
        }),
    }
}

/// Normalise a date of birth to `YYYY-MM-DD`, accepting `YYYY-MM-DD` or `MM/DD/YYYY`.
pub fn normalize_date_of_birth(value: &str) -> BookingResult<String> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| BookingError::InvalidInput {
            code: "VALIDATION_ERROR",
            message: "date_of_birth must be YYYY-MM-DD or MM/DD/YYYY".into(),
        })
}

/// Minimal shape check for an email address.
pub fn validate_email(value: &str) -> BookingResult<()> {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(BookingError::InvalidInput {
            code: "VALIDATION_ERROR",
            message: "email_address is not a valid email address".into(),
        })
    }
}

/// Parse a `YYYY-MM-DD` query parameter.
pub fn parse_query_date(field: &str, value: &str) -> BookingResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| BookingError::InvalidInput {
        code: "INVALID_PARAMETERS",
        message: format!("{field} must be a date in YYYY-MM-DD format"),
    })
}

/// Parse the `noOfDays` availability window.
///
/// Absent or blank means the default window; numeric values are clamped to
/// `1..=MAX_AVAILABILITY_DAYS`.
pub fn parse_days_requested(value: Option<&str>) -> BookingResult<u32> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(DEFAULT_AVAILABILITY_DAYS);
    };
    value
        .parse::<i64>()
        .map(|days| days.clamp(1, i64::from(MAX_AVAILABILITY_DAYS)) as u32)
        .map_err(|_| BookingError::InvalidInput {
            code: "INVALID_PARAMETERS",
            message: "noOfDays must be a whole number of days".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_absent_null_and_empty_are_missing() {
        let payload = object(json!({
            "patient_id": "p1",
            "start_time": null,
            "duration": 30,
            "visit_reason_id": "  ",
            "location_id": "L1"
        }));
        let result = validate(&payload, BOOKING_REQUIRED_FIELDS);
        assert!(!result.ok());
        assert_eq!(
            result.missing_fields,
            vec!["start_time", "provider_id", "visit_reason_id"]
        );
        assert_eq!(result.display_missing(), "start_time, provider_id, visit_reason_id");
    }

    #[test]
    fn test_zero_and_false_are_present() {
        let payload = object(json!({"a": 0, "b": false}));
        assert!(validate(&payload, &["a", "b"]).ok());
    }

    #[test]
    fn test_into_result_carries_code() {
        let payload = object(json!({}));
        let err = validate(&payload, PATIENT_SEARCH_REQUIRED_FIELDS)
            .into_result("VALIDATION_ERROR")
            .unwrap_err();
        match err {
            BookingError::Validation { code, missing } => {
                assert_eq!(code, "VALIDATION_ERROR");
                assert_eq!(missing.len(), 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration_minutes(&json!(30)).unwrap(), 30);
        assert_eq!(parse_duration_minutes(&json!(" 45 ")).unwrap(), 45);
        assert!(parse_duration_minutes(&json!(0)).is_err());
        assert!(parse_duration_minutes(&json!(-5)).is_err());
        assert!(parse_duration_minutes(&json!("half an hour")).is_err());
    }

    #[test]
    fn test_date_of_birth_normalisation() {
        assert_eq!(normalize_date_of_birth("1984-03-07").unwrap(), "1984-03-07");
        assert_eq!(normalize_date_of_birth("03/07/1984").unwrap(), "1984-03-07");
        assert!(normalize_date_of_birth("7 March 1984").is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("jane@example.org").is_ok());
        assert!(validate_email("jane.example.org").is_err());
        assert!(validate_email("@example.org").is_err());
        assert!(validate_email("jane@localhost").is_err());
    }

    #[test]
    fn test_field_as_string_renders_numbers() {
        let payload = object(json!({"provider_id": 1234567890, "notes": ""}));
        assert_eq!(field_as_string(&payload, "provider_id").as_deref(), Some("1234567890"));
        assert_eq!(field_as_string(&payload, "notes"), None);
    }

    #[test]
    fn test_days_requested_default_and_clamp() {
        assert_eq!(parse_days_requested(None).unwrap(), 30);
        assert_eq!(parse_days_requested(Some(" ")).unwrap(), 30);
        assert_eq!(parse_days_requested(Some("14")).unwrap(), 14);
        assert_eq!(parse_days_requested(Some("0")).unwrap(), 1);
        assert_eq!(parse_days_requested(Some("365")).unwrap(), 90);
        assert!(matches!(
            parse_days_requested(Some("soon")),
            Err(BookingError::InvalidInput { code: "INVALID_PARAMETERS", .. })
        ));
    }
}
