//! Constants used throughout the booking core crate.
//!
//! EHR sub-resource paths, defaults for configuration values and the fixed
//! limits of the booking pipeline live here so that every component agrees on them.

/// Token endpoint path, relative to the EHR base URL, used when none is configured.
pub const DEFAULT_TOKEN_PATH: &str = "/oauth2/token";

/// Safety buffer subtracted from the vendor's `expires_in` before caching a token.
pub const TOKEN_EXPIRY_BUFFER_SECS: i64 = 300;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Per-call timeout for outbound EHR requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Requests allowed per client IP inside one rate-limit window.
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 10;

/// Length of one rate-limit window.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Facility timezone used for grouping and displaying appointment slots.
pub const DEFAULT_FACILITY_TIMEZONE: &str = "America/New_York";

/// Provider specialty code (NUCC taxonomy: obstetrics & gynecology) listed by `/doctors`.
pub const DEFAULT_SPECIALTY_CODE: &str = "207V00000X";

/// Visit reason code sent with a booking when the caller does not supply one.
pub const DEFAULT_VISIT_REASON_CODE: &str = "NEW_PATIENT";

/// Days of availability requested when `noOfDays` is absent.
pub const DEFAULT_AVAILABILITY_DAYS: u32 = 30;

/// Upper bound for `noOfDays`.
pub const MAX_AVAILABILITY_DAYS: u32 = 90;

/// Slot length assumed when the vendor omits both `end_time` and `duration`.
pub const DEFAULT_SLOT_MINUTES: i64 = 30;

/// Bucket key for requests whose client IP cannot be attributed.
pub const UNKNOWN_CLIENT_IP: &str = "unknown";

/// EHR sub-resource: next available slots for one provider.
pub const NEXT_AVAILABLE_SLOTS_PATH: &str = "/nextAvailable_slots/by_provider";

/// EHR sub-resource: slots for a provider, location and date range.
pub const AVAILABLE_SLOTS_PATH: &str = "/available_slots/by_provider";

/// EHR sub-resource: appointment booking.
pub const APPOINTMENTS_PATH: &str = "/appointments";

/// EHR sub-resource: patient search.
pub const PATIENT_SEARCH_PATH: &str = "/patients/search";

/// EHR sub-resource: patient creation.
pub const PATIENTS_PATH: &str = "/patients";

/// EHR sub-resource: visit reasons.
pub const VISIT_REASONS_PATH: &str = "/visit_reasons";

/// EHR sub-resource prefix: providers by specialty code.
pub const PROVIDER_SPECIALTY_PATH: &str = "/FetchProviderSpeciality";

/// Keys under which the vendor may wrap a list response.
pub const LIST_WRAPPER_KEYS: &[&str] = &[
    "data",
    "results",
    "slots",
    "patients",
    "providers",
    "visit_reasons",
];
