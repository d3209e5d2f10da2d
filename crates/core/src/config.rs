//! Booking runtime configuration.
//!
//! This module defines configuration that is resolved once at process startup and then
//! passed into the token acquirer, gateway and HTTP layer. Request handling never reads
//! process-wide environment variables, which keeps behaviour consistent across threads and
//! lets tests build configurations side by side.

use crate::constants::{
    DEFAULT_FACILITY_TIMEZONE, DEFAULT_RATE_LIMIT_MAX_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SPECIALTY_CODE, DEFAULT_TOKEN_PATH,
};
use crate::{BookingError, BookingResult};
use chrono_tz::Tz;
use std::time::Duration;

/// Client credentials for the EHR vendor.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

impl Credentials {
    /// Build credentials, trimming a trailing `/` from the base URL.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self {
            client_id: client_id.into().trim().to_string(),
            client_secret: client_secret.into().trim().to_string(),
            base_url,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Whether the process runs with production information hiding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(self) -> bool {
        self == RuntimeEnvironment::Production
    }
}

/// Fixed-window rate-limit settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

/// Booking configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct BookingConfig {
    credentials: Option<Credentials>,
    token_path: String,
    specialty_code: String,
    request_timeout: Duration,
    allowed_origins: Vec<String>,
    environment: RuntimeEnvironment,
    facility_timezone: Tz,
    rate_limit: RateLimitSettings,
}

impl BookingConfig {
    /// Create a development configuration with default settings.
    ///
    /// `credentials` may be `None`; EHR-backed endpoints then answer with a configuration
    /// error while the rest of the service keeps working.
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            credentials,
            token_path: DEFAULT_TOKEN_PATH.into(),
            specialty_code: DEFAULT_SPECIALTY_CODE.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            allowed_origins: Vec::new(),
            environment: RuntimeEnvironment::Development,
            facility_timezone: chrono_tz::America::New_York,
            rate_limit: RateLimitSettings::default(),
        }
    }

    /// Resolve configuration from a key lookup (normally the process environment).
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Config` if a numeric setting does not parse, the timezone is
    /// unknown, or the rate-limit settings are zero.
    pub fn from_lookup<F>(lookup: F) -> BookingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let credentials = match (
            value("HARMONY_CLIENT_ID"),
            value("HARMONY_CLIENT_KEY"),
            value("HARMONY_BASE_URL"),
        ) {
            (Some(id), Some(secret), Some(base_url)) => Some(Credentials::new(id, secret, base_url)),
            _ => None,
        };

        let environment = environment_from_value(value("APP_ENV").or_else(|| value("NODE_ENV")));
        let facility_timezone = timezone_from_value(value("FACILITY_TIMEZONE"))?;
        let request_timeout = Duration::from_secs(parse_number(
            "HARMONY_TIMEOUT_SECS",
            value("HARMONY_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let max_requests = parse_number(
            "RATE_LIMIT_MAX_REQUESTS",
            value("RATE_LIMIT_MAX_REQUESTS"),
            DEFAULT_RATE_LIMIT_MAX_REQUESTS,
        )?;
        let window_secs = parse_number(
            "RATE_LIMIT_WINDOW_SECS",
            value("RATE_LIMIT_WINDOW_SECS"),
            DEFAULT_RATE_LIMIT_WINDOW_SECS,
        )?;
        if max_requests == 0 || window_secs == 0 {
            return Err(BookingError::Config(
                "rate limit settings must be greater than zero".into(),
            ));
        }

        let mut token_path = value("HARMONY_TOKEN_PATH").unwrap_or_else(|| DEFAULT_TOKEN_PATH.into());
        if !token_path.starts_with('/') {
            token_path.insert(0, '/');
        }

        Ok(Self {
            credentials,
            token_path,
            specialty_code: value("HARMONY_SPECIALTY_CODE")
                .unwrap_or_else(|| DEFAULT_SPECIALTY_CODE.into()),
            request_timeout,
            allowed_origins: origins_from_value(value("ALLOWED_ORIGINS")),
            environment,
            facility_timezone,
            rate_limit: RateLimitSettings {
                max_requests,
                window: Duration::from_secs(window_secs),
            },
        })
    }

    /// Resolve configuration from the process environment.
    pub fn from_env() -> BookingResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn with_environment(mut self, environment: RuntimeEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitSettings) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_facility_timezone(mut self, tz: Tz) -> Self {
        self.facility_timezone = tz;
        self
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn token_path(&self) -> &str {
        &self.token_path
    }

    pub fn specialty_code(&self) -> &str {
        &self.specialty_code
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    pub fn environment(&self) -> RuntimeEnvironment {
        self.environment
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    pub fn facility_timezone(&self) -> Tz {
        self.facility_timezone
    }

    pub fn rate_limit(&self) -> RateLimitSettings {
        self.rate_limit
    }
}

/// Parse the runtime environment; anything other than `production` is development.
pub fn environment_from_value(value: Option<String>) -> RuntimeEnvironment {
    match value.as_deref().map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("production") || v.eq_ignore_ascii_case("prod") => {
            RuntimeEnvironment::Production
        }
        _ => RuntimeEnvironment::Development,
    }
}

/// Parse an IANA timezone name, falling back to the default facility timezone.
pub fn timezone_from_value(value: Option<String>) -> BookingResult<Tz> {
    let name = value.unwrap_or_else(|| DEFAULT_FACILITY_TIMEZONE.into());
    name.parse::<Tz>()
        .map_err(|_| BookingError::Config(format!("unknown FACILITY_TIMEZONE: {name}")))
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
pub fn origins_from_value(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn parse_number<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> BookingResult<T> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse::<T>()
            .map_err(|_| BookingError::Config(format!("{key} must be a non-negative integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let cfg = BookingConfig::from_lookup(lookup(&[])).unwrap();
        assert!(cfg.credentials().is_none());
        assert_eq!(cfg.token_path(), "/oauth2/token");
        assert_eq!(cfg.rate_limit().max_requests, 10);
        assert_eq!(cfg.rate_limit().window, Duration::from_secs(60));
        assert_eq!(cfg.facility_timezone(), chrono_tz::America::New_York);
        assert!(!cfg.is_production());
    }

    #[test]
    fn test_credentials_require_all_three_values() {
        let cfg = BookingConfig::from_lookup(lookup(&[
            ("HARMONY_CLIENT_ID", "id"),
            ("HARMONY_CLIENT_KEY", "  "),
            ("HARMONY_BASE_URL", "https://ehr.example.com"),
        ]))
        .unwrap();
        assert!(cfg.credentials().is_none());
    }

    #[test]
    fn test_credentials_strip_trailing_slash() {
        let cfg = BookingConfig::from_lookup(lookup(&[
            ("HARMONY_CLIENT_ID", "id"),
            ("HARMONY_CLIENT_KEY", "secret"),
            ("HARMONY_BASE_URL", "https://ehr.example.com/api/"),
        ]))
        .unwrap();
        let creds = cfg.credentials().unwrap();
        assert_eq!(creds.base_url, "https://ehr.example.com/api");
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn test_production_flag_from_node_env_fallback() {
        let cfg = BookingConfig::from_lookup(lookup(&[("NODE_ENV", "production")])).unwrap();
        assert!(cfg.is_production());

        let cfg = BookingConfig::from_lookup(lookup(&[
            ("APP_ENV", "staging"),
            ("NODE_ENV", "production"),
        ]))
        .unwrap();
        assert!(!cfg.is_production());
    }

    #[test]
    fn test_allowed_origins_are_split() {
        let cfg = BookingConfig::from_lookup(lookup(&[(
            "ALLOWED_ORIGINS",
            "https://a.example.com/, ,https://b.example.com",
        )]))
        .unwrap();
        assert_eq!(
            cfg.allowed_origins(),
            &["https://a.example.com".to_string(), "https://b.example.com".to_string()]
        );
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let err = BookingConfig::from_lookup(lookup(&[("FACILITY_TIMEZONE", "Mars/Olympus")]))
            .unwrap_err();
        assert!(matches!(err, BookingError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_rate_limit() {
        let err = BookingConfig::from_lookup(lookup(&[("RATE_LIMIT_MAX_REQUESTS", "0")]))
            .unwrap_err();
        assert!(matches!(err, BookingError::Config(_)));
    }

    #[test]
    fn test_rejects_non_numeric_timeout() {
        let err = BookingConfig::from_lookup(lookup(&[("HARMONY_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, BookingError::Config(_)));
    }

    #[test]
    fn test_token_path_gets_leading_slash() {
        let cfg = BookingConfig::from_lookup(lookup(&[("HARMONY_TOKEN_PATH", "auth/token")]))
            .unwrap();
        assert_eq!(cfg.token_path(), "/auth/token");
    }
}
