use api_shared::{Envelopes, RateLimitGuard};
use booking_core::{
    BookingConfig, BookingResult, Clock, HarmonyGateway, RateLimiter, SlotFormatter,
};
use std::sync::Arc;

/// Application state for the REST API server
///
/// Everything a handler needs is owned here and injected through axum's `State`; the token
/// cache lives inside the gateway and the rate-limit map inside the limiter.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BookingConfig>,
    pub gateway: Arc<HarmonyGateway>,
    pub limiter: Arc<RateLimiter>,
    pub envelopes: Envelopes,
    pub formatter: SlotFormatter,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Build the shared state from a resolved configuration.
    ///
    /// Missing EHR credentials are not an error here; the affected endpoints answer
    /// `CONFIG_ERROR` instead.
    pub fn new(config: BookingConfig, clock: Arc<dyn Clock>) -> BookingResult<Self> {
        let gateway = HarmonyGateway::new(&config, clock.clone())?;
        let limiter = RateLimiter::new(config.rate_limit(), clock.clone());
        Ok(Self {
            envelopes: Envelopes::new(config.environment()),
            formatter: SlotFormatter::new(config.facility_timezone()),
            gateway: Arc::new(gateway),
            limiter: Arc::new(limiter),
            config: Arc::new(config),
            clock,
        })
    }

    pub fn rate_limit_guard(&self) -> RateLimitGuard {
        RateLimitGuard::new(self.limiter.clone(), self.envelopes)
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(self.clock.now_ms()).unwrap_or_default()
    }
}
