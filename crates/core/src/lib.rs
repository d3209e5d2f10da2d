//! # Booking Core
//!
//! Core logic for the fibroid-care appointment booking proxy.
//!
//! This crate owns everything between an inbound request and the Harmony EHR:
//! - Startup configuration (credentials, CORS allow-list, facility timezone, limits)
//! - EHR access-token acquisition and caching
//! - Per-IP fixed-window rate limiting
//! - Required-field validation and field normalisation
//! - Booking and patient payload preparation
//! - Authenticated EHR calls with a uniform error taxonomy
//! - Slot grouping and display formatting
//!
//! **No HTTP server concerns**: routing, envelopes, CORS headers and IP extraction belong in
//! `api-shared` and `api-rest`.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod models;
pub mod rate_limit;
pub mod requests;
pub mod slots;
pub mod token;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BookingConfig, Credentials, RateLimitSettings, RuntimeEnvironment};
pub use error::{BookingError, BookingResult};
pub use gateway::{HarmonyGateway, SlotQuery};
pub use models::{Doctor, Patient, VisitReason};
pub use rate_limit::{RateDecision, RateLimiter};
pub use slots::{AppointmentSlot, AvailableDate, RawSlot, SlotFormatter, SlotType};
pub use token::{AccessToken, TokenAcquirer};
pub use validation::ValidationResult;
