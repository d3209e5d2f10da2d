//! # API Shared
//!
//! HTTP-layer building blocks shared by the booking REST API.
//!
//! Contains:
//! - Response envelopes and the mapping from core errors to HTTP failures
//! - CORS layer built from the booking configuration
//! - Client IP extraction and the rate-limit middleware
//! - `HealthService`
//!
//! Used by `api-rest`; business logic stays in `booking-core`.

pub mod client_ip;
pub mod cors;
pub mod envelope;
pub mod health;
pub mod rate_limit;

pub use client_ip::client_ip;
pub use cors::cors_layer;
pub use envelope::{ApiFailure, Envelopes, ErrorBody};
pub use health::{HealthRes, HealthService};
pub use rate_limit::{rate_limit_middleware, RateLimitGuard};
