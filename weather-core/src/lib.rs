//! Core library for the weather relay.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over the weather and AI advice providers
//! - Shared domain models (request and response envelopes)
//! - The request handler tying validation and both providers together
//!
//! It has no HTTP server of its own; `weather-server` exposes it over axum.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod relay;

pub use config::Config;
pub use error::{ErrorKind, ProviderError, RelayError};
pub use model::{
    HealthStatus, HourlyReading, RequestEnvelope, ResponseEnvelope, WeatherRequest, WeatherSummary,
};
pub use provider::{AdviceProvider, WeatherProvider};
pub use relay::{ADVICE_UNAVAILABLE, Relay};
