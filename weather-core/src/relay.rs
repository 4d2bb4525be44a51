//! Request handling: validation, the weather call, the optional advice call,
//! and assembly of the response envelope.

use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::RelayError,
    model::{HealthStatus, RequestEnvelope, ResponseEnvelope, WeatherRequest, WeatherSummary},
    provider::{
        AdviceProvider, WeatherProvider, advice_provider_from_config, weather_provider_from_config,
    },
};

/// Used in place of advice when no AI key is configured.
pub const ADVICE_UNAVAILABLE: &str = "AI recommendations unavailable (no API key configured).";

/// Check an envelope against the shared secret.
///
/// Order: every field's presence (token, requester_name, location, date),
/// then the types of the echoed fields, then the token, then the date
/// format. The first failure wins.
///
/// The token is present whenever its key was sent; any value other than the
/// exact secret string, `null` included, is a wrong token. For the other
/// fields `null` counts as absent.
pub fn validate(
    envelope: RequestEnvelope,
    security_token: &str,
) -> Result<WeatherRequest, RelayError> {
    let RequestEnvelope {
        token,
        requester_name,
        location,
        date,
    } = envelope;

    let token = token.ok_or(RelayError::MissingField("token"))?;
    let requester_name = present(requester_name, "requester_name")?;
    let location = present(location, "location")?;
    let date = present(date, "date")?;

    let requester_name = string_value(requester_name, "requester_name")?;
    let location = string_value(location, "location")?;
    let date = string_value(date, "date")?;

    let token_ok = match &token {
        Value::String(token) => bool::from(token.as_bytes().ct_eq(security_token.as_bytes())),
        _ => false,
    };
    if !token_ok {
        return Err(RelayError::InvalidToken);
    }

    let date = parse_date(&date).ok_or(RelayError::InvalidDateFormat)?;

    Ok(WeatherRequest {
        requester_name,
        location,
        date,
    })
}

fn present(value: Option<Value>, name: &'static str) -> Result<Value, RelayError> {
    match value {
        None | Some(Value::Null) => Err(RelayError::MissingField(name)),
        Some(value) => Ok(value),
    }
}

fn string_value(value: Value, name: &'static str) -> Result<String, RelayError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(RelayError::InvalidFieldType(name)),
    }
}

/// Strict `YYYY-MM-DD`: zero-padded, hyphen separated, and a real calendar day.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !shape_ok {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// The weather relay. Holds only immutable configuration and provider
/// handles, so one instance serves every request concurrently.
#[derive(Debug, Clone)]
pub struct Relay {
    security_token: String,
    weather: Arc<dyn WeatherProvider>,
    advice: Option<Arc<dyn AdviceProvider>>,
}

impl Relay {
    pub fn new(
        security_token: impl Into<String>,
        weather: Arc<dyn WeatherProvider>,
        advice: Option<Arc<dyn AdviceProvider>>,
    ) -> Self {
        Self {
            security_token: security_token.into(),
            weather,
            advice,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let weather = weather_provider_from_config(config)?;
        let advice = advice_provider_from_config(config);

        if advice.is_none() {
            info!("no AI key configured, outfit advice disabled");
        }

        Ok(Self::new(config.security_token.clone(), weather, advice))
    }

    pub fn advice_enabled(&self) -> bool {
        self.advice.is_some()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus::ok()
    }

    /// Decode and validate a raw request body.
    pub fn validate_body(&self, body: &[u8]) -> Result<WeatherRequest, RelayError> {
        let envelope = RequestEnvelope::from_slice(body)?;
        validate(envelope, &self.security_token)
    }

    /// `POST /weather`
    pub async fn get_weather(&self, body: &[u8]) -> Result<ResponseEnvelope, RelayError> {
        let request = self.checked(body)?;
        let weather = self.fetch_weather(&request).await?;
        Ok(ResponseEnvelope::new(request, weather))
    }

    /// `POST /weather/ai`
    ///
    /// The weather call completes before advice is requested. An advice
    /// failure fails the whole request; no partial envelope is returned.
    pub async fn get_weather_with_advice(
        &self,
        body: &[u8],
    ) -> Result<ResponseEnvelope, RelayError> {
        let request = self.checked(body)?;
        let weather = self.fetch_weather(&request).await?;

        let advice = match &self.advice {
            None => ADVICE_UNAVAILABLE.to_string(),
            Some(provider) => provider
                .recommend(&weather, &request.location, request.date)
                .await
                .map_err(|e| {
                    warn!(location = %request.location, date = %request.date, error = %e, "advice provider failed");
                    RelayError::AdviceUnavailable(e)
                })?,
        };

        Ok(ResponseEnvelope::new(request, weather).with_recommendation(advice))
    }

    fn checked(&self, body: &[u8]) -> Result<WeatherRequest, RelayError> {
        self.validate_body(body).inspect_err(|e| {
            debug!(error = %e, "rejected weather request");
        })
    }

    async fn fetch_weather(
        &self,
        request: &WeatherRequest,
    ) -> Result<WeatherSummary, RelayError> {
        self.weather
            .fetch_day(&request.location, request.date)
            .await
            .map_err(|e| {
                warn!(location = %request.location, date = %request.date, error = %e, "weather provider failed");
                RelayError::WeatherUnavailable(e)
            })
    }
}
