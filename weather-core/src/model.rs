use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

/// Inbound request body, as sent by a client.
///
/// Values are kept raw: presence, type and content checks belong to
/// [`crate::relay::validate`], which reports them in a fixed order. A key
/// that was sent with `null` is kept as `Some(Value::Null)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestEnvelope {
    pub token: Option<Value>,
    pub requester_name: Option<Value>,
    pub location: Option<Value>,
    pub date: Option<Value>,
}

impl RequestEnvelope {
    /// Decode a raw request body. The body must be a non-empty JSON object.
    pub fn from_slice(body: &[u8]) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| RelayError::InvalidJson)?;

        let mut object = match value {
            Value::Object(map) if !map.is_empty() => map,
            _ => return Err(RelayError::InvalidJson),
        };

        Ok(Self {
            token: object.remove("token"),
            requester_name: object.remove("requester_name"),
            location: object.remove("location"),
            date: object.remove("date"),
        })
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherRequest {
    pub requester_name: String,
    pub location: String,
    pub date: NaiveDate,
}

/// Day-level weather aggregate. Every field is whatever the provider sent;
/// missing values serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub temp_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub temp_min_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub wind_kph: Option<f64>,
    pub wind_gust_kph: Option<f64>,
    pub pressure_mb: Option<f64>,
    pub humidity: Option<f64>,
    pub precip_mm: Option<f64>,
    pub precip_prob: Option<f64>,
    pub snow_cm: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub visibility_km: Option<f64>,
    pub uv_index: Option<f64>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub conditions: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub hourly: Vec<HourlyReading>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyReading {
    pub time: Option<String>,
    pub temp_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub wind_kph: Option<f64>,
    pub humidity: Option<f64>,
    pub conditions: Option<String>,
}

/// Outbound body for both weather endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub requester_name: String,
    #[serde(with = "utc_seconds")]
    pub timestamp: DateTime<Utc>,
    pub location: String,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    pub weather: WeatherSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfit_recommendation: Option<String>,
}

impl ResponseEnvelope {
    pub fn new(request: WeatherRequest, weather: WeatherSummary) -> Self {
        Self {
            requester_name: request.requester_name,
            timestamp: Utc::now(),
            location: request.location,
            date: request.date,
            weather,
            outfit_recommendation: None,
        }
    }

    pub fn with_recommendation(mut self, advice: String) -> Self {
        self.outfit_recommendation = Some(advice);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(with = "utc_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ`, always UTC, no fractional seconds.
pub mod utc_seconds {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(D::Error::custom)
    }
}

/// Calendar dates as `YYYY-MM-DD`.
pub mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(D::Error::custom)
    }
}
