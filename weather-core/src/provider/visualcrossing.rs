use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::ProviderError,
    model::{HourlyReading, WeatherSummary},
    provider::truncate_body,
};

use super::WeatherProvider;

/// Visual Crossing Timeline API, one day at a time, metric units.
#[derive(Debug, Clone)]
pub struct VisualCrossingProvider {
    api_key: String,
    base_url: Url,
    timeout: Duration,
    http: Client,
}

impl VisualCrossingProvider {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid Visual Crossing base URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Visual Crossing base URL cannot carry a path: {base_url}"));
        }

        Ok(Self {
            api_key,
            base_url,
            timeout,
            http: Client::new(),
        })
    }

    /// `{base}/VisualCrossingWebServices/rest/services/timeline/{location}/{date}/{date}`
    fn timeline_url(&self, location: &str, date: NaiveDate) -> Url {
        let date = date.format("%Y-%m-%d").to_string();
        let mut url = self.base_url.clone();

        // cannot_be_a_base was ruled out in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "VisualCrossingWebServices",
                "rest",
                "services",
                "timeline",
                location,
                date.as_str(),
                date.as_str(),
            ]);
        }

        url
    }
}

#[derive(Debug, Deserialize)]
struct VcTimeline {
    #[serde(default)]
    days: Vec<VcDay>,
}

#[derive(Debug, Deserialize)]
struct VcDay {
    temp: Option<f64>,
    tempmax: Option<f64>,
    tempmin: Option<f64>,
    feelslike: Option<f64>,
    windspeed: Option<f64>,
    windgust: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<f64>,
    precip: Option<f64>,
    precipprob: Option<f64>,
    snow: Option<f64>,
    cloudcover: Option<f64>,
    visibility: Option<f64>,
    uvindex: Option<f64>,
    sunrise: Option<String>,
    sunset: Option<String>,
    conditions: Option<String>,
    description: Option<String>,
    hours: Option<Vec<VcHour>>,
}

#[derive(Debug, Deserialize)]
struct VcHour {
    datetime: Option<String>,
    temp: Option<f64>,
    feelslike: Option<f64>,
    windspeed: Option<f64>,
    humidity: Option<f64>,
    conditions: Option<String>,
}

impl From<VcHour> for HourlyReading {
    fn from(h: VcHour) -> Self {
        Self {
            time: h.datetime,
            temp_c: h.temp,
            feels_like_c: h.feelslike,
            wind_kph: h.windspeed,
            humidity: h.humidity,
            conditions: h.conditions,
        }
    }
}

impl From<VcDay> for WeatherSummary {
    fn from(d: VcDay) -> Self {
        Self {
            temp_c: d.temp,
            temp_max_c: d.tempmax,
            temp_min_c: d.tempmin,
            feels_like_c: d.feelslike,
            wind_kph: d.windspeed,
            wind_gust_kph: d.windgust,
            pressure_mb: d.pressure,
            humidity: d.humidity,
            precip_mm: d.precip,
            precip_prob: d.precipprob,
            snow_cm: d.snow,
            cloud_cover: d.cloudcover,
            visibility_km: d.visibility,
            uv_index: d.uvindex,
            sunrise: d.sunrise,
            sunset: d.sunset,
            conditions: d.conditions,
            description: d.description,
            hourly: d
                .hours
                .unwrap_or_default()
                .into_iter()
                .map(HourlyReading::from)
                .collect(),
        }
    }
}

#[async_trait]
impl WeatherProvider for VisualCrossingProvider {
    async fn fetch_day(
        &self,
        location: &str,
        date: NaiveDate,
    ) -> Result<WeatherSummary, ProviderError> {
        let url = self.timeline_url(location, date);
        debug!(%location, %date, "requesting Visual Crossing timeline");

        let res = self
            .http
            .get(url)
            .query(&[
                ("unitGroup", "metric"),
                ("key", self.api_key.as_str()),
                ("contentType", "json"),
                ("include", "hours,days"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: VcTimeline = serde_json::from_str(&body)
            .map_err(|e| ProviderError::decode(format!("Visual Crossing JSON: {e}")))?;

        let day = parsed
            .days
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::decode("Visual Crossing response contained no days"))?;

        Ok(day.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMELINE: &str = "/VisualCrossingWebServices/rest/services/timeline";

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn provider(server: &MockServer) -> VisualCrossingProvider {
        VisualCrossingProvider::new("VC_KEY".into(), &server.uri(), Duration::from_millis(500))
            .unwrap()
    }

    fn sample_day() -> serde_json::Value {
        json!({
            "queryCost": 1,
            "resolvedAddress": "Paris, France",
            "days": [{
                "datetime": "2024-06-01",
                "temp": 18.4,
                "tempmax": 22.1,
                "tempmin": 13.0,
                "feelslike": 18.0,
                "humidity": 71.2,
                "precip": 0.4,
                "precipprob": 35,
                "snow": 0,
                "windgust": 31.7,
                "windspeed": 14.8,
                "pressure": 1013.2,
                "cloudcover": 62.5,
                "visibility": 22.4,
                "uvindex": 6,
                "sunrise": "05:48:01",
                "sunset": "21:49:12",
                "conditions": "Rain, Partially cloudy",
                "description": "Partly cloudy throughout the day with a chance of rain.",
                "hours": [
                    {"datetime": "00:00:00", "temp": 14.1, "feelslike": 14.1, "windspeed": 8.3, "humidity": 88.0, "conditions": "Overcast"},
                    {"datetime": "01:00:00", "temp": 13.6, "conditions": "Clear"}
                ]
            }]
        })
    }

    #[tokio::test]
    async fn maps_first_day_and_hours() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{TIMELINE}/Paris/2024-06-01/2024-06-01")))
            .and(query_param("unitGroup", "metric"))
            .and(query_param("key", "VC_KEY"))
            .and(query_param("contentType", "json"))
            .and(query_param("include", "hours,days"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_day()))
            .expect(1)
            .mount(&server)
            .await;

        let summary = provider(&server).fetch_day("Paris", june_first()).await.unwrap();

        assert_eq!(summary.temp_c, Some(18.4));
        assert_eq!(summary.temp_max_c, Some(22.1));
        assert_eq!(summary.precip_prob, Some(35.0));
        assert_eq!(summary.uv_index, Some(6.0));
        assert_eq!(summary.sunrise.as_deref(), Some("05:48:01"));
        assert_eq!(summary.conditions.as_deref(), Some("Rain, Partially cloudy"));
        assert_eq!(summary.hourly.len(), 2);
        assert_eq!(summary.hourly[0].time.as_deref(), Some("00:00:00"));
        assert_eq!(summary.hourly[0].wind_kph, Some(8.3));
        assert_eq!(summary.hourly[1].feels_like_c, None);
        assert_eq!(summary.hourly[1].conditions.as_deref(), Some("Clear"));
    }

    #[tokio::test]
    async fn location_is_a_single_encoded_segment() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{TIMELINE}/New%20York,%20NY%2F1/2024-06-01/2024-06-01")))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_day()))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server)
            .fetch_day("New York, NY/1", june_first())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_fields_become_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "days": [{"temp": 3.0, "windgust": null}]
            })))
            .mount(&server)
            .await;

        let summary = provider(&server).fetch_day("Oslo", june_first()).await.unwrap();
        assert_eq!(summary.temp_c, Some(3.0));
        assert_eq!(summary.wind_gust_kph, None);
        assert_eq!(summary.description, None);
        assert!(summary.hourly.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("No account found with API key"))
            .mount(&server)
            .await;

        let err = provider(&server).fetch_day("Paris", june_first()).await.unwrap_err();
        match err {
            ProviderError::Status { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(body, "No account found with API key");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sample_day())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = provider(&server).fetch_day("Paris", june_first()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn empty_day_list_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"days": []})))
            .mount(&server)
            .await;

        let err = provider(&server).fetch_day("Paris", june_first()).await.unwrap_err();
        assert!(err.to_string().contains("contained no days"));
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = provider(&server).fetch_day("Paris", june_first()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_host_does_not_leak_the_key() {
        // Port 9 (discard) on localhost is normally closed.
        let provider =
            VisualCrossingProvider::new("SECRET_KEY".into(), "http://127.0.0.1:9", Duration::from_secs(2))
                .unwrap();

        let err = provider.fetch_day("Paris", june_first()).await.unwrap_err();
        assert!(!err.to_string().contains("SECRET_KEY"));
    }

    #[test]
    fn base_url_with_trailing_slash() {
        let provider =
            VisualCrossingProvider::new("k".into(), "https://example.com/", Duration::from_secs(1))
                .unwrap();
        let url = provider.timeline_url("Paris", june_first());
        assert_eq!(
            url.as_str(),
            "https://example.com/VisualCrossingWebServices/rest/services/timeline/Paris/2024-06-01/2024-06-01"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(VisualCrossingProvider::new("k".into(), "not a url", Duration::from_secs(1)).is_err());
        assert!(VisualCrossingProvider::new("k".into(), "mailto:x@y", Duration::from_secs(1)).is_err());
    }
}
