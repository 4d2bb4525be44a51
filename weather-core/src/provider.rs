use crate::{
    config::Config,
    error::ProviderError,
    model::WeatherSummary,
    provider::{openrouter::OpenRouterProvider, visualcrossing::VisualCrossingProvider},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::{fmt::Debug, sync::Arc};

pub mod openrouter;
pub mod visualcrossing;

/// Source of day-level weather data.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_day(
        &self,
        location: &str,
        date: NaiveDate,
    ) -> Result<WeatherSummary, ProviderError>;
}

/// Source of free-text outfit advice for a day's weather.
#[async_trait]
pub trait AdviceProvider: Send + Sync + Debug {
    async fn recommend(
        &self,
        weather: &WeatherSummary,
        location: &str,
        date: NaiveDate,
    ) -> Result<String, ProviderError>;
}

/// Construct the weather provider described by `config`.
pub fn weather_provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let cfg = &config.weather;
    let provider =
        VisualCrossingProvider::new(cfg.api_key.clone(), &cfg.base_url, cfg.timeout())?;
    Ok(Arc::new(provider))
}

/// Construct the advice provider, or `None` when no AI key is configured.
pub fn advice_provider_from_config(config: &Config) -> Option<Arc<dyn AdviceProvider>> {
    let cfg = &config.advice;
    if !cfg.is_enabled() {
        return None;
    }

    Some(Arc::new(OpenRouterProvider::new(
        cfg.api_key.clone(),
        cfg.base_url.clone(),
        cfg.model.clone(),
        cfg.timeout(),
    )))
}

/// Natural-language summary sent to the chat model.
pub fn outfit_prompt(weather: &WeatherSummary, location: &str, date: NaiveDate) -> String {
    format!(
        "Weather for {location} on {date}: {temp}C (feels like {feels}C), wind {wind} kph, \
         humidity {humidity}%, conditions: {conditions}. \
         Give outfit recommendations and tips. Be concise and friendly.",
        date = date.format("%Y-%m-%d"),
        temp = or_na(weather.temp_c),
        feels = or_na(weather.feels_like_c),
        wind = or_na(weather.wind_kph),
        humidity = or_na(weather.humidity),
        conditions = weather.conditions.as_deref().unwrap_or("n/a"),
    )
}

fn or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

/// Keep error bodies short enough to hand back to a client.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut cfg = Config::default();
        cfg.security_token = "s".into();
        cfg.weather.api_key = "VC".into();
        cfg
    }

    #[test]
    fn weather_provider_rejects_bad_base_url() {
        let mut cfg = configured();
        assert!(weather_provider_from_config(&cfg).is_ok());

        cfg.weather.base_url = "::nope".into();
        let err = weather_provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("Invalid Visual Crossing base URL"));
    }

    #[test]
    fn advice_provider_absent_without_key() {
        assert!(advice_provider_from_config(&configured()).is_none());
    }

    #[test]
    fn advice_provider_present_with_key() {
        let mut cfg = configured();
        cfg.advice.api_key = "AI".into();
        assert!(advice_provider_from_config(&cfg).is_some());
    }

    #[test]
    fn prompt_mentions_all_headline_values() {
        let weather = WeatherSummary {
            temp_c: Some(21.5),
            feels_like_c: Some(20.0),
            wind_kph: Some(12.3),
            humidity: Some(55.0),
            conditions: Some("Partially cloudy".into()),
            ..Default::default()
        };
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let prompt = outfit_prompt(&weather, "Paris", date);
        assert_eq!(
            prompt,
            "Weather for Paris on 2024-06-01: 21.5C (feels like 20C), wind 12.3 kph, \
             humidity 55%, conditions: Partially cloudy. \
             Give outfit recommendations and tips. Be concise and friendly."
        );
    }

    #[test]
    fn prompt_marks_missing_values() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let prompt = outfit_prompt(&WeatherSummary::default(), "Oslo", date);
        assert!(prompt.contains("n/aC (feels like n/aC)"));
        assert!(prompt.contains("conditions: n/a."));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        assert_eq!(truncate_body("short"), "short");

        let long = "é".repeat(150);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 203);
    }
}
