use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::{
    error::ProviderError,
    model::WeatherSummary,
    provider::{outfit_prompt, truncate_body},
};

use super::AdviceProvider;

/// OpenAI-compatible chat completions endpoint (OpenRouter by default).
#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    http: Client,
}

impl OpenRouterProvider {
    pub fn new(api_key: String, base_url: String, model: String, timeout: Duration) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
            http: Client::new(),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "sending chat completion request");

        let res = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
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

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::decode(format!("chat completion JSON: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::decode("chat completion contained no message content"))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl AdviceProvider for OpenRouterProvider {
    async fn recommend(
        &self,
        weather: &WeatherSummary,
        location: &str,
        date: NaiveDate,
    ) -> Result<String, ProviderError> {
        let prompt = outfit_prompt(weather, location, date);
        self.complete(&prompt).await
    }
}
