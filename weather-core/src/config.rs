use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://weather.visualcrossing.com";
pub const DEFAULT_ADVICE_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_ADVICE_MODEL: &str = "stepfun/step-3.5-flash:free";

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Visual Crossing credentials and endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Chat-completions credentials and endpoint. An empty `api_key` turns the
/// AI call off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdviceConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_ADVICE_BASE_URL.to_string(),
            model: DEFAULT_ADVICE_MODEL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl AdviceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Process-wide configuration. Built once at startup and never mutated
/// afterwards.
///
/// Example TOML:
/// ```toml
/// security_token = "..."
///
/// [weather]
/// api_key = "..."
///
/// [advice]
/// api_key = ""
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shared secret every weather request must carry.
    pub security_token: String,
    pub server: ServerConfig,
    pub weather: WeatherConfig,
    pub advice: AdviceConfig,
}

impl Config {
    /// Load config from `path`, or from the platform config directory when no
    /// path is given. Environment variables override file values.
    ///
    /// An explicit path must exist; the platform file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::config_file_path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Overlay values from environment-style lookups. Unset keys leave the
    /// current value alone; unparsable ports are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SECURITY_TOKEN") {
            self.security_token = v;
        }
        if let Some(v) = lookup("VISUAL_CROSSING_KEY") {
            self.weather.api_key = v;
        }
        if let Some(v) = lookup("VISUAL_CROSSING_BASE_URL") {
            self.weather.base_url = v;
        }
        if let Some(v) = lookup("AI_KEY") {
            self.advice.api_key = v;
        }
        if let Some(v) = lookup("AI_BASE_URL") {
            self.advice.base_url = v;
        }
        if let Some(v) = lookup("AI_MODEL") {
            self.advice.model = v;
        }
        if let Some(v) = lookup("RELAY_HOST") {
            self.server.host = v;
        }
        if let Some(port) = lookup("RELAY_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Reject configurations the relay cannot serve with.
    pub fn validate(&self) -> Result<()> {
        if self.security_token.is_empty() {
            bail!(
                "No security token configured.\n\
                 Hint: set SECURITY_TOKEN or `security_token` in the config file."
            );
        }
        if self.weather.api_key.is_empty() {
            bail!(
                "No Visual Crossing API key configured.\n\
                 Hint: set VISUAL_CROSSING_KEY or `[weather] api_key` in the config file."
            );
        }
        Ok(())
    }

    /// Path to the platform config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-relay", "weather-server")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
