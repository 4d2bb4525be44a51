use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to an upstream provider.
///
/// Messages end up in client-facing error bodies, so none of them carry the
/// request URL (it holds the API key).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out after {}s", .after.as_secs_f32())]
    Timeout { after: Duration },

    #[error("{0}")]
    Transport(reqwest::Error),

    #[error("upstream responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed upstream response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Classify a `reqwest` failure, dropping the URL from its message.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { after: timeout }
        } else if err.is_decode() {
            Self::Decode(err.without_url().to_string())
        } else {
            Self::Transport(err.without_url())
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

/// How a request failure is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request itself was unusable.
    ClientInput,
    /// The shared secret did not match.
    Auth,
    /// A provider could not be reached or answered badly.
    Upstream,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::ClientInput => StatusCode::BAD_REQUEST,
            ErrorKind::Auth => StatusCode::UNAUTHORIZED,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Everything that can stop a weather request from producing an envelope.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Request body must be valid JSON")]
    InvalidJson,

    #[error("Missing required field: '{0}'")]
    MissingField(&'static str),

    #[error("Field '{0}' must be a string")]
    InvalidFieldType(&'static str),

    #[error("Invalid security token")]
    InvalidToken,

    #[error("Field 'date' must be in YYYY-MM-DD format")]
    InvalidDateFormat,

    #[error("Failed to reach weather service: {0}")]
    WeatherUnavailable(#[source] ProviderError),

    #[error("Failed to reach AI service: {0}")]
    AdviceUnavailable(#[source] ProviderError),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::InvalidJson
            | RelayError::MissingField(_)
            | RelayError::InvalidFieldType(_)
            | RelayError::InvalidDateFormat => ErrorKind::ClientInput,
            RelayError::InvalidToken => ErrorKind::Auth,
            RelayError::WeatherUnavailable(_) | RelayError::AdviceUnavailable(_) => {
                ErrorKind::Upstream
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }
}
