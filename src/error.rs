//! Error types for the photocopy effect.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur while applying the effect.
#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    /// Credential or other configuration missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file is not an image the codec can decode.
    #[error("unsupported image {}: {reason}", .path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    /// API rejected the credential.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Request did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Returned payload could not be decoded.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The model answered but produced no image part.
    #[error("no image returned by the model{}", .text.as_deref().map(|t| format!(": {t}")).unwrap_or_default())]
    NoImageReturned { text: Option<String> },

    /// Result image could not be written.
    #[error("cannot write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },
}

/// Coarse classification of an [`EffectError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid credential/settings; nothing was attempted.
    Configuration,
    /// Input file unreadable or undecodable; no call was made.
    Input,
    /// Network or API failure.
    Transport,
    /// API succeeded but the answer is unusable.
    Response,
    /// Result could not be persisted.
    Output,
}

impl EffectError {
    /// Returns the category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::FileAccess { .. } | Self::UnsupportedFormat { .. } => ErrorCategory::Input,
            Self::Auth(_)
            | Self::Api { .. }
            | Self::RateLimited { .. }
            | Self::Timeout(_)
            | Self::Network(_)
            | Self::Json(_) => ErrorCategory::Transport,
            Self::Decode(_) | Self::ContentBlocked(_) | Self::NoImageReturned { .. } => {
                ErrorCategory::Response
            }
            Self::Output { .. } => ErrorCategory::Output,
        }
    }

    /// Returns true for network/API failures.
    pub fn is_transport(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }
}

/// Truncates an upstream error body so it stays readable in a terminal.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    const MAX: usize = 500;
    let trimmed = text.trim();
    // Prefer the structured message Google APIs put under error.message
    let message = serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| trimmed.to_string());

    if message.chars().count() > MAX {
        let cut: String = message.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        message
    }
}

/// Reads a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Result type alias for effect operations.
pub type Result<T> = std::result::Result<T, EffectError>;
