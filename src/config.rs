//! Runtime configuration.
//!
//! Everything the effect needs from the environment is collected once into an
//! [`EffectConfig`] value that is handed to the client at construction.

use crate::error::{EffectError, Result};
use crate::image::providers::{GeminiModel, DEFAULT_BASE_URL};
use std::time::Duration;

/// Primary credential variable.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Fallback credential variable, also honored by Google's own SDKs.
pub const FALLBACK_API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Optional model id override.
pub const MODEL_ENV: &str = "PHOTOCOPY_MODEL";
/// Optional request timeout in whole seconds.
pub const TIMEOUT_ENV: &str = "PHOTOCOPY_TIMEOUT_SECS";
/// Optional API base URL override.
pub const BASE_URL_ENV: &str = "PHOTOCOPY_BASE_URL";

/// Settings for an [`ImageEffectClient`](crate::ImageEffectClient).
#[derive(Clone)]
pub struct EffectConfig {
    api_key: Option<String>,
    /// Model to send requests to.
    pub model: GeminiModel,
    /// Upper bound on the model call; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// API base URL.
    pub base_url: String,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default(),
            timeout: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for EffectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl EffectConfig {
    /// Creates a config with the given credential and default settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Reads configuration from process environment variables.
    ///
    /// A missing credential is not an error here; it is reported when the
    /// credential is first needed. Malformed optional values are rejected.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self {
            api_key: non_empty(API_KEY_ENV).or_else(|| non_empty(FALLBACK_API_KEY_ENV)),
            ..Default::default()
        };

        if let Some(model) = non_empty(MODEL_ENV) {
            config.model = model.parse()?;
        }

        if let Some(raw) = non_empty(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                EffectError::Configuration(format!(
                    "{TIMEOUT_ENV} must be a whole number of seconds, got {raw:?}"
                ))
            })?;
            if secs == 0 {
                return Err(EffectError::Configuration(format!(
                    "{TIMEOUT_ENV} must be greater than zero"
                )));
            }
            config.timeout = Some(Duration::from_secs(secs));
        }

        if let Some(url) = non_empty(BASE_URL_ENV) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }

        Ok(config)
    }

    /// Sets the model.
    pub fn with_model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Returns the credential, or a configuration error if none is set.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                EffectError::Configuration(format!(
                    "{API_KEY_ENV} environment variable not set. Please set it before running."
                ))
            })
    }

    /// Returns true if a credential is present.
    pub fn has_api_key(&self) -> bool {
        self.api_key().is_ok()
    }
}
