//! Model client configuration.

use std::time::Duration;

use crate::error::{GenAiError, GenAiResult};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_UPSCALE_MODEL: &str = "gemini-3-pro-image-preview";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Sampling temperature for frame generation.
pub const GENERATION_TEMPERATURE: f64 = 0.2;

/// Configuration for the Gemini image client.
#[derive(Clone)]
pub struct GenAiConfig {
    /// API key for the standard tier
    pub api_key: String,
    /// API key for the elevated tier used by upscaling
    pub upscale_api_key: Option<String>,
    /// Base URL of the API (without version path)
    pub base_url: String,
    /// Model used for frame generation
    pub image_model: String,
    /// Model used for upscaling
    pub upscale_model: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for GenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiConfig")
            .field("api_key", &"<redacted>")
            .field("upscale_api_key", &self.upscale_api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("image_model", &self.image_model)
            .field("upscale_model", &self.upscale_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GenAiConfig {
    /// Create a config with default models and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            upscale_api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            upscale_model: DEFAULT_UPSCALE_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        let api_key = non_empty_var("GEMINI_API_KEY")
            .ok_or_else(|| GenAiError::config_error("GEMINI_API_KEY not set"))?;

        let mut config = Self::new(api_key);
        config.upscale_api_key = non_empty_var("GEMINI_UPSCALE_API_KEY");
        if let Some(base_url) = non_empty_var("GEMINI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = non_empty_var("GEMINI_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Some(model) = non_empty_var("GEMINI_UPSCALE_MODEL") {
            config.upscale_model = model;
        }
        config.timeout = Duration::from_secs(
            std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
        );

        Ok(config)
    }

    /// Set the elevated credential.
    pub fn with_upscale_key(mut self, key: impl Into<String>) -> Self {
        self.upscale_api_key = Some(key.into());
        self
    }

    /// Point the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether the elevated tier is available.
    pub fn has_upscale_credential(&self) -> bool {
        self.upscale_api_key.is_some()
    }

    /// `generateContent` URL for a model. The key travels in a header, never here.
    pub fn generate_url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
