//! Application state.

use std::sync::Arc;

use motion_genai::{GeminiImageClient, ImageModel};
use motion_studio::{Studio, StudioConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub studio: Arc<Studio>,
}

impl AppState {
    /// Create application state backed by the Gemini client.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let studio_config = StudioConfig::from_env();
        std::fs::create_dir_all(&studio_config.work_dir)?;

        let client = GeminiImageClient::from_env()?;
        if !client.supports_upscale() {
            tracing::warn!("GEMINI_UPSCALE_API_KEY not set, upscaling is disabled");
        }

        Ok(Self::with_studio(config, Studio::new(studio_config, Arc::new(client))))
    }

    /// Create application state around an existing studio.
    pub fn with_studio(config: ApiConfig, studio: Studio) -> Self {
        Self {
            config,
            studio: Arc::new(studio),
        }
    }
}
