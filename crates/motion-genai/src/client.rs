//! Gemini image model HTTP client.

use async_trait::async_trait;
use motion_models::{AspectRatio, Direction, InlineImage, ResolutionTier, PNG_MIME};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::{GenAiConfig, API_KEY_HEADER, GENERATION_TEMPERATURE};
use crate::error::{GenAiError, GenAiResult};
use crate::prompt::{frame_prompt, upscale_prompt};
use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageConfig, Part,
};

/// Request for one generated frame.
#[derive(Debug, Clone)]
pub struct FrameRequest {
    pub seed: InlineImage,
    /// 1-based position of the frame after the seed
    pub index: usize,
    /// Number of frames generated in the batch
    pub total: usize,
    pub description: String,
    pub direction: Direction,
}

/// Request for one upscaled frame.
#[derive(Debug, Clone)]
pub struct UpscaleRequest {
    pub image: InlineImage,
    pub aspect_ratio: AspectRatio,
    pub resolution: ResolutionTier,
}

/// A hosted image model.
///
/// Every successful call yields a PNG-labelled inline image.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Generate one frame of a motion sequence from the seed image.
    async fn generate_frame(&self, request: &FrameRequest) -> GenAiResult<InlineImage>;

    /// Re-render one frame at a higher resolution.
    async fn upscale_frame(&self, request: &UpscaleRequest) -> GenAiResult<InlineImage>;

    /// Whether the elevated credential needed by [`ImageModel::upscale_frame`] is present.
    fn supports_upscale(&self) -> bool;
}

/// Client for Gemini `generateContent` image models.
pub struct GeminiImageClient {
    http: Client,
    config: GenAiConfig,
}

impl GeminiImageClient {
    /// Create a new client.
    pub fn new(config: GenAiConfig) -> GenAiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::new(GenAiConfig::from_env()?)
    }

    pub fn config(&self) -> &GenAiConfig {
        &self.config
    }

    /// Build the generation request for one frame.
    pub fn frame_request_body(request: &FrameRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![
                    Part::image(&request.seed),
                    Part::text(frame_prompt(
                        request.index,
                        request.total,
                        &request.description,
                        request.direction,
                    )),
                ],
            }],
            generation_config: GenerationConfig {
                temperature: Some(GENERATION_TEMPERATURE),
                response_modalities: vec!["IMAGE".to_string()],
                image_config: None,
            },
        }
    }

    /// Build the upscale request for one frame.
    pub fn upscale_request_body(request: &UpscaleRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![
                    Part::image(&request.image),
                    Part::text(upscale_prompt(request.aspect_ratio, request.resolution)),
                ],
            }],
            generation_config: GenerationConfig {
                temperature: None,
                response_modalities: vec!["IMAGE".to_string()],
                image_config: Some(ImageConfig {
                    aspect_ratio: request.aspect_ratio.to_string(),
                    image_size: request.resolution.as_str().to_string(),
                }),
            },
        }
    }

    /// Call `generateContent` and extract the first inline image.
    async fn call_model(
        &self,
        model: &str,
        api_key: &str,
        body: &GenerateContentRequest,
    ) -> GenAiResult<InlineImage> {
        let url = self.config.generate_url(model);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(model, status = status.as_u16(), "Gemini API request failed");
            return Err(GenAiError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;

        if let Some(reason) = parsed.block_reason() {
            return Err(GenAiError::Blocked(reason.to_string()));
        }

        let blob = parsed
            .first_image()
            .ok_or_else(|| GenAiError::NoImage(parsed.finish_reason().map(str::to_string)))?;

        let mut image = InlineImage::parse(&blob.data, PNG_MIME)
            .map_err(|e| GenAiError::invalid_response(format!("inline image payload: {e}")))?;
        image.mime_type = PNG_MIME.to_string();

        Ok(image)
    }
}

#[async_trait]
impl ImageModel for GeminiImageClient {
    async fn generate_frame(&self, request: &FrameRequest) -> GenAiResult<InlineImage> {
        debug!(
            index = request.index,
            total = request.total,
            direction = %request.direction,
            model = %self.config.image_model,
            "Requesting frame"
        );

        let body = Self::frame_request_body(request);
        self.call_model(&self.config.image_model, &self.config.api_key, &body)
            .await
    }

    async fn upscale_frame(&self, request: &UpscaleRequest) -> GenAiResult<InlineImage> {
        let api_key = self.config.upscale_api_key.as_deref().ok_or_else(|| {
            GenAiError::MissingCredential("GEMINI_UPSCALE_API_KEY not set".to_string())
        })?;

        debug!(
            aspect_ratio = %request.aspect_ratio,
            resolution = %request.resolution,
            model = %self.config.upscale_model,
            "Requesting upscale"
        );

        let body = Self::upscale_request_body(request);
        self.call_model(&self.config.upscale_model, api_key, &body).await
    }

    fn supports_upscale(&self) -> bool {
        self.config.has_upscale_credential()
    }
}
