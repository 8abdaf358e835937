//! Scripted image model for orchestration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use motion_genai::{FrameRequest, GenAiError, GenAiResult, ImageModel, UpscaleRequest};
use motion_models::InlineImage;

/// What the model does for one request.
#[derive(Debug, Clone, Copy)]
pub enum ScriptedReply {
    /// Answer with an image after the given delay
    Image { delay_ms: u64 },
    /// Answer with a server error
    Fail,
}

type Script = Box<dyn Fn(usize) -> ScriptedReply + Send + Sync>;

/// Model whose behavior per frame position is scripted.
///
/// Generated frame `i` is the PNG-labelled payload `frame-i`; an upscaled
/// frame is `up-<original payload>`. Upscale positions are recovered from
/// the payload (`seed` is position 0).
pub struct ScriptedModel {
    script: Script,
    calls: Arc<Mutex<Vec<(usize, usize)>>>,
    upscale_calls: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedModel {
    pub fn new(script: impl Fn(usize) -> ScriptedReply + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Arc::default(),
            upscale_calls: Arc::default(),
        }
    }

    /// `(index, total)` of every generation request, in call order.
    pub fn calls(&self) -> Arc<Mutex<Vec<(usize, usize)>>> {
        Arc::clone(&self.calls)
    }

    /// Position of every upscale request, in call order.
    pub fn upscale_calls(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.upscale_calls)
    }

    pub fn seed_image() -> InlineImage {
        InlineImage::png(STANDARD.encode("seed"))
    }

    pub fn frame_image(index: usize) -> InlineImage {
        InlineImage::png(STANDARD.encode(format!("frame-{index}")))
    }

    pub fn upscaled_image(original: &InlineImage) -> InlineImage {
        let text = Self::payload_text(original);
        InlineImage::png(STANDARD.encode(format!("up-{text}")))
    }

    fn payload_text(image: &InlineImage) -> String {
        image
            .decode()
            .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
            .unwrap_or_default()
    }

    fn position_of(image: &InlineImage) -> usize {
        Self::payload_text(image)
            .strip_prefix("frame-")
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }

    async fn reply(&self, position: usize, image: InlineImage) -> GenAiResult<InlineImage> {
        match (self.script)(position) {
            ScriptedReply::Image { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(image)
            }
            ScriptedReply::Fail => Err(GenAiError::RequestFailed {
                status: 500,
                body: format!("scripted failure at {position}"),
            }),
        }
    }
}

#[async_trait]
impl ImageModel for ScriptedModel {
    async fn generate_frame(&self, request: &FrameRequest) -> GenAiResult<InlineImage> {
        self.calls
            .lock()
            .unwrap()
            .push((request.index, request.total));
        self.reply(request.index, Self::frame_image(request.index))
            .await
    }

    async fn upscale_frame(&self, request: &UpscaleRequest) -> GenAiResult<InlineImage> {
        let position = Self::position_of(&request.image);
        self.upscale_calls.lock().unwrap().push(position);
        self.reply(position, Self::upscaled_image(&request.image))
            .await
    }

    fn supports_upscale(&self) -> bool {
        true
    }
}
