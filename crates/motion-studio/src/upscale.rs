//! Upscale orchestration.

use std::sync::Arc;
use std::time::{Duration, Instant};

use motion_genai::{ImageModel, UpscaleRequest};
use motion_media::inline_dimensions;
use motion_models::{AspectRatio, OperationKind, ResolutionTier, Sequence};
use tracing::{error, info};

use crate::batch::run_staggered;
use crate::error::{StudioError, StudioResult};
use crate::frames::batch_error;

/// Re-renders every frame of a sequence through the high-fidelity model.
#[derive(Clone)]
pub struct UpscaleOrchestrator {
    model: Arc<dyn ImageModel>,
    stagger: Duration,
}

impl UpscaleOrchestrator {
    pub fn new(model: Arc<dyn ImageModel>, stagger: Duration) -> Self {
        Self { model, stagger }
    }

    /// Aspect ratio requested for every frame, taken from the first frame.
    pub fn target_aspect_ratio(sequence: &Sequence) -> StudioResult<AspectRatio> {
        let first = sequence.first().ok_or(StudioError::NoSequence)?;
        let (width, height) = inline_dimensions(&first.image)?;
        Ok(AspectRatio::snap(width, height))
    }

    /// Upscale every frame, seed included, keeping length and order.
    ///
    /// `on_frame` runs once per successfully upscaled frame.
    pub async fn upscale<P>(
        &self,
        sequence: &Sequence,
        resolution: ResolutionTier,
        on_frame: P,
    ) -> StudioResult<Sequence>
    where
        P: Fn(usize),
    {
        let aspect_ratio = Self::target_aspect_ratio(sequence)?;
        self.upscale_with_ratio(sequence, aspect_ratio, resolution, on_frame)
            .await
    }

    /// Upscale every frame with an explicit aspect ratio.
    pub async fn upscale_with_ratio<P>(
        &self,
        sequence: &Sequence,
        aspect_ratio: AspectRatio,
        resolution: ResolutionTier,
        on_frame: P,
    ) -> StudioResult<Sequence>
    where
        P: Fn(usize),
    {
        let started = Instant::now();
        metrics::counter!("motion_batches_total", "kind" => "upscale").increment(1);

        info!(
            frames = sequence.len(),
            aspect_ratio = %aspect_ratio,
            resolution = %resolution,
            "Starting upscale batch"
        );

        let frames = sequence.frames();
        let results = run_staggered(
            (0..frames.len()).collect(),
            self.stagger,
            |index| {
                let request = UpscaleRequest {
                    image: frames[index].image.clone(),
                    aspect_ratio,
                    resolution,
                };
                let model = Arc::clone(&self.model);
                async move { model.upscale_frame(&request).await }
            },
            |index| {
                metrics::counter!("motion_frames_total", "kind" => "upscale").increment(1);
                on_frame(index);
            },
        )
        .await
        .map_err(|failure| {
            error!(
                failed = failure.failed,
                total = failure.total,
                first_failed_index = failure.tag,
                "Upscale failed: {}", failure.error
            );
            batch_error(OperationKind::Upscale, failure)
        })?;

        let upscaled = sequence.replace_frames(results)?;

        metrics::histogram!("motion_batch_duration_seconds", "kind" => "upscale")
            .record(started.elapsed().as_secs_f64());
        info!(
            frames = upscaled.len(),
            sequence_id = %upscaled.id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upscale batch complete"
        );

        Ok(upscaled)
    }
}
