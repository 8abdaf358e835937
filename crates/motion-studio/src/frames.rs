//! Frame generation orchestration.

use std::sync::Arc;
use std::time::{Duration, Instant};

use motion_genai::{FrameRequest, GenAiError, ImageModel};
use motion_models::{Direction, InlineImage, OperationKind, Sequence};
use tracing::info;

use crate::batch::{run_staggered, BatchFailure};
use crate::error::{StudioError, StudioResult};

/// Turns a seed image into a sequence of `frame_count + 1` frames.
#[derive(Clone)]
pub struct FrameOrchestrator {
    model: Arc<dyn ImageModel>,
    frame_count: usize,
    stagger: Duration,
}

impl FrameOrchestrator {
    pub fn new(model: Arc<dyn ImageModel>, frame_count: usize, stagger: Duration) -> Self {
        Self {
            model,
            frame_count,
            stagger,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Generate every frame concurrently and assemble them behind the seed.
    ///
    /// `on_frame` runs once per successfully generated frame.
    pub async fn generate<P>(
        &self,
        seed: &InlineImage,
        description: &str,
        direction: Direction,
        on_frame: P,
    ) -> StudioResult<Sequence>
    where
        P: Fn(usize),
    {
        let started = Instant::now();
        let total = self.frame_count;
        metrics::counter!("motion_batches_total", "kind" => "generate").increment(1);

        let results = run_staggered(
            (1..=total).collect(),
            self.stagger,
            |index| {
                let request = FrameRequest {
                    seed: seed.clone(),
                    index,
                    total,
                    description: description.to_string(),
                    direction,
                };
                let model = Arc::clone(&self.model);
                async move { model.generate_frame(&request).await }
            },
            |index| {
                metrics::counter!("motion_frames_total", "kind" => "generate").increment(1);
                on_frame(index);
            },
        )
        .await
        .map_err(|failure| batch_error(OperationKind::Generate, failure))?;

        let sequence = Sequence::assemble(seed.clone(), results)?;

        metrics::histogram!("motion_batch_duration_seconds", "kind" => "generate")
            .record(started.elapsed().as_secs_f64());
        info!(
            frames = sequence.len(),
            sequence_id = %sequence.id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Frame generation batch complete"
        );

        Ok(sequence)
    }
}

/// Convert a failed batch into the studio error, recording it.
pub(crate) fn batch_error(kind: OperationKind, failure: BatchFailure<GenAiError>) -> StudioError {
    metrics::counter!("motion_batches_failed_total", "kind" => kind.as_str()).increment(1);
    StudioError::BatchFailed {
        kind,
        failed: failure.failed,
        total: failure.total,
        message: failure.error.to_string(),
    }
}
