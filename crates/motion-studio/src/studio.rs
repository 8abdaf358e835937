//! Studio session: seed, sequence, status, playback and the operation guard.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as SyncRwLock};

use motion_genai::ImageModel;
use motion_media::{build_archive, intake_image, ArchiveArtifact, VideoArtifact, VideoExporter};
use motion_models::{
    Direction, Frame, GenerationStatus, InlineImage, OperationKind, ResolutionTier, Sequence,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::Instrument;

use crate::config::StudioConfig;
use crate::error::{StudioError, StudioResult};
use crate::frames::FrameOrchestrator;
use crate::guard::OperationGuard;
use crate::logging::OperationLogger;
use crate::playback::PlaybackDriver;
use crate::upscale::UpscaleOrchestrator;

/// Description of the current seed image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedInfo {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
}

#[derive(Default)]
struct Session {
    seed: Option<(InlineImage, SeedInfo)>,
    sequence: Option<Arc<Sequence>>,
}

/// One user's motion studio.
pub struct Studio {
    config: StudioConfig,
    model: Arc<dyn ImageModel>,
    frames: FrameOrchestrator,
    upscaler: UpscaleOrchestrator,
    exporter: VideoExporter,
    guard: OperationGuard,
    session: RwLock<Session>,
    // Written from synchronous progress callbacks, never held across an await
    status: SyncRwLock<GenerationStatus>,
    epoch: AtomicU64,
    playback: PlaybackDriver,
}

impl Studio {
    pub fn new(config: StudioConfig, model: Arc<dyn ImageModel>) -> Self {
        let frames = FrameOrchestrator::new(
            Arc::clone(&model),
            config.frame_count,
            config.generation_stagger,
        );
        let upscaler = UpscaleOrchestrator::new(Arc::clone(&model), config.upscale_stagger);
        let exporter =
            VideoExporter::new(&config.work_dir).with_timeout(config.export_timeout.as_secs());
        let playback = PlaybackDriver::new(config.playback_fps);

        Self {
            config,
            model,
            frames,
            upscaler,
            exporter,
            guard: OperationGuard::new(),
            session: RwLock::new(Session::default()),
            status: SyncRwLock::new(GenerationStatus::default()),
            epoch: AtomicU64::new(0),
            playback,
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Accept a new seed image.
    ///
    /// Clears the sequence and the status. Allowed while an operation is
    /// running; that operation's result will be discarded.
    pub async fn set_seed(
        &self,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> StudioResult<SeedInfo> {
        let accepted = intake_image(content_type, bytes)?;
        let info = SeedInfo {
            mime_type: accepted.image.mime_type.clone(),
            width: accepted.width,
            height: accepted.height,
            size_bytes: accepted.size_bytes,
        };

        {
            let mut session = self.session.write().await;
            let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
            session.seed = Some((accepted.image, info.clone()));
            session.sequence = None;
            self.write_status().reset();

            tracing::info!(
                epoch,
                width = info.width,
                height = info.height,
                size_bytes = info.size_bytes,
                "Seed image replaced"
            );
        }

        self.playback.clear();
        Ok(info)
    }

    /// Generate a new sequence from the seed.
    ///
    /// The batch runs on its own task and completes even if the caller
    /// stops waiting for it.
    pub async fn generate(
        self: &Arc<Self>,
        description: &str,
        direction: Direction,
    ) -> StudioResult<Arc<Sequence>> {
        let permit = self.guard.try_acquire(OperationKind::Generate)?;
        let logger = OperationLogger::new(permit.kind());
        let total = self.frames.frame_count();

        // Epoch and status start under one session lock so a new seed cannot slip between them
        let (seed, epoch) = {
            let session = self.session.read().await;
            let (seed, _) = session.seed.clone().ok_or(StudioError::NoSeed)?;
            self.write_status().start(OperationKind::Generate, total);
            (seed, self.epoch.load(Ordering::Acquire))
        };
        logger.log_start(&format!("{} frames, direction {}", total, direction));

        let studio = Arc::clone(self);
        let description = description.to_string();
        self.run_detached(epoch, async move {
            let result = studio
                .frames
                .generate(&seed, &description, direction, |index| {
                    studio.record_progress(epoch);
                    logger.log_progress(&format!("frame {} of {} ready", index, total));
                })
                .instrument(logger.create_span())
                .await;

            let applied = studio.apply_batch(&logger, epoch, result).await;
            drop(permit);
            applied
        })
        .await
    }

    /// Replace every frame with an upscaled rendering.
    ///
    /// Runs detached like [`Studio::generate`].
    pub async fn upscale(
        self: &Arc<Self>,
        resolution: ResolutionTier,
    ) -> StudioResult<Arc<Sequence>> {
        // Checked before anything else so no request is ever sent without it
        if !self.model.supports_upscale() {
            return Err(StudioError::CredentialRequired);
        }

        let permit = self.guard.try_acquire(OperationKind::Upscale)?;
        let logger = OperationLogger::new(permit.kind());

        let (sequence, epoch) = {
            let session = self.session.read().await;
            let sequence = session.sequence.clone().ok_or(StudioError::NoSequence)?;
            self.write_status().start(OperationKind::Upscale, sequence.len());
            (sequence, self.epoch.load(Ordering::Acquire))
        };
        logger.log_start(&format!("{} frames at {}", sequence.len(), resolution));

        let studio = Arc::clone(self);
        self.run_detached(epoch, async move {
            let result = studio
                .upscaler
                .upscale(&sequence, resolution, |index| {
                    studio.record_progress(epoch);
                    logger.log_progress(&format!("frame {} upscaled", index));
                })
                .instrument(logger.create_span())
                .await;

            let applied = studio.apply_batch(&logger, epoch, result).await;
            drop(permit);
            applied
        })
        .await
    }

    /// Encode the current sequence as a video.
    pub async fn export_video(&self) -> StudioResult<VideoArtifact> {
        let permit = self.guard.try_acquire(OperationKind::ExportVideo)?;
        let logger = OperationLogger::new(permit.kind());
        let images = self.sequence_images().await?;

        logger.log_start(&format!("{} frames", images.len()));
        match self.exporter.export(&images).instrument(logger.create_span()).await {
            Ok(artifact) => {
                logger.log_completion(&artifact.file_name);
                Ok(artifact)
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                Err(e.into())
            }
        }
    }

    /// Package the current sequence as a zip of PNG frames.
    pub async fn export_archive(&self) -> StudioResult<ArchiveArtifact> {
        let permit = self.guard.try_acquire(OperationKind::ExportArchive)?;
        let logger = OperationLogger::new(permit.kind());
        let images = self.sequence_images().await?;

        logger.log_start(&format!("{} frames", images.len()));
        let result = tokio::task::spawn_blocking(move || build_archive(&images))
            .await
            .map_err(|e| StudioError::internal(format!("archive task failed: {}", e)))?;

        match result {
            Ok(artifact) => {
                logger.log_completion(&artifact.file_name);
                Ok(artifact)
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                Err(e.into())
            }
        }
    }

    pub fn status(&self) -> GenerationStatus {
        self.status.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub async fn sequence(&self) -> Option<Arc<Sequence>> {
        self.session.read().await.sequence.clone()
    }

    pub async fn frame(&self, index: usize) -> StudioResult<Frame> {
        let sequence = self.sequence().await.ok_or(StudioError::NoSequence)?;
        sequence.get(index).cloned().ok_or_else(|| {
            crate::playback::PlaybackError::IndexOutOfRange {
                index,
                len: sequence.len(),
            }
            .into()
        })
    }

    pub async fn seed(&self) -> Option<SeedInfo> {
        self.session.read().await.seed.as_ref().map(|(_, info)| info.clone())
    }

    pub fn playback(&self) -> &PlaybackDriver {
        &self.playback
    }

    /// Operation currently in flight, if any.
    pub fn current_operation(&self) -> Option<OperationKind> {
        self.guard.current()
    }

    pub fn supports_upscale(&self) -> bool {
        self.model.supports_upscale()
    }

    async fn sequence_images(&self) -> StudioResult<Vec<InlineImage>> {
        let sequence = self.sequence().await.ok_or(StudioError::NoSequence)?;
        Ok(sequence.images().cloned().collect())
    }

    /// Spawn a batch and wait for its result.
    async fn run_detached<F>(&self, epoch: u64, batch: F) -> StudioResult<Arc<Sequence>>
    where
        F: Future<Output = StudioResult<Arc<Sequence>>> + Send + 'static,
    {
        match tokio::spawn(batch).await {
            Ok(result) => result,
            Err(e) => {
                let err = StudioError::internal(format!("batch task failed: {}", e));
                if self.epoch.load(Ordering::Acquire) == epoch {
                    self.write_status().fail(err.to_string());
                }
                Err(err)
            }
        }
    }

    fn record_progress(&self, epoch: u64) {
        if self.epoch.load(Ordering::Acquire) == epoch {
            self.write_status().record_completion();
        }
    }

    /// Apply a finished batch unless a new seed arrived meanwhile.
    async fn apply_batch(
        &self,
        logger: &OperationLogger,
        epoch: u64,
        result: StudioResult<Sequence>,
    ) -> StudioResult<Arc<Sequence>> {
        let mut session = self.session.write().await;

        if self.epoch.load(Ordering::Acquire) != epoch {
            logger.log_warning("seed changed during the operation, result discarded");
            return Err(StudioError::Superseded(logger.kind()));
        }

        match result {
            Ok(sequence) => {
                let sequence = Arc::new(sequence);
                session.sequence = Some(Arc::clone(&sequence));
                self.write_status().finish();
                drop(session);

                self.playback.load(&sequence);
                logger.log_completion(&format!(
                    "sequence {} with {} frames",
                    sequence.id(),
                    sequence.len()
                ));
                Ok(sequence)
            }
            Err(e) => {
                self.write_status().fail(e.to_string());
                logger.log_error(&e.to_string());
                Err(e)
            }
        }
    }

    fn write_status(&self) -> std::sync::RwLockWriteGuard<'_, GenerationStatus> {
        self.status.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedModel, ScriptedReply};
    use async_trait::async_trait;
    use image::{ImageOutputFormat, Rgba, RgbaImage};
    use motion_genai::{FrameRequest, GenAiResult, UpscaleRequest};
    use std::io::Cursor;
    use std::time::Duration;

    mockall::mock! {
        pub Model {}

        #[async_trait]
        impl ImageModel for Model {
            async fn generate_frame(&self, request: &FrameRequest) -> GenAiResult<InlineImage>;
            async fn upscale_frame(&self, request: &UpscaleRequest) -> GenAiResult<InlineImage>;
            fn supports_upscale(&self) -> bool;
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]))
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn config() -> StudioConfig {
        StudioConfig {
            frame_count: 4,
            work_dir: std::env::temp_dir().join("motion-gen-tests"),
            ..StudioConfig::default()
        }
    }

    fn studio_with(model: ScriptedModel) -> Arc<Studio> {
        Arc::new(Studio::new(config(), Arc::new(model)))
    }

    fn ok_model(delay_ms: u64) -> ScriptedModel {
        ScriptedModel::new(move |_| ScriptedReply::Image { delay_ms })
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_requires_seed() {
        let studio = studio_with(ok_model(0));
        assert!(matches!(
            studio.generate("x", Direction::Right).await,
            Err(StudioError::NoSeed)
        ));
        // The guard was released
        assert_eq!(studio.current_operation(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_seed_is_not_stored() {
        let studio = studio_with(ok_model(0));
        let err = studio.set_seed(Some("text/plain"), b"hello").await.unwrap_err();
        assert!(err.is_input_error());
        assert!(studio.seed().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_success_updates_state() {
        let studio = studio_with(ok_model(100));
        let info = studio.set_seed(Some("image/png"), &png_bytes(8, 6)).await.unwrap();
        assert_eq!((info.width, info.height), (8, 6));

        let sequence = studio.generate("clouds", Direction::Left).await.unwrap();
        assert_eq!(sequence.len(), 5);

        let status = studio.status();
        assert!(!status.in_progress);
        assert_eq!(status.completed, 4);
        assert_eq!(status.total, 4);
        assert!(status.error.is_none());

        assert_eq!(studio.sequence().await.unwrap().id(), sequence.id());
        let playback = studio.playback().state();
        assert_eq!(playback.sequence_id, Some(sequence.id()));
        assert_eq!(playback.len, 5);
        assert_eq!(playback.index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_regeneration_preserves_visible_sequence() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        // First batch succeeds, every later request fails
        let model = ScriptedModel::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 4 {
                ScriptedReply::Image { delay_ms: 5 }
            } else {
                ScriptedReply::Fail
            }
        });
        let studio = studio_with(model);
        studio.set_seed(Some("image/png"), &png_bytes(4, 4)).await.unwrap();

        let first = studio.generate("a", Direction::Down).await.unwrap();
        let err = studio.generate("b", Direction::Down).await.unwrap_err();
        assert!(matches!(err, StudioError::BatchFailed { .. }));

        assert_eq!(studio.sequence().await.unwrap().id(), first.id());
        assert!(studio.status().error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_operation_is_busy() {
        let studio = studio_with(ok_model(1000));
        studio.set_seed(Some("image/png"), &png_bytes(4, 4)).await.unwrap();

        let (first, second) = tokio::join!(
            studio.generate("a", Direction::Right),
            studio.export_archive()
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(StudioError::Busy(OperationKind::Generate))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_seed_discards_running_batch() {
        let studio = studio_with(ok_model(1000));
        studio.set_seed(Some("image/png"), &png_bytes(4, 4)).await.unwrap();

        let (generated, _) = tokio::join!(studio.generate("a", Direction::Right), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            studio.set_seed(Some("image/png"), &png_bytes(6, 6)).await.unwrap();
        });

        assert!(matches!(generated, Err(StudioError::Superseded(OperationKind::Generate))));
        assert!(studio.sequence().await.is_none());
        let status = studio.status();
        assert_eq!(status.completed, 0);
        assert!(!status.in_progress);
        assert_eq!(studio.seed().await.unwrap().width, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_caller_does_not_cancel_generation() {
        let studio = studio_with(ok_model(5000));
        studio.set_seed(Some("image/png"), &png_bytes(4, 4)).await.unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(500),
            studio.generate("a", Direction::Right),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(studio.status().in_progress);
        assert_eq!(studio.current_operation(), Some(OperationKind::Generate));

        tokio::time::sleep(Duration::from_secs(60)).await;

        let status = studio.status();
        assert!(!status.in_progress);
        assert_eq!(status.completed, 4);
        assert!(status.error.is_none());
        assert_eq!(studio.sequence().await.unwrap().len(), 5);
        assert_eq!(studio.current_operation(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_upscale_still_replaces_sequence() {
        let studio = studio_with(ok_model(2000));
        studio.set_seed(Some("image/png"), &png_bytes(4, 4)).await.unwrap();
        let generated = studio.generate("a", Direction::Right).await.unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            studio.upscale(ResolutionTier::TwoK),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(60)).await;

        let upscaled = studio.sequence().await.unwrap();
        assert_ne!(upscaled.id(), generated.id());
        assert_eq!(upscaled.len(), generated.len());
        assert!(!studio.status().in_progress);
        assert_eq!(studio.current_operation(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_seed_clears_sequence_and_status() {
        let studio = studio_with(ok_model(1));
        studio.set_seed(Some("image/png"), &png_bytes(4, 4)).await.unwrap();
        studio.generate("a", Direction::Right).await.unwrap();
        assert_eq!(studio.status().completed, 4);

        studio.set_seed(Some("image/jpeg"), &png_bytes(4, 4)).await.unwrap();
        assert_eq!(studio.status().completed, 0);
        assert!(studio.sequence().await.is_none());
        assert_eq!(studio.playback().state().len, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upscale_without_credential_sends_nothing() {
        let mut model = MockModel::new();
        model.expect_supports_upscale().return_const(false);
        model.expect_upscale_frame().never();
        model.expect_generate_frame().never();

        let studio = Arc::new(Studio::new(config(), Arc::new(model)));
        assert!(matches!(
            studio.upscale(ResolutionTier::TwoK).await,
            Err(StudioError::CredentialRequired)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upscale_replaces_sequence_keeping_length() {
        let studio = studio_with(ok_model(10));
        studio.set_seed(Some("image/png"), &png_bytes(16, 9)).await.unwrap();
        let generated = studio.generate("a", Direction::ZoomIn).await.unwrap();

        let upscaled = studio.upscale(ResolutionTier::FourK).await.unwrap();
        assert_eq!(upscaled.len(), generated.len());
        assert_ne!(upscaled.id(), generated.id());
        for (before, after) in generated.frames().iter().zip(upscaled.frames()) {
            assert_eq!(after.image, ScriptedModel::upscaled_image(&before.image));
        }
        assert_eq!(studio.status().completed, generated.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upscale_requires_sequence() {
        let studio = studio_with(ok_model(1));
        assert!(matches!(
            studio.upscale(ResolutionTier::TwoK).await,
            Err(StudioError::NoSequence)
        ));
    }

    #[tokio::test]
    async fn test_export_archive_names_every_frame() {
        let studio = Arc::new(Studio::new(
            StudioConfig {
                generation_stagger: Duration::ZERO,
                ..config()
            },
            Arc::new(ok_model(0)),
        ));
        studio.set_seed(Some("image/png"), &png_bytes(4, 4)).await.unwrap();
        studio.generate("a", Direction::Right).await.unwrap();

        let artifact = studio.export_archive().await.unwrap();
        assert_eq!(
            artifact.entries,
            vec![
                "frame_001.png",
                "frame_002.png",
                "frame_003.png",
                "frame_004.png",
                "frame_005.png"
            ]
        );
    }

    #[tokio::test]
    async fn test_exports_require_sequence() {
        let studio = studio_with(ok_model(0));
        assert!(matches!(studio.export_archive().await, Err(StudioError::NoSequence)));
        assert!(matches!(studio.export_video().await, Err(StudioError::NoSequence)));
    }

    #[tokio::test]
    async fn test_frame_lookup() {
        let studio = Arc::new(Studio::new(
            StudioConfig {
                generation_stagger: Duration::ZERO,
                ..config()
            },
            Arc::new(ok_model(0)),
        ));
        assert!(matches!(studio.frame(0).await, Err(StudioError::NoSequence)));

        studio.set_seed(Some("image/png"), &png_bytes(4, 4)).await.unwrap();
        studio.generate("a", Direction::Right).await.unwrap();
        assert_eq!(studio.frame(2).await.unwrap().image, ScriptedModel::frame_image(2));
        assert!(matches!(studio.frame(5).await, Err(StudioError::Playback(_))));
    }
}
