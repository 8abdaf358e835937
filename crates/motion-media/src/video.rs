//! Video assembly.
//!
//! Frames are composited onto a canvas sized by the first frame, and the
//! canvas is captured at a fixed rate while each image is held for
//! [`FRAME_DISPLAY_MS`]. Captured canvases are piped to FFmpeg as raw RGBA.

use chrono::Utc;
use image::{imageops, RgbaImage};
use motion_models::export::{video_file_name, CAPTURE_FPS, FRAME_DISPLAY_MS};
use motion_models::InlineImage;
use std::collections::HashSet;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Output container, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoContainer {
    /// WebM with VP9
    WebM,
    /// MP4 with H.264
    Mp4,
}

impl VideoContainer {
    /// Containers in the order they are tried.
    pub const PREFERENCE: &'static [VideoContainer] = &[VideoContainer::WebM, VideoContainer::Mp4];

    /// FFmpeg encoder required by the container.
    pub fn encoder(&self) -> &'static str {
        match self {
            VideoContainer::WebM => "libvpx-vp9",
            VideoContainer::Mp4 => "libx264",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            VideoContainer::WebM => "webm",
            VideoContainer::Mp4 => "mp4",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            VideoContainer::WebM => "video/webm",
            VideoContainer::Mp4 => "video/mp4",
        }
    }

    /// Append the container's encoder settings to a command.
    fn apply(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        // yuv420p needs even dimensions
        let cmd = cmd
            .video_filter("pad=ceil(iw/2)*2:ceil(ih/2)*2")
            .video_codec(self.encoder());
        match self {
            VideoContainer::WebM => cmd
                .crf(32)
                .output_args(["-b:v", "0", "-deadline", "good", "-row-mt", "1"])
                .pixel_format("yuv420p"),
            VideoContainer::Mp4 => cmd
                .crf(20)
                .preset("veryfast")
                .pixel_format("yuv420p")
                .output_args(["-movflags", "+faststart"]),
        }
    }
}

/// Pick the first container whose encoder is available.
pub fn choose_container(encoders: &HashSet<String>) -> Option<VideoContainer> {
    VideoContainer::PREFERENCE
        .iter()
        .copied()
        .find(|container| encoders.contains(container.encoder()))
}

/// Capture slots occupied by image `k`.
///
/// Slot `s` is captured at `s / CAPTURE_FPS` seconds, and image `k` is on
/// screen from `k * FRAME_DISPLAY_MS` until the next image is drawn, so it
/// owns every slot whose timestamp falls in that window.
pub fn capture_slots(k: u64) -> Range<u64> {
    first_slot_at(k)..first_slot_at(k + 1)
}

/// Total number of captured frames for `images` images.
pub fn total_capture_frames(images: usize) -> u64 {
    first_slot_at(images as u64)
}

fn first_slot_at(k: u64) -> u64 {
    let scaled = k * FRAME_DISPLAY_MS * CAPTURE_FPS as u64;
    scaled.div_ceil(1000)
}

/// Drawing surface the frames are composited onto.
#[derive(Debug, Clone)]
pub struct FrameCanvas {
    canvas: RgbaImage,
}

impl FrameCanvas {
    /// Create a transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::new(width, height),
        }
    }

    /// Draw an image at the origin without scaling, over the current content.
    ///
    /// Parts of the image beyond the canvas are clipped.
    pub fn draw(&mut self, image: &RgbaImage) {
        imageops::overlay(&mut self.canvas, image, 0, 0);
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Raw RGBA bytes of the current content.
    pub fn as_raw(&self) -> &[u8] {
        self.canvas.as_raw()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }
}

/// A finished video export.
#[derive(Debug, Clone)]
pub struct VideoArtifact {
    /// `motion-gen-<timestamp>.<ext>`
    pub file_name: String,
    pub container: VideoContainer,
    pub bytes: Vec<u8>,
    /// Number of source images
    pub image_count: usize,
    /// Number of captured frames written to the encoder
    pub capture_frames: u64,
}

impl VideoArtifact {
    pub fn mime_type(&self) -> &'static str {
        self.container.mime_type()
    }
}

/// Encodes sequences into a single video file.
#[derive(Debug, Clone)]
pub struct VideoExporter {
    work_dir: PathBuf,
    runner: FfmpegRunner,
}

impl VideoExporter {
    /// Create an exporter writing temporary files under `work_dir`.
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            runner: FfmpegRunner::new(),
        }
    }

    /// Bound the time FFmpeg may take to finish after the last frame.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    /// Probe FFmpeg for the preferred available container.
    pub async fn select_container(&self) -> MediaResult<VideoContainer> {
        let encoders = self.runner.list_encoders().await?;
        choose_container(&encoders).ok_or_else(|| {
            MediaError::unsupported_format(format!(
                "no video encoder available (tried {})",
                VideoContainer::PREFERENCE
                    .iter()
                    .map(|c| c.encoder())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }

    /// Encode the images, in order, into one video.
    pub async fn export(&self, images: &[InlineImage]) -> MediaResult<VideoArtifact> {
        if images.is_empty() {
            return Err(MediaError::EmptySequence);
        }

        let started = Instant::now();

        // Decode everything up front so a bad frame fails before encoding starts
        let decoded = images
            .iter()
            .enumerate()
            .map(|(index, image)| {
                decode_rgba(image).map_err(|e| {
                    MediaError::invalid_image(format!(
                        "frame {} could not be decoded: {}",
                        index, e
                    ))
                })
            })
            .collect::<MediaResult<Vec<_>>>()?;

        let container = self.select_container().await?;
        let mut canvas = FrameCanvas::new(decoded[0].width(), decoded[0].height());

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let temp_dir = tempfile::Builder::new()
            .prefix("motion-export-")
            .tempdir_in(&self.work_dir)?;
        let output_path = temp_dir.path().join(format!("output.{}", container.extension()));

        let cmd = container.apply(
            FfmpegCommand::from_stdin(&output_path).raw_rgba_input(
                canvas.width(),
                canvas.height(),
                CAPTURE_FPS,
            ),
        );

        info!(
            container = container.extension(),
            width = canvas.width(),
            height = canvas.height(),
            images = decoded.len(),
            "Starting video export"
        );

        let total_frames = total_capture_frames(decoded.len());
        let mut session = self.runner.spawn_piped(&cmd, move |progress| {
            debug!(
                frame = progress.frame,
                percent = progress.percentage(total_frames),
                "Video encode progress"
            );
        })?;

        for (k, frame) in decoded.iter().enumerate() {
            canvas.draw(frame);
            for _ in capture_slots(k as u64) {
                session.write(canvas.as_raw()).await?;
            }
        }

        session.finish().await?;

        let bytes = tokio::fs::read(&output_path).await?;
        // Temporary output is released as soon as it has been read
        temp_dir.close()?;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::histogram!("motion_export_duration_seconds", "kind" => "video").record(elapsed);

        info!(
            container = container.extension(),
            size_bytes = bytes.len(),
            capture_frames = total_frames,
            elapsed_secs = elapsed,
            "Video export complete"
        );

        Ok(VideoArtifact {
            file_name: video_file_name(Utc::now(), container.extension()),
            container,
            bytes,
            image_count: decoded.len(),
            capture_frames: total_frames,
        })
    }
}

/// Decode an inline image into RGBA pixels.
pub fn decode_rgba(image: &InlineImage) -> MediaResult<RgbaImage> {
    let bytes = image.decode()?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::tests::png_bytes;
    use image::Rgba;

    #[test]
    fn test_capture_slots_alternate() {
        assert_eq!(capture_slots(0), 0..8);
        assert_eq!(capture_slots(1), 8..15);
        assert_eq!(capture_slots(2), 15..23);
        assert_eq!(capture_slots(3), 23..30);

        let counts: Vec<u64> = (0..4).map(|k| capture_slots(k).count() as u64).collect();
        assert_eq!(counts, vec![8, 7, 8, 7]);
    }

    #[test]
    fn test_total_capture_frames() {
        assert_eq!(total_capture_frames(0), 0);
        assert_eq!(total_capture_frames(4), 30);
        // 11 images * 250 ms = 2.75 s at 30 fps
        assert_eq!(total_capture_frames(11), 83);
        let summed: u64 = (0..11).map(|k| capture_slots(k).count() as u64).sum();
        assert_eq!(summed, total_capture_frames(11));
    }

    #[test]
    fn test_choose_container_preference() {
        let both: HashSet<String> =
            ["libx264", "libvpx-vp9"].iter().map(|s| s.to_string()).collect();
        assert_eq!(choose_container(&both), Some(VideoContainer::WebM));

        let h264_only: HashSet<String> = ["libx264"].iter().map(|s| s.to_string()).collect();
        assert_eq!(choose_container(&h264_only), Some(VideoContainer::Mp4));

        let neither: HashSet<String> = ["mpeg4"].iter().map(|s| s.to_string()).collect();
        assert_eq!(choose_container(&neither), None);
    }

    #[test]
    fn test_container_metadata() {
        assert_eq!(VideoContainer::WebM.extension(), "webm");
        assert_eq!(VideoContainer::Mp4.mime_type(), "video/mp4");
    }

    #[test]
    fn test_canvas_draws_at_origin_without_scaling() {
        let mut canvas = FrameCanvas::new(4, 4);
        canvas.draw(&RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])));
        // A smaller frame only covers the top-left corner
        canvas.draw(&RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255])));

        assert_eq!(canvas.image().get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(canvas.image().get_pixel(3, 3), &Rgba([255, 0, 0, 255]));

        // A larger frame is clipped to the canvas
        canvas.draw(&RgbaImage::from_pixel(8, 8, Rgba([0, 255, 0, 255])));
        assert_eq!((canvas.width(), canvas.height()), (4, 4));
        assert_eq!(canvas.as_raw().len(), 4 * 4 * 4);
    }

    #[test]
    fn test_decode_rgba() {
        let image = InlineImage::png(base64_png(3, 2));
        let decoded = decode_rgba(&image).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
    }

    #[tokio::test]
    async fn test_export_empty_sequence_fails() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = VideoExporter::new(dir.path());
        assert!(matches!(exporter.export(&[]).await, Err(MediaError::EmptySequence)));
    }

    #[tokio::test]
    async fn test_export_undecodable_frame_fails_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = VideoExporter::new(dir.path());
        let images = vec![
            InlineImage::png(base64_png(2, 2)),
            InlineImage::from_bytes("image/png", b"not a png"),
        ];
        let err = exporter.export(&images).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidImage(_)));
    }

    #[tokio::test]
    async fn test_export_encodes_odd_sized_frames() {
        if crate::command::check_ffmpeg().is_err() {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let exporter = VideoExporter::new(dir.path()).with_timeout(60);
        if exporter.select_container().await.is_err() {
            eprintln!("no VP9 or H.264 encoder, skipping");
            return;
        }

        let images: Vec<InlineImage> = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]]
            .iter()
            .map(|color| InlineImage::from_bytes("image/png", &png_bytes(5, 3, *color)))
            .collect();

        let artifact = exporter.export(&images).await.unwrap();

        assert!(!artifact.bytes.is_empty());
        assert_eq!(artifact.image_count, 3);
        assert_eq!(artifact.capture_frames, 23);
        assert!(artifact.file_name.starts_with("motion-gen-"));
        assert!(artifact
            .file_name
            .ends_with(&format!(".{}", artifact.container.extension())));
        // The temporary output directory is gone
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    fn base64_png(width: u32, height: u32) -> String {
        InlineImage::from_bytes("image/png", &png_bytes(width, height, [9, 9, 9, 255])).data
    }
}
