//! Prompt construction.

use motion_models::{AspectRatio, Direction, ResolutionTier};

/// Prompt for one generated frame.
///
/// `index` is 1-based; frame 0 is always the seed image itself.
pub fn frame_prompt(index: usize, total: usize, description: &str, direction: Direction) -> String {
    let motion = if direction.is_zoom() {
        format!("the camera performing a steady {}", direction.label().to_lowercase())
    } else {
        format!("the camera panning steadily {}", direction.label().to_lowercase())
    };

    let description = description.trim();
    let subject = if description.is_empty() {
        "the scene in the reference image".to_string()
    } else {
        description.to_string()
    };

    format!(
        "The attached image is frame 0 of a short animated sequence of {total} further frames. \
Generate frame {index} of {total}, showing {subject} with {motion}. \
The motion must progress smoothly and proportionally: frame {index} is {index}/{total} of the way \
through the full movement ({direction}). Keep the subject, style, lighting, colors and framing \
consistent with the reference image. Return only the image.",
        direction = direction.label(),
    )
}

/// Prompt for upscaling one frame.
pub fn upscale_prompt(aspect_ratio: AspectRatio, resolution: ResolutionTier) -> String {
    format!(
        "Upscale this image to {resolution} resolution at a {aspect_ratio} aspect ratio. \
Preserve the composition, subject, colors and every detail exactly; only increase sharpness and \
fidelity. Do not add, remove or move anything. Return only the image."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_prompt_mentions_index_total_and_direction() {
        let prompt = frame_prompt(3, 10, "a red kite over the sea", Direction::ZoomIn);
        assert!(prompt.contains("frame 3 of 10"));
        assert!(prompt.contains("a red kite over the sea"));
        assert!(prompt.contains("Zoom In"));
        assert!(prompt.contains("zoom in"));
    }

    #[test]
    fn test_frame_prompt_blank_description() {
        let prompt = frame_prompt(1, 10, "   ", Direction::Left);
        assert!(prompt.contains("the scene in the reference image"));
        assert!(prompt.contains("panning steadily left"));
    }

    #[test]
    fn test_upscale_prompt() {
        let prompt = upscale_prompt(AspectRatio::LANDSCAPE_16_9, ResolutionTier::FourK);
        assert!(prompt.contains("4K"));
        assert!(prompt.contains("16:9"));
    }
}
