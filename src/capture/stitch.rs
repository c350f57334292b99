use super::segments::ScreenshotSegment;
use crate::error::{CaptureError, CaptureResult};
use image::{imageops, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Composite segments into one PNG of `canvas_width` x `canvas_height` CSS pixels.
///
/// Segments are drawn in order at their scroll offset, so overlapping bands
/// end up with the later segment's pixels. When the backend captured at device
/// pixel scale, the canvas is scaled by the same factor as the first segment.
pub fn stitch_segments(
    segments: &[ScreenshotSegment],
    canvas_width: u32,
    canvas_height: u32,
) -> CaptureResult<Vec<u8>> {
    let mut canvas: Option<RgbaImage> = None;
    let mut scale = 1.0f64;

    for (index, segment) in segments.iter().enumerate() {
        let decoded = image::load_from_memory(&segment.image_data)
            .map_err(|e| CaptureError::Stitch {
                index,
                reason: e.to_string(),
            })?
            .to_rgba8();

        let canvas = canvas.get_or_insert_with(|| {
            if canvas_width > 0 && decoded.width() != canvas_width {
                scale = decoded.width() as f64 / canvas_width as f64;
                log::debug!("Segments captured at {:.2}x scale", scale);
            }
            RgbaImage::new(
                scaled(canvas_width, scale).max(1),
                scaled(canvas_height, scale).max(1),
            )
        });

        let y = scaled(segment.scroll_offset_y, scale) as i64;
        imageops::replace(canvas, &decoded, 0, y);
    }

    let canvas = canvas.ok_or_else(|| CaptureError::Stitch {
        index: 0,
        reason: "no segments to stitch".to_string(),
    })?;

    log::debug!(
        "Stitched {} segments into {}x{}",
        segments.len(),
        canvas.width(),
        canvas.height()
    );

    let mut bytes = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| CaptureError::Stitch {
            index: segments.len().saturating_sub(1),
            reason: format!("failed to encode stitched image: {}", e),
        })?;

    Ok(bytes)
}

fn scaled(value: u32, scale: f64) -> u32 {
    (value as f64 * scale).round() as u32
}
