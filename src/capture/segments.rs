use super::options::CaptureOptions;
use super::probe::PageDimensions;
use crate::error::{CaptureError, CaptureResult};
use crate::page::PageAutomation;

/// One viewport screenshot taken at a given scroll offset
#[derive(Debug, Clone)]
pub struct ScreenshotSegment {
    /// Encoded image bytes as returned by the screenshot backend
    pub image_data: Vec<u8>,
    pub scroll_offset_y: u32,
    /// Viewport size in CSS pixels at capture time
    pub width: u32,
    pub height: u32,
}

/// Scroll positions for a multi-segment capture.
///
/// Starts at 0 and advances by `segment_height - overlap` until the position
/// reaches `total_height` or `max_segments` offsets have been planned.
pub fn plan_scroll_offsets(total_height: u32, options: &CaptureOptions) -> Vec<u32> {
    let step = options.step().max(1);
    let mut offsets = Vec::new();
    let mut scroll_y = 0u32;

    while scroll_y < total_height && offsets.len() < options.max_segments {
        offsets.push(scroll_y);
        scroll_y = scroll_y.saturating_add(step);
    }

    if offsets.is_empty() {
        offsets.push(0);
    }
    offsets
}

/// Capture the segments covering the page.
///
/// Short pages (no taller than the viewport) take a single screenshot without
/// scrolling. Any failed screenshot aborts the whole capture.
pub async fn capture_segments<P>(
    page: &P,
    dimensions: &PageDimensions,
    options: &CaptureOptions,
) -> CaptureResult<Vec<ScreenshotSegment>>
where
    P: PageAutomation + ?Sized,
{
    if dimensions.total_height <= dimensions.viewport_height {
        log::info!("Page fits in viewport, capturing a single segment");
        let image_data = page.capture_visible_area().await.map_err(|e| {
            CaptureError::SegmentCapture {
                index: 0,
                scroll_y: 0,
                reason: e.to_string(),
            }
        })?;
        return Ok(vec![ScreenshotSegment {
            image_data,
            scroll_offset_y: 0,
            width: dimensions.viewport_width,
            height: dimensions.viewport_height,
        }]);
    }

    let offsets = plan_scroll_offsets(dimensions.total_height, options);
    let covered = offsets
        .last()
        .map(|last| last.saturating_add(dimensions.viewport_height))
        .unwrap_or(0);
    if covered < dimensions.total_height {
        log::info!(
            "Capture capped at {} segments, covering {}px of {}px",
            offsets.len(),
            covered,
            dimensions.total_height
        );
    }

    if options.step() > dimensions.viewport_height {
        log::warn!(
            "Scroll step {}px is taller than the {}px viewport, the stitched image will have gaps",
            options.step(),
            dimensions.viewport_height
        );
    }

    let original_scroll = match page.scroll_metrics().await {
        Ok(metrics) => Some(metrics.scroll_y),
        Err(e) => {
            log::warn!("Failed to read scroll position, it will not be restored: {}", e);
            None
        }
    };
    let result = capture_at_offsets(page, dimensions, options, &offsets).await;

    if let Some(original) = original_scroll {
        let original = original.max(0.0).round() as u32;
        if let Err(e) = page.scroll_to(original).await {
            log::warn!("Failed to restore scroll position {}: {}", original, e);
        }
    }

    result
}

async fn capture_at_offsets<P>(
    page: &P,
    dimensions: &PageDimensions,
    options: &CaptureOptions,
    offsets: &[u32],
) -> CaptureResult<Vec<ScreenshotSegment>>
where
    P: PageAutomation + ?Sized,
{
    let mut segments: Vec<ScreenshotSegment> = Vec::with_capacity(offsets.len());

    for (index, &scroll_y) in offsets.iter().enumerate() {
        let fail = |reason: String| CaptureError::SegmentCapture {
            index,
            scroll_y,
            reason,
        };

        // Segments are placed where the page really is, not where it was asked to go
        let actual_y = page
            .scroll_to(scroll_y)
            .await
            .map_err(|e| fail(e.to_string()))?;

        if let Some(previous) = segments.last() {
            if actual_y <= previous.scroll_offset_y {
                log::info!(
                    "Scroll stopped at {}px (requested {}px), page bottom reached after {} segments",
                    actual_y,
                    scroll_y,
                    segments.len()
                );
                break;
            }
        }
        if actual_y != scroll_y {
            log::debug!("Requested scrollY={} landed at {}", scroll_y, actual_y);
        }

        if options.wait_time_ms > 0 {
            tokio::time::sleep(options.settle_delay()).await;
        }

        let image_data = page
            .capture_visible_area()
            .await
            .map_err(|e| fail(e.to_string()))?;

        log::debug!(
            "Captured segment {}/{} at scrollY={} ({} KB)",
            index + 1,
            offsets.len(),
            actual_y,
            image_data.len() / 1024
        );

        segments.push(ScreenshotSegment {
            image_data,
            scroll_offset_y: actual_y,
            width: dimensions.viewport_width,
            height: dimensions.viewport_height,
        });
    }

    Ok(segments)
}
