//! Full-page capture
//!
//! Scrolls the page segment by segment, stitches the screenshots into one
//! image and pairs it with a filtered DOM snapshot. Every step of a capture
//! runs strictly in order: scrolling is a side effect on the one target page,
//! so nothing here is parallel and nothing is kept between captures.

pub mod dom;
pub mod options;
pub mod probe;
pub mod segments;
pub mod stitch;

pub use dom::snapshot_dom;
pub use options::CaptureOptions;
pub use probe::{probe_dimensions, PageDimensions};
pub use segments::{capture_segments, plan_scroll_offsets, ScreenshotSegment};
pub use stitch::stitch_segments;

use crate::error::{CaptureError, CaptureResult};
use crate::page::PageAutomation;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Viewport size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Everything produced by one full-page capture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullPageCaptureResult {
    /// PNG of the whole page (or the single viewport screenshot for short pages)
    #[serde(with = "base64_bytes")]
    pub stitched_image: Vec<u8>,

    /// Serialized DOM with non-rendered elements removed
    pub dom_snapshot: String,

    pub viewport: Viewport,

    pub total_height: u32,

    /// Segments actually captured; may cover less than `total_height` when
    /// the capture hit `max_segments`
    pub segment_count: usize,

    pub device_pixel_ratio: f64,

    /// ISO 8601 timestamp when the capture finished
    pub captured_at: String,

    /// SHA-256 of `stitched_image`
    pub image_hash: String,
}

impl FullPageCaptureResult {
    pub fn stitched_image_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.stitched_image)
    }
}

/// Capture the full page: probe, capture segments, stitch, snapshot DOM.
///
/// # Errors
///
/// Returns error if:
/// - The options are invalid
/// - The page dimensions cannot be read
/// - Any segment screenshot fails (no partial result is returned)
/// - Any segment cannot be decoded while stitching
/// - The DOM snapshot script fails
///
/// # Example
///
/// ```no_run
/// use pattern_hunter::{capture_full_page, CaptureOptions, ChromeDriver};
///
/// # async fn example() -> anyhow::Result<()> {
/// let driver = ChromeDriver::launch_auto().await?;
/// driver.navigate("https://example.com").await?;
///
/// let page = driver.current_page().await?;
/// let capture = capture_full_page(&page, &CaptureOptions::default()).await?;
/// println!("{} segments, {}px tall", capture.segment_count, capture.total_height);
/// # Ok(())
/// # }
/// ```
pub async fn capture_full_page<P>(
    page: &P,
    options: &CaptureOptions,
) -> CaptureResult<FullPageCaptureResult>
where
    P: PageAutomation + ?Sized,
{
    options.validate()?;

    log::info!("Probing page dimensions...");
    let dimensions = probe_dimensions(page).await?;

    log::info!(
        "Capturing {}px page with {}px viewport",
        dimensions.total_height,
        dimensions.viewport_height
    );
    let segments = capture_segments(page, &dimensions, options).await?;
    let segment_count = segments.len();

    let stitched_image = if segment_count == 1 {
        segments
            .into_iter()
            .next()
            .map(|segment| segment.image_data)
            .unwrap_or_default()
    } else {
        log::info!("Stitching {} segments...", segment_count);
        let (width, height) = (dimensions.viewport_width, dimensions.total_height);
        tokio::task::spawn_blocking(move || stitch_segments(&segments, width, height))
            .await
            .map_err(|e| CaptureError::Stitch {
                index: 0,
                reason: format!("stitching task failed: {}", e),
            })??
    };

    log::info!("Extracting DOM...");
    let dom_snapshot = snapshot_dom(page).await?;

    let image_hash = compute_bytes_hash(&stitched_image);

    log::info!(
        "Full-page capture complete: {} segment(s), {} KB image, {} KB DOM",
        segment_count,
        stitched_image.len() / 1024,
        dom_snapshot.len() / 1024
    );

    Ok(FullPageCaptureResult {
        stitched_image,
        dom_snapshot,
        viewport: Viewport {
            width: dimensions.viewport_width,
            height: dimensions.viewport_height,
        },
        total_height: dimensions.total_height,
        segment_count,
        device_pixel_ratio: dimensions.device_pixel_ratio,
        captured_at: chrono::Utc::now().to_rfc3339(),
        image_hash,
    })
}

/// Compute SHA-256 hash of a byte slice
fn compute_bytes_hash(content: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(content);
    let hash = hasher.finalize();

    format!("{:x}", hash)
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
