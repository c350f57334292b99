use crate::error::{CaptureError, CaptureResult};
use crate::page::PageAutomation;
use serde::{Deserialize, Serialize};

/// Page geometry needed to plan a capture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDimensions {
    pub total_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub device_pixel_ratio: f64,
}

/// Read total scrollable height and viewport size from the page.
pub async fn probe_dimensions<P>(page: &P) -> CaptureResult<PageDimensions>
where
    P: PageAutomation + ?Sized,
{
    let metrics = page
        .scroll_metrics()
        .await
        .map_err(|e| CaptureError::DimensionProbe(e.to_string()))?;

    if !metrics.viewport_height.is_finite() || metrics.viewport_height < 1.0 {
        return Err(CaptureError::DimensionProbe(format!(
            "page reported an unusable viewport height ({})",
            metrics.viewport_height
        )));
    }
    if !metrics.viewport_width.is_finite() || metrics.viewport_width < 1.0 {
        return Err(CaptureError::DimensionProbe(format!(
            "page reported an unusable viewport width ({})",
            metrics.viewport_width
        )));
    }

    let dpr = if metrics.device_pixel_ratio.is_finite() && metrics.device_pixel_ratio > 0.0 {
        metrics.device_pixel_ratio
    } else {
        1.0
    };

    let dimensions = PageDimensions {
        total_height: metrics.total_height().ceil() as u32,
        viewport_width: metrics.viewport_width.round() as u32,
        viewport_height: metrics.viewport_height.round() as u32,
        device_pixel_ratio: dpr,
    };

    log::debug!(
        "Page dimensions: {}x{} viewport, {}px total, dpr {}",
        dimensions.viewport_width,
        dimensions.viewport_height,
        dimensions.total_height,
        dimensions.device_pixel_ratio
    );

    Ok(dimensions)
}
