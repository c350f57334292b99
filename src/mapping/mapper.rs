use super::bbox::{denormalize_bbox, BoundingBox, Size};
use crate::error::Result;
use crate::page::{ElementRef, PageAutomation, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

/// Everything needed to place a screenshot-space box on the live page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingContext {
    pub screenshot_size: Size,
    pub viewport_size: Size,
    pub scroll_position: ScrollPosition,
    pub device_pixel_ratio: f64,
    /// Box values are on the 0-1000 scale rather than screenshot pixels
    pub is_normalized: bool,
}

impl MappingContext {
    fn dpr_scale(&self) -> f64 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            1.0 / self.device_pixel_ratio
        } else {
            1.0
        }
    }
}

/// Box placed on the page, in document-absolute CSS pixels.
///
/// `element_rect` is the resolved element's live rect, also document-absolute.
/// When an element resolves, the `dom_*` values are that rect (snap-to-element);
/// otherwise they are the mapped model box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateMappingResult {
    pub dom_x: f64,
    pub dom_y: f64,
    pub dom_width: f64,
    pub dom_height: f64,
    pub resolved_element: Option<ElementRef>,
    pub element_rect: Option<Rect>,
}

impl CoordinateMappingResult {
    pub fn rect(&self) -> Rect {
        Rect::new(self.dom_x, self.dom_y, self.dom_width, self.dom_height)
    }

    pub fn is_snapped(&self) -> bool {
        self.resolved_element.is_some()
    }
}

/// Map a screenshot-space box to document-absolute CSS pixels without
/// touching the page: scale normalized values to screenshot pixels, divide by
/// the device pixel ratio, then add the scroll offset.
pub fn map_geometry(bbox: BoundingBox, context: &MappingContext) -> Rect {
    let pixels = if context.is_normalized {
        denormalize_bbox(bbox, context.screenshot_size)
    } else {
        bbox
    };

    // TODO: verify the 1/dpr direction against a backend that captures at native device scale
    let scale = context.dpr_scale();
    Rect::new(
        pixels.x * scale + context.scroll_position.x,
        pixels.y * scale + context.scroll_position.y,
        pixels.width * scale,
        pixels.height * scale,
    )
}

/// Place a model box on the live page and snap it to the element underneath.
///
/// Never fails: if the hit test finds nothing (or errors), the mapped box is
/// returned with no resolved element.
pub async fn map_bounding_box_to_dom<P>(
    page: &P,
    bbox: BoundingBox,
    context: &MappingContext,
) -> CoordinateMappingResult
where
    P: PageAutomation + ?Sized,
{
    let mapped = map_geometry(bbox, context);
    let (center_x, center_y) = mapped.center();
    let viewport_x = center_x - context.scroll_position.x;
    let viewport_y = center_y - context.scroll_position.y;

    let raw = CoordinateMappingResult {
        dom_x: mapped.x,
        dom_y: mapped.y,
        dom_width: mapped.width,
        dom_height: mapped.height,
        resolved_element: None,
        element_rect: None,
    };

    let outside_viewport = !context.viewport_size.is_empty()
        && (viewport_x < 0.0
            || viewport_y < 0.0
            || viewport_x >= context.viewport_size.width
            || viewport_y >= context.viewport_size.height);
    if outside_viewport {
        log::debug!(
            "Box centre ({:.1}, {:.1}) is outside the viewport, keeping mapped box",
            viewport_x,
            viewport_y
        );
        return raw;
    }

    match page.element_at_point(viewport_x, viewport_y).await {
        Ok(Some(resolved)) => {
            let rect = resolved
                .rect
                .translate(context.scroll_position.x, context.scroll_position.y);
            log::debug!("Snapped box to <{}> {}", resolved.element.tag, resolved.element.selector);
            CoordinateMappingResult {
                dom_x: rect.x,
                dom_y: rect.y,
                dom_width: rect.width,
                dom_height: rect.height,
                resolved_element: Some(resolved.element),
                element_rect: Some(rect),
            }
        }
        Ok(None) => raw,
        Err(e) => {
            log::warn!("Hit test failed, keeping mapped box: {}", e);
            raw
        }
    }
}

/// Read a fresh mapping context from the page for a screenshot of `screenshot_size`.
///
/// Scroll and viewport change constantly, so call this for every mapping pass
/// instead of reusing an older context.
pub async fn mapping_context_for<P>(
    page: &P,
    screenshot_size: Size,
    is_normalized: bool,
) -> Result<MappingContext>
where
    P: PageAutomation + ?Sized,
{
    let metrics = page.scroll_metrics().await?;
    Ok(MappingContext {
        screenshot_size,
        viewport_size: Size::new(metrics.viewport_width, metrics.viewport_height),
        scroll_position: ScrollPosition {
            x: metrics.scroll_x,
            y: metrics.scroll_y,
        },
        device_pixel_ratio: metrics.device_pixel_ratio,
        is_normalized,
    })
}
