use serde::{Deserialize, Serialize};

/// Fixed scale used by models that report normalized coordinates
pub const NORMALIZED_SCALE: f64 = 1000.0;

/// Bounding box reported by the model.
///
/// Whether the values are on the 0-1000 scale or in screenshot pixels is not
/// encoded in the box; callers carry that flag separately.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// From `[x, y, width, height]`
    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Convert a 0-1000 box into pixels of an image of `size`
pub fn denormalize_bbox(bbox: BoundingBox, size: Size) -> BoundingBox {
    BoundingBox::new(
        bbox.x / NORMALIZED_SCALE * size.width,
        bbox.y / NORMALIZED_SCALE * size.height,
        bbox.width / NORMALIZED_SCALE * size.width,
        bbox.height / NORMALIZED_SCALE * size.height,
    )
}

/// Convert a pixel box of an image of `size` onto the 0-1000 scale.
///
/// Inverse of [`denormalize_bbox`]. A zero-sized image yields non-finite
/// values, which [`is_valid_bbox`] rejects.
pub fn normalize_bbox(bbox: BoundingBox, size: Size) -> BoundingBox {
    BoundingBox::new(
        bbox.x / size.width * NORMALIZED_SCALE,
        bbox.y / size.height * NORMALIZED_SCALE,
        bbox.width / size.width * NORMALIZED_SCALE,
        bbox.height / size.height * NORMALIZED_SCALE,
    )
}

pub fn is_valid_bbox(bbox: &BoundingBox) -> bool {
    bbox.to_array().iter().all(|v| v.is_finite())
        && bbox.x >= 0.0
        && bbox.y >= 0.0
        && bbox.width > 0.0
        && bbox.height > 0.0
}

/// Force a box inside `bounds`, logging a warning for every adjustment.
///
/// Negative origins move to 0 (keeping the right/bottom edge), boxes running
/// past the bounds are cut at the edge, and the result is at least 1px in each
/// dimension.
pub fn clamp_bbox(bbox: BoundingBox, bounds: Size) -> BoundingBox {
    let (x, width) = clamp_axis("x", bbox.x, bbox.width, bounds.width);
    let (y, height) = clamp_axis("y", bbox.y, bbox.height, bounds.height);
    BoundingBox::new(x, y, width, height)
}

fn clamp_axis(axis: &str, start: f64, extent: f64, limit: f64) -> (f64, f64) {
    let mut start = if start.is_finite() {
        start
    } else {
        log::warn!("Bounding box {} is not finite ({}), using 0", axis, start);
        0.0
    };
    let mut extent = if extent.is_finite() {
        extent
    } else {
        log::warn!("Bounding box {} extent is not finite ({}), using 1", axis, extent);
        1.0
    };

    if start < 0.0 {
        log::warn!("Bounding box {} is negative ({}), clamping to 0", axis, start);
        extent += start;
        start = 0.0;
    }

    if limit.is_finite() && limit > 0.0 {
        if start >= limit {
            log::warn!(
                "Bounding box {} ({}) is outside bounds ({}), moving inside",
                axis,
                start,
                limit
            );
            start = (limit - 1.0).max(0.0);
        }
        if start + extent > limit {
            log::warn!(
                "Bounding box {} extent runs past bounds ({} > {}), trimming",
                axis,
                start + extent,
                limit
            );
            extent = limit - start;
        }
    }

    if extent < 1.0 {
        log::warn!("Bounding box {} extent too small ({}), using 1", axis, extent);
        extent = 1.0;
    }

    (start, extent)
}
