//! Coordinate mapping from screenshot space to the live DOM
//!
//! Model boxes arrive either on a 0-1000 scale or in screenshot pixels. They
//! are converted to document-absolute CSS pixels and, when possible, snapped
//! to the element found under the box centre. Results are never cached.

pub mod bbox;
pub mod mapper;

pub use bbox::{
    clamp_bbox, denormalize_bbox, is_valid_bbox, normalize_bbox, BoundingBox, Size,
    NORMALIZED_SCALE,
};
pub use mapper::{
    map_bounding_box_to_dom, map_geometry, mapping_context_for, CoordinateMappingResult,
    MappingContext, ScrollPosition,
};
