pub mod browser;
pub mod capture;
pub mod detection;
pub mod error;
pub mod highlight;
pub mod mapping;
pub mod page;

#[cfg(test)]
mod testing;

//  Re-export commonly used items
pub use browser::{ChromeDriver, ChromePage, ConnectionMode};
pub use capture::{capture_full_page, CaptureOptions, FullPageCaptureResult, Viewport};
pub use detection::{Detection, DetectionReport, PatternKind};
pub use error::{BrowserError, CaptureError};
pub use highlight::{Highlight, HighlightContext};
pub use mapping::{
    clamp_bbox, denormalize_bbox, is_valid_bbox, map_bounding_box_to_dom, mapping_context_for,
    normalize_bbox, BoundingBox, CoordinateMappingResult, MappingContext, ScrollPosition, Size,
};
pub use page::{ElementRef, PageAutomation, Rect, ResolvedElement, ScrollMetrics};
