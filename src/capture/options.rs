use crate::error::{CaptureError, CaptureResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for a single full-page capture
///
/// Missing fields fall back to [`CaptureOptions::default`] when deserialized,
/// so callers can send `{}` or just the values they care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureOptions {
    /// Hard cap on the number of segments (bounds cost on very long pages)
    pub max_segments: usize,

    /// Scroll step before overlap, in CSS pixels
    pub segment_height: u32,

    /// Pixels shared by consecutive segments
    pub overlap: u32,

    /// Settle delay after each scroll, before the screenshot
    pub wait_time_ms: u64,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            max_segments: 10,
            segment_height: 800,
            overlap: 0,
            wait_time_ms: 300,
        }
    }
}

impl CaptureOptions {
    pub fn validate(&self) -> CaptureResult<()> {
        if self.max_segments == 0 {
            return Err(CaptureError::InvalidOptions(
                "maxSegments must be greater than 0".to_string(),
            ));
        }
        if self.segment_height == 0 {
            return Err(CaptureError::InvalidOptions(
                "segmentHeight must be greater than 0".to_string(),
            ));
        }
        if self.overlap >= self.segment_height {
            return Err(CaptureError::InvalidOptions(format!(
                "overlap ({}) must be smaller than segmentHeight ({})",
                self.overlap, self.segment_height
            )));
        }
        Ok(())
    }

    /// Distance between consecutive scroll positions
    pub fn step(&self) -> u32 {
        self.segment_height.saturating_sub(self.overlap)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.wait_time_ms)
    }
}
