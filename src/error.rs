use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to connect to Chrome: {0}")]
    ConnectionFailed(String),

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("No page available")]
    NoPage,

    #[error("Script execution failed: {0}")]
    ScriptFailed(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BrowserError>;

/// Errors raised by a single full-page capture.
///
/// Every variant is unrecoverable for the call that produced it. Nothing is
/// retried internally.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Invalid capture options: {0}")]
    InvalidOptions(String),

    #[error("Failed to probe page dimensions: {0}")]
    DimensionProbe(String),

    #[error("Failed to capture segment {index} at scrollY={scroll_y}: {reason}")]
    SegmentCapture {
        index: usize,
        scroll_y: u32,
        reason: String,
    },

    #[error("Failed to stitch segment {index}: {reason}")]
    Stitch { index: usize, reason: String },

    #[error("Failed to snapshot DOM: {0}")]
    DomSnapshot(String),

    #[error("Failed to parse detections: {0}")]
    Detection(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;
