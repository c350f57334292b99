use crate::error::{BrowserError, Result};
use crate::page::PageAutomation;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};

/// A Chrome tab driven over CDP
#[derive(Debug, Clone)]
pub struct ChromePage {
    page: Page,
}

impl ChromePage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Underlying chromiumoxide page for typed CDP access
    pub fn inner(&self) -> &Page {
        &self.page
    }
}

#[async_trait]
impl PageAutomation for ChromePage {
    async fn run_in_page(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::ScriptFailed(e.to_string()))?;

        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    async fn capture_visible_area(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(false)
                    .build(),
            )
            .await
            .map_err(|e| BrowserError::ScreenshotFailed(e.to_string()))
    }
}
