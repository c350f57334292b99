//! In-memory page and log capture used by unit tests

use crate::error::{BrowserError, Result};
use crate::page::{PageAutomation, ResolvedElement, ScrollMetrics};
use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::{Mutex, Once};

pub fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Viewport screenshot of a page whose row `y` has red channel `y / 10`
pub fn page_rows_png(width: u32, height: u32, scroll_y: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |_, row| {
        Rgba([row_red(scroll_y + row), 0, 0, 255])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Red channel of document row `y` in [`page_rows_png`] screenshots
pub fn row_red(y: u32) -> u8 {
    (y / 10).min(255) as u8
}

/// Colour used for the n-th capture of a [`FakePage`]
pub fn capture_color(index: usize) -> [u8; 4] {
    [(index as u8).wrapping_mul(40).wrapping_add(20), 100, 200, 255]
}

pub struct FakePage {
    pub metrics: ScrollMetrics,
    pub dom: String,
    pub element: Option<ResolvedElement>,
    /// Zero-based capture index that should fail
    pub fail_capture_at: Option<usize>,
    pub scroll_calls: Mutex<Vec<u32>>,
    pub hit_points: Mutex<Vec<(f64, f64)>>,
    pub scripts: Mutex<Vec<String>>,
    /// Stop scrolling at `total - viewport` like a browser does
    pub clamp_scroll: bool,
    /// Screenshots show document rows (see [`page_rows_png`]) instead of a
    /// solid colour per capture
    pub render_rows: bool,
    pub fail_scroll_metrics: bool,
    position: Mutex<u32>,
    captures: Mutex<usize>,
}

impl FakePage {
    pub fn new(total_height: f64, viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            metrics: ScrollMetrics {
                document_scroll_height: total_height,
                body_scroll_height: total_height,
                document_offset_height: total_height,
                body_offset_height: total_height,
                viewport_width,
                viewport_height,
                scroll_x: 0.0,
                scroll_y: 0.0,
                device_pixel_ratio: 1.0,
            },
            dom: "<html><head></head><body><p>fake</p></body></html>".to_string(),
            element: None,
            fail_capture_at: None,
            scroll_calls: Mutex::new(Vec::new()),
            hit_points: Mutex::new(Vec::new()),
            scripts: Mutex::new(Vec::new()),
            clamp_scroll: false,
            render_rows: false,
            fail_scroll_metrics: false,
            position: Mutex::new(0),
            captures: Mutex::new(0),
        }
    }

    pub fn scrolls(&self) -> Vec<u32> {
        self.scroll_calls.lock().unwrap().clone()
    }

    pub fn capture_count(&self) -> usize {
        *self.captures.lock().unwrap()
    }
}

#[async_trait]
impl PageAutomation for FakePage {
    async fn run_in_page(&self, script: &str) -> Result<serde_json::Value> {
        self.scripts.lock().unwrap().push(script.to_string());
        Ok(serde_json::Value::String(self.dom.clone()))
    }

    async fn capture_visible_area(&self) -> Result<Vec<u8>> {
        let index = {
            let mut captures = self.captures.lock().unwrap();
            let index = *captures;
            *captures += 1;
            index
        };

        if self.fail_capture_at == Some(index) {
            return Err(BrowserError::ScreenshotFailed("target closed".to_string()));
        }

        let (width, height) = (
            self.metrics.viewport_width as u32,
            self.metrics.viewport_height as u32,
        );
        if self.render_rows {
            return Ok(page_rows_png(width, height, *self.position.lock().unwrap()));
        }
        Ok(solid_png(width, height, capture_color(index)))
    }

    async fn scroll_metrics(&self) -> Result<ScrollMetrics> {
        if self.fail_scroll_metrics {
            return Err(BrowserError::ScriptFailed("execution context destroyed".to_string()));
        }
        Ok(self.metrics)
    }

    async fn scroll_to(&self, y: u32) -> Result<u32> {
        self.scroll_calls.lock().unwrap().push(y);

        let actual = if self.clamp_scroll {
            let max = (self.metrics.total_height() - self.metrics.viewport_height).max(0.0);
            y.min(max as u32)
        } else {
            y
        };
        *self.position.lock().unwrap() = actual;
        Ok(actual)
    }

    async fn element_at_point(&self, x: f64, y: f64) -> Result<Option<ResolvedElement>> {
        self.hit_points.lock().unwrap().push((x, y));
        Ok(self.element.clone())
    }
}

/// Process-wide logger that keeps every record for later assertions
struct CapturingLogger {
    records: Mutex<Vec<(log::Level, String)>>,
}

impl log::Log for CapturingLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger {
    records: Mutex::new(Vec::new()),
};
static LOGGER_INIT: Once = Once::new();

/// Install the capturing logger (once per test binary)
pub fn capture_logs() {
    LOGGER_INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(log::LevelFilter::Trace);
    });
}

/// Messages logged at `level` that contain `needle`.
///
/// Tests run in parallel and share the logger, so match on text unique to
/// the test.
pub fn logged(level: log::Level, needle: &str) -> Vec<String> {
    LOGGER
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(l, message)| *l == level && message.contains(needle))
        .map(|(_, message)| message.clone())
        .collect()
}
