//! Page automation seam
//!
//! Everything the capture pipeline and the highlighter need from a live page
//! goes through [`PageAutomation`]. The Chrome backend only has to provide
//! script evaluation and a visible-area screenshot; the scroll, metrics and
//! hit-test operations have default implementations built on top of
//! [`PageAutomation::run_in_page`].

use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const SCROLL_METRICS_SCRIPT: &str = r#"
    (() => {
        const doc = document.documentElement;
        const body = document.body;
        return {
            documentScrollHeight: doc ? doc.scrollHeight : 0,
            bodyScrollHeight: body ? body.scrollHeight : 0,
            documentOffsetHeight: doc ? doc.offsetHeight : 0,
            bodyOffsetHeight: body ? body.offsetHeight : 0,
            viewportWidth: window.innerWidth,
            viewportHeight: window.innerHeight,
            scrollX: window.scrollX,
            scrollY: window.scrollY,
            devicePixelRatio: window.devicePixelRatio || 1,
        };
    })()
"#;

// `__X__` / `__Y__` are substituted with viewport-relative CSS pixels.
const ELEMENT_AT_POINT_SCRIPT: &str = r#"
    (() => {
        const el = document.elementFromPoint(__X__, __Y__);
        if (!el || el === document.documentElement || el === document.body) {
            return null;
        }

        const path = [];
        let node = el;
        while (node && node.nodeType === 1 && node !== document.documentElement) {
            if (node.id) {
                path.unshift('#' + CSS.escape(node.id));
                break;
            }
            let part = node.tagName.toLowerCase();
            const parent = node.parentElement;
            if (parent) {
                const siblings = Array.from(parent.children).filter(c => c.tagName === node.tagName);
                if (siblings.length > 1) {
                    part += ':nth-of-type(' + (siblings.indexOf(node) + 1) + ')';
                }
            }
            path.unshift(part);
            node = parent;
        }

        const rect = el.getBoundingClientRect();
        return {
            element: {
                tag: el.tagName.toLowerCase(),
                id: el.id || null,
                classes: Array.from(el.classList),
                selector: path.join(' > '),
                text: (el.innerText || el.textContent || '').trim().substring(0, 120),
            },
            rect: { x: rect.left, y: rect.top, width: rect.width, height: rect.height },
        };
    })()
"#;

/// Raw scroll and viewport metrics reported by the page.
///
/// The four height metrics are kept separate because layout and quirks modes
/// disagree about which one holds the real document height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub document_scroll_height: f64,
    pub body_scroll_height: f64,
    pub document_offset_height: f64,
    pub body_offset_height: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub device_pixel_ratio: f64,
}

impl ScrollMetrics {
    /// Tallest of the four reported document heights
    pub fn total_height(&self) -> f64 {
        [
            self.document_scroll_height,
            self.body_scroll_height,
            self.document_offset_height,
            self.body_offset_height,
        ]
        .into_iter()
        .filter(|h| h.is_finite())
        .fold(0.0, f64::max)
    }
}

/// Axis-aligned rectangle in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Descriptor of a DOM element resolved by a hit test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRef {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    /// CSS selector path from the nearest ancestor with an id (or the root)
    pub selector: String,
    #[serde(default)]
    pub text: String,
}

/// Result of a point hit test: the element and its viewport-relative rect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedElement {
    pub element: ElementRef,
    pub rect: Rect,
}

/// Capabilities a page must expose to be captured and highlighted.
#[async_trait]
pub trait PageAutomation: Send + Sync {
    /// Evaluate a script in the page and return its JSON value
    async fn run_in_page(&self, script: &str) -> Result<serde_json::Value>;

    /// Screenshot of the currently visible viewport as encoded image bytes
    async fn capture_visible_area(&self) -> Result<Vec<u8>>;

    async fn scroll_metrics(&self) -> Result<ScrollMetrics> {
        let value = self.run_in_page(SCROLL_METRICS_SCRIPT).await?;
        serde_json::from_value(value)
            .map_err(|e| BrowserError::ScriptFailed(format!("Invalid scroll metrics: {}", e)))
    }

    /// Scroll to `y` and return the position the page actually settled at.
    ///
    /// Browsers stop at `scrollHeight - innerHeight`, so the result can be
    /// lower than the request near the bottom of the page.
    async fn scroll_to(&self, y: u32) -> Result<u32> {
        let value = self
            .run_in_page(&format!("window.scrollTo(0, {}); window.scrollY", y))
            .await?;

        match value.as_f64() {
            Some(actual) if actual.is_finite() => Ok(actual.max(0.0).round() as u32),
            _ => Err(BrowserError::ScriptFailed(format!(
                "Invalid scroll position: {}",
                value
            ))),
        }
    }

    /// Topmost element at a viewport-relative point.
    ///
    /// Returns `None` when nothing but the root or body is hit.
    async fn element_at_point(&self, x: f64, y: f64) -> Result<Option<ResolvedElement>> {
        if !x.is_finite() || !y.is_finite() {
            return Ok(None);
        }

        let script = ELEMENT_AT_POINT_SCRIPT
            .replace("__X__", &x.to_string())
            .replace("__Y__", &y.to_string());
        let value = self.run_in_page(&script).await?;
        if value.is_null() {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| BrowserError::ScriptFailed(format!("Invalid hit test result: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(heights: [f64; 4]) -> ScrollMetrics {
        ScrollMetrics {
            document_scroll_height: heights[0],
            body_scroll_height: heights[1],
            document_offset_height: heights[2],
            body_offset_height: heights[3],
            viewport_width: 1280.0,
            viewport_height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            device_pixel_ratio: 1.0,
        }
    }

    #[test]
    fn test_total_height_takes_max_of_four_metrics() {
        assert_eq!(metrics([1200.0, 900.0, 800.0, 2400.0]).total_height(), 2400.0);
        assert_eq!(metrics([3000.0, 0.0, 0.0, 0.0]).total_height(), 3000.0);
    }

    #[test]
    fn test_total_height_ignores_non_finite_metrics() {
        assert_eq!(metrics([f64::NAN, 900.0, f64::INFINITY, 0.0]).total_height(), 900.0);
    }

    #[test]
    fn test_scroll_metrics_deserializes_camel_case() {
        let json = serde_json::json!({
            "documentScrollHeight": 2500,
            "bodyScrollHeight": 2400,
            "documentOffsetHeight": 2500,
            "bodyOffsetHeight": 2380,
            "viewportWidth": 1280,
            "viewportHeight": 800,
            "scrollX": 0,
            "scrollY": 120,
            "devicePixelRatio": 2
        });

        let metrics: ScrollMetrics = serde_json::from_value(json).unwrap();
        assert_eq!(metrics.total_height(), 2500.0);
        assert_eq!(metrics.scroll_y, 120.0);
        assert_eq!(metrics.device_pixel_ratio, 2.0);
    }

    #[test]
    fn test_rect_center_and_translate() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.center(), (60.0, 45.0));
        assert_eq!(rect.translate(5.0, 100.0), Rect::new(15.0, 120.0, 100.0, 50.0));
    }

    /// Page whose every script evaluates to the same value
    struct ScriptedPage(serde_json::Value);

    #[async_trait]
    impl PageAutomation for ScriptedPage {
        async fn run_in_page(&self, _script: &str) -> Result<serde_json::Value> {
            Ok(self.0.clone())
        }

        async fn capture_visible_area(&self) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_scroll_to_reports_landed_position() {
        let page = ScriptedPage(serde_json::json!(1700.4));
        assert_eq!(page.scroll_to(2400).await.unwrap(), 1700);
    }

    #[tokio::test]
    async fn test_scroll_to_rejects_non_numeric_position() {
        let page = ScriptedPage(serde_json::Value::Null);
        let err = page.scroll_to(800).await.unwrap_err();
        assert!(matches!(err, BrowserError::ScriptFailed(_)));
    }

    #[test]
    fn test_element_script_placeholders() {
        assert!(ELEMENT_AT_POINT_SCRIPT.contains("__X__"));
        assert!(ELEMENT_AT_POINT_SCRIPT.contains("__Y__"));
        assert!(ELEMENT_AT_POINT_SCRIPT.contains("elementFromPoint"));
    }
}
