//! Overlay highlights for detected patterns
//!
//! A [`HighlightContext`] owns one overlay container injected into the page.
//! It is created explicitly, passed to every render call and disposed when
//! done, so several pages (or several passes on one page) never share state.

use crate::detection::{Detection, PatternKind};
use crate::error::{BrowserError, Result};
use crate::mapping::{
    clamp_bbox, is_valid_bbox, map_bounding_box_to_dom, mapping_context_for,
    CoordinateMappingResult, Size, NORMALIZED_SCALE,
};
use crate::page::PageAutomation;
use serde::Serialize;

// `__ID__` is replaced with the JSON-encoded container id.
const CREATE_CONTAINER_SCRIPT: &str = r#"
    (() => {
        const id = __ID__;
        let container = document.getElementById(id);
        if (!container) {
            container = document.createElement('div');
            container.id = id;
            container.setAttribute('data-pattern-hunter', 'overlay');
            Object.assign(container.style, {
                position: 'absolute',
                top: '0px',
                left: '0px',
                width: '0px',
                height: '0px',
                overflow: 'visible',
                pointerEvents: 'none',
                zIndex: '2147483647',
            });
            document.documentElement.appendChild(container);
        }
        return container.id;
    })()
"#;

// `__ID__` and `__BOXES__` are replaced with JSON values.
const RENDER_SCRIPT: &str = r#"
    (() => {
        const container = document.getElementById(__ID__);
        if (!container) return -1;
        container.replaceChildren();
        const boxes = __BOXES__;
        for (const b of boxes) {
            const el = document.createElement('div');
            el.className = 'pattern-hunter-highlight';
            Object.assign(el.style, {
                position: 'absolute',
                left: b.x + 'px',
                top: b.y + 'px',
                width: b.width + 'px',
                height: b.height + 'px',
                border: '2px solid ' + (b.snapped ? '#e11d48' : '#f59e0b'),
                background: 'rgba(225, 29, 72, 0.08)',
                boxSizing: 'border-box',
                pointerEvents: 'none',
            });
            const label = document.createElement('span');
            label.textContent = b.label;
            Object.assign(label.style, {
                position: 'absolute',
                left: '0px',
                top: '-18px',
                font: '11px/16px sans-serif',
                color: '#fff',
                background: '#e11d48',
                padding: '0 4px',
                whiteSpace: 'nowrap',
            });
            el.appendChild(label);
            container.appendChild(el);
        }
        return boxes.length;
    })()
"#;

const REMOVE_CONTAINER_SCRIPT: &str = r#"
    (() => {
        const container = document.getElementById(__ID__);
        if (container) container.remove();
        return true;
    })()
"#;

/// One drawn overlay and where it landed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    /// Index into the detections passed to [`HighlightContext::render`]
    pub detection_index: usize,
    pub kind: PatternKind,
    pub mapping: CoordinateMappingResult,
}

#[derive(Serialize)]
struct OverlayBox<'a> {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    label: &'a str,
    snapped: bool,
}

pub struct HighlightContext<'a, P: PageAutomation + ?Sized> {
    page: &'a P,
    container_id: String,
}

impl<'a, P: PageAutomation + ?Sized> HighlightContext<'a, P> {
    /// Inject a fresh overlay container into the page
    pub async fn create(page: &'a P) -> Result<Self> {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();
        let container_id = format!("pattern-hunter-overlay-{:x}", nanos);

        page.run_in_page(&with_id(CREATE_CONTAINER_SCRIPT, &container_id)?)
            .await
            .map_err(|e| BrowserError::ScriptFailed(format!("Failed to inject overlay: {}", e)))?;

        log::debug!("Created overlay container {}", container_id);
        Ok(Self { page, container_id })
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Map every locatable detection onto the page and draw it.
    ///
    /// Reads a fresh mapping context on each call, so calling this again after
    /// a scroll or resize re-aligns the overlays. Detections without a box are
    /// skipped; boxes outside the screenshot are clamped first.
    pub async fn render(
        &self,
        detections: &[Detection],
        screenshot_size: Size,
        default_normalized: bool,
    ) -> Result<Vec<Highlight>> {
        let base = mapping_context_for(self.page, screenshot_size, default_normalized).await?;
        let mut highlights = Vec::new();

        for (index, detection) in detections.iter().enumerate() {
            let Some(bbox) = detection.bbox else {
                log::debug!("Detection {} ({}) has no box, skipping", index, detection.kind);
                continue;
            };

            let mut context = base;
            context.is_normalized = detection.is_normalized(default_normalized);

            let bounds = if context.is_normalized {
                Size::new(NORMALIZED_SCALE, NORMALIZED_SCALE)
            } else {
                screenshot_size
            };
            let bbox = if is_valid_bbox(&bbox) {
                bbox
            } else {
                clamp_bbox(bbox, bounds)
            };

            let mapping = map_bounding_box_to_dom(self.page, bbox, &context).await;
            highlights.push(Highlight {
                detection_index: index,
                kind: detection.kind.clone(),
                mapping,
            });
        }

        let boxes: Vec<OverlayBox> = highlights
            .iter()
            .map(|h| OverlayBox {
                x: h.mapping.dom_x,
                y: h.mapping.dom_y,
                width: h.mapping.dom_width,
                height: h.mapping.dom_height,
                label: h.kind.as_str(),
                snapped: h.mapping.is_snapped(),
            })
            .collect();
        let boxes_json = serde_json::to_string(&boxes)
            .map_err(|e| BrowserError::Other(format!("Failed to serialize overlays: {}", e)))?;

        let script = with_id(RENDER_SCRIPT, &self.container_id)?.replace("__BOXES__", &boxes_json);
        self.page
            .run_in_page(&script)
            .await
            .map_err(|e| BrowserError::ScriptFailed(format!("Failed to draw overlays: {}", e)))?;

        log::info!(
            "Rendered {} highlight(s), {} snapped to elements",
            highlights.len(),
            highlights.iter().filter(|h| h.mapping.is_snapped()).count()
        );
        Ok(highlights)
    }

    /// Remove the overlay container from the page
    pub async fn dispose(self) -> Result<()> {
        self.page
            .run_in_page(&with_id(REMOVE_CONTAINER_SCRIPT, &self.container_id)?)
            .await
            .map_err(|e| BrowserError::ScriptFailed(format!("Failed to remove overlay: {}", e)))?;
        log::debug!("Disposed overlay container {}", self.container_id);
        Ok(())
    }
}

fn with_id(script: &str, id: &str) -> Result<String> {
    let id_json = serde_json::to_string(id)
        .map_err(|e| BrowserError::Other(format!("Failed to encode overlay id: {}", e)))?;
    Ok(script.replace("__ID__", &id_json))
}
