use crate::error::{CaptureError, CaptureResult};
use crate::page::PageAutomation;

/// Serializes `document.documentElement` with non-rendered elements removed
/// (`display:none`, `visibility:hidden`, `opacity:0`, or zero-sized).
///
/// Embedded at compile time from dom_snapshot.js
pub const DOM_SNAPSHOT_SCRIPT: &str = include_str!("dom_snapshot.js");

/// Serialize the rendered part of the page's DOM.
pub async fn snapshot_dom<P>(page: &P) -> CaptureResult<String>
where
    P: PageAutomation + ?Sized,
{
    let value = page
        .run_in_page(DOM_SNAPSHOT_SCRIPT)
        .await
        .map_err(|e| CaptureError::DomSnapshot(e.to_string()))?;

    match value {
        serde_json::Value::String(html) => {
            log::debug!("DOM snapshot: {} KB", html.len() / 1024);
            Ok(html)
        }
        serde_json::Value::Null => Err(CaptureError::DomSnapshot(
            "page has no document element".to_string(),
        )),
        other => Err(CaptureError::DomSnapshot(format!(
            "expected serialized HTML, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    #[test]
    fn test_script_filters_all_hidden_kinds() {
        assert!(DOM_SNAPSHOT_SCRIPT.contains("display === 'none'"));
        assert!(DOM_SNAPSHOT_SCRIPT.contains("visibility === 'hidden'"));
        assert!(DOM_SNAPSHOT_SCRIPT.contains("opacity"));
        assert!(DOM_SNAPSHOT_SCRIPT.contains("rect.width === 0"));
        assert!(DOM_SNAPSHOT_SCRIPT.contains("cloneNode(true)"));
    }

    #[tokio::test]
    async fn test_snapshot_returns_page_html() {
        let mut page = FakePage::new(800.0, 1280.0, 800.0);
        page.dom = "<html><body><button>Accept all</button></body></html>".to_string();

        let html = snapshot_dom(&page).await.unwrap();
        assert!(html.contains("Accept all"));

        let scripts = page.scripts.lock().unwrap();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0], DOM_SNAPSHOT_SCRIPT);
    }
}
