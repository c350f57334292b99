//! Screenshot-to-DOM mapping and overlay highlights on a live page


use pattern_hunter::{
    map_bounding_box_to_dom, mapping_context_for, BoundingBox, ChromeDriver, ConnectionMode,
    DetectionReport, HighlightContext, PageAutomation, PatternKind, Rect, Size,
};
use test_server::TestServer;

/// Helper to create a headless driver for testing
async fn create_headless_driver() -> anyhow::Result<ChromeDriver> {
    ChromeDriver::new(ConnectionMode::Sandboxed {
        chrome_path: None,
        no_sandbox: true,
        headless: true,
    })
    .await
    .map_err(|e| anyhow::anyhow!("Failed to launch Chrome: {}", e))
}

#[tokio::test]
async fn test_box_snaps_to_button() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let driver = create_headless_driver().await?;

    driver.navigate(&server.page_url("/long")).await?;
    driver.set_viewport(1000, 800, 1.0).await?;
    let page = driver.current_page().await?;

    // Loose box inside the button, in screenshot pixels
    let context = mapping_context_for(&page, Size::new(1000.0, 800.0), false).await?;
    let result =
        map_bounding_box_to_dom(&page, BoundingBox::new(110.0, 110.0, 100.0, 30.0), &context)
            .await;

    let element = result
        .resolved_element
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("expected the box to resolve to an element"))?;
    assert_eq!(element.tag, "button");
    assert_eq!(element.id.as_deref(), Some("buy-now"));
    assert_eq!(element.selector, "#buy-now");
    assert!(element.text.contains("buy now"));
    assert_eq!(result.rect(), Rect::new(100.0, 100.0, 200.0, 50.0));

    println!("✅ Snapped to <{}> {}", element.tag, element.selector);
    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_scrolled_mapping_is_document_absolute() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let driver = create_headless_driver().await?;

    driver.navigate(&server.page_url("/long")).await?;
    driver.set_viewport(1000, 800, 1.0).await?;
    let page = driver.current_page().await?;
    assert_eq!(page.scroll_to(1200).await?, 1200);

    // Normalized box over the middle section: pixels (100, 320, 300, 80)
    let context = mapping_context_for(&page, Size::new(1000.0, 800.0), true).await?;
    assert_eq!(context.scroll_position.y, 1200.0);

    let result =
        map_bounding_box_to_dom(&page, BoundingBox::new(100.0, 400.0, 300.0, 100.0), &context)
            .await;

    let element = result
        .resolved_element
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("expected the middle section"))?;
    assert_eq!(element.id.as_deref(), Some("middle"));

    let rect = result
        .element_rect
        .ok_or_else(|| anyhow::anyhow!("snapped result must carry the element rect"))?;
    assert_eq!(rect.y, 1000.0);
    assert_eq!(rect.height, 1000.0);

    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_box_below_viewport_keeps_mapped_geometry() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let driver = create_headless_driver().await?;

    driver.navigate(&server.page_url("/long")).await?;
    driver.set_viewport(1000, 800, 1.0).await?;
    let page = driver.current_page().await?;

    // Box taken from the full stitched image, far below the visible area
    let context = mapping_context_for(&page, Size::new(1000.0, 3000.0), false).await?;
    let result =
        map_bounding_box_to_dom(&page, BoundingBox::new(100.0, 2000.0, 50.0, 50.0), &context)
            .await;

    assert!(!result.is_snapped());
    assert_eq!(result.rect(), Rect::new(100.0, 2000.0, 50.0, 50.0));

    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_highlight_lifecycle() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let driver = create_headless_driver().await?;

    driver.navigate(&server.page_url("/long")).await?;
    driver.set_viewport(1000, 800, 1.0).await?;
    let page = driver.current_page().await?;

    let answer = r#"```json
{"patterns": [
  {"type": "fake scarcity", "description": "Only 2 left", "bbox": [110, 140, 100, 40]},
  {"type": "confirmshaming", "description": "Guilt-trip opt out"}
]}
```"#;
    let report = DetectionReport::parse(answer)?;
    assert_eq!(report.locatable().count(), 1);

    let highlights = HighlightContext::create(&page).await?;
    let container_id = highlights.container_id().to_string();

    let drawn = highlights
        .render(&report.patterns, Size::new(1000.0, 800.0), true)
        .await?;
    assert_eq!(drawn.len(), 1);
    assert_eq!(drawn[0].kind, PatternKind::FakeScarcity);
    assert!(drawn[0].mapping.is_snapped());

    let overlay_count = page
        .run_in_page("document.querySelectorAll('.pattern-hunter-highlight').length")
        .await?;
    assert_eq!(overlay_count.as_u64(), Some(1));

    // Overlays must not intercept hit tests
    let hit = page.element_at_point(150.0, 125.0).await?;
    assert_eq!(
        hit.and_then(|h| h.element.id),
        Some("buy-now".to_string())
    );

    highlights.dispose().await?;
    let container_left = page
        .run_in_page(&format!(
            "document.getElementById({:?}) !== null",
            container_id
        ))
        .await?;
    assert_eq!(container_left.as_bool(), Some(false));

    println!("✅ Highlight created, rendered and disposed ({})", container_id);
    driver.close().await?;
    Ok(())
}
