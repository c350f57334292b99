use super::page::ChromePage;
use crate::error::{BrowserError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};

const CHROME_NOT_FOUND_HELP: &str = "Chrome not found. You can:\n\
     - Install Chrome: https://www.google.com/chrome/\n\
     - Ubuntu/Debian: sudo apt install chromium-browser\n\
     - Fedora: sudo dnf install chromium\n\
     - macOS: brew install --cask google-chrome\n\
     - Or specify path: --chrome-path /path/to/chrome\n\
     - Linux sandbox issue? Try: --no-sandbox";

pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for Chrome browser
pub enum ConnectionMode {
    /// Sandboxed mode - launches Chrome using system installation
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Advanced mode - connects to existing Chrome on debug port
    DebugPort(u16),
}

impl ChromeDriver {
    /// Helper method to get the current active page, excluding Chrome's new-tab-page
    async fn get_active_page(&self) -> Result<chromiumoxide::page::Page> {
        let pages = self.browser.pages().await?;

        // Prefer the first real page, then the most recently created one
        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        if let Some(page) = pages.last() {
            return Ok(page.clone());
        }

        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Other(format!("Failed to create page: {}", e)))
    }

    /// Launch Chrome with auto-detection for CI environments
    pub async fn launch_auto() -> Result<Self> {
        let is_ci = is_ci_environment();

        Self::new(ConnectionMode::Sandboxed {
            chrome_path: None,
            no_sandbox: is_ci, // CI environments typically need --no-sandbox
            headless: is_ci,
        })
        .await
    }

    /// Create new ChromeDriver with specified connection mode
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile directory so parallel instances never share state
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or_default();
                let temp_dir =
                    std::env::temp_dir().join(format!("pattern-hunter-chrome-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    BrowserError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };

                config = config.user_data_dir(&temp_dir);

                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }

                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                } else {
                    match Self::ensure_chrome_installed().await {
                        Ok(path) => {
                            config = config.chrome_executable(path);
                        }
                        Err(e) => {
                            log::warn!("Auto-download failed ({}), trying system Chrome...", e);
                        }
                    }
                }

                let config = config.build().map_err(|e| {
                    BrowserError::LaunchFailed(format!("{}. \n\n{}", e, CHROME_NOT_FOUND_HELP))
                })?;

                let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
                    BrowserError::LaunchFailed(format!("{}. \n\n{}", e, CHROME_NOT_FOUND_HELP))
                })?;

                tokio::spawn(async move {
                    while let Some(event) = handler.next().await {
                        if let Err(e) = event {
                            log::debug!("CDP handler error: {}", e);
                        }
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    BrowserError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                             Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while let Some(event) = handler.next().await {
                        if let Err(e) = event {
                            log::debug!("CDP handler error: {}", e);
                        }
                    }
                });

                (browser, None)
            }
        };

        Ok(Self { browser, temp_dir })
    }

    /// Navigate to a URL and wait for the load event
    pub async fn navigate(&self, url: &str) -> Result<()> {
        use chromiumoxide::cdp::browser_protocol::page::{EventLoadEventFired, NavigateParams};

        let normalized_url = normalize_url(url);
        log::info!("Navigating to {}", normalized_url);

        let page = self.get_active_page().await?;

        // Subscribe before navigating so a fast load is not missed
        let mut load_events = page
            .event_listener::<EventLoadEventFired>()
            .await
            .map_err(|e| BrowserError::NavigationFailed(format!("Failed to listen for load: {}", e)))?;

        let params = NavigateParams::builder()
            .url(&normalized_url)
            .build()
            .map_err(|e| {
                BrowserError::NavigationFailed(format!("Invalid URL {}: {}", normalized_url, e))
            })?;

        let response = page.execute(params).await.map_err(|e| {
            let error_str = e.to_string();

            // "oneshot canceled" means the browser connection is gone
            if error_str.contains("oneshot canceled") {
                BrowserError::NavigationFailed(
                    "Browser connection lost. The browser may have been closed or crashed. Please launch the browser again.".to_string()
                )
            } else {
                BrowserError::NavigationFailed(format!(
                    "Failed to navigate to {}: {}",
                    normalized_url, e
                ))
            }
        })?;

        if let Some(error_text) = response.result.error_text.clone() {
            log::error!("Navigation error from browser: {}", error_text);
            return Err(BrowserError::NavigationFailed(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        match tokio::time::timeout(tokio::time::Duration::from_secs(30), load_events.next()).await
        {
            Ok(Some(_)) => log::debug!("Page load event fired"),
            Ok(None) => log::warn!("Load event stream closed before the page loaded"),
            Err(_) => {
                return Err(BrowserError::NavigationFailed(format!(
                    "Request timed out after 30s waiting for {} to load",
                    normalized_url
                )));
            }
        }

        // Small delay for page state to stabilize
        tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
        Ok(())
    }

    /// Get current URL
    pub async fn current_url(&self) -> Result<String> {
        let page = self.get_active_page().await?;

        page.url()
            .await
            .map_err(|e| BrowserError::Other(e.to_string()))?
            .ok_or(BrowserError::NoPage)
    }

    /// Get page title
    pub async fn title(&self) -> Result<String> {
        let page = self.get_active_page().await?;

        page.get_title()
            .await
            .map_err(|e| BrowserError::Other(e.to_string()))?
            .ok_or(BrowserError::NoPage)
    }

    /// Get the active page as a capture target
    pub async fn current_page(&self) -> Result<ChromePage> {
        self.get_active_page().await.map(ChromePage::new)
    }

    /// Override viewport size and device pixel ratio of the active page
    pub async fn set_viewport(&self, width: u32, height: u32, device_scale_factor: f64) -> Result<()> {
        use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;

        let page = self.get_active_page().await?;
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(width))
            .height(i64::from(height))
            .device_scale_factor(device_scale_factor)
            .mobile(false)
            .build()
            .map_err(|e| BrowserError::Other(format!("Failed to build viewport params: {}", e)))?;

        page.execute(params).await?;
        log::debug!(
            "Viewport set to {}x{} @ {}x",
            width,
            height,
            device_scale_factor
        );
        Ok(())
    }

    /// Check if the browser is still alive and responsive
    pub async fn is_alive(&self) -> bool {
        match self.browser.pages().await {
            Ok(pages) => {
                if let Some(page) = pages.first() {
                    matches!(
                        tokio::time::timeout(tokio::time::Duration::from_secs(2), page.url()).await,
                        Ok(Ok(_))
                    )
                } else {
                    true
                }
            }
            Err(_) => false,
        }
    }

    /// Close the browser connection
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| BrowserError::Other(e.to_string()))?;
        Ok(())
    }

    /// Ensure Chrome is installed, downloading if necessary
    async fn ensure_chrome_installed() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| BrowserError::Other("Cannot determine cache directory".to_string()))?
            .join("pattern-hunter")
            .join("chrome");

        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| BrowserError::Other(format!("Failed to create cache dir: {}", e)))?;

        let marker = cache_dir.join(".downloaded");
        if marker.exists() {
            if let Some(executable) = Self::find_chrome_in_cache(&cache_dir).await {
                return Ok(executable);
            }
        }

        log::info!("Downloading Chrome for Testing (first time only, ~150MB)...");
        let fetcher = BrowserFetcher::new(
            BrowserFetcherOptions::builder()
                .with_path(&cache_dir)
                .build()
                .map_err(|e| BrowserError::Other(format!("Fetcher config failed: {}", e)))?,
        );

        let info = fetcher
            .fetch()
            .await
            .map_err(|e| BrowserError::Other(format!("Chrome download failed: {}", e)))?;

        tokio::fs::write(&marker, "downloaded")
            .await
            .map_err(|e| BrowserError::Other(format!("Failed to write marker: {}", e)))?;

        log::info!("Chrome downloaded to {}", info.executable_path.display());
        Ok(info.executable_path)
    }

    /// Find Chrome executable in cache directory
    async fn find_chrome_in_cache(cache_dir: &Path) -> Option<PathBuf> {
        let possible_paths = [
            cache_dir.join("chrome"),
            cache_dir.join("chrome.exe"),
            cache_dir.join("Google Chrome.app/Contents/MacOS/Google Chrome"),
            cache_dir.join("chrome-linux/chrome"),
            cache_dir.join("chrome-mac/Chromium.app/Contents/MacOS/Chromium"),
            cache_dir.join("chrome-win/chrome.exe"),
        ];

        possible_paths.into_iter().find(|path| path.exists())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}

/// Whether the process looks like it is running on a CI runner
pub fn is_ci_environment() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "JENKINS_HOME", "CIRCLECI"]
        .iter()
        .any(|var| std::env::var(var).is_ok())
}

/// Add `https://` when the URL has no recognised scheme
pub fn normalize_url(url: &str) -> String {
    const SCHEMES: [&str; 5] = ["http://", "https://", "file://", "about:", "data:"];

    if SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_adds_https() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("shop.example.com/cart"), "https://shop.example.com/cart");
    }

    #[test]
    fn test_normalize_url_keeps_known_schemes() {
        for url in [
            "http://localhost:8080",
            "https://example.com",
            "file:///tmp/page.html",
            "about:blank",
            "data:text/html,<p>hi</p>",
        ] {
            assert_eq!(normalize_url(url), url);
        }
    }
}
