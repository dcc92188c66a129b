//! Headless-browser screenshot capture over the Chrome DevTools
//! Protocol via chromiumoxide.
//!
//! Requires: Chrome or Chromium browser installed

use crate::types::{Result, ScanError};
use crate::vision::Screenshotter;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Counter for generating unique browser profile directories, so
/// parallel captures never share a user-data dir.
static BROWSER_INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Screenshot capability backed by a headless Chrome instance. A fresh
/// browser with its own profile directory is launched per capture and
/// torn down afterwards, keeping hung renders isolated.
pub struct BrowserScreenshotter {
    chrome_executable: Option<PathBuf>,
    user_agent: Option<String>,
    window: (u32, u32),
}

impl BrowserScreenshotter {
    pub fn new() -> Self {
        Self {
            chrome_executable: None,
            user_agent: None,
            window: (1920, 1080),
        }
    }

    /// Set an explicit Chrome/Chromium executable path; by default the
    /// system installation is auto-detected.
    pub fn with_chrome_executable(mut self, path: Option<PathBuf>) -> Self {
        self.chrome_executable = path;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    fn build_browser_config(&self, temp_dir: &Path) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(temp_dir)
            .window_size(self.window.0, self.window.1)
            .no_sandbox();

        if let Some(ref exe) = self.chrome_executable {
            builder = builder.chrome_executable(exe);
        }

        builder
            .build()
            .map_err(|e| ScanError::BrowserError(format!("failed to build browser config: {e}")))
    }

    async fn capture_page(&self, browser: &Browser, domain: &str, out_path: &Path) -> Result<()> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScanError::BrowserError(format!("failed to create page: {e}")))?;

        if let Some(ref ua) = self.user_agent {
            if let Err(e) = page.set_user_agent(ua).await {
                debug!("failed to set user agent: {e}");
            }
        }

        let url = format!("http://{domain}");
        debug!("navigating to {url}");
        if let Err(e) = page.goto(&url).await {
            return Err(ScanError::CaptureError {
                domain: domain.to_string(),
                reason: format!("navigation failed: {e}"),
            });
        }
        if let Err(e) = page.wait_for_navigation().await {
            debug!("navigation wait for {domain} errored (continuing): {e}");
        }

        wait_for_dom_stability(&page).await;

        page.save_screenshot(
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(false)
                .build(),
            out_path,
        )
        .await
        .map_err(|e| ScanError::CaptureError {
            domain: domain.to_string(),
            reason: format!("screenshot failed: {e}"),
        })?;

        Ok(())
    }
}

impl Default for BrowserScreenshotter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Screenshotter for BrowserScreenshotter {
    async fn capture(&self, domain: &str, out_path: &Path, timeout: Duration) -> Result<()> {
        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let instance_id = BROWSER_INSTANCE_COUNTER.fetch_add(1, Ordering::SeqCst);
        let temp_dir = std::env::temp_dir().join(format!(
            "squatscan-browser-{}-{}",
            std::process::id(),
            instance_id
        ));
        if let Err(e) = std::fs::create_dir_all(&temp_dir) {
            debug!("failed to create temp dir {temp_dir:?}: {e}");
        }

        let config = self.build_browser_config(&temp_dir)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScanError::BrowserError(format!("failed to launch browser: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        // Hard timeout around the whole capture to prevent hangs.
        let result = match tokio::time::timeout(
            timeout,
            self.capture_page(&browser, domain, out_path),
        )
        .await
        {
            Ok(r) => r,
            Err(_) => {
                warn!("capture of {domain} hit the {}s hard timeout", timeout.as_secs());
                Err(ScanError::CaptureError {
                    domain: domain.to_string(),
                    reason: "capture timed out".to_string(),
                })
            }
        };

        drop(browser);
        handler_task.abort();

        let temp_dir_for_cleanup = temp_dir.clone();
        tokio::spawn(async move {
            // Small delay so the browser has fully exited.
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Err(e) = std::fs::remove_dir_all(&temp_dir_for_cleanup) {
                debug!("failed to cleanup temp dir {temp_dir_for_cleanup:?}: {e}");
            }
        });

        result
    }
}

/// Wait until the DOM element count stops changing, so lazy-rendered
/// phishing kits are captured after their scripts settle.
async fn wait_for_dom_stability(page: &chromiumoxide::Page) {
    const CHECK_INTERVAL: Duration = Duration::from_millis(500);
    const MAX_CHECKS: usize = 10;
    const STABLE_CHECKS: usize = 3;

    let mut previous = dom_size(page).await;
    let mut stable = 0;

    for _ in 0..MAX_CHECKS {
        tokio::time::sleep(CHECK_INTERVAL).await;
        let current = dom_size(page).await;
        if current == previous && current.is_some() {
            stable += 1;
            if stable >= STABLE_CHECKS {
                return;
            }
        } else {
            stable = 0;
        }
        previous = current;
    }
    debug!("DOM did not stabilize in time, capturing anyway");
}

async fn dom_size(page: &chromiumoxide::Page) -> Option<i64> {
    page.evaluate("document.querySelectorAll('*').length")
        .await
        .ok()
        .and_then(|v| v.into_value::<i64>().ok())
}
