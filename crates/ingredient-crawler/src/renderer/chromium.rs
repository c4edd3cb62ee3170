//! Chromium-based render context using chromiumoxide.

use super::{Locator, NavigationResult, RenderContext};
use crate::config::BrowserOptions;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. INGREDIENT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("INGREDIENT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. A Chrome for Testing download under the home directory
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".cache/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".cache/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
            ]
        } else {
            vec![home.join(".cache/chromium/chrome-linux64/chrome")]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// One Chromium process driving a single page.
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    closed: AtomicBool,
}

impl ChromiumSession {
    /// Launch Chromium with `options` and open a blank page.
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder();

        match options.chrome_executable.clone().or_else(find_chromium) {
            Some(path) => {
                tracing::debug!("using browser at {}", path.display());
                builder = builder.chrome_executable(path);
            }
            None => tracing::debug!("no browser found, deferring to chromiumoxide discovery"),
        }
        if !options.headless {
            builder = builder.with_head();
        }
        for arg in options.launch_args() {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        tracing::info!(
            "Chromium session started (headless={}, lang={})",
            options.headless,
            options.lang
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl RenderContext for ChromiumSession {
    async fn navigate(&self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        match result {
            Ok(Ok(_)) => {
                // Wait for page to be loaded
                let _ = self.page.wait_for_navigation().await;

                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms: start.elapsed().as_millis() as u64,
                })
            }
            Ok(Err(e)) => bail!("navigation to {url} failed: {e}"),
            Err(_) => bail!("navigation to {url} timed out after {timeout_ms}ms"),
        }
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn get_html(&self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        let html: String = result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))?;

        Ok(html)
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        let script = format!("({}).length", locator.to_js_array());
        let value = self
            .execute_js(&script)
            .await
            .with_context(|| format!("failed to count {locator}"))?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn click(&self, locator: &Locator) -> Result<bool> {
        let script = format!(
            "(() => {{ const els = {}; if (!els.length) return false; \
             els[0].click(); return true; }})()",
            locator.to_js_array()
        );
        let value = self
            .execute_js(&script)
            .await
            .with_context(|| format!("failed to click {locator}"))?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.page.clone().close().await {
            tracing::debug!("page close: {e}");
        }

        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.context("failed to close browser");
        if let Err(e) = browser.wait().await {
            tracing::debug!("browser process wait: {e}");
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}
