//! Renderer abstraction for the live browser session.
//!
//! The crawler only needs a handful of capabilities from the browser:
//! navigate, run script, count or click elements by locator, and take an
//! HTML snapshot. `RenderContext` captures exactly those, so the paginator
//! and extractor can run against a scripted context in tests.

pub mod chromium;

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Delay between checks while waiting for an element.
const WAIT_POLL: Duration = Duration::from_millis(250);

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// How to find elements in the live DOM.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "query", rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    pub fn css(query: impl Into<String>) -> Self {
        Self::Css(query.into())
    }

    pub fn xpath(query: impl Into<String>) -> Self {
        Self::XPath(query.into())
    }

    pub fn query(&self) -> &str {
        match self {
            Self::Css(q) | Self::XPath(q) => q,
        }
    }

    /// A JS expression evaluating to an array of the matching elements.
    pub fn to_js_array(&self) -> String {
        // A JSON string literal is a valid JS string literal.
        let quoted = serde_json::to_string(self.query()).unwrap_or_else(|_| "\"\"".to_string());
        match self {
            Self::Css(_) => format!("Array.from(document.querySelectorAll({quoted}))"),
            Self::XPath(_) => format!(
                "(() => {{ const r = document.evaluate({quoted}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
                 return out; }})()"
            ),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(q) => write!(f, "css:{q}"),
            Self::XPath(q) => write!(f, "xpath:{q}"),
        }
    }
}

/// A single live browser page shared by the crawl.
///
/// All methods take `&self` so the modal watchdog can hold the same context
/// as the main flow.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the full rendered HTML.
    async fn get_html(&self) -> Result<String>;
    /// Number of elements currently matching `locator`.
    async fn count(&self, locator: &Locator) -> Result<usize>;
    /// Click the first element matching `locator`. `false` if none matched.
    async fn click(&self, locator: &Locator) -> Result<bool>;
    /// Close the page and the browser behind it.
    async fn close(&self) -> Result<()>;

    /// Poll until `locator` matches something or `timeout` elapses.
    ///
    /// Lookup errors count as "not there yet". Always checks at least once.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if matches!(self.count(locator).await, Ok(n) if n > 0) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(WAIT_POLL.min(deadline - now)).await;
        }
    }
}
