//! Crawler configuration: defaults, environment overrides, and the site layout.
//!
//! Precedence is defaults < `INGREDIENT_*` environment variables < CLI flags
//! (applied by `main`).

use std::path::PathBuf;
use std::time::Duration;

use ingredient_dictionary::{DetailRules, ListingRules};
use serde::Serialize;

use crate::renderer::Locator;

pub const DEFAULT_BASE_URL: &str = "https://www.paulaschoice.com/ingredient-dictionary";
pub const DEFAULT_LINKS_FILE: &str = "all_links.json";
pub const DEFAULT_UNAVAILABLE_FILE: &str = "unavailable_data.json";
pub const DEFAULT_DATASET_FILE: &str = "paulaschoice.json";

/// Everything a crawl run needs to know.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlerConfig {
    /// Listing page of the catalog.
    pub base_url: String,
    /// Origin that relative detail links are resolved against.
    pub site_origin: String,
    pub output: OutputConfig,
    pub browser: BrowserOptions,
    pub timings: Timings,
    /// Consecutive pages without links before pagination gives up.
    /// Zero disables the cutoff.
    pub max_consecutive_stalls: u32,
    /// Only extract the first N discovered links.
    pub limit: Option<usize>,
    pub layout: SiteLayout,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub links_file: String,
    pub unavailable_file: String,
    pub dataset_file: String,
}

/// Browser launch options.
#[derive(Debug, Clone, Serialize)]
pub struct BrowserOptions {
    pub headless: bool,
    /// Locale passed as `--lang`.
    pub lang: String,
    /// Explicit Chromium binary; discovered when unset.
    pub chrome_executable: Option<PathBuf>,
    pub ignore_certificate_errors: bool,
    pub no_sandbox: bool,
    pub disable_extensions: bool,
    /// Keep Chromium's own logging down to fatal errors.
    pub quiet_browser_logs: bool,
}

impl BrowserOptions {
    /// Extra command-line switches for the browser process.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![format!("--lang={}", self.lang)];
        if self.ignore_certificate_errors {
            args.push("--ignore-certificate-errors".to_string());
        }
        if self.no_sandbox {
            args.push("--no-sandbox".to_string());
        }
        if self.disable_extensions {
            args.push("--disable-extensions".to_string());
        }
        if self.quiet_browser_logs {
            args.push("--log-level=3".to_string());
        }
        // Hide the automation infobar and navigator.webdriver hint.
        args.push("--disable-blink-features=AutomationControlled".to_string());
        args
    }
}

/// Fixed delays and bounded waits, in milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct Timings {
    /// Delay after first loading the listing page.
    pub initial_settle_ms: u64,
    /// Delay at the top of every listing page.
    pub page_settle_ms: u64,
    /// Delay between stabilization polls.
    pub stabilize_poll_ms: u64,
    /// Stabilization polls before giving up on the heading threshold.
    pub stabilize_attempts: u32,
    /// Heading count that marks the listing as fully rendered.
    pub heading_threshold: usize,
    /// Bounded wait for a single element.
    pub element_wait_ms: u64,
    /// Delay after clicking "next page".
    pub after_click_ms: u64,
    pub watchdog_interval_ms: u64,
    pub navigation_timeout_ms: u64,
}

impl Timings {
    pub fn initial_settle(&self) -> Duration {
        Duration::from_millis(self.initial_settle_ms)
    }
    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }
    pub fn stabilize_poll(&self) -> Duration {
        Duration::from_millis(self.stabilize_poll_ms)
    }
    pub fn element_wait(&self) -> Duration {
        Duration::from_millis(self.element_wait_ms)
    }
    pub fn after_click(&self) -> Duration {
        Duration::from_millis(self.after_click_ms)
    }
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    /// No delays at all; every wait is a single check.
    pub fn immediate() -> Self {
        Self {
            initial_settle_ms: 0,
            page_settle_ms: 0,
            stabilize_poll_ms: 0,
            stabilize_attempts: 1,
            heading_threshold: 2000,
            element_wait_ms: 0,
            after_click_ms: 0,
            watchdog_interval_ms: 5,
            navigation_timeout_ms: 1000,
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            initial_settle_ms: 2_000,
            page_settle_ms: 5_000,
            stabilize_poll_ms: 2_000,
            stabilize_attempts: 5,
            heading_threshold: 2_000,
            element_wait_ms: 5_000,
            after_click_ms: 1_000,
            watchdog_interval_ms: 1_000,
            navigation_timeout_ms: 30_000,
        }
    }
}

/// Locators, injected scripts, and snapshot rules for the catalog site.
#[derive(Debug, Clone, Serialize)]
pub struct SiteLayout {
    /// Regional redirect prompt shown on first visit.
    pub region_gate: Locator,
    /// Tab that switches the listing to every category.
    pub show_all: Locator,
    pub next_page: Locator,
    /// Structural heading counted during stabilization.
    pub listing_heading: Locator,
    /// Primary heading of a detail page.
    pub detail_ready: Locator,
    /// Closes the recurring overlay; evaluates to `true` if it clicked.
    pub dismiss_modal_script: String,
    pub listing: ListingRules,
    pub detail: DetailRules,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            region_gate: Locator::xpath("//button[text()='Continue to US Site']"),
            show_all: Locator::xpath("//a[text()='All']"),
            next_page: Locator::xpath("//a[@aria-label='Next Page' and text()='>']"),
            listing_heading: Locator::css("h3"),
            detail_ready: Locator::css("h1"),
            dismiss_modal_script: r#"(() => {
                const modals = document.querySelectorAll("div[aria-modal='true']");
                const close = modals.length > 1 ? modals[1].querySelector("span") : null;
                if (!close) return false;
                close.click();
                return true;
            })()"#
                .to_string(),
            listing: ListingRules::default(),
            detail: DetailRules::default(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            site_origin: "https://www.paulaschoice.com/".to_string(),
            output: OutputConfig {
                dir: PathBuf::from("."),
                links_file: DEFAULT_LINKS_FILE.to_string(),
                unavailable_file: DEFAULT_UNAVAILABLE_FILE.to_string(),
                dataset_file: DEFAULT_DATASET_FILE.to_string(),
            },
            browser: BrowserOptions {
                headless: true,
                lang: "en-US".to_string(),
                chrome_executable: None,
                ignore_certificate_errors: true,
                no_sandbox: true,
                disable_extensions: true,
                quiet_browser_logs: true,
            },
            timings: Timings::default(),
            max_consecutive_stalls: 10,
            limit: None,
            layout: SiteLayout::default(),
        }
    }
}

impl CrawlerConfig {
    /// Defaults overridden by `INGREDIENT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut cfg = Self::default();
        if let Some(url) = read("INGREDIENT_BASE_URL") {
            cfg.base_url = url;
        }
        if let Some(origin) = read("INGREDIENT_SITE_ORIGIN") {
            cfg.site_origin = origin;
        }
        if let Some(dir) = read("INGREDIENT_OUTPUT_DIR") {
            cfg.output.dir = PathBuf::from(dir);
        }
        if let Some(file) = read("INGREDIENT_DATASET_FILE") {
            cfg.output.dataset_file = file;
        }
        if let Some(headless) = read("INGREDIENT_HEADLESS").and_then(|v| parse_bool(&v)) {
            cfg.browser.headless = headless;
        }
        if let Some(lang) = read("INGREDIENT_LANG") {
            cfg.browser.lang = lang;
        }
        if let Some(path) = read("INGREDIENT_CHROMIUM_PATH") {
            cfg.browser.chrome_executable = Some(PathBuf::from(path));
        }
        if let Some(stalls) = read("INGREDIENT_MAX_STALLS").and_then(|v| v.parse().ok()) {
            cfg.max_consecutive_stalls = stalls;
        }
        cfg
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
