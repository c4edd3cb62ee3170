//! Scripted in-memory render context for pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};

use ingredient_crawler::config::{CrawlerConfig, SiteLayout, Timings};
use ingredient_crawler::renderer::{Locator, NavigationResult, RenderContext};

pub const BASE_URL: &str = "https://catalog.test/ingredient-dictionary";
pub const ORIGIN: &str = "https://catalog.test/";

/// One page of the fake listing.
#[derive(Debug, Clone)]
pub struct ListingFixture {
    pub html: String,
    pub has_next: bool,
}

#[derive(Debug, Clone)]
enum Current {
    Blank,
    Listing(usize),
    Detail(String),
}

/// A fake site: a paginated listing plus detail pages keyed by URL.
///
/// A detail URL mapped to `None` fails to navigate.
pub struct FakeContext {
    layout: SiteLayout,
    listing: Vec<ListingFixture>,
    details: HashMap<String, Option<String>>,
    current: Mutex<Current>,
    pub navigations: Mutex<Vec<String>>,
    pub scripts_run: AtomicUsize,
    pub show_all_clicked: AtomicBool,
    /// An overlay the dismiss script will close on its next run.
    pub overlay_open: AtomicBool,
    pub closed: AtomicBool,
    /// "Next page" keeps working past the last fixture, repeating it.
    pub endless: bool,
    pub fail_close: bool,
    /// Simulated load time of every detail page.
    pub detail_load: Duration,
}

impl FakeContext {
    pub fn new(listing: Vec<ListingFixture>) -> Self {
        Self {
            layout: SiteLayout::default(),
            listing,
            details: HashMap::new(),
            current: Mutex::new(Current::Blank),
            navigations: Mutex::new(Vec::new()),
            scripts_run: AtomicUsize::new(0),
            show_all_clicked: AtomicBool::new(false),
            overlay_open: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            endless: false,
            fail_close: false,
            detail_load: Duration::ZERO,
        }
    }

    pub fn with_detail(mut self, url: &str, html: Option<&str>) -> Self {
        self.details.insert(url.to_string(), html.map(str::to_string));
        self
    }

    /// Start on a detail page without navigating.
    pub fn showing(self, html: &str) -> Self {
        *self.current.lock().unwrap() = Current::Detail(html.to_string());
        self
    }

    pub fn navigated(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    fn current_html(&self) -> String {
        match &*self.current.lock().unwrap() {
            Current::Blank => "<html><body></body></html>".to_string(),
            Current::Listing(i) => self.listing[*i].html.clone(),
            Current::Detail(html) => html.clone(),
        }
    }

    fn has_next(&self) -> bool {
        match &*self.current.lock().unwrap() {
            Current::Listing(i) => self.listing[*i].has_next,
            _ => false,
        }
    }
}

#[async_trait]
impl RenderContext for FakeContext {
    async fn navigate(&self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        self.navigations.lock().unwrap().push(url.to_string());
        let next = if url == BASE_URL && !self.listing.is_empty() {
            Current::Listing(0)
        } else {
            match self.details.get(url) {
                Some(Some(html)) => {
                    if !self.detail_load.is_zero() {
                        tokio::time::sleep(self.detail_load).await;
                    }
                    Current::Detail(html.clone())
                }
                Some(None) => bail!("net::ERR_CONNECTION_RESET"),
                None => bail!("net::ERR_NAME_NOT_RESOLVED"),
            }
        };
        *self.current.lock().unwrap() = next;
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn execute_js(&self, _script: &str) -> Result<serde_json::Value> {
        self.scripts_run.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::Value::Bool(self.overlay_open.swap(false, Ordering::SeqCst)))
    }

    async fn get_html(&self) -> Result<String> {
        Ok(self.current_html())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        if *locator == self.layout.next_page {
            return Ok(usize::from(self.has_next()));
        }
        match locator {
            Locator::Css(css) => {
                let doc = Html::parse_document(&self.current_html());
                let sel = Selector::parse(css).map_err(|e| anyhow::anyhow!("{e:?}"))?;
                Ok(doc.select(&sel).count())
            }
            Locator::XPath(_) => Ok(0),
        }
    }

    async fn click(&self, locator: &Locator) -> Result<bool> {
        if *locator == self.layout.show_all {
            self.show_all_clicked.store(true, Ordering::SeqCst);
            return Ok(true);
        }
        if *locator == self.layout.next_page {
            let mut current = self.current.lock().unwrap();
            if let Current::Listing(i) = *current {
                if i + 1 < self.listing.len() {
                    *current = Current::Listing(i + 1);
                    return Ok(true);
                }
                if self.endless {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            bail!("browser already gone");
        }
        Ok(())
    }
}

/// Test configuration: fake site URLs, no delays, output in `dir`.
pub fn test_config(dir: &std::path::Path) -> CrawlerConfig {
    let mut cfg = CrawlerConfig {
        base_url: BASE_URL.to_string(),
        site_origin: ORIGIN.to_string(),
        timings: Timings::immediate(),
        ..CrawlerConfig::default()
    };
    cfg.output.dir = dir.to_path_buf();
    cfg
}

/// A listing page with linked rows for `available` slugs and bare rows for
/// `unavailable` (title, description) pairs.
pub fn listing_html(available: &[&str], unavailable: &[(&str, &str)]) -> String {
    let mut rows = String::new();
    for slug in available {
        rows.push_str(&format!(
            r#"<tr><td><a href="/ingredient-dictionary/{slug}.html"><h3>{slug}</h3></a>
               <a href="/ingredient-dictionary/{slug}.html"><span><span>Read More</span></span></a></td></tr>"#
        ));
    }
    for (title, description) in unavailable {
        rows.push_str(&format!(
            "<tr><td><h3>{title}</h3><p>{description}</p></td></tr>"
        ));
    }
    format!("<html><body><table><tbody>{rows}</tbody></table></body></html>")
}

pub fn page(html: String, has_next: bool) -> ListingFixture {
    ListingFixture { html, has_next }
}

pub fn detail_url(slug: &str) -> String {
    format!("{ORIGIN}ingredient-dictionary/{slug}.html")
}

pub fn detail_html(name: &str, rating: &str) -> String {
    format!(
        r#"<html><body><h1>{name}</h1>
           <div><span class="large7">Rating:</span> {rating}</div>
           <div><h2>{name} Description</h2></div>
           <div><p>About {name}.</p></div>
           </body></html>"#
    )
}
