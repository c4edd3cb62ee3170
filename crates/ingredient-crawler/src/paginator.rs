//! Listing paginator: walks every page of the catalog listing and collects
//! detail-page links and unavailable rows.
//!
//! The listing is rendered client-side and has no reliable "ready" signal,
//! so each page goes through a bounded stabilization wait before it is
//! snapshotted. Pagination ends when the "next page" control disappears,
//! or earlier if too many pages in a row yield no links.

use anyhow::{Context, Result};
use ingredient_dictionary::{scan_listing, LinkUrl, UnavailableRow};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::CrawlerConfig;
use crate::renderer::RenderContext;

/// Why pagination stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No "next page" control: the normal end of the listing.
    LastPage,
    /// The "next page" control was found but could not be clicked.
    NextPageFailed,
    /// Too many consecutive pages without links.
    StallCutoff,
    Cancelled,
}

/// How the stabilization wait for one page ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stabilization {
    /// The heading threshold was reached.
    Threshold,
    /// No "next page" control, so this is the last (short) page.
    LastPage,
    /// The poll budget ran out first.
    Exhausted,
    Cancelled,
}

/// Everything collected by one pass over the listing.
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    /// Links in page-traversal order, duplicates kept.
    pub links: Vec<LinkUrl>,
    pub unavailable: Vec<UnavailableRow>,
    pub pages: u32,
    /// Pages that yielded zero links.
    pub stalls: u32,
    pub stop_reason: StopReason,
}

/// Drives the listing page of a live render context.
pub struct Paginator<'a> {
    ctx: &'a dyn RenderContext,
    config: &'a CrawlerConfig,
    origin: Url,
    cancel: CancellationToken,
}

impl<'a> Paginator<'a> {
    pub fn new(
        ctx: &'a dyn RenderContext,
        config: &'a CrawlerConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let origin = Url::parse(&config.site_origin)
            .with_context(|| format!("invalid site origin: {}", config.site_origin))?;
        Ok(Self {
            ctx,
            config,
            origin,
            cancel,
        })
    }

    /// Open the listing and switch it to the "All" view.
    ///
    /// Only a failed navigation is an error; the region prompt, overlay and
    /// "All" tab are all best effort.
    pub async fn prepare(&self) -> Result<()> {
        let layout = &self.config.layout;
        let timings = &self.config.timings;

        let nav = self
            .ctx
            .navigate(&self.config.base_url, timings.navigation_timeout_ms)
            .await
            .context("failed to open the catalog listing")?;
        tracing::info!("opened {} in {}ms", nav.final_url, nav.load_time_ms);

        if !self.pause(timings.initial_settle()).await {
            return Ok(());
        }

        if self.ctx.wait_for(&layout.region_gate, timings.element_wait()).await {
            match self.ctx.click(&layout.region_gate).await {
                Ok(true) => tracing::debug!("dismissed region prompt"),
                Ok(false) => {}
                Err(e) => tracing::debug!("region prompt: {e:#}"),
            }
        }
        match self.ctx.execute_js(&layout.dismiss_modal_script).await {
            Ok(serde_json::Value::Bool(true)) => tracing::debug!("dismissed overlay"),
            Ok(_) => {}
            Err(e) => tracing::trace!("overlay dismiss: {e:#}"),
        }

        match self.ctx.click(&layout.show_all).await {
            Ok(true) => tracing::info!("switched listing to the \"All\" view"),
            Ok(false) => tracing::warn!("no \"All\" tab found; crawling the default view"),
            Err(e) => tracing::warn!("could not select the \"All\" view: {e:#}"),
        }
        Ok(())
    }

    /// Walk the listing until there is no next page.
    pub async fn discover_links(&self) -> Discovery {
        let timings = &self.config.timings;
        let next_page = &self.config.layout.next_page;
        let cutoff = self.config.max_consecutive_stalls;

        let mut discovery = Discovery {
            links: Vec::new(),
            unavailable: Vec::new(),
            pages: 0,
            stalls: 0,
            stop_reason: StopReason::LastPage,
        };
        let mut consecutive_stalls = 0u32;

        loop {
            if !self.pause(timings.page_settle()).await {
                discovery.stop_reason = StopReason::Cancelled;
                break;
            }
            let settled = self.stabilize().await;
            if settled == Stabilization::Cancelled {
                discovery.stop_reason = StopReason::Cancelled;
                break;
            }
            discovery.pages += 1;
            let page = discovery.pages;

            let html = match self.ctx.get_html().await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("page {page}: snapshot failed: {e:#}");
                    String::new()
                }
            };
            let scan = scan_listing(&html, &self.origin, &self.config.layout.listing);
            let rows = match scan.unavailable {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!("page {page}: unavailable-row scan failed: {e}");
                    Vec::new()
                }
            };

            tracing::info!(
                "page {page}: {} link(s), {} unavailable row(s) ({settled:?})",
                scan.links.len(),
                rows.len()
            );

            if scan.links.is_empty() {
                discovery.stalls += 1;
                consecutive_stalls += 1;
                tracing::warn!(
                    "page {page}: no links found ({consecutive_stalls} consecutive stall(s))"
                );
            } else {
                consecutive_stalls = 0;
            }
            discovery.links.extend(scan.links);
            discovery.unavailable.extend(rows);

            if cutoff > 0 && consecutive_stalls >= cutoff {
                tracing::warn!("giving up after {consecutive_stalls} pages without links");
                discovery.stop_reason = StopReason::StallCutoff;
                break;
            }

            if !self.ctx.wait_for(next_page, timings.element_wait()).await {
                discovery.stop_reason = StopReason::LastPage;
                break;
            }
            match self.ctx.click(next_page).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!("page {page}: next-page control vanished before the click");
                    discovery.stop_reason = StopReason::NextPageFailed;
                    break;
                }
                Err(e) => {
                    tracing::warn!("page {page}: next-page click failed: {e:#}");
                    discovery.stop_reason = StopReason::NextPageFailed;
                    break;
                }
            }
            if !self.pause(timings.after_click()).await {
                discovery.stop_reason = StopReason::Cancelled;
                break;
            }
        }

        tracing::info!(
            "discovery finished: {} link(s), {} unavailable row(s), {} page(s), \
             {} stall(s), stop={:?}",
            discovery.links.len(),
            discovery.unavailable.len(),
            discovery.pages,
            discovery.stalls,
            discovery.stop_reason
        );
        discovery
    }

    /// Bounded wait for the current page's content to finish rendering.
    pub async fn stabilize(&self) -> Stabilization {
        let timings = &self.config.timings;
        let layout = &self.config.layout;
        let attempts = timings.stabilize_attempts.max(1);

        for attempt in 1..=attempts {
            let headings = self.ctx.count(&layout.listing_heading).await.unwrap_or(0);
            if headings >= timings.heading_threshold {
                return Stabilization::Threshold;
            }
            if attempt == attempts {
                break;
            }
            // The last page never reaches the threshold.
            if !self.ctx.wait_for(&layout.next_page, timings.element_wait()).await {
                return Stabilization::LastPage;
            }
            tracing::debug!(
                "listing not settled: {headings}/{} headings (attempt {attempt}/{attempts})",
                timings.heading_threshold
            );
            if !self.pause(timings.stabilize_poll()).await {
                return Stabilization::Cancelled;
            }
        }
        Stabilization::Exhausted
    }

    /// Sleep unless cancelled. `false` means cancellation was requested.
    async fn pause(&self, duration: Duration) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if duration.is_zero() {
            return true;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
