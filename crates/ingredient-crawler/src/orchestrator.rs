//! Run orchestration: discovery, the link checkpoint, sequential extraction,
//! and the final dataset.
//!
//! The browser context is shared with the modal watchdog for the whole run.
//! Whatever happens in between, the watchdog is stopped and the browser is
//! closed before `run` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ingredient_dictionary::{DatasetStore, IngredientRecord, LinkUrl, UnavailableRow};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::CrawlerConfig;
use crate::extractor::DetailExtractor;
use crate::paginator::{Paginator, StopReason};
use crate::renderer::RenderContext;
use crate::watchdog::ModalWatchdog;

/// Where the extraction stage gets its links from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    /// Walk the live listing.
    Discover,
    /// Reuse the links file written by an earlier run.
    Resume,
}

/// State accumulated over one run.
#[derive(Debug, Default)]
pub struct CrawlState {
    pub links: Vec<LinkUrl>,
    pub unavailable: Vec<UnavailableRow>,
    pub records: Vec<IngredientRecord>,
    finished: Arc<AtomicBool>,
}

impl CrawlState {
    /// The flag the watchdog polls.
    pub fn finished_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finished)
    }

    /// Flip the finished flag. Returns `false` if it was already set.
    pub fn mark_finished(&self) -> bool {
        !self.finished.swap(true, Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub links_discovered: usize,
    pub unavailable_rows: usize,
    pub pages: u32,
    pub stalls: u32,
    pub stop_reason: Option<StopReason>,
    pub attempted: usize,
    pub extracted: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub overlays_dismissed: u64,
}

/// One crawl run over a live render context.
pub struct Crawler {
    ctx: Arc<dyn RenderContext>,
    config: CrawlerConfig,
    store: DatasetStore,
    cancel: CancellationToken,
    source: LinkSource,
    show_progress: bool,
}

impl Crawler {
    pub fn new(
        ctx: Arc<dyn RenderContext>,
        config: CrawlerConfig,
        cancel: CancellationToken,
    ) -> Self {
        let store = DatasetStore::new(config.output.dir.clone());
        Self {
            ctx,
            config,
            store,
            cancel,
            source: LinkSource::Discover,
            show_progress: false,
        }
    }

    pub fn with_link_source(mut self, source: LinkSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run the whole pipeline.
    ///
    /// The dataset is saved whenever extraction was reached, including after
    /// a cancellation. Save failures are returned; a failure to close the
    /// browser is only logged.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut state = CrawlState::default();
        let mut summary = RunSummary::default();

        let watchdog = ModalWatchdog::spawn(
            Arc::clone(&self.ctx),
            self.config.layout.dismiss_modal_script.clone(),
            self.config.timings.watchdog_interval(),
            state.finished_flag(),
        );

        let staged = self.crawl(&mut state, &mut summary).await;

        state.mark_finished();
        summary.overlays_dismissed = watchdog.join().await.dismissed;

        let saved = match staged {
            Ok(()) => self
                .store
                .save(&self.config.output.dataset_file, &state.records)
                .with_context(|| format!("failed to save {}", self.config.output.dataset_file)),
            Err(e) => Err(e),
        };

        if let Err(e) = self.ctx.close().await {
            tracing::warn!("failed to close the browser: {e:#}");
        }

        let path = saved?;
        tracing::info!(
            "saved {} record(s) to {} ({} attempted, {} failed{})",
            summary.extracted,
            path.display(),
            summary.attempted,
            summary.failed,
            if summary.cancelled { ", cancelled" } else { "" }
        );
        Ok(summary)
    }

    /// Discovery plus the link checkpoint, then extraction.
    async fn crawl(&self, state: &mut CrawlState, summary: &mut RunSummary) -> Result<()> {
        match self.source {
            LinkSource::Discover => self.discover(state, summary).await?,
            LinkSource::Resume => {
                state.links = self.store.load(&self.config.output.links_file);
                if state.links.is_empty() {
                    bail!(
                        "no links to resume from in {}",
                        self.store.path_for(&self.config.output.links_file).display()
                    );
                }
                summary.links_discovered = state.links.len();
                tracing::info!("resuming with {} saved link(s)", state.links.len());
            }
        }

        self.extract_all(state, summary).await;
        Ok(())
    }

    async fn discover(&self, state: &mut CrawlState, summary: &mut RunSummary) -> Result<()> {
        let paginator = Paginator::new(self.ctx.as_ref(), &self.config, self.cancel.clone())?;
        paginator.prepare().await?;
        let discovery = paginator.discover_links().await;

        summary.links_discovered = discovery.links.len();
        summary.unavailable_rows = discovery.unavailable.len();
        summary.pages = discovery.pages;
        summary.stalls = discovery.stalls;
        summary.stop_reason = Some(discovery.stop_reason);
        summary.cancelled = discovery.stop_reason == StopReason::Cancelled;
        state.links = discovery.links;
        state.unavailable = discovery.unavailable;

        let output = &self.config.output;
        self.store
            .save(&output.unavailable_file, &state.unavailable)
            .with_context(|| format!("failed to save {}", output.unavailable_file))?;
        self.store
            .save(&output.links_file, &state.links)
            .with_context(|| format!("failed to save {}", output.links_file))?;

        tracing::info!(
            "total links found: {}, unavailable: {}",
            state.links.len(),
            state.unavailable.len()
        );
        Ok(())
    }

    /// Extract every link in order, one page at a time.
    async fn extract_all(&self, state: &mut CrawlState, summary: &mut RunSummary) {
        let extractor = DetailExtractor::new(self.ctx.as_ref(), &self.config);
        let total = self
            .config
            .limit
            .map_or(state.links.len(), |n| n.min(state.links.len()));
        let progress = self.progress_bar(total as u64);

        for (index, url) in state.links.iter().take(total).enumerate() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            progress.set_message(url.clone());
            tracing::debug!("extracting {}/{total}: {url}", index + 1);

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    summary.cancelled = true;
                    break;
                }
                outcome = extractor.extract(url) => outcome,
            };

            summary.attempted += 1;
            match outcome {
                Ok(record) => state.records.push(record),
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!("skipping {url}: {e:#}");
                }
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
        summary.extracted = state.records.len();
        if summary.cancelled {
            tracing::warn!(
                "extraction interrupted after {}/{total} page(s)",
                summary.attempted
            );
        }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {wide_msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(len).with_style(style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_flag_flips_once() {
        let state = CrawlState::default();
        let flag = state.finished_flag();
        assert!(!state.is_finished());
        assert!(state.mark_finished());
        assert!(!state.mark_finished());
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_summary_serializes_stop_reason() {
        let summary = RunSummary {
            stop_reason: Some(StopReason::StallCutoff),
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["stop_reason"], "stall_cutoff");
    }
}
