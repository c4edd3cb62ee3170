//! Detail extractor: renders one detail page and parses it into a record.

use anyhow::{Context, Result};
use ingredient_dictionary::{parse_detail, IngredientRecord};

use crate::config::CrawlerConfig;
use crate::renderer::RenderContext;

/// Extracts records from detail pages. Calls are independent of each other.
pub struct DetailExtractor<'a> {
    ctx: &'a dyn RenderContext,
    config: &'a CrawlerConfig,
}

impl<'a> DetailExtractor<'a> {
    pub fn new(ctx: &'a dyn RenderContext, config: &'a CrawlerConfig) -> Self {
        Self { ctx, config }
    }

    /// Load `url` and build its record.
    ///
    /// A page that never shows its primary heading is still parsed, which
    /// may produce a partial record. Navigation or snapshot failures are
    /// errors for this URL only.
    pub async fn extract(&self, url: &str) -> Result<IngredientRecord> {
        let layout = &self.config.layout;
        let timings = &self.config.timings;

        self.ctx
            .navigate(url, timings.navigation_timeout_ms)
            .await
            .with_context(|| format!("failed to load {url}"))?;

        if !self
            .ctx
            .wait_for(&layout.detail_ready, timings.element_wait())
            .await
        {
            tracing::debug!(
                "{url}: no {} within {}ms",
                layout.detail_ready,
                timings.element_wait_ms
            );
        }

        let html = self
            .ctx
            .get_html()
            .await
            .with_context(|| format!("failed to snapshot {url}"))?;

        let record = parse_detail(&html, url, &layout.detail)?;
        tracing::debug!("{url}: {} section(s)", record.section_count());
        Ok(record)
    }
}
