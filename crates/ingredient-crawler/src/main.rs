// Copyright 2026 Ingredient Dictionary Contributors
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use ingredient_crawler::config::CrawlerConfig;
use ingredient_crawler::orchestrator::{Crawler, LinkSource, RunSummary};
use ingredient_crawler::renderer::chromium::ChromiumSession;
use ingredient_crawler::renderer::RenderContext;

#[derive(Parser)]
#[command(
    name = "ingredient-crawler",
    about = "Crawl the ingredient dictionary into a JSON dataset",
    version
)]
struct Cli {
    /// Catalog listing URL
    #[arg(long)]
    base_url: Option<String>,

    /// Directory the JSON files are written to
    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    /// File name of the extracted dataset
    #[arg(long)]
    dataset_file: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    visible: bool,

    /// Browser locale (e.g. "en-US")
    #[arg(long)]
    lang: Option<String>,

    /// Path to the Chromium executable
    #[arg(long)]
    chrome_path: Option<PathBuf>,

    /// Stop paginating after this many pages in a row without links (0 = never)
    #[arg(long)]
    max_stalls: Option<u32>,

    /// Only extract the first N links
    #[arg(long)]
    limit: Option<usize>,

    /// Reuse the saved links file instead of walking the listing again
    #[arg(long)]
    skip_discovery: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    show_config: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Hide the progress bar
    #[arg(long, short)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn apply(&self, cfg: &mut CrawlerConfig) {
        if let Some(url) = &self.base_url {
            cfg.base_url = url.clone();
        }
        if let Some(dir) = &self.output_dir {
            cfg.output.dir = dir.clone();
        }
        if let Some(file) = &self.dataset_file {
            cfg.output.dataset_file = file.clone();
        }
        if self.visible {
            cfg.browser.headless = false;
        }
        if let Some(lang) = &self.lang {
            cfg.browser.lang = lang.clone();
        }
        if let Some(path) = &self.chrome_path {
            cfg.browser.chrome_executable = Some(path.clone());
        }
        if let Some(stalls) = self.max_stalls {
            cfg.max_consecutive_stalls = stalls;
        }
        if self.limit.is_some() {
            cfg.limit = self.limit;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = CrawlerConfig::from_env();
    cli.apply(&mut config);

    if cli.show_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::info!("starting ingredient-crawler v{}", env!("CARGO_PKG_VERSION"));

    let result = run(&cli, config).await;

    // Consistent exit codes: 0=success, 1=error
    match result {
        Ok(summary) => {
            print_summary(&summary, cli.json)?;
            Ok(())
        }
        Err(e) => {
            eprintln!("  Error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli, config: CrawlerConfig) -> Result<RunSummary> {
    let session = ChromiumSession::launch(&config.browser).await?;
    let ctx: Arc<dyn RenderContext> = Arc::new(session);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received interrupt, saving what we have");
            on_interrupt.cancel();
        }
    });

    let source = if cli.skip_discovery {
        LinkSource::Resume
    } else {
        LinkSource::Discover
    };

    Crawler::new(ctx, config, cancel)
        .with_link_source(source)
        .with_progress(!cli.quiet)
        .run()
        .await
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!(
            "Links: {} | Unavailable: {} | Extracted: {}/{} | Failed: {}{}",
            summary.links_discovered,
            summary.unavailable_rows,
            summary.extracted,
            summary.attempted,
            summary.failed,
            if summary.cancelled { " | cancelled" } else { "" }
        );
    }
    Ok(())
}
