// Copyright 2026 Ingredient Dictionary Contributors
// SPDX-License-Identifier: MIT

//! Ingredient crawler: drives a live browser over the catalog listing and
//! detail pages.
//!
//! This library crate exposes the pipeline stages for integration testing.

pub mod config;
pub mod extractor;
pub mod orchestrator;
pub mod paginator;
pub mod renderer;
pub mod watchdog;

pub use config::CrawlerConfig;
pub use extractor::DetailExtractor;
pub use orchestrator::{CrawlState, Crawler, LinkSource, RunSummary};
pub use paginator::{Discovery, Paginator, Stabilization, StopReason};
pub use renderer::{Locator, NavigationResult, RenderContext};
pub use watchdog::{ModalWatchdog, WatchdogStats};
