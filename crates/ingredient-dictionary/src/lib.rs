//! Ingredient dictionary: data model, snapshot extraction, and JSON datasets.
//!
//! Everything here works on static HTML snapshots; driving the browser that
//! produces them lives in `ingredient-crawler`.

pub mod detail;
pub mod dom;
pub mod listing;
pub mod storage;
pub mod types;

pub use detail::{parse_detail, DetailRules, FactRule};
pub use listing::{
    read_more_links, resolve_link, scan_listing, scan_unavailable_rows, ListingRules, ListingScan,
};
pub use storage::DatasetStore;
pub use types::*;
