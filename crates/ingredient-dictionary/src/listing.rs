//! Scans over a rendered listing page snapshot.
//!
//! Two independent scans run over the same snapshot:
//! - "Read More" affordances, each resolved to an absolute detail-page URL
//! - unavailable rows: table-body headings that do not link anywhere

use crate::dom::{self, ancestor_named, element_text, next_sibling_text, parent_element};
use crate::types::{DictionaryError, DictionaryResult, LinkUrl, UnavailableRow};
use scraper::node::Node;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use url::Url;

/// Structural rules for the catalog listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRules {
    /// Exact (trimmed) text of the affordance that links to a detail page.
    pub read_more_label: String,
    /// Selector of the table body holding the listing rows.
    pub table_body: String,
    /// Selector of the per-row title heading.
    pub row_heading: String,
}

impl Default for ListingRules {
    fn default() -> Self {
        Self {
            read_more_label: "Read More".to_string(),
            table_body: "tbody".to_string(),
            row_heading: "h3".to_string(),
        }
    }
}

/// Result of scanning one listing snapshot.
#[derive(Debug)]
pub struct ListingScan {
    /// Detail-page links in document order, not deduplicated.
    pub links: Vec<LinkUrl>,
    /// Unavailable rows, or the page-level failure that prevented the scan.
    pub unavailable: DictionaryResult<Vec<UnavailableRow>>,
}

/// Run both listing scans over a raw HTML snapshot.
pub fn scan_listing(html: &str, origin: &Url, rules: &ListingRules) -> ListingScan {
    let document = Html::parse_document(html);
    ListingScan {
        links: read_more_links(&document, origin, rules),
        unavailable: scan_unavailable_rows(&document, rules),
    }
}

/// Resolve a listing `href` against the site origin.
///
/// Absolute hrefs are kept as-is; relative paths are joined onto the origin.
pub fn resolve_link(origin: &Url, href: &str) -> DictionaryResult<LinkUrl> {
    origin
        .join(href.trim())
        .map(|u| u.to_string())
        .map_err(|e| DictionaryError::InvalidUrl(format!("{href}: {e}")))
}

/// Every "Read More" affordance in the snapshot, resolved to absolute URLs.
///
/// The link is the `href` of the nearest anchor enclosing the label text.
/// Labels outside an anchor, anchors without `href` and unresolvable hrefs
/// are skipped.
pub fn read_more_links(document: &Html, origin: &Url, rules: &ListingRules) -> Vec<LinkUrl> {
    let mut links = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        if text.trim() != rules.read_more_label {
            continue;
        }
        let Some(anchor) = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "a")
        else {
            tracing::debug!("'{}' label outside of an anchor", rules.read_more_label);
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        match resolve_link(origin, href) {
            Ok(url) => links.push(url),
            Err(e) => tracing::warn!("skipping listing link: {e}"),
        }
    }

    links
}

/// Listing rows that have no detail page.
///
/// Scans every row heading inside the first table body. A heading that sits
/// inside an anchor, or whose parent also holds an anchor, belongs to an
/// available item and is skipped. For the rest, the heading text is the
/// title and the next sibling's text is the description; a heading with no
/// following sibling is skipped.
///
/// Returns `MissingElement` when the snapshot has no table body at all.
pub fn scan_unavailable_rows(
    document: &Html,
    rules: &ListingRules,
) -> DictionaryResult<Vec<UnavailableRow>> {
    let body_sel = dom::selector(&rules.table_body)?;
    let heading_sel = dom::selector(&rules.row_heading)?;
    let anchor_sel = dom::selector("a")?;

    let tbody = document
        .select(&body_sel)
        .next()
        .ok_or_else(|| DictionaryError::MissingElement(rules.table_body.clone()))?;

    let mut rows = Vec::new();
    for heading in tbody.select(&heading_sel) {
        let linked = ancestor_named(heading, "a").is_some()
            || parent_element(heading)
                .map(|parent| parent.select(&anchor_sel).next().is_some())
                .unwrap_or(false);
        if linked {
            continue;
        }

        let title = element_text(heading);
        match next_sibling_text(heading) {
            Some(description) => rows.push(UnavailableRow { title, description }),
            None => tracing::debug!("unavailable row '{title}' has no description"),
        }
    }

    Ok(rows)
}
