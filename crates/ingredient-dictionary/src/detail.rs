//! Field extraction from a rendered ingredient detail page.
//!
//! Detail pages are not laid out consistently, so each section is located
//! independently and a missing section only leaves its field unset.

use crate::dom::{self, collect_texts, element_text, next_element_sibling, parent_element};
use crate::types::{DictionaryResult, IngredientRecord};
use scraper::Html;
use serde::{Deserialize, Serialize};

/// A "Keyword: value" fact rendered next to a styled marker element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRule {
    /// Substring that identifies the fact in the enclosing block's text.
    pub keyword: String,
    /// Literal removed from the block text to produce the value.
    pub prefix: String,
}

impl FactRule {
    fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            prefix: format!("{keyword}:"),
        }
    }
}

/// Structural rules for the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRules {
    /// Class carried by the marker element inside each fact block.
    pub fact_class: String,
    pub rating: FactRule,
    pub category: FactRule,
    pub benefits: FactRule,
    /// Selector of the section headings.
    pub section_heading: String,
    pub description_heading: String,
    pub references_heading: String,
    pub glance_heading: String,
}

impl Default for DetailRules {
    fn default() -> Self {
        Self {
            fact_class: "large7".to_string(),
            rating: FactRule::new("Rating"),
            category: FactRule::new("Categories"),
            benefits: FactRule::new("Benefits"),
            section_heading: "h2".to_string(),
            description_heading: "Description".to_string(),
            references_heading: "References".to_string(),
            glance_heading: "Glance".to_string(),
        }
    }
}

/// Build a record from a detail-page snapshot.
///
/// Only an unparsable rule selector is an error; absent sections are not.
pub fn parse_detail(
    html: &str,
    url: &str,
    rules: &DetailRules,
) -> DictionaryResult<IngredientRecord> {
    let document = Html::parse_document(html);
    let mut record = IngredientRecord::new(url);

    extract_facts(&document, rules, &mut record)?;
    extract_sections(&document, rules, &mut record)?;

    Ok(record)
}

fn extract_facts(
    document: &Html,
    rules: &DetailRules,
    record: &mut IngredientRecord,
) -> DictionaryResult<()> {
    let marker_sel = dom::selector(&format!(".{}", rules.fact_class))?;

    for marker in document.select(&marker_sel) {
        let Some(block) = parent_element(marker) else {
            continue;
        };
        let text = element_text(block);
        // A block may satisfy several keywords; each one is checked.
        assign_fact(&mut record.rating, "rating", &text, &rules.rating);
        assign_fact(&mut record.category, "category", &text, &rules.category);
        assign_fact(&mut record.benefits, "benefits", &text, &rules.benefits);
    }

    Ok(())
}

/// Last match wins.
fn assign_fact(slot: &mut Option<String>, field: &str, text: &str, rule: &FactRule) {
    if !text.contains(&rule.keyword) {
        return;
    }
    let value = text.replace(&rule.prefix, "");
    if let Some(previous) = slot.as_deref() {
        if previous != value {
            tracing::debug!("{field} overwritten: {previous:?} -> {value:?}");
        }
    }
    *slot = Some(value);
}

fn extract_sections(
    document: &Html,
    rules: &DetailRules,
    record: &mut IngredientRecord,
) -> DictionaryResult<()> {
    let heading_sel = dom::selector(&rules.section_heading)?;
    let paragraph_sel = dom::selector("p")?;
    let block_sel = dom::selector("div")?;
    let item_sel = dom::selector("li")?;

    for heading in document.select(&heading_sel) {
        let title = element_text(heading);

        // Description and References live in the container after the
        // heading's wrapper; Glance items follow the heading directly.
        if title.contains(&rules.description_heading) {
            match parent_element(heading).and_then(next_element_sibling) {
                Some(container) => {
                    record.description = Some(collect_texts(container, &paragraph_sel))
                }
                None => tracing::debug!("description heading without a content container"),
            }
        }
        if title.contains(&rules.references_heading) {
            match parent_element(heading).and_then(next_element_sibling) {
                Some(container) => record.references = Some(collect_texts(container, &block_sel)),
                None => tracing::debug!("references heading without a content container"),
            }
        }
        if title.contains(&rules.glance_heading) {
            match next_element_sibling(heading) {
                Some(list) => record.glance = Some(collect_texts(list, &item_sel)),
                None => tracing::debug!("glance heading without a list"),
            }
        }
    }

    Ok(())
}
