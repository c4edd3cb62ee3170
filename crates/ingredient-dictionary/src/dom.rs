//! Small helpers for walking a parsed snapshot with `scraper`.
//!
//! The catalog pages are not consistent about whitespace between blocks, so
//! sibling lookups here skip whitespace-only text nodes and comments.

use crate::types::{DictionaryError, DictionaryResult};
use scraper::node::Node;
use scraper::{ElementRef, Selector};

/// Parse a CSS selector, mapping failures into the crate error.
pub fn selector(css: &str) -> DictionaryResult<Selector> {
    Selector::parse(css).map_err(|e| DictionaryError::InvalidSelector(format!("{css}: {e:?}")))
}

/// Element text including all descendants, untrimmed.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Text of the next sibling that carries content (an element or non-blank
/// text), untrimmed.
pub fn next_sibling_text(el: ElementRef<'_>) -> Option<String> {
    el.next_siblings().find_map(|node| match node.value() {
        Node::Element(_) => ElementRef::wrap(node).map(element_text),
        Node::Text(text) if !text.trim().is_empty() => {
            let s: &str = text;
            Some(s.to_owned())
        }
        _ => None,
    })
}

/// Next sibling that is an element.
pub fn next_element_sibling(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

/// Nearest enclosing element.
pub fn parent_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}

/// Nearest ancestor element with the given tag name.
pub fn ancestor_named<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == tag)
}

/// Text of every element inside `container` matching `sel`, in document order.
pub fn collect_texts(container: ElementRef<'_>, sel: &Selector) -> Vec<String> {
    container.select(sel).map(element_text).collect()
}
