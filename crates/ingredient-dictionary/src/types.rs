//! Core data types for crawled ingredient records.

use serde::{Deserialize, Serialize};

/// An absolute URL pointing to an ingredient detail page.
pub type LinkUrl = String;

/// Structured facts extracted from one ingredient detail page.
///
/// Every field except `url` is optional: `None` means the page had no such
/// section, which is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub url: LinkUrl,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glance: Option<Vec<String>>,
}

impl IngredientRecord {
    /// An empty record for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Number of optional sections that were found on the page.
    pub fn section_count(&self) -> usize {
        [
            self.rating.is_some(),
            self.category.is_some(),
            self.benefits.is_some(),
            self.description.is_some(),
            self.references.is_some(),
            self.glance.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

/// A listing row with no detail page (discontinued or delisted item).
///
/// Titles are not unique across the listing; duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableRow {
    pub title: String,
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing element: {0}")]
    MissingElement(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

pub type DictionaryResult<T> = Result<T, DictionaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_sections_are_not_serialized() {
        let record = IngredientRecord {
            rating: Some(" Good".to_string()),
            ..IngredientRecord::new("https://example.com/a")
        };
        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("url"));
        assert!(obj.contains_key("rating"));
        assert!(!obj.contains_key("references"));
    }

    #[test]
    fn test_record_deserializes_without_optional_fields() {
        let record: IngredientRecord =
            serde_json::from_str(r#"{"url": "https://example.com/b"}"#).unwrap();
        assert_eq!(record, IngredientRecord::new("https://example.com/b"));
        assert_eq!(record.section_count(), 0);
    }

    #[test]
    fn test_section_count() {
        let record = IngredientRecord {
            description: Some(vec![]),
            glance: Some(vec!["one".into()]),
            ..IngredientRecord::new("u")
        };
        assert_eq!(record.section_count(), 2);
    }
}
