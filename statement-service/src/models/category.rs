//! Category set and category-assignment provenance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of spending categories, plus the `UNKNOWN` marker the rule
/// table produces on a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Food & Dining")]
    FoodAndDining,
    Groceries,
    Transportation,
    Shopping,
    Entertainment,
    Utilities,
    Healthcare,
    Education,
    Income,
    Taxes,
    Transfers,
    Subscriptions,
    #[serde(rename = "Credit Card Payment")]
    CreditCardPayment,
    Other,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Category {
    /// The 14 assignable categories, in glossary order.
    pub const ALL: [Category; 14] = [
        Category::FoodAndDining,
        Category::Groceries,
        Category::Transportation,
        Category::Shopping,
        Category::Entertainment,
        Category::Utilities,
        Category::Healthcare,
        Category::Education,
        Category::Income,
        Category::Taxes,
        Category::Transfers,
        Category::Subscriptions,
        Category::CreditCardPayment,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FoodAndDining => "Food & Dining",
            Self::Groceries => "Groceries",
            Self::Transportation => "Transportation",
            Self::Shopping => "Shopping",
            Self::Entertainment => "Entertainment",
            Self::Utilities => "Utilities",
            Self::Healthcare => "Healthcare",
            Self::Education => "Education",
            Self::Income => "Income",
            Self::Taxes => "Taxes",
            Self::Transfers => "Transfers",
            Self::Subscriptions => "Subscriptions",
            Self::CreditCardPayment => "Credit Card Payment",
            Self::Other => "Other",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Resolve a free-form name (model output, user edit) to an assignable
    /// category. Case and surrounding punctuation are ignored; `UNKNOWN` is
    /// never returned.
    pub fn from_name(name: &str) -> Option<Category> {
        let cleaned = name
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '`')
            .trim();

        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_str().eq_ignore_ascii_case(cleaned))
    }

    /// Whether the assignment still needs a better answer than the rule table gave.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unknown | Self::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a category assignment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategorySource {
    Rule,
    Ai,
    AiCache,
    Manual,
}

impl CategorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Ai => "ai",
            Self::AiCache => "ai-cache",
            Self::Manual => "manual",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rule" => Some(Self::Rule),
            "ai" => Some(Self::Ai),
            "ai-cache" | "ai_cache" => Some(Self::AiCache),
            "manual" | "user" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Result of categorizing one description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryAssignment {
    pub category: Category,
    pub confidence: f64,
    pub source: CategorySource,
}

impl CategoryAssignment {
    pub fn new(category: Category, confidence: f64, source: CategorySource) -> Self {
        Self {
            category,
            confidence,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_ignores_case_and_punctuation() {
        assert_eq!(Category::from_name(" groceries. "), Some(Category::Groceries));
        assert_eq!(
            Category::from_name("\"Food & Dining\""),
            Some(Category::FoodAndDining)
        );
        assert_eq!(
            Category::from_name("credit card payment"),
            Some(Category::CreditCardPayment)
        );
    }

    #[test]
    fn from_name_rejects_names_outside_the_set() {
        assert_eq!(Category::from_name("UNKNOWN"), None);
        assert_eq!(Category::from_name("Pets"), None);
        assert_eq!(Category::from_name(""), None);
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&Category::FoodAndDining).unwrap();
        assert_eq!(json, "\"Food & Dining\"");
        let source = serde_json::to_string(&CategorySource::AiCache).unwrap();
        assert_eq!(source, "\"ai-cache\"");
    }

    #[test]
    fn source_names_round_trip_through_as_str() {
        for source in [
            CategorySource::Rule,
            CategorySource::Ai,
            CategorySource::AiCache,
            CategorySource::Manual,
        ] {
            assert_eq!(CategorySource::from_name(source.as_str()), Some(source));
        }
        assert_eq!(CategorySource::from_name("guess"), None);
    }
}
