use serde::{Deserialize, Serialize};

use crate::config::{ImportConfig, DEFAULT_CATEGORIES, DEFAULT_FALLBACK_CATEGORY};

/// One category label and the description substrings that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Ordered keyword matcher. Rules are tried in declaration order and the
/// first one with a keyword contained in the upper-cased description wins.
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<CategoryRule>,
    fallback: String,
}

impl Categorizer {
    pub fn new(rules: Vec<CategoryRule>, fallback: impl Into<String>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| CategoryRule {
                keywords: rule
                    .keywords
                    .iter()
                    .filter(|k| !k.trim().is_empty())
                    .map(|k| k.to_uppercase())
                    .collect(),
                label: rule.label,
            })
            .collect();
        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.categories.clone(), config.fallback_category.clone())
    }

    pub fn categorize(&self, description: &str) -> &str {
        let text = description.to_uppercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| text.contains(k.as_str())))
            .map_or(self.fallback.as_str(), |rule| rule.label.as_str())
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Every label this categorizer can return, fallback last.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .map(|r| r.label.as_str())
            .chain(std::iter::once(self.fallback.as_str()))
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_CATEGORIES
                .iter()
                .map(|(label, keywords)| CategoryRule::new(label, keywords))
                .collect(),
            DEFAULT_FALLBACK_CATEGORY,
        )
    }
}
