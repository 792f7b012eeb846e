use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::categorize::CategoryRule;
use crate::tabular::TabularProfile;

/// Month names for long-form dates ("13 de Janeiro de 2026"), January first.
pub const DEFAULT_MONTHS: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho",
    "Julho", "Agosto", "Setembro", "Outubro", "Novembro", "Dezembro",
];

/// Category keyword table in precedence order: the first label whose keyword
/// list hits wins.
pub const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Alimentação",
        &[
            "LANCHES", "PIZZA", "HOTDOG", "SUSHI", "RESTAURANTE", "CONVENIENCIA",
            "ARCOS DOURADOS", "BOMFRIGO", "IFOOD", "UBER EATS",
        ],
    ),
    (
        "Transporte",
        &[
            "POSTOS", "COMBUSTIVEIS", "AUTO PECAS", "AUTO SERVICE", "GM PRIME",
            "UBER", "99APP", "ESTACIONAMENTO",
        ],
    ),
    ("Assinaturas", &["APPLE.COM", "NETFLIX", "SPOTIFY", "GOOGLE", "CLARO", "VIVO"]),
    ("Lazer", &["GELO E GELA", "CINEMA", "SHOPPING"]),
    ("Transferência", &["PIX RECEBIDO", "PIX ENVIADO", "TED", "DOC"]),
    ("Pagamentos", &["PAGAMENTO FATURA", "BOLETO", "CONSEC"]),
];

pub const DEFAULT_FALLBACK_CATEGORY: &str = "Outros";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Month table must list 12 names, got {0}")]
    MonthCount(usize),
    #[error("Category table is empty")]
    EmptyCategories,
    #[error("Category '{0}' has no keywords")]
    NoKeywords(String),
    #[error("Category '{0}' has a blank keyword")]
    BlankKeyword(String),
    #[error("Fallback category label is empty")]
    EmptyFallback,
    #[error("Thousands and decimal separators are both '{0}'")]
    AmbiguousSeparators(char),
    #[error("Invalid statement pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// How monetary strings are written in the source documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountLocale {
    pub currency_marker: String,
    pub thousands_separator: char,
    pub decimal_separator: char,
}

impl Default for AmountLocale {
    fn default() -> Self {
        Self {
            currency_marker: "R$".to_string(),
            thousands_separator: '.',
            decimal_separator: ',',
        }
    }
}

/// Immutable lookup data for one import locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub amount: AmountLocale,
    pub months: Vec<String>,
    pub categories: Vec<CategoryRule>,
    pub fallback_category: String,
    pub tabular: TabularProfile,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            amount: AmountLocale::default(),
            months: DEFAULT_MONTHS.iter().map(|m| m.to_string()).collect(),
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|(label, keywords)| CategoryRule::new(label, keywords))
                .collect(),
            fallback_category: DEFAULT_FALLBACK_CATEGORY.to_string(),
            tabular: TabularProfile::default(),
        }
    }
}

impl ImportConfig {
    /// Load overrides from TOML; omitted sections keep their defaults.
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: ImportConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.months.len() != 12 {
            return Err(ConfigError::MonthCount(self.months.len()));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::EmptyCategories);
        }
        if let Some(rule) = self.categories.iter().find(|r| r.keywords.is_empty()) {
            return Err(ConfigError::NoKeywords(rule.label.clone()));
        }
        // A blank keyword is contained in every description.
        if let Some(rule) = self
            .categories
            .iter()
            .find(|r| r.keywords.iter().any(|k| k.trim().is_empty()))
        {
            return Err(ConfigError::BlankKeyword(rule.label.clone()));
        }
        if self.fallback_category.trim().is_empty() {
            return Err(ConfigError::EmptyFallback);
        }
        if self.amount.thousands_separator == self.amount.decimal_separator {
            return Err(ConfigError::AmbiguousSeparators(self.amount.decimal_separator));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        ImportConfig::default().validate().unwrap();
    }

    #[test]
    fn default_category_order() {
        let labels: Vec<_> = ImportConfig::default()
            .categories
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(
            labels,
            ["Alimentação", "Transporte", "Assinaturas", "Lazer", "Transferência", "Pagamentos"]
        );
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = ImportConfig::from_toml("").unwrap();
        assert_eq!(config, ImportConfig::default());
    }

    #[test]
    fn toml_overrides_locale_and_categories() {
        let config = ImportConfig::from_toml(
            r#"
fallback_category = "Other"

[amount]
currency_marker = "US$"
thousands_separator = ","
decimal_separator = "."

[[categories]]
label = "Groceries"
keywords = ["WHOLE FOODS", "TRADER JOE"]
"#,
        )
        .unwrap();
        assert_eq!(config.amount.currency_marker, "US$");
        assert_eq!(config.amount.decimal_separator, '.');
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.fallback_category, "Other");
        // Untouched sections keep their defaults.
        assert_eq!(config.months[2], "Março");
    }

    #[test]
    fn short_month_table_rejected() {
        let err = ImportConfig::from_toml(r#"months = ["Jan", "Feb"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::MonthCount(2)));
    }

    #[test]
    fn category_without_keywords_rejected() {
        let err = ImportConfig::from_toml(
            r#"
[[categories]]
label = "Empty"
keywords = []
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NoKeywords(label) if label == "Empty"));
    }

    #[test]
    fn blank_keyword_rejected() {
        let err = ImportConfig::from_toml(
            r#"
[[categories]]
label = "Tudo"
keywords = ["PIX", "  "]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::BlankKeyword(label) if label == "Tudo"));
    }

    #[test]
    fn same_separators_rejected() {
        let err = ImportConfig::from_toml(
            r#"
[amount]
thousands_separator = ","
decimal_separator = ","
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::AmbiguousSeparators(',')));
    }

    #[test]
    fn malformed_toml_rejected() {
        assert!(matches!(
            ImportConfig::from_toml("months = ["),
            Err(ConfigError::Toml(_))
        ));
    }
}
