//! Locale-aware parsing of statement amounts and dates.
//!
//! Dates come out as canonical `YYYY-MM-DD` strings. Calendar validity is not
//! checked here; the assembler rejects impossible dates later.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::config::{AmountLocale, ConfigError, ImportConfig, DEFAULT_MONTHS};

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_long_date, r"(\d+)\s+de\s+(\w+)\s+de\s+(\d{4})");
re!(re_iso_date, r"^(\d{4}-\d{2}-\d{2})(?:[ T].*)?$");

/// Month used when a long-form date names a month missing from the table.
pub const UNKNOWN_MONTH_FALLBACK: u32 = 1;

/// Why a single row or line was dropped. Never escapes a parse call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejected {
    #[error("missing {0} cell")]
    MissingCell(&'static str),
    #[error("unparseable amount '{0}'")]
    Amount(String),
    #[error("unparseable date '{0}'")]
    Date(String),
    #[error("empty description")]
    EmptyDescription,
}

/// Twelve month names, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthTable {
    names: Vec<String>,
}

impl MonthTable {
    pub fn new(names: Vec<String>) -> Result<Self, ConfigError> {
        if names.len() != 12 {
            return Err(ConfigError::MonthCount(names.len()));
        }
        Ok(Self {
            names: names.into_iter().map(|n| n.to_lowercase()).collect(),
        })
    }

    /// 1-based month number, or `None` when the name is not in the table.
    pub fn number(&self, name: &str) -> Option<u32> {
        let name = name.to_lowercase();
        self.names
            .iter()
            .position(|n| *n == name)
            .map(|idx| idx as u32 + 1)
    }
}

impl Default for MonthTable {
    fn default() -> Self {
        Self {
            names: DEFAULT_MONTHS.iter().map(|n| n.to_lowercase()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    locale: AmountLocale,
    months: MonthTable,
}

impl Normalizer {
    pub fn new(locale: AmountLocale, months: MonthTable) -> Self {
        Self { locale, months }
    }

    pub fn from_config(config: &ImportConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.amount.clone(), MonthTable::new(config.months.clone())?))
    }

    pub fn locale(&self) -> &AmountLocale {
        &self.locale
    }

    // ── Amounts ──────────────────────────────────────────────────────────────

    /// Parse a locale-formatted amount such as `R$ 1.234,56` or `-R$ 50,00`.
    pub fn parse_amount(&self, s: &str) -> Option<Decimal> {
        let mut s = s.trim().to_string();
        if !self.locale.currency_marker.is_empty() {
            s = s.replace(&self.locale.currency_marker, "");
        }
        let cleaned: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != self.locale.thousands_separator)
            .map(|c| if c == self.locale.decimal_separator { '.' } else { c })
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        Decimal::from_str(&cleaned).ok()
    }

    /// Amount from a spreadsheet or CSV text cell. Cells without the currency
    /// marker or the locale decimal separator are read as plain decimals
    /// (`-45.90`); everything else goes through [`Normalizer::parse_amount`].
    pub fn parse_cell_amount(&self, s: &str) -> Option<Decimal> {
        let s = s.trim();
        let marker = &self.locale.currency_marker;
        let localized = (!marker.is_empty() && s.contains(marker.as_str()))
            || s.contains(self.locale.decimal_separator);
        if localized {
            self.parse_amount(s)
        } else {
            Decimal::from_str(s).ok()
        }
    }

    // ── Dates ────────────────────────────────────────────────────────────────

    /// Find a "`<day> de <Month> de <year>`" announcement anywhere in `text`.
    pub fn find_long_date(&self, text: &str) -> Option<String> {
        let c = re_long_date().captures(text)?;
        Some(self.long_date(&c[1], &c[2], &c[3]))
    }

    pub fn long_date(&self, day: &str, month_name: &str, year: &str) -> String {
        let month = self.month_number(month_name);
        format!("{year}-{month:02}-{day:0>2}")
    }

    /// Month number for `name`, falling back to January for unknown names.
    pub fn month_number(&self, name: &str) -> u32 {
        match self.months.number(name) {
            Some(m) => m,
            None => {
                debug!(month = name, "unknown month name, using fallback");
                UNKNOWN_MONTH_FALLBACK
            }
        }
    }

    /// Date from a tabular cell: `DD/MM/YYYY` or ISO with an optional time part.
    pub fn parse_cell_date(&self, s: &str) -> Option<String> {
        let s = s.trim();
        if s.contains('/') {
            return parse_slash_date(s);
        }
        re_iso_date().captures(s).map(|c| c[1].to_string())
    }
}

/// Reorder `D/M/Y` into `Y-MM-DD` without range checks.
pub fn parse_slash_date(s: &str) -> Option<String> {
    let mut parts = s.trim().split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let numeric = |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
    if !(numeric(day) && numeric(month) && numeric(year)) {
        return None;
    }
    Some(format!("{year}-{month:0>2}-{day:0>2}"))
}
