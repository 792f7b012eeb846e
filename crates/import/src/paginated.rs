//! Line scanner for statements recovered as free text from paginated documents.
//!
//! Expected layout:
//!   13 de Janeiro de 2026
//!   IFOOD*RESTAURANTE            -R$ 45,90     R$ 1.000,00
//!   PIX RECEBIDO                  R$ 200,00    R$ 1.200,00
//!
//! A date announcement sets the date for every ledger line below it until the
//! next announcement. The trailing balance column only anchors the match.

use std::panic::{self, AssertUnwindSafe};

use extrato_core::ExtractedTransaction;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::config::{AmountLocale, ConfigError};
use crate::normalize::Normalizer;

#[derive(Debug, Error)]
pub enum TextLayerError {
    #[error("PDF text extraction failed: {0}")]
    Pdf(String),
}

/// Source of per-page text for a paginated document.
pub trait TextLayer: Send + Sync {
    fn pages(&self, document: &[u8]) -> Result<Vec<String>, TextLayerError>;
}

// ── PDF backend ───────────────────────────────────────────────────────────────

/// Text layer backed by `pdf-extract`.
///
/// Extractor panics are caught and returned as [`TextLayerError::Pdf`]. The
/// process panic hook still runs first, so binaries that need a quiet stderr
/// should install their own hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextLayer;

impl TextLayer for PdfTextLayer {
    fn pages(&self, document: &[u8]) -> Result<Vec<String>, TextLayerError> {
        // pdf-extract panics on some malformed font tables.
        match panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(document)
        })) {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(TextLayerError::Pdf(format!("{e:?}"))),
            Err(_) => Err(TextLayerError::Pdf("extractor panicked".to_string())),
        }
    }
}

// ── Static backend (already-extracted text, tests) ────────────────────────────

/// Returns preset pages regardless of the document bytes.
#[derive(Debug, Clone, Default)]
pub struct StaticTextLayer {
    pub pages: Vec<String>,
}

impl StaticTextLayer {
    pub fn new<S: Into<String>>(pages: impl IntoIterator<Item = S>) -> Self {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
        }
    }
}

impl TextLayer for StaticTextLayer {
    fn pages(&self, _document: &[u8]) -> Result<Vec<String>, TextLayerError> {
        Ok(self.pages.clone())
    }
}

/// Page texts in order, each followed by a line break.
pub fn join_pages(pages: &[String]) -> String {
    let mut text = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    for page in pages {
        text.push_str(page);
        text.push('\n');
    }
    text
}

// ── Scanner ───────────────────────────────────────────────────────────────────

/// Build the ledger-line pattern: description, signed amount, balance, end of line.
fn transaction_pattern(locale: &AmountLocale) -> Result<Regex, regex::Error> {
    let marker = regex::escape(&locale.currency_marker);
    let digits = format!(
        r"[\d{}{}]+",
        regex::escape(&locale.thousands_separator.to_string()),
        regex::escape(&locale.decimal_separator.to_string()),
    );
    Regex::new(&format!(
        r"^(?P<desc>.+?)\s+(?P<amount>-?{marker}\s*{digits})\s+(?P<balance>-?{marker}\s*{digits})$"
    ))
}

#[derive(Debug, Clone)]
pub struct StatementScanner {
    normalizer: Normalizer,
    transaction: Regex,
}

impl StatementScanner {
    pub fn new(normalizer: Normalizer) -> Result<Self, ConfigError> {
        let transaction = transaction_pattern(normalizer.locale())?;
        Ok(Self { normalizer, transaction })
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Single top-to-bottom pass over `text`.
    pub fn scan(&self, text: &str) -> Vec<ExtractedTransaction> {
        let mut date_context: Option<String> = None;
        let mut transactions = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(date) = self.normalizer.find_long_date(line) {
                date_context = Some(date);
                continue;
            }

            let Some(caps) = self.transaction.captures(line) else {
                continue;
            };
            let Some(date) = date_context.as_deref() else {
                debug!(line = idx + 1, "ledger line before any date announcement");
                continue;
            };
            let Some(amount) = self.normalizer.parse_amount(&caps["amount"]) else {
                debug!(line = idx + 1, amount = &caps["amount"], "unparseable amount");
                continue;
            };

            transactions.push(ExtractedTransaction::new(date, caps["desc"].trim(), amount));
        }

        transactions
    }

    /// Fetch pages from `layer`, join them and scan the result.
    pub fn extract<L: TextLayer + ?Sized>(
        &self,
        layer: &L,
        document: &[u8],
    ) -> Result<Vec<ExtractedTransaction>, TextLayerError> {
        let pages = layer.pages(document)?;
        Ok(self.scan(&join_pages(&pages)))
    }
}

impl Default for StatementScanner {
    fn default() -> Self {
        Self::new(Normalizer::default()).expect("default statement pattern is valid")
    }
}
