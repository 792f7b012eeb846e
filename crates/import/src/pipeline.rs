use std::fmt;

use extrato_core::{ExtractedTransaction, FinalizedTransaction};
use thiserror::Error;
use tracing::info;

use crate::assemble::Assembler;
use crate::categorize::Categorizer;
use crate::config::{ConfigError, ImportConfig};
use crate::normalize::Normalizer;
use crate::ofx::{self, OfxError};
use crate::paginated::{PdfTextLayer, StatementScanner, TextLayer, TextLayerError};
use crate::tabular::{TabularError, TabularExtractor, TabularProfile};
use crate::util::{decode_text, extension_of};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unsupported format: '{0}'")]
    UnsupportedFormat(String),
    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),
}

impl From<TabularError> for ImportError {
    fn from(e: TabularError) -> Self {
        ImportError::UnreadableDocument(e.to_string())
    }
}

impl From<OfxError> for ImportError {
    fn from(e: OfxError) -> Self {
        ImportError::UnreadableDocument(e.to_string())
    }
}

impl From<TextLayerError> for ImportError {
    fn from(e: TextLayerError) -> Self {
        ImportError::UnreadableDocument(e.to_string())
    }
}

/// Source layout, chosen from the file extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `.csv`
    DelimitedText,
    /// `.xlsx`, `.xls`
    Spreadsheet,
    /// `.ofx`
    Exchange,
    /// `.pdf`
    PaginatedText,
    /// `.txt`, text already recovered from a statement
    PlainText,
}

impl SourceFormat {
    pub fn from_extension(ext: &str) -> Result<Self, ImportError> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(SourceFormat::DelimitedText),
            "xlsx" | "xls" => Ok(SourceFormat::Spreadsheet),
            "ofx" => Ok(SourceFormat::Exchange),
            "pdf" => Ok(SourceFormat::PaginatedText),
            "txt" => Ok(SourceFormat::PlainText),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_filename(filename: &str) -> Result<Self, ImportError> {
        Self::from_extension(&extension_of(filename))
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::DelimitedText => write!(f, "csv"),
            SourceFormat::Spreadsheet => write!(f, "spreadsheet"),
            SourceFormat::Exchange => write!(f, "ofx"),
            SourceFormat::PaginatedText => write!(f, "pdf"),
            SourceFormat::PlainText => write!(f, "text"),
        }
    }
}

/// Orchestrates: extension dispatch → extract → normalize → categorize → assemble.
///
/// Holds only immutable configuration, so one importer can serve concurrent
/// parse calls.
pub struct StatementImporter<L: TextLayer = PdfTextLayer> {
    scanner: StatementScanner,
    categorizer: Categorizer,
    profile: TabularProfile,
    text_layer: L,
}

impl StatementImporter<PdfTextLayer> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ImportConfig) -> Result<Self, ConfigError> {
        Self::with_text_layer(config, PdfTextLayer)
    }
}

impl Default for StatementImporter<PdfTextLayer> {
    fn default() -> Self {
        Self {
            scanner: StatementScanner::default(),
            categorizer: Categorizer::default(),
            profile: TabularProfile::default(),
            text_layer: PdfTextLayer,
        }
    }
}

impl<L: TextLayer> StatementImporter<L> {
    pub fn with_text_layer(config: ImportConfig, text_layer: L) -> Result<Self, ConfigError> {
        config.validate()?;
        let normalizer = Normalizer::from_config(&config)?;
        Ok(Self {
            scanner: StatementScanner::new(normalizer)?,
            categorizer: Categorizer::from_config(&config),
            profile: config.tabular,
            text_layer,
        })
    }

    pub fn categorizer(&self) -> &Categorizer {
        &self.categorizer
    }

    /// Parse one statement into finalized transactions, in source order.
    pub fn parse(&self, bytes: &[u8], filename: &str) -> Result<Vec<FinalizedTransaction>, ImportError> {
        let format = SourceFormat::from_filename(filename)?;
        let extracted = self.extract(bytes, format)?;
        let extracted_count = extracted.len();

        let finalized = Assembler::new(&self.categorizer).assemble(extracted);
        info!(
            filename,
            %format,
            extracted = extracted_count,
            emitted = finalized.len(),
            "statement parsed"
        );
        Ok(finalized)
    }

    /// Run the extractor for `format` without categorizing.
    pub fn extract(&self, bytes: &[u8], format: SourceFormat) -> Result<Vec<ExtractedTransaction>, ImportError> {
        let tabular = TabularExtractor::new(self.scanner.normalizer(), &self.profile);
        let extracted = match format {
            SourceFormat::DelimitedText => tabular.extract_csv(bytes)?,
            SourceFormat::Spreadsheet => tabular.extract_workbook(bytes)?,
            SourceFormat::Exchange => ofx::extract(bytes)?,
            SourceFormat::PaginatedText => self.scanner.extract(&self.text_layer, bytes)?,
            SourceFormat::PlainText => self.scanner.scan(&decode_text(bytes)),
        };
        Ok(extracted)
    }
}
