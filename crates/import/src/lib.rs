pub mod assemble;
pub mod categorize;
pub mod config;
pub mod normalize;
pub mod ofx;
pub mod paginated;
pub mod pipeline;
pub mod tabular;
pub(crate) mod util;

pub use assemble::Assembler;
pub use categorize::{CategoryRule, Categorizer};
pub use config::{AmountLocale, ConfigError, ImportConfig};
pub use normalize::{MonthTable, Normalizer, RowRejected};
pub use ofx::{OfxDocument, OfxStatement, OfxTransaction};
pub use paginated::{PdfTextLayer, StatementScanner, StaticTextLayer, TextLayer, TextLayerError};
pub use pipeline::{ImportError, SourceFormat, StatementImporter};
pub use tabular::{TabularExtractor, TabularProfile};

pub mod import {
    use crate::*;
    use extrato_core::FinalizedTransaction;

    /// Parse a statement with the built-in Portuguese tables.
    pub fn parse_statement(bytes: &[u8], filename: &str) -> Result<Vec<FinalizedTransaction>, ImportError> {
        StatementImporter::new().parse(bytes, filename)
    }

    pub fn load_config(toml_content: &str) -> Result<ImportConfig, ConfigError> {
        ImportConfig::from_toml(toml_content)
    }

    pub fn importer_from_toml(toml_content: &str) -> Result<StatementImporter, ConfigError> {
        StatementImporter::with_config(ImportConfig::from_toml(toml_content)?)
    }
}
