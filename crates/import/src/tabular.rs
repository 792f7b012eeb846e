use std::io::Cursor;

use calamine::{Data, DataType, Reader};
use chrono::NaiveDate;
use extrato_core::ExtractedTransaction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::normalize::{Normalizer, RowRejected};
use crate::util::decode_text;

/// Header aliases for the three required columns, plus the description used
/// when a row leaves its description cell empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularProfile {
    pub date_headers: Vec<String>,
    pub description_headers: Vec<String>,
    pub amount_headers: Vec<String>,
    pub description_placeholder: String,
}

impl Default for TabularProfile {
    fn default() -> Self {
        Self {
            date_headers: vec!["Data".to_string(), "date".to_string()],
            description_headers: vec![
                "Descrição".to_string(),
                "Descricao".to_string(),
                "description".to_string(),
            ],
            amount_headers: vec!["Valor".to_string(), "amount".to_string()],
            description_placeholder: "Transação".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum TabularError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Spreadsheet error: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Workbook has no worksheets")]
    NoWorksheet,
}

/// Cell contents after format-specific decoding.
#[derive(Debug, Clone, PartialEq)]
enum RawCell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Empty,
}

impl RawCell {
    fn from_text(s: &str) -> Self {
        if s.trim().is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(s.to_string())
        }
    }

    fn from_data(cell: &Data) -> Self {
        match cell {
            Data::Empty => RawCell::Empty,
            Data::String(s) => RawCell::from_text(s),
            Data::Float(f) => RawCell::Number(*f),
            Data::Int(i) => RawCell::Number(*i as f64),
            Data::DateTime(_) | Data::DateTimeIso(_) => {
                cell.as_date().map_or(RawCell::Empty, RawCell::Date)
            }
            other => RawCell::from_text(&other.to_string()),
        }
    }
}

/// Column positions resolved from a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    date: usize,
    description: Option<usize>,
    amount: usize,
}

impl ColumnMap {
    fn resolve(headers: &[String], profile: &TabularProfile) -> Option<Self> {
        let find = |aliases: &[String]| {
            headers.iter().position(|h| {
                let h = h.trim().to_lowercase();
                aliases.iter().any(|a| a.to_lowercase() == h)
            })
        };
        let date = find(profile.date_headers.as_slice());
        let amount = find(profile.amount_headers.as_slice());
        match (date, amount) {
            (Some(date), Some(amount)) => Some(ColumnMap {
                date,
                description: find(profile.description_headers.as_slice()),
                amount,
            }),
            _ => {
                warn!(?headers, "table lacks a date or amount column");
                None
            }
        }
    }
}

/// Converts rows of a header-first table into extracted transactions.
pub struct TabularExtractor<'a> {
    normalizer: &'a Normalizer,
    profile: &'a TabularProfile,
}

impl<'a> TabularExtractor<'a> {
    pub fn new(normalizer: &'a Normalizer, profile: &'a TabularProfile) -> Self {
        Self { normalizer, profile }
    }

    /// Delimited text; `;` or `,` is picked from the header line.
    pub fn extract_csv(&self, data: &[u8]) -> Result<Vec<ExtractedTransaction>, TabularError> {
        let text = decode_text(data);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(detect_delimiter(&text))
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let Some(columns) = ColumnMap::resolve(&headers, self.profile) else {
            return Ok(Vec::new());
        };

        let mut transactions = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            // Header is row 1.
            let row_no = idx + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!(row = row_no, error = %e, "skipping unreadable row");
                    continue;
                }
            };
            let cells: Vec<RawCell> = record.iter().map(RawCell::from_text).collect();
            self.push_row(&cells, &columns, row_no, &mut transactions);
        }

        Ok(transactions)
    }

    /// First worksheet of an `.xlsx`/`.xls` workbook; row 1 holds the headers.
    pub fn extract_workbook(&self, data: &[u8]) -> Result<Vec<ExtractedTransaction>, TabularError> {
        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(data))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(TabularError::NoWorksheet)??;

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(Vec::new());
        };
        let headers: Vec<String> = header_row.iter().map(|c| c.to_string()).collect();
        let Some(columns) = ColumnMap::resolve(&headers, self.profile) else {
            return Ok(Vec::new());
        };

        let mut transactions = Vec::new();
        for (idx, row) in rows.enumerate() {
            let cells: Vec<RawCell> = row.iter().map(RawCell::from_data).collect();
            self.push_row(&cells, &columns, idx + 2, &mut transactions);
        }

        Ok(transactions)
    }

    fn push_row(
        &self,
        cells: &[RawCell],
        columns: &ColumnMap,
        row_no: usize,
        out: &mut Vec<ExtractedTransaction>,
    ) {
        if cells.iter().all(|c| *c == RawCell::Empty) {
            return;
        }
        match self.convert_row(cells, columns) {
            Ok(tx) => out.push(tx),
            Err(reason) => debug!(row = row_no, %reason, "row rejected"),
        }
    }

    fn convert_row(
        &self,
        cells: &[RawCell],
        columns: &ColumnMap,
    ) -> Result<ExtractedTransaction, RowRejected> {
        let date = self.cell_date(cells.get(columns.date).unwrap_or(&RawCell::Empty))?;
        let amount = self.cell_amount(cells.get(columns.amount).unwrap_or(&RawCell::Empty))?;

        let description = columns
            .description
            .and_then(|col| match cells.get(col) {
                Some(RawCell::Text(s)) => Some(s.trim().to_string()),
                Some(RawCell::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.profile.description_placeholder.clone());

        Ok(ExtractedTransaction::new(date, description, amount))
    }

    fn cell_date(&self, cell: &RawCell) -> Result<String, RowRejected> {
        match cell {
            RawCell::Date(d) => Ok(d.format("%Y-%m-%d").to_string()),
            RawCell::Text(s) => self
                .normalizer
                .parse_cell_date(s)
                .ok_or_else(|| RowRejected::Date(s.clone())),
            RawCell::Number(n) => Err(RowRejected::Date(n.to_string())),
            RawCell::Empty => Err(RowRejected::MissingCell("date")),
        }
    }

    fn cell_amount(&self, cell: &RawCell) -> Result<Decimal, RowRejected> {
        match cell {
            RawCell::Number(n) if n.is_finite() => {
                // f64 Display is the shortest round-tripping form, never exponential.
                Decimal::from_str(&n.to_string()).map_err(|_| RowRejected::Amount(n.to_string()))
            }
            RawCell::Number(n) => Err(RowRejected::Amount(n.to_string())),
            RawCell::Text(s) => self
                .normalizer
                .parse_cell_amount(s)
                .ok_or_else(|| RowRejected::Amount(s.clone())),
            RawCell::Date(d) => Err(RowRejected::Amount(d.to_string())),
            RawCell::Empty => Err(RowRejected::MissingCell("amount")),
        }
    }
}

fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(data: &str) -> Vec<ExtractedTransaction> {
        let normalizer = Normalizer::default();
        let profile = TabularProfile::default();
        TabularExtractor::new(&normalizer, &profile)
            .extract_csv(data.as_bytes())
            .unwrap()
    }

    // ── delimiter / headers ───────────────────────────────────────────────────

    #[test]
    fn detect_semicolon_delimiter() {
        assert_eq!(detect_delimiter("Data;Descrição;Valor\n"), b';');
        assert_eq!(detect_delimiter("date,description,amount\n"), b',');
        assert_eq!(detect_delimiter(""), b',');
    }

    #[test]
    fn resolve_header_aliases() {
        let headers: Vec<String> = ["Valor", " descrição ", "DATA"].iter().map(|s| s.to_string()).collect();
        let map = ColumnMap::resolve(&headers, &TabularProfile::default()).unwrap();
        assert_eq!(map, ColumnMap { date: 2, description: Some(1), amount: 0 });
    }

    #[test]
    fn resolve_missing_amount_column() {
        let headers: Vec<String> = ["Data", "Descrição"].iter().map(|s| s.to_string()).collect();
        assert!(ColumnMap::resolve(&headers, &TabularProfile::default()).is_none());
    }

    // ── rows ─────────────────────────────────────────────────────────────────

    #[test]
    fn brazilian_export() {
        let txs = extract(
            "Data;Descrição;Valor\n05/02/2026;IFOOD*RESTAURANTE;-45,90\n06/02/2026;PIX RECEBIDO;R$ 1.200,00\n",
        );
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0], ExtractedTransaction::new("2026-02-05", "IFOOD*RESTAURANTE", Decimal::new(-4_590, 2)));
        assert_eq!(txs[1].amount, Decimal::new(120_000, 2));
    }

    #[test]
    fn english_headers_plain_numbers() {
        let txs = extract("date,description,amount\n2026-01-13,NETFLIX,-39.90\n2026-01-14,SALARY,5000\n");
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].date, "2026-01-13");
        assert_eq!(txs[0].amount, Decimal::new(-3_990, 2));
        assert_eq!(txs[1].amount, Decimal::new(5_000, 0));
    }

    #[test]
    fn bad_amount_row_skipped_and_batch_continues() {
        let txs = extract(
            "Data;Descrição;Valor\n01/01/2026;A;10,00\n02/01/2026;B;abc\n03/01/2026;C;30,00\n",
        );
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].description, "A");
        assert_eq!(txs[1].description, "C");
    }

    #[test]
    fn bad_date_row_skipped() {
        let txs = extract("Data;Descrição;Valor\nontem;A;10,00\n03/01/2026;C;30,00\n");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].date, "2026-01-03");
    }

    #[test]
    fn empty_description_gets_placeholder() {
        let txs = extract("Data;Descrição;Valor\n01/01/2026;;10,00\n");
        assert_eq!(txs[0].description, "Transação");
    }

    #[test]
    fn missing_description_column_gets_placeholder() {
        let txs = extract("Data;Valor\n01/01/2026;10,00\n");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "Transação");
    }

    #[test]
    fn short_row_rejected_not_fatal() {
        let txs = extract("Data;Descrição;Valor\n01/01/2026;A\n02/01/2026;B;5,00\n");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "B");
    }

    #[test]
    fn missing_required_column_yields_empty() {
        assert!(extract("Quando;Quanto\n01/01/2026;10,00\n").is_empty());
    }

    #[test]
    fn header_only_yields_empty() {
        assert!(extract("Data;Descrição;Valor\n").is_empty());
    }

    fn sample_workbook() -> Vec<u8> {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let date_format = Format::new().set_num_format("dd/mm/yyyy");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "DATA").unwrap();
        sheet.write_string(0, 1, "Descrição").unwrap();
        sheet.write_string(0, 2, "valor").unwrap();

        let feb5 = ExcelDateTime::from_ymd(2026, 2, 5).unwrap();
        sheet.write_datetime_with_format(1, 0, &feb5, &date_format).unwrap();
        sheet.write_string(1, 1, "IFOOD*RESTAURANTE").unwrap();
        sheet.write_number(1, 2, -45.9).unwrap();

        sheet.write_string(2, 0, "06/02/2026").unwrap();
        sheet.write_string(2, 1, "PIX RECEBIDO").unwrap();
        sheet.write_number(2, 2, 1200.0).unwrap();

        sheet.write_datetime_with_format(3, 0, &feb5, &date_format).unwrap();
        sheet.write_string(3, 1, "SEM VALOR").unwrap();
        sheet.write_string(3, 2, "abc").unwrap();

        let feb7 = ExcelDateTime::from_ymd(2026, 2, 7).unwrap();
        sheet.write_datetime_with_format(4, 0, &feb7, &date_format).unwrap();
        sheet.write_string(4, 2, "R$ 80,50").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn workbook_rows_extracted() {
        let normalizer = Normalizer::default();
        let profile = TabularProfile::default();
        let txs = TabularExtractor::new(&normalizer, &profile)
            .extract_workbook(&sample_workbook())
            .unwrap();
        assert_eq!(
            txs,
            vec![
                ExtractedTransaction::new("2026-02-05", "IFOOD*RESTAURANTE", Decimal::new(-459, 1)),
                ExtractedTransaction::new("2026-02-06", "PIX RECEBIDO", Decimal::new(1_200, 0)),
                ExtractedTransaction::new("2026-02-07", "Transação", Decimal::new(8_050, 2)),
            ]
        );
    }

    #[test]
    fn garbage_workbook_is_an_error() {
        let normalizer = Normalizer::default();
        let profile = TabularProfile::default();
        let result = TabularExtractor::new(&normalizer, &profile).extract_workbook(b"not a spreadsheet");
        assert!(result.is_err());
    }

    // ── cells ────────────────────────────────────────────────────────────────

    #[test]
    fn numeric_cells_convert_exactly() {
        let normalizer = Normalizer::default();
        let profile = TabularProfile::default();
        let ex = TabularExtractor::new(&normalizer, &profile);
        assert_eq!(ex.cell_amount(&RawCell::Number(45.9)), Ok(Decimal::new(459, 1)));
        assert_eq!(ex.cell_amount(&RawCell::Number(-1200.0)), Ok(Decimal::new(-1200, 0)));
        assert!(ex.cell_amount(&RawCell::Number(f64::NAN)).is_err());
        assert_eq!(
            ex.cell_date(&RawCell::Date(NaiveDate::from_ymd_opt(2026, 2, 5).unwrap())),
            Ok("2026-02-05".to_string())
        );
    }
}
