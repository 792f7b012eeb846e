use chrono::NaiveDate;
use extrato_core::ExtractedTransaction;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::util::decode_text;

/// Description used when a transaction carries neither memo nor payee.
pub const DESCRIPTION_PLACEHOLDER: &str = "Transação s/ desc.";

#[derive(Debug, Clone, PartialEq)]
pub struct OfxTransaction {
    pub fit_id: Option<String>,
    pub date: NaiveDate,
    /// Signed as provided by the institution.
    pub amount: Decimal,
    pub memo: Option<String>,
    pub name: Option<String>,
    pub check_number: Option<String>,
}

impl OfxTransaction {
    /// Memo, then payee, then the placeholder.
    pub fn description(&self) -> &str {
        [self.memo.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(DESCRIPTION_PLACEHOLDER)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfxAccount {
    pub account_id: Option<String>,
    pub bank_id: Option<String>,
    pub account_type: Option<String>,
}

/// One `STMTRS` (bank) or `CCSTMTRS` (credit card) group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfxStatement {
    pub account: OfxAccount,
    pub currency: Option<String>,
    pub transactions: Vec<OfxTransaction>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfxDocument {
    pub statements: Vec<OfxStatement>,
}

impl OfxDocument {
    /// All transactions across statement groups, in document order.
    pub fn flatten(&self) -> Vec<ExtractedTransaction> {
        self.statements
            .iter()
            .flat_map(|s| s.transactions.iter())
            .map(|tx| {
                ExtractedTransaction::new(
                    tx.date.format("%Y-%m-%d").to_string(),
                    tx.description(),
                    tx.amount,
                )
            })
            .collect()
    }
}

#[derive(Error, Debug)]
pub enum OfxError {
    #[error("Not an OFX document: missing <OFX> root")]
    MissingRoot,
}

pub struct OfxParser;

impl OfxParser {
    /// Parse SGML (v1) or XML (v2) OFX text.
    pub fn parse(data: &str) -> Result<OfxDocument, OfxError> {
        let root = find_ignore_case(data, "<OFX>").ok_or(OfxError::MissingRoot)?;
        let body = &data[root..];

        let mut statements: Vec<OfxStatement> = Vec::new();
        let mut current_stmt: Option<OfxStatement> = None;
        let mut current_trx: Option<BuildingTrx> = None;

        for (tag, value) in tags(body) {
            match tag.as_str() {
                "STMTRS" | "CCSTMTRS" => {
                    if let Some(stmt) = current_stmt.take() {
                        statements.push(stmt);
                    }
                    current_stmt = Some(OfxStatement::default());
                }
                "/STMTRS" | "/CCSTMTRS" => {
                    if let Some(trx) = current_trx.take() {
                        finish_trx(trx, current_stmt.get_or_insert_with(Default::default));
                    }
                    if let Some(stmt) = current_stmt.take() {
                        statements.push(stmt);
                    }
                }
                "STMTTRN" => {
                    if let Some(trx) = current_trx.take() {
                        finish_trx(trx, current_stmt.get_or_insert_with(Default::default));
                    }
                    current_trx = Some(BuildingTrx::default());
                }
                "/STMTTRN" | "/BANKTRANLIST" => {
                    if let Some(trx) = current_trx.take() {
                        finish_trx(trx, current_stmt.get_or_insert_with(Default::default));
                    }
                }
                _ => {
                    let Some(value) = value else { continue };
                    if let Some(ref mut trx) = current_trx {
                        match tag.as_str() {
                            "FITID" => trx.fit_id = Some(value),
                            "DTPOSTED" => trx.date = parse_ofx_date(&value),
                            "TRNAMT" => trx.amount = parse_ofx_amount(&value),
                            "MEMO" => trx.memo = Some(value),
                            "NAME" | "PAYEE" => trx.name = Some(value),
                            "CHECKNUM" => trx.check_number = Some(value),
                            _ => {}
                        }
                        continue;
                    }
                    let stmt = current_stmt.get_or_insert_with(Default::default);
                    match tag.as_str() {
                        "ACCTID" => stmt.account.account_id = Some(value),
                        "BANKID" => stmt.account.bank_id = Some(value),
                        "ACCTTYPE" => stmt.account.account_type = Some(value),
                        "CURDEF" => stmt.currency = Some(value),
                        _ => {}
                    }
                }
            }
        }

        if let Some(mut stmt) = current_stmt.take() {
            if let Some(trx) = current_trx.take() {
                finish_trx(trx, &mut stmt);
            }
            statements.push(stmt);
        }

        Ok(OfxDocument { statements })
    }
}

#[derive(Default)]
struct BuildingTrx {
    fit_id: Option<String>,
    date: Option<NaiveDate>,
    amount: Option<Decimal>,
    memo: Option<String>,
    name: Option<String>,
    check_number: Option<String>,
}

fn finish_trx(trx: BuildingTrx, stmt: &mut OfxStatement) {
    match (trx.date, trx.amount) {
        (Some(date), Some(amount)) => stmt.transactions.push(OfxTransaction {
            fit_id: trx.fit_id,
            date,
            amount,
            memo: trx.memo,
            name: trx.name,
            check_number: trx.check_number,
        }),
        _ => debug!(fit_id = ?trx.fit_id, "dropping STMTTRN without date or amount"),
    }
}

/// Split markup into `(UPPERCASE_TAG, trimmed value)` pairs. Closing tags keep
/// their leading `/`; XML-style `</TAG>` after a value is its own token.
fn tags(body: &str) -> impl Iterator<Item = (String, Option<String>)> + '_ {
    body.split('<').skip(1).filter_map(|piece| {
        let (name, rest) = piece.split_once('>')?;
        let name = name.trim().to_uppercase();
        let value = unescape(rest.trim());
        Some((name, (!value.is_empty()).then_some(value)))
    })
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| {
            haystack
                .get(i..i + needle.len())
                .is_some_and(|s| s.eq_ignore_ascii_case(needle))
        })
}

fn parse_ofx_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let digits = (s.get(0..4), s.get(4..6), s.get(6..8));
    if let (Some(y), Some(m), Some(d)) = digits {
        if let (Ok(y), Ok(m), Ok(d)) = (y.parse::<i32>(), m.parse::<u32>(), d.parse::<u32>()) {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                return Some(date);
            }
        }
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    None
}

/// Signed decimal. When both `,` and `.` appear, whichever comes last is the
/// decimal separator and the other is grouping; a lone `,` is the decimal
/// separator.
fn parse_ofx_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let normalized = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        _ => s.to_string(),
    };
    Decimal::from_str(&normalized).ok()
}

pub fn parse(data: &[u8]) -> Result<OfxDocument, OfxError> {
    let content = decode_text(data);
    OfxParser::parse(&content)
}

/// Parse and flatten every statement group into extracted transactions.
pub fn extract(data: &[u8]) -> Result<Vec<ExtractedTransaction>, OfxError> {
    Ok(parse(data)?.flatten())
}
