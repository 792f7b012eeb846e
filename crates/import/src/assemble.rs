use chrono::NaiveDate;
use extrato_core::{ExtractedTransaction, FinalizedTransaction, Money};
use tracing::debug;
use uuid::Uuid;

use crate::categorize::Categorizer;
use crate::normalize::RowRejected;

/// Attaches identity, category and type to extracted rows.
pub struct Assembler<'a> {
    categorizer: &'a Categorizer,
}

impl<'a> Assembler<'a> {
    pub fn new(categorizer: &'a Categorizer) -> Self {
        Self { categorizer }
    }

    /// Finalize one row. Rows with a blank description, or a date that is not
    /// a four-digit-year `YYYY-MM-DD` real calendar day, are rejected.
    pub fn finalize(&self, tx: ExtractedTransaction) -> Result<FinalizedTransaction, RowRejected> {
        let description = tx.description.trim();
        if description.is_empty() {
            return Err(RowRejected::EmptyDescription);
        }
        if tx.date.len() != 10 {
            return Err(RowRejected::Date(tx.date));
        }
        let date = NaiveDate::parse_from_str(&tx.date, "%Y-%m-%d")
            .map_err(|_| RowRejected::Date(tx.date.clone()))?;

        Ok(FinalizedTransaction::new(
            Uuid::new_v4().to_string(),
            date,
            description,
            Money::from_decimal(tx.amount),
            self.categorizer.categorize(description),
        ))
    }

    /// Finalize every row in order, dropping rejected ones.
    pub fn assemble(&self, extracted: Vec<ExtractedTransaction>) -> Vec<FinalizedTransaction> {
        extracted
            .into_iter()
            .enumerate()
            .filter_map(|(idx, tx)| match self.finalize(tx) {
                Ok(tx) => Some(tx),
                Err(reason) => {
                    debug!(index = idx, %reason, "transaction rejected during assembly");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extrato_core::TransactionType;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    fn extracted(date: &str, desc: &str, units: i64) -> ExtractedTransaction {
        ExtractedTransaction::new(date, desc, Decimal::new(units, 2))
    }

    #[test]
    fn finalize_attaches_category_and_type() {
        let categorizer = Categorizer::default();
        let tx = Assembler::new(&categorizer)
            .finalize(extracted("2026-01-13", "PIX RECEBIDO", 20_000))
            .unwrap();
        assert_eq!(tx.category, "Transferência");
        assert_eq!(tx.transaction_type, TransactionType::Income);
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2026, 1, 13).unwrap());
        assert!(!tx.id.is_empty());
    }

    #[test]
    fn zero_amount_is_expense() {
        let categorizer = Categorizer::default();
        let tx = Assembler::new(&categorizer)
            .finalize(extracted("2026-01-13", "AJUSTE", 0))
            .unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert_eq!(tx.category, "Outros");
    }

    #[test]
    fn sub_cent_credit_stays_income() {
        let categorizer = Categorizer::default();
        let tx = Assembler::new(&categorizer)
            .finalize(ExtractedTransaction::new("2026-01-01", "JUROS", Decimal::new(4, 3)))
            .unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Income);
        assert_eq!(tx.amount.amount(), Decimal::new(4, 3));
    }

    #[test]
    fn description_is_trimmed() {
        let categorizer = Categorizer::default();
        let tx = Assembler::new(&categorizer)
            .finalize(extracted("2026-01-13", "  NETFLIX  ", -3_990))
            .unwrap();
        assert_eq!(tx.description, "NETFLIX");
    }

    #[test]
    fn impossible_calendar_date_rejected() {
        let categorizer = Categorizer::default();
        let result = Assembler::new(&categorizer).finalize(extracted("2026-02-31", "X", 100));
        assert_eq!(result, Err(RowRejected::Date("2026-02-31".to_string())));
    }

    #[test]
    fn two_digit_year_rejected() {
        let categorizer = Categorizer::default();
        let result = Assembler::new(&categorizer).finalize(extracted("26-02-05", "X", 100));
        assert_eq!(result, Err(RowRejected::Date("26-02-05".to_string())));
    }

    #[test]
    fn blank_description_rejected() {
        let categorizer = Categorizer::default();
        let result = Assembler::new(&categorizer).finalize(extracted("2026-01-13", "   ", 100));
        assert_eq!(result, Err(RowRejected::EmptyDescription));
    }

    #[test]
    fn assemble_keeps_order_and_unique_ids() {
        let categorizer = Categorizer::default();
        let out = Assembler::new(&categorizer).assemble(vec![
            extracted("2026-01-13", "A", 100),
            extracted("2026-13-01", "bad month", 100),
            extracted("2026-01-14", "B", -100),
            extracted("2026-01-15", "C", 300),
        ]);
        let descriptions: Vec<_> = out.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, ["A", "B", "C"]);
        let ids: HashSet<_> = out.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), 3);
    }
}
