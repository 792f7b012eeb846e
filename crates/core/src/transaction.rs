use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;

/// Direction of a finalized transaction, derived from the sign of its amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// `Income` only for strictly positive amounts; zero counts as an expense.
    pub fn from_amount(amount: Money) -> Self {
        if amount.is_positive() {
            TransactionType::Income
        } else {
            TransactionType::Expense
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Income => write!(f, "INCOME"),
            TransactionType::Expense => write!(f, "EXPENSE"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INCOME" => Ok(TransactionType::Income),
            "EXPENSE" => Ok(TransactionType::Expense),
            other => Err(format!("Unknown transaction type: '{other}'")),
        }
    }
}

/// One ledger entry as read from a statement, before categorization.
///
/// `date` is the canonical `YYYY-MM-DD` string produced by the normalizer; it
/// has not been checked against the calendar yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTransaction {
    pub date: String,
    pub description: String,
    pub amount: Decimal,
}

impl ExtractedTransaction {
    pub fn new(date: impl Into<String>, description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            amount,
        }
    }
}

/// A reviewed-ready transaction: extracted fields plus identity, category and type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedTransaction {
    /// Correlation token for human review; never persisted.
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    pub category: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

impl FinalizedTransaction {
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        amount: Money,
        category: impl Into<String>,
    ) -> Self {
        FinalizedTransaction {
            id: id.into(),
            date,
            description: description.into(),
            amount,
            category: category.into(),
            transaction_type: TransactionType::from_amount(amount),
        }
    }

    /// Same record with the identity token blanked, for comparing two parses.
    pub fn without_id(&self) -> FinalizedTransaction {
        FinalizedTransaction {
            id: String::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn money(units: i64) -> Money {
        Money::from_decimal(Decimal::new(units, 2))
    }

    #[test]
    fn positive_amount_is_income() {
        assert_eq!(TransactionType::from_amount(money(20_000)), TransactionType::Income);
    }

    #[test]
    fn negative_and_zero_amounts_are_expenses() {
        assert_eq!(TransactionType::from_amount(money(-4_590)), TransactionType::Expense);
        assert_eq!(TransactionType::from_amount(Money::zero()), TransactionType::Expense);
    }

    #[test]
    fn sub_cent_sign_decides_type() {
        let tiny = Money::from_decimal(Decimal::new(4, 3));
        assert_eq!(TransactionType::from_amount(tiny), TransactionType::Income);
        assert_eq!(TransactionType::from_amount(-tiny), TransactionType::Expense);
    }

    #[test]
    fn transaction_type_roundtrip() {
        use std::str::FromStr;
        assert_eq!(
            TransactionType::from_str(&TransactionType::Income.to_string()).unwrap(),
            TransactionType::Income
        );
        assert_eq!(TransactionType::from_str("expense").unwrap(), TransactionType::Expense);
        assert!(TransactionType::from_str("transfer").is_err());
    }

    #[test]
    fn finalized_derives_type_from_amount() {
        let tx = FinalizedTransaction::new("a", date(2026, 1, 13), "IFOOD", money(-4_590), "Alimentação");
        assert_eq!(tx.transaction_type, TransactionType::Expense);
    }

    #[test]
    fn finalized_serializes_type_and_iso_date() {
        let tx = FinalizedTransaction::new("a", date(2026, 1, 13), "PIX RECEBIDO", money(20_000), "Transferência");
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "INCOME");
        assert_eq!(json["date"], "2026-01-13");
        assert_eq!(json["category"], "Transferência");
    }

    #[test]
    fn without_id_blanks_only_identity() {
        let tx = FinalizedTransaction::new("abc", date(2026, 1, 13), "TED", money(100), "Transferência");
        let blank = tx.without_id();
        assert!(blank.id.is_empty());
        assert_eq!(blank.description, tx.description);
        assert_eq!(blank.amount, tx.amount);
    }
}
