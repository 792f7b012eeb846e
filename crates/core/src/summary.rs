use serde::Serialize;
use std::collections::BTreeMap;

use super::money::Money;
use super::transaction::{FinalizedTransaction, TransactionType};

/// Totals over one parsed statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseSummary {
    pub count: usize,
    /// Sum of income magnitudes.
    pub income: Money,
    /// Sum of expense magnitudes.
    pub expense: Money,
    /// Signed total per category label.
    pub by_category: BTreeMap<String, Money>,
}

impl ParseSummary {
    pub fn from_transactions(transactions: &[FinalizedTransaction]) -> Self {
        let mut income = Money::zero();
        let mut expense = Money::zero();
        let mut by_category: BTreeMap<String, Money> = BTreeMap::new();

        for tx in transactions {
            let magnitude = Money::from_decimal(tx.amount.magnitude());
            match tx.transaction_type {
                TransactionType::Income => income = income + magnitude,
                TransactionType::Expense => expense = expense + magnitude,
            }
            let entry = by_category.entry(tx.category.clone()).or_insert_with(Money::zero);
            *entry = *entry + tx.amount;
        }

        ParseSummary {
            count: transactions.len(),
            income,
            expense,
            by_category,
        }
    }

    pub fn net(&self) -> Money {
        self.income - self.expense
    }
}
