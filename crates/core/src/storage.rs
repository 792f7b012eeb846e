use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::{FinalizedTransaction, TransactionType};

/// Row shape handed to the external transaction store.
///
/// The store keeps unsigned amounts; direction lives in `transaction_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub user_id: String,
    pub account_id: Option<String>,
    pub description: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// ISO calendar date.
    pub date: String,
    pub is_paid: bool,
    pub category: String,
}

impl StorageRecord {
    pub fn from_finalized(tx: &FinalizedTransaction, user_id: &str, account_id: Option<&str>) -> Self {
        StorageRecord {
            user_id: user_id.to_string(),
            account_id: account_id.filter(|id| !id.is_empty()).map(str::to_string),
            description: tx.description.clone(),
            amount: tx.amount.magnitude(),
            transaction_type: tx.transaction_type,
            date: tx.date.format("%Y-%m-%d").to_string(),
            is_paid: true,
            category: tx.category.clone(),
        }
    }
}

pub fn prepare_batch(
    transactions: &[FinalizedTransaction],
    user_id: &str,
    account_id: Option<&str>,
) -> Vec<StorageRecord> {
    transactions
        .iter()
        .map(|tx| StorageRecord::from_finalized(tx, user_id, account_id))
        .collect()
}
