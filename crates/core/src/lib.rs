pub mod money;
pub mod storage;
pub mod summary;
pub mod transaction;

pub use money::Money;
pub use storage::{prepare_batch, StorageRecord};
pub use summary::ParseSummary;
pub use transaction::{ExtractedTransaction, FinalizedTransaction, TransactionType};
