pub mod client;
#[cfg(test)]
pub mod mock;
pub mod models;

pub use client::MusicoinClient;
pub use models::{TransactionStatus, TxStatus};

use crate::error::LedgerApiError;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Remote ledger operations the reconciler depends on
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Look up the current status of a submitted transaction
    async fn get_transaction_status(&self, tx_id: &str) -> Result<TransactionStatus, LedgerApiError>;

    /// Pay `amount` musicoins to `recipient`. Returns the transaction id.
    async fn send_reward(&self, recipient: &str, amount: Decimal) -> Result<String, LedgerApiError>;
}
