use super::models::TransactionStatus;
use super::LedgerApi;
use crate::error::LedgerApiError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted ledger API for tests. Unscripted transactions report pending.
#[derive(Default)]
pub struct MockLedgerApi {
    statuses: Mutex<HashMap<String, Option<TransactionStatus>>>,
    rewards: Mutex<Vec<(String, Decimal)>>,
    lookups: AtomicUsize,
}

impl MockLedgerApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, tx_id: &str, status: TransactionStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(tx_id.to_string(), Some(status));
    }

    /// Make lookups of `tx_id` fail as if the service were unreachable
    pub fn set_unreachable(&self, tx_id: &str) {
        self.statuses.lock().unwrap().insert(tx_id.to_string(), None);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn rewards(&self) -> Vec<(String, Decimal)> {
        self.rewards.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerApi for MockLedgerApi {
    async fn get_transaction_status(&self, tx_id: &str) -> Result<TransactionStatus, LedgerApiError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.statuses.lock().unwrap().get(tx_id) {
            Some(Some(status)) => Ok(status.clone()),
            Some(None) => Err(LedgerApiError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            }),
            None => Ok(TransactionStatus::pending()),
        }
    }

    async fn send_reward(&self, recipient: &str, amount: Decimal) -> Result<String, LedgerApiError> {
        let mut rewards = self.rewards.lock().unwrap();
        rewards.push((recipient.to_string(), amount));
        Ok(format!("0xreward{}", rewards.len()))
    }
}
