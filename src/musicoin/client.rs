use super::models::*;
use super::LedgerApi;
use crate::error::{AppError, AppResult, LedgerApiError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, info, instrument};

const CLIENT_ID_HEADER: &str = "clientID";

/// HTTP binding to the remote musicoin ledger service
pub struct MusicoinClient {
    client: Client,
    base_url: String,
    client_id: String,
}

impl MusicoinClient {
    pub fn new(base_url: &str, client_id: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
        })
    }

    fn status_url(&self, tx_id: &str) -> String {
        format!("{}/tx/status/{}", self.base_url, tx_id)
    }

    fn reward_url(&self) -> String {
        format!("{}/reward", self.base_url)
    }

    async fn read_body(response: Response) -> Result<String, LedgerApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LedgerApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

/// Decode a transaction-status body
pub fn parse_status_body(body: &str) -> Result<TransactionStatus, LedgerApiError> {
    serde_json::from_str(body).map_err(|e| LedgerApiError::Decode(e.to_string()))
}

#[async_trait]
impl LedgerApi for MusicoinClient {
    #[instrument(skip(self))]
    async fn get_transaction_status(&self, tx_id: &str) -> Result<TransactionStatus, LedgerApiError> {
        let response = self
            .client
            .get(self.status_url(tx_id))
            .header(CLIENT_ID_HEADER, &self.client_id)
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let status = parse_status_body(&body)?;
        debug!(
            status = ?status.status,
            block = ?status.receipt.as_ref().and_then(|r| r.block_number),
            "Transaction status received"
        );

        Ok(status)
    }

    #[instrument(skip(self))]
    async fn send_reward(&self, recipient: &str, amount: Decimal) -> Result<String, LedgerApiError> {
        let response = self
            .client
            .post(self.reward_url())
            .header(CLIENT_ID_HEADER, &self.client_id)
            .json(&RewardRequest { recipient, amount })
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let reward: RewardResponse =
            serde_json::from_str(&body).map_err(|e| LedgerApiError::Decode(e.to_string()))?;

        info!("💸 Sent {} musicoins to {} (tx: {})", amount, recipient, reward.tx);
        Ok(reward.tx)
    }
}
