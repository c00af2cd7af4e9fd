use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Remote status of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum TxStatus {
    Pending,
    Complete,
    Error,
    Unknown,
}

impl From<String> for TxStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => TxStatus::Pending,
            "complete" => TxStatus::Complete,
            "error" => TxStatus::Error,
            _ => TxStatus::Unknown,
        }
    }
}

/// Mined transaction receipt (only the fields the reconciler reads)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<u64>,
}

/// Response of the transaction-status lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub status: TxStatus,
    #[serde(default)]
    pub receipt: Option<Receipt>,
}

impl TransactionStatus {
    /// Contract address from the receipt, if present and non-blank
    pub fn contract_address(&self) -> Option<&str> {
        self.receipt
            .as_ref()
            .and_then(|r| r.contract_address.as_deref())
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

#[cfg(test)]
impl TransactionStatus {
    pub fn pending() -> Self {
        Self { status: TxStatus::Pending, receipt: None }
    }

    pub fn complete(contract_address: Option<&str>) -> Self {
        Self {
            status: TxStatus::Complete,
            receipt: Some(Receipt {
                contract_address: contract_address.map(str::to_string),
                ..Receipt::default()
            }),
        }
    }

    pub fn with_status(status: TxStatus) -> Self {
        Self { status, receipt: None }
    }
}

#[derive(Debug, Serialize)]
pub struct RewardRequest<'a> {
    pub recipient: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct RewardResponse {
    pub tx: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_decoding() {
        let body = r#"{"status":"complete","receipt":{"contractAddress":"0xabc","blockNumber":12}}"#;
        let parsed: TransactionStatus = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, TxStatus::Complete);
        assert_eq!(parsed.contract_address(), Some("0xabc"));
        assert_eq!(parsed.receipt.unwrap().block_number, Some(12));
    }

    #[test]
    fn test_unrecognized_status_is_unknown() {
        let parsed: TransactionStatus = serde_json::from_str(r#"{"status":"reverted"}"#).unwrap();
        assert_eq!(parsed.status, TxStatus::Unknown);
        assert!(parsed.receipt.is_none());

        let parsed: TransactionStatus = serde_json::from_str(r#"{"status":"PENDING"}"#).unwrap();
        assert_eq!(parsed.status, TxStatus::Pending);
    }

    #[test]
    fn test_blank_contract_address_is_absent() {
        let status = TransactionStatus::complete(Some("  "));
        assert_eq!(status.contract_address(), None);
    }
}
