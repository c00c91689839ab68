//! # Gateway Types and Dispatch
//!
//! The three-call ledger boundary: submit, fetch, status. Errors are
//! structured so callers can distinguish retriable conditions
//! (`Unavailable`, `Timeout`) from fatal ones (`Rejected`).

use creda_core::ContentDigest;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::HttpLedger;
use crate::mock::MockLedger;

/// Errors from ledger gateway operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The ledger node could not be reached. Retriable.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger rejected the transaction. Not retriable without
    /// operator intervention.
    #[error("ledger rejected transaction: {0}")]
    Rejected(String),

    /// The submission did not complete within the bounded timeout.
    /// Retriable; the transaction may or may not have landed.
    #[error("ledger submission timed out after {elapsed_ms}ms")]
    Timeout {
        /// How long the caller waited before giving up.
        elapsed_ms: u64,
    },

    /// The requested transaction does not exist on the ledger.
    #[error("transaction not found: {0}")]
    NotFound(String),
}

impl LedgerError {
    /// Whether a later retry of the same operation can succeed without
    /// anything else changing.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// The payload submitted to the ledger for one anchoring attempt.
///
/// The memo carries the credential's certificate number so a ledger
/// explorer entry is traceable back to the registry record without
/// exposing subject identity on-chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorSubmission {
    /// The canonical-payload digest being committed.
    pub digest: ContentDigest,
    /// Opaque reference recorded alongside the digest.
    pub memo: String,
}

/// Receipt returned by a successful `submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Ledger-assigned transaction identifier.
    pub transaction_id: String,
    /// Height of the block/slot that included the transaction.
    pub block_height: u64,
}

/// Details of a previously submitted transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetails {
    /// Ledger-assigned transaction identifier.
    pub transaction_id: String,
    /// Height of the including block/slot.
    pub block_height: u64,
    /// The committed digest, as rendered at submission time.
    pub digest: String,
    /// The memo recorded with the transaction.
    pub memo: String,
}

/// Connectivity and chain-tip report from `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatus {
    /// Whether the node answered.
    pub connected: bool,
    /// Network identifier (e.g. `algorand-testnet`, `mock`).
    pub network: String,
    /// Current chain height as seen by the node.
    pub current_height: u64,
}

/// The ledger gateway, dispatching to one of the supported adapters.
///
/// An enum rather than a trait object: the adapter set is closed by
/// design (an unaudited adapter could report commitments the ledger never
/// recorded), and enum dispatch keeps the async methods' futures `Send`
/// without boxing.
#[derive(Debug)]
pub enum LedgerClient {
    /// REST adapter against a ledger node.
    Http(HttpLedger),
    /// Deterministic in-process ledger for development and tests.
    Mock(MockLedger),
}

impl LedgerClient {
    /// Submit an anchoring transaction and await its inclusion receipt.
    pub async fn submit(&self, submission: &AnchorSubmission) -> Result<SubmitReceipt, LedgerError> {
        match self {
            Self::Http(ledger) => ledger.submit(submission).await,
            Self::Mock(ledger) => ledger.submit(submission),
        }
    }

    /// Fetch a previously submitted transaction by identifier.
    pub async fn fetch(&self, transaction_id: &str) -> Result<TransactionDetails, LedgerError> {
        match self {
            Self::Http(ledger) => ledger.fetch(transaction_id).await,
            Self::Mock(ledger) => ledger.fetch(transaction_id),
        }
    }

    /// Report connectivity and current chain height.
    pub async fn status(&self) -> Result<NetworkStatus, LedgerError> {
        match self {
            Self::Http(ledger) => ledger.status().await,
            Self::Mock(ledger) => Ok(ledger.status()),
        }
    }

    /// The network identifier this client anchors to.
    pub fn network(&self) -> &str {
        match self {
            Self::Http(ledger) => ledger.network(),
            Self::Mock(ledger) => ledger.network(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_classification() {
        assert!(LedgerError::Unavailable("connection refused".into()).is_retriable());
        assert!(LedgerError::Timeout { elapsed_ms: 5000 }.is_retriable());
        assert!(!LedgerError::Rejected("bad payload".into()).is_retriable());
        assert!(!LedgerError::NotFound("tx-missing".into()).is_retriable());
    }

    #[test]
    fn error_display() {
        let err = LedgerError::Timeout { elapsed_ms: 5000 };
        assert!(err.to_string().contains("5000"));
        let err = LedgerError::Rejected("digest malformed".into());
        assert!(err.to_string().contains("digest malformed"));
    }

    #[test]
    fn receipt_serde_roundtrip() {
        let receipt = SubmitReceipt {
            transaction_id: "tx-abc".into(),
            block_height: 42,
        };
        let json = serde_json::to_string(&receipt).unwrap();
        let back: SubmitReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(back.transaction_id, "tx-abc");
        assert_eq!(back.block_height, 42);
    }
}
