//! # Mock Ledger
//!
//! Deterministic in-process ledger for development and tests. Transaction
//! identifiers are derived from the submitted digest prefix, block heights
//! increase monotonically, and submissions are remembered so a later
//! `fetch` resolves them.
//!
//! ## Failure scripting
//!
//! Tests drive the unavailable/rejected/timeout paths by setting a
//! [`FailureMode`] on the mock. The mode applies to subsequent `submit`
//! calls until changed, which lets a test fail the first anchoring attempt
//! and succeed the retry.
//!
//! ## Warning
//!
//! Provides no durability or finality. Suitable only for development and
//! tests; production deployments configure the HTTP adapter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::gateway::{
    AnchorSubmission, LedgerError, NetworkStatus, SubmitReceipt, TransactionDetails,
};

/// Scripted failure behavior for `submit` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Submissions succeed.
    #[default]
    None,
    /// Submissions fail with [`LedgerError::Unavailable`].
    Unavailable,
    /// Submissions fail with [`LedgerError::Rejected`].
    Reject,
    /// Submissions fail with [`LedgerError::Timeout`].
    Timeout,
}

/// Deterministic in-process ledger.
#[derive(Debug)]
pub struct MockLedger {
    network: String,
    next_block: AtomicU64,
    failure: Mutex<FailureMode>,
    transactions: Mutex<HashMap<String, TransactionDetails>>,
}

impl MockLedger {
    /// Create a mock ledger for the given network name.
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            next_block: AtomicU64::new(1),
            failure: Mutex::new(FailureMode::None),
            transactions: Mutex::new(HashMap::new()),
        }
    }

    /// Set the failure mode applied to subsequent submissions.
    pub fn set_failure(&self, mode: FailureMode) {
        *self.failure.lock() = mode;
    }

    /// Number of transactions the mock has accepted.
    pub fn transaction_count(&self) -> usize {
        self.transactions.lock().len()
    }

    /// Submit an anchoring transaction.
    pub fn submit(&self, submission: &AnchorSubmission) -> Result<SubmitReceipt, LedgerError> {
        match *self.failure.lock() {
            FailureMode::None => {}
            FailureMode::Unavailable => {
                return Err(LedgerError::Unavailable("mock ledger offline".to_string()));
            }
            FailureMode::Reject => {
                return Err(LedgerError::Rejected("mock ledger rejection".to_string()));
            }
            FailureMode::Timeout => {
                return Err(LedgerError::Timeout { elapsed_ms: 0 });
            }
        }

        let block = self.next_block.fetch_add(1, Ordering::SeqCst);
        let hex = submission.digest.to_hex();
        let transaction_id = format!("tx-{}", hex.get(..16).unwrap_or(&hex));

        let details = TransactionDetails {
            transaction_id: transaction_id.clone(),
            block_height: block,
            digest: submission.digest.to_string(),
            memo: submission.memo.clone(),
        };
        self.transactions
            .lock()
            .insert(transaction_id.clone(), details);

        Ok(SubmitReceipt {
            transaction_id,
            block_height: block,
        })
    }

    /// Fetch a previously submitted transaction.
    pub fn fetch(&self, transaction_id: &str) -> Result<TransactionDetails, LedgerError> {
        self.transactions
            .lock()
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(transaction_id.to_string()))
    }

    /// Report connectivity and chain tip.
    pub fn status(&self) -> NetworkStatus {
        NetworkStatus {
            connected: *self.failure.lock() != FailureMode::Unavailable,
            network: self.network.clone(),
            // next_block is the height the NEXT submission will land at.
            current_height: self.next_block.load(Ordering::SeqCst).saturating_sub(1),
        }
    }

    /// The network identifier.
    pub fn network(&self) -> &str {
        &self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creda_core::{sha256_digest, CanonicalBytes};

    fn submission(label: &str) -> AnchorSubmission {
        let cb = CanonicalBytes::new(&serde_json::json!({ "credential": label })).unwrap();
        AnchorSubmission {
            digest: sha256_digest(&cb),
            memo: format!("memo-{label}"),
        }
    }

    #[test]
    fn submit_succeeds_with_digest_derived_tx_id() {
        let ledger = MockLedger::new("mock");
        let sub = submission("c1");
        let receipt = ledger.submit(&sub).unwrap();
        assert!(receipt.transaction_id.starts_with("tx-"));
        assert_eq!(receipt.transaction_id.len(), 3 + 16);
        assert_eq!(receipt.block_height, 1);
    }

    #[test]
    fn blocks_increment() {
        let ledger = MockLedger::new("mock");
        for expected in 1..=5 {
            let receipt = ledger.submit(&submission(&format!("c{expected}"))).unwrap();
            assert_eq!(receipt.block_height, expected);
        }
    }

    #[test]
    fn fetch_resolves_submitted_transaction() {
        let ledger = MockLedger::new("mock");
        let sub = submission("c1");
        let receipt = ledger.submit(&sub).unwrap();
        let details = ledger.fetch(&receipt.transaction_id).unwrap();
        assert_eq!(details.digest, sub.digest.to_string());
        assert_eq!(details.memo, "memo-c1");
        assert_eq!(details.block_height, receipt.block_height);
    }

    #[test]
    fn fetch_unknown_is_not_found() {
        let ledger = MockLedger::new("mock");
        match ledger.fetch("tx-missing") {
            Err(LedgerError::NotFound(id)) => assert_eq!(id, "tx-missing"),
            other => panic!("expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn failure_modes_are_scriptable() {
        let ledger = MockLedger::new("mock");

        ledger.set_failure(FailureMode::Unavailable);
        assert!(matches!(
            ledger.submit(&submission("c1")),
            Err(LedgerError::Unavailable(_))
        ));

        ledger.set_failure(FailureMode::Reject);
        assert!(matches!(
            ledger.submit(&submission("c1")),
            Err(LedgerError::Rejected(_))
        ));

        ledger.set_failure(FailureMode::Timeout);
        assert!(matches!(
            ledger.submit(&submission("c1")),
            Err(LedgerError::Timeout { .. })
        ));

        // Recovery: clearing the mode lets the retry land.
        ledger.set_failure(FailureMode::None);
        assert!(ledger.submit(&submission("c1")).is_ok());
    }

    #[test]
    fn failed_submissions_do_not_consume_blocks() {
        let ledger = MockLedger::new("mock");
        ledger.set_failure(FailureMode::Unavailable);
        let _ = ledger.submit(&submission("c1"));
        ledger.set_failure(FailureMode::None);
        let receipt = ledger.submit(&submission("c1")).unwrap();
        assert_eq!(receipt.block_height, 1);
        assert_eq!(ledger.transaction_count(), 1);
    }

    #[test]
    fn status_reports_network_and_height() {
        let ledger = MockLedger::new("mock-net");
        let status = ledger.status();
        assert!(status.connected);
        assert_eq!(status.network, "mock-net");
        assert_eq!(status.current_height, 0);

        ledger.submit(&submission("c1")).unwrap();
        assert_eq!(ledger.status().current_height, 1);
    }

    #[test]
    fn status_disconnected_when_unavailable() {
        let ledger = MockLedger::new("mock");
        ledger.set_failure(FailureMode::Unavailable);
        assert!(!ledger.status().connected);
    }
}
