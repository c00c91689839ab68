//! # HTTP Ledger Adapter
//!
//! REST adapter against a ledger node exposing the three-call boundary:
//!
//! - `POST /transactions` with `{digest, memo}` → `{transaction_id, block_height}`
//! - `GET /transactions/{id}` → transaction details
//! - `GET /status` → `{network, current_height}`
//!
//! Transport failures map onto the structured error taxonomy: request
//! timeouts become [`LedgerError::Timeout`], connection failures become
//! [`LedgerError::Unavailable`], HTTP 404 becomes [`LedgerError::NotFound`],
//! and other 4xx responses become [`LedgerError::Rejected`]. 5xx responses
//! are treated as `Unavailable` — the node exists but cannot currently
//! serve, which is a retriable condition.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::gateway::{
    AnchorSubmission, LedgerError, NetworkStatus, SubmitReceipt, TransactionDetails,
};

/// REST client for a ledger node.
#[derive(Debug)]
pub struct HttpLedger {
    client: reqwest::Client,
    base: Url,
    network: String,
}

/// Wire shape of the node's submit response.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    transaction_id: String,
    block_height: u64,
}

/// Wire shape of the node's transaction detail response.
#[derive(Debug, Deserialize)]
struct TransactionResponse {
    transaction_id: String,
    block_height: u64,
    #[serde(default)]
    digest: String,
    #[serde(default)]
    memo: String,
}

/// Wire shape of the node's status response.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    network: String,
    current_height: u64,
}

impl HttpLedger {
    /// Construct an adapter for the node at `base`, anchoring to `network`.
    ///
    /// `request_timeout` bounds every individual HTTP request; the
    /// lifecycle manager applies its own overall submission deadline on
    /// top of this.
    pub fn new(
        base: Url,
        network: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LedgerError::Unavailable(format!("client construction failed: {e}")))?;
        Ok(Self {
            client,
            base,
            network: network.into(),
        })
    }

    /// Submit an anchoring transaction and await its inclusion receipt.
    pub async fn submit(&self, submission: &AnchorSubmission) -> Result<SubmitReceipt, LedgerError> {
        let url = self.endpoint("transactions")?;
        let body = serde_json::json!({
            "digest": submission.digest.to_string(),
            "memo": submission.memo,
        });

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;
        let response = check_status(response)?;

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Unavailable(format!("malformed submit response: {e}")))?;
        Ok(SubmitReceipt {
            transaction_id: parsed.transaction_id,
            block_height: parsed.block_height,
        })
    }

    /// Fetch a previously submitted transaction by identifier.
    pub async fn fetch(&self, transaction_id: &str) -> Result<TransactionDetails, LedgerError> {
        let url = self.endpoint(&format!("transactions/{transaction_id}"))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LedgerError::NotFound(transaction_id.to_string()));
        }
        let response = check_status(response)?;

        let parsed: TransactionResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Unavailable(format!("malformed transaction response: {e}")))?;
        Ok(TransactionDetails {
            transaction_id: parsed.transaction_id,
            block_height: parsed.block_height,
            digest: parsed.digest,
            memo: parsed.memo,
        })
    }

    /// Report connectivity and current chain height.
    ///
    /// An unreachable node yields `connected: false` rather than an error;
    /// status is a health signal, not a precondition.
    pub async fn status(&self) -> Result<NetworkStatus, LedgerError> {
        let url = self.endpoint("status")?;
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "ledger status probe failed");
                return Ok(NetworkStatus {
                    connected: false,
                    network: self.network.clone(),
                    current_height: 0,
                });
            }
        };

        match check_status(response) {
            Ok(response) => {
                let parsed: StatusResponse = response.json().await.map_err(|e| {
                    LedgerError::Unavailable(format!("malformed status response: {e}"))
                })?;
                Ok(NetworkStatus {
                    connected: true,
                    network: parsed.network,
                    current_height: parsed.current_height,
                })
            }
            Err(_) => Ok(NetworkStatus {
                connected: false,
                network: self.network.clone(),
                current_height: 0,
            }),
        }
    }

    /// The network identifier this adapter anchors to.
    pub fn network(&self) -> &str {
        &self.network
    }

    fn endpoint(&self, path: &str) -> Result<Url, LedgerError> {
        self.base
            .join(path)
            .map_err(|e| LedgerError::Unavailable(format!("invalid endpoint {path:?}: {e}")))
    }
}

/// Map reqwest transport errors onto the gateway taxonomy.
fn map_transport_error(e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        LedgerError::Timeout { elapsed_ms: 0 }
    } else {
        LedgerError::Unavailable(e.to_string())
    }
}

/// Map non-success HTTP statuses onto the gateway taxonomy.
fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LedgerError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status.is_client_error() {
        Err(LedgerError::Rejected(format!("node returned {status}")))
    } else {
        Err(LedgerError::Unavailable(format!("node returned {status}")))
    }
}
