//! # Anchor Reference
//!
//! The persisted, explorer-linkable reference for a ledger anchor:
//! `{network}:{transactionId}:{blockHeight}`. Stable enough to
//! reconstruct an external explorer URL without consulting the gateway.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing an anchor reference string.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid anchor reference {input:?}: {reason}")]
pub struct AnchorRefParseError {
    /// The rejected input.
    pub input: String,
    /// Why parsing failed.
    pub reason: &'static str,
}

/// A parsed `{network}:{transactionId}:{blockHeight}` reference.
///
/// The transaction id may itself contain `:`; the network (first segment)
/// and block height (last segment) may not, so parsing splits once from
/// each end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRef {
    /// Network identifier the anchor lives on.
    pub network: String,
    /// Ledger transaction identifier.
    pub transaction_id: String,
    /// Height of the including block/slot.
    pub block_height: u64,
}

impl AnchorRef {
    /// Build a reference from its parts.
    pub fn new(network: impl Into<String>, transaction_id: impl Into<String>, block_height: u64) -> Self {
        Self {
            network: network.into(),
            transaction_id: transaction_id.into(),
            block_height,
        }
    }

    /// Parse a reference from its display form.
    pub fn parse(s: &str) -> Result<Self, AnchorRefParseError> {
        let err = |reason| AnchorRefParseError {
            input: s.to_string(),
            reason,
        };
        let (network, rest) = s.split_once(':').ok_or_else(|| err("missing separators"))?;
        let (transaction_id, height) = rest
            .rsplit_once(':')
            .ok_or_else(|| err("missing block height segment"))?;
        if network.is_empty() {
            return Err(err("empty network segment"));
        }
        if transaction_id.is_empty() {
            return Err(err("empty transaction id segment"));
        }
        let block_height = height
            .parse::<u64>()
            .map_err(|_| err("block height is not an unsigned integer"))?;
        Ok(Self {
            network: network.to_string(),
            transaction_id: transaction_id.to_string(),
            block_height,
        })
    }
}

impl std::fmt::Display for AnchorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.network, self.transaction_id, self.block_height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let r = AnchorRef::new("algorand-testnet", "TX7ABC", 912_118);
        assert_eq!(r.to_string(), "algorand-testnet:TX7ABC:912118");
    }

    #[test]
    fn parse_roundtrip() {
        let r = AnchorRef::new("mock", "tx-44136fa355b3678a", 7);
        let parsed = AnchorRef::parse(&r.to_string()).unwrap();
        assert_eq!(parsed, r);
    }

    #[test]
    fn parse_transaction_id_containing_colons() {
        let parsed = AnchorRef::parse("net:tx:with:colons:99").unwrap();
        assert_eq!(parsed.network, "net");
        assert_eq!(parsed.transaction_id, "tx:with:colons");
        assert_eq!(parsed.block_height, 99);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(AnchorRef::parse("").is_err());
        assert!(AnchorRef::parse("no-separators").is_err());
        assert!(AnchorRef::parse("net:tx").is_err());
        assert!(AnchorRef::parse("net:tx:not-a-number").is_err());
        assert!(AnchorRef::parse(":tx:1").is_err());
        assert!(AnchorRef::parse("net::1").is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let r = AnchorRef::new("algorand-mainnet", "TXID", 1);
        let json = serde_json::to_string(&r).unwrap();
        let back: AnchorRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
