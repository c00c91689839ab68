//! # Configuration
//!
//! YAML configuration with environment overrides. The file carries
//! everything the process needs at start: bind address, ledger adapter
//! selection, issuer token table, institution certificate prefixes, and
//! the course catalog seed.
//!
//! ## Example
//!
//! ```yaml
//! bind_addr: "0.0.0.0:8080"
//! ledger:
//!   mode: http
//!   endpoint: "https://ledger-node.internal:7310/"
//!   network: algorand-testnet
//!   submit_timeout_secs: 10
//!   fetch_timeout_secs: 2
//! institutions:
//!   - id: 0191c6a2-...-...
//!     certificate_prefix: UOA
//! issuers:
//!   - token: s3cr3t-registrar-token
//!     subject: registrar@uoa
//!     institution_id: 0191c6a2-...-...
//!     capabilities: [issue_credentials, revoke_credentials]
//! courses:
//!   - id: 0191c6b0-...-...
//!     credit_weight: 3
//! ```
//!
//! Environment overrides: `CREDA_BIND_ADDR`, `CREDA_LEDGER_ENDPOINT`,
//! `CREDA_LEDGER_NETWORK`. `DATABASE_URL` is read by the persistence
//! layer, not here.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use creda_core::{Capability, InstitutionId, Principal};

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file could not be parsed.
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        /// Path that failed.
        path: String,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A field carried an invalid value.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Which ledger adapter to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMode {
    /// In-process deterministic mock (development, tests).
    #[default]
    Mock,
    /// REST adapter against a ledger node.
    Http,
}

/// Ledger gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Adapter selection.
    #[serde(default)]
    pub mode: LedgerMode,
    /// Node base URL (required for `http` mode).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Network identifier recorded in anchor references.
    #[serde(default = "default_network")]
    pub network: String,
    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Overall deadline for one anchoring submission.
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout_secs: u64,
    /// Deadline for the best-effort live read during verification.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            mode: LedgerMode::Mock,
            endpoint: None,
            network: default_network(),
            request_timeout_secs: default_request_timeout(),
            submit_timeout_secs: default_submit_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl LedgerSettings {
    /// Overall submission deadline.
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    /// Live-read deadline.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Per-request HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// An institution known to this registry instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionEntry {
    /// Institution identifier.
    pub id: Uuid,
    /// Prefix for composed certificate numbers, e.g. `UOA`.
    pub certificate_prefix: String,
}

/// A bearer token and the principal it resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerToken {
    /// The bearer token value. Compared in constant time.
    pub token: String,
    /// Principal subject.
    pub subject: String,
    /// Institution the principal acts for.
    pub institution_id: Uuid,
    /// Granted capabilities.
    pub capabilities: Vec<Capability>,
}

impl IssuerToken {
    /// The principal this token resolves to.
    pub fn principal(&self) -> Principal {
        Principal::new(
            self.subject.clone(),
            InstitutionId::from(self.institution_id),
            self.capabilities.iter().copied(),
        )
    }
}

/// Course catalog seed entry. The catalog itself is managed elsewhere;
/// the registry only needs credit weights for result submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSeed {
    /// Course identifier.
    pub id: Uuid,
    /// Current credit weight.
    pub credit_weight: u8,
}

/// Top-level API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Ledger gateway settings.
    #[serde(default)]
    pub ledger: LedgerSettings,
    /// Institutions served by this instance.
    #[serde(default)]
    pub institutions: Vec<InstitutionEntry>,
    /// Issuer token table.
    #[serde(default)]
    pub issuers: Vec<IssuerToken>,
    /// Course catalog seed.
    #[serde(default)]
    pub courses: Vec<CourseSeed>,
    /// Capacity of the in-memory verification attempt log.
    #[serde(default = "default_attempt_capacity")]
    pub attempt_log_capacity: usize,
    /// Interval for the background anchoring retry sweep; absent disables
    /// the sweep.
    #[serde(default)]
    pub retry_sweep_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            ledger: LedgerSettings::default(),
            institutions: Vec::new(),
            issuers: Vec::new(),
            courses: Vec::new(),
            attempt_log_capacity: default_attempt_capacity(),
            retry_sweep_secs: None,
        }
    }
}

impl ApiConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides onto an already-built configuration.
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("CREDA_BIND_ADDR") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "ignoring unparseable CREDA_BIND_ADDR");
            }
        }
        if let Ok(endpoint) = std::env::var("CREDA_LEDGER_ENDPOINT") {
            self.ledger.endpoint = Some(endpoint);
            self.ledger.mode = LedgerMode::Http;
        }
        if let Ok(network) = std::env::var("CREDA_LEDGER_NETWORK") {
            self.ledger.network = network;
        }
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.mode == LedgerMode::Http && self.ledger.endpoint.is_none() {
            return Err(ConfigError::Invalid {
                field: "ledger.endpoint",
                reason: "required when ledger.mode is http".to_string(),
            });
        }
        if self.ledger.submit_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "ledger.submit_timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for issuer in &self.issuers {
            if issuer.token.len() < 16 {
                return Err(ConfigError::Invalid {
                    field: "issuers.token",
                    reason: format!("token for {} is shorter than 16 chars", issuer.subject),
                });
            }
            if !seen.insert(issuer.token.as_str()) {
                return Err(ConfigError::Invalid {
                    field: "issuers.token",
                    reason: "duplicate token value".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Certificate prefixes keyed by institution id, for the lifecycle
    /// manager.
    pub fn certificate_prefixes(
        &self,
    ) -> std::collections::HashMap<InstitutionId, String> {
        self.institutions
            .iter()
            .map(|entry| {
                (
                    InstitutionId::from(entry.id),
                    entry.certificate_prefix.clone(),
                )
            })
            .collect()
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("static default address")
}

fn default_network() -> String {
    "mock".to_string()
}

fn default_request_timeout() -> u64 {
    5
}

fn default_submit_timeout() -> u64 {
    10
}

fn default_fetch_timeout() -> u64 {
    2
}

fn default_attempt_capacity() -> usize {
    100_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = ApiConfig::default();
        assert_eq!(config.ledger.mode, LedgerMode::Mock);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_minimal_yaml() {
        let yaml = r#"
bind_addr: "127.0.0.1:9090"
ledger:
  mode: mock
  network: devnet
"#;
        let config: ApiConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.bind_addr.port(), 9090);
        assert_eq!(config.ledger.network, "devnet");
        assert!(config.issuers.is_empty());
    }

    #[test]
    fn parses_full_issuer_table() {
        let yaml = r#"
issuers:
  - token: registrar-token-0123456789
    subject: registrar@uoa
    institution_id: 00000000-0000-0000-0000-000000001001
    capabilities: [issue_credentials, revoke_credentials]
institutions:
  - id: 00000000-0000-0000-0000-000000001001
    certificate_prefix: UOA
courses:
  - id: 00000000-0000-0000-0000-000000002001
    credit_weight: 3
"#;
        let config: ApiConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        let principal = config.issuers[0].principal();
        assert!(principal.can_issue(&InstitutionId::from(config.issuers[0].institution_id)));
        assert_eq!(config.certificate_prefixes().len(), 1);
        assert_eq!(config.courses[0].credit_weight, 3);
    }

    #[test]
    fn http_mode_requires_endpoint() {
        let mut config = ApiConfig::default();
        config.ledger.mode = LedgerMode::Http;
        assert!(config.validate().is_err());
        config.ledger.endpoint = Some("http://node:7310/".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn short_tokens_rejected() {
        let mut config = ApiConfig::default();
        config.issuers.push(IssuerToken {
            token: "short".to_string(),
            subject: "x".to_string(),
            institution_id: Uuid::nil(),
            capabilities: vec![],
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_tokens_rejected() {
        let mut config = ApiConfig::default();
        for subject in ["a", "b"] {
            config.issuers.push(IssuerToken {
                token: "same-token-0123456789".to_string(),
                subject: subject.to_string(),
                institution_id: Uuid::nil(),
                capabilities: vec![],
            });
        }
        assert!(config.validate().is_err());
    }
}
