//! # Principals and Capabilities
//!
//! Authentication itself (sessions, tokens, SSO) is an external
//! collaborator; what the registry needs internally is a resolved
//! principal and a capability check scoped to an institution. Every
//! mutating operation takes a [`Principal`] and verifies the relevant
//! [`Capability`] before touching state.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::identity::InstitutionId;

/// A capability a principal may hold within its institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// May issue credentials for the institution.
    IssueCredentials,
    /// May revoke credentials belonging to the institution.
    RevokeCredentials,
    /// May approve, publish, or dispute academic results.
    ModerateResults,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::IssueCredentials => "issue_credentials",
            Self::RevokeCredentials => "revoke_credentials",
            Self::ModerateResults => "moderate_results",
        };
        f.write_str(s)
    }
}

/// A resolved caller identity: who they are, which institution they act
/// for, and what they may do there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Stable subject identifier from the external auth system.
    pub subject: String,
    /// The institution this principal acts on behalf of.
    pub institution_id: InstitutionId,
    /// Capabilities granted within that institution.
    pub capabilities: HashSet<Capability>,
}

impl Principal {
    /// Construct a principal with the given capabilities.
    pub fn new(
        subject: impl Into<String>,
        institution_id: InstitutionId,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            subject: subject.into(),
            institution_id,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    /// Whether this principal may issue credentials for `institution`.
    pub fn can_issue(&self, institution: &InstitutionId) -> bool {
        self.institution_id == *institution
            && self.capabilities.contains(&Capability::IssueCredentials)
    }

    /// Whether this principal may revoke credentials for `institution`.
    pub fn can_revoke(&self, institution: &InstitutionId) -> bool {
        self.institution_id == *institution
            && self.capabilities.contains(&Capability::RevokeCredentials)
    }

    /// Whether this principal may moderate academic results.
    pub fn can_moderate_results(&self) -> bool {
        self.capabilities.contains(&Capability::ModerateResults)
    }
}
