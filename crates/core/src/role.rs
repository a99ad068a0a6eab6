//! Role - Workspace-scoped roles and the authorization matrix
//!
//! Roles are a closed enum, and every mutating operation goes through the
//! single `Role::can` matrix. A role only ever means something inside one
//! workspace; there is no global admin.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error when parsing an unknown role string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct RoleParseError(pub String);

/// Workspace-scoped member role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Proposer,
    Approver,
    Viewer,
}

/// Actions gated by the authorization matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Create a draft spending proposal
    CreateProposal,
    /// Decide on a submitted proposal (approve or reject)
    DecideProposal,
    /// Manage workspace structure: members, wallets, budget lines, operations
    ManageWorkspace,
    /// Read workspace data
    View,
}

impl Role {
    /// The authorization matrix.
    ///
    /// Submitting a draft is deliberately absent: only the submitter of a
    /// proposal may submit it, which is an identity check, not a role check.
    pub fn can(&self, action: Action) -> bool {
        match action {
            Action::CreateProposal => {
                matches!(self, Role::Owner | Role::Admin | Role::Proposer)
            }
            Action::DecideProposal => {
                matches!(self, Role::Owner | Role::Admin | Role::Approver)
            }
            Action::ManageWorkspace => matches!(self, Role::Owner | Role::Admin),
            Action::View => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Proposer => "proposer",
            Role::Approver => "approver",
            Role::Viewer => "viewer",
        }
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "proposer" => Ok(Role::Proposer),
            "approver" => Ok(Role::Approver),
            "viewer" => Ok(Role::Viewer),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
