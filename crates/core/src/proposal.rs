//! Proposal lifecycle states and decision records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error when parsing an unknown status string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown proposal status: {0}")]
pub struct StatusParseError(pub String);

/// Status of a spending proposal.
///
/// Legal transitions implemented by the workflow:
/// `Draft -> Submitted -> {Approved, Rejected}`.
/// `Spent` and `Cancelled` exist in the schema for a later phase; no
/// transition reaches them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Spent,
    Cancelled,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Submitted => "submitted",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Spent => "spent",
            ProposalStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ProposalStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProposalStatus::Draft),
            "submitted" => Ok(ProposalStatus::Submitted),
            "approved" => Ok(ProposalStatus::Approved),
            "rejected" => Ok(ProposalStatus::Rejected),
            "spent" => Ok(ProposalStatus::Spent),
            "cancelled" => Ok(ProposalStatus::Cancelled),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The outcome recorded by a single approval event.
///
/// Approval records are append-only audit rows; a proposal accumulates one
/// per decision event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }

    /// The proposal status this decision moves a submitted proposal into
    pub fn resulting_status(&self) -> ProposalStatus {
        match self {
            Decision::Approved => ProposalStatus::Approved,
            Decision::Rejected => ProposalStatus::Rejected,
        }
    }
}

impl FromStr for Decision {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Decision::Approved),
            "rejected" => Ok(Decision::Rejected),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
