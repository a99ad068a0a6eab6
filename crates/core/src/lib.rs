//! Kubera Core - Domain types
//!
//! This crate contains the fundamental types used across Kubera:
//! - `Amount`: Non-negative decimal wrapper for budget and proposal amounts
//! - `CurrencyCode`: Validated ISO 4217-like currency codes
//! - `Role` / `Action`: Workspace-scoped roles and the authorization matrix
//! - `ProposalStatus` / `Decision`: Proposal lifecycle states
//! - `ErrorCode`: Stable machine-readable error codes for the API envelope

pub mod amount;
pub mod currency;
pub mod error_code;
pub mod proposal;
pub mod role;

pub use amount::{Amount, AmountError};
pub use currency::{CurrencyCode, CurrencyError};
pub use error_code::ErrorCode;
pub use proposal::{Decision, ProposalStatus, StatusParseError};
pub use role::{Action, Role, RoleParseError};
