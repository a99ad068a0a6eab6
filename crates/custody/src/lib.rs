//! Kubera Custody - Signed client for the Fystack custody API
//!
//! Two pieces: the request signer (HMAC-SHA256 over a canonical sorted
//! query string) and the HTTP client that wraps it. The client owns
//! nothing stateful beyond its credentials; idempotency keys for
//! withdrawals are generated by the caller, one per logical attempt.

pub mod client;
pub mod error;
pub mod signer;

pub use client::{
    extract_wallet_id, extract_withdrawal_id, CreateWalletRequest, FystackClient,
    FystackConfig, WalletPurpose, WalletType, WithdrawalRequest,
};
pub use error::{CustodyError, CustodyResult};
pub use signer::RequestSigner;
