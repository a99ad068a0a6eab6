//! Withdrawal executor seam
//!
//! The state machine talks to the custody provider through this trait so
//! the approval logic stays testable without a network.

use async_trait::async_trait;
use kubera_custody::{CustodyResult, FystackClient, WithdrawalRequest};
use serde_json::Value;

/// Executes a withdrawal against the custody provider.
#[async_trait]
pub trait WithdrawalExecutor: Send + Sync {
    async fn request_withdrawal(
        &self,
        wallet_external_id: &str,
        request: &WithdrawalRequest,
        idempotency_key: &str,
    ) -> CustodyResult<Value>;
}

#[async_trait]
impl WithdrawalExecutor for FystackClient {
    async fn request_withdrawal(
        &self,
        wallet_external_id: &str,
        request: &WithdrawalRequest,
        idempotency_key: &str,
    ) -> CustodyResult<Value> {
        FystackClient::request_withdrawal(self, wallet_external_id, request, idempotency_key)
            .await
    }
}
