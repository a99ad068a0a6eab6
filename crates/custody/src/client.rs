//! Fystack custody client
//!
//! Typed operations against the external wallet/custody API. Each call
//! produces exactly one signed HTTP request; read operations have no
//! side effects, and the only mutating calls are wallet creation and
//! withdrawal requests. There is no retry loop and no timeout policy
//! beyond the transport defaults: a slow provider blocks only the
//! requesting caller.

use crate::error::{CustodyError, CustodyResult};
use crate::signer::RequestSigner;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "https://api.fystack.io";

/// Client configuration. Credentials are optional here so the rest of
/// the system can boot without custody access; `FystackClient::new`
/// rejects a config with missing credentials before any network call.
#[derive(Debug, Clone, Default)]
pub struct FystackConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
}

impl FystackConfig {
    /// Read `FYSTACK_BASE_URL`, `FYSTACK_API_KEY`, `FYSTACK_SECRET_KEY`.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("FYSTACK_BASE_URL").ok(),
            api_key: std::env::var("FYSTACK_API_KEY").ok(),
            secret_key: std::env::var("FYSTACK_SECRET_KEY").ok(),
        }
    }
}

/// Wallet type accepted by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    Standard,
    Mpc,
}

/// Wallet purpose accepted by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletPurpose {
    General,
    User,
}

/// Payload for `POST /wallets`
#[derive(Debug, Clone, Serialize)]
pub struct CreateWalletRequest {
    pub name: String,
    pub wallet_type: WalletType,
    pub wallet_purpose: WalletPurpose,
}

/// Payload for `POST /wallets/{id}/request-withdrawal`
///
/// Amount travels as a decimal string; the provider never sees a float.
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalRequest {
    pub asset_id: String,
    pub amount: String,
    pub recipient_address: String,
}

/// Signed HTTP client for the custody provider.
pub struct FystackClient {
    base_url: String,
    api_key: String,
    signer: RequestSigner,
    http: reqwest::Client,
}

impl FystackClient {
    /// Build a client; fails when api key or secret is absent.
    pub fn new(config: FystackConfig) -> CustodyResult<Self> {
        let api_key = config
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or(CustodyError::MissingCredentials)?;
        let secret = config
            .secret_key
            .filter(|s| !s.is_empty())
            .ok_or(CustodyError::MissingCredentials)?;

        Ok(Self {
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            signer: RequestSigner::new(secret),
            http: reqwest::Client::new(),
        })
    }

    /// Issue one signed request and parse the response.
    ///
    /// The serialized body is signed byte-for-byte as sent, so it is
    /// serialized once here and reused for both the signature and the
    /// request. Non-2xx responses become `CustodyError::Provider` with
    /// the parsed body, or the raw text wrapped when parsing fails.
    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        idempotency_key: Option<&str>,
    ) -> CustodyResult<Value> {
        let path_with_query = if query.is_empty() {
            path.to_string()
        } else {
            let qs = query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            format!("{path}?{qs}")
        };

        let body_text = body.map(serde_json::to_string).transpose()?;
        let timestamp = Utc::now().timestamp();
        let sign = self.signer.sign(
            method.as_str(),
            &path_with_query,
            timestamp,
            body_text.as_deref(),
        );

        let url = format!("{}{}", self.base_url, path_with_query);
        let mut request = self
            .http
            .request(method, &url)
            .header("ACCESS-API-KEY", &self.api_key)
            .header("ACCESS-TIMESTAMP", timestamp.to_string())
            .header("ACCESS-SIGN", sign);

        if let Some(key) = idempotency_key {
            request = request.header("X-Idempotency-Key", key);
        }
        if let Some(body_text) = body_text {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body_text);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let parsed: Value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }))
        };

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), %url, "provider request failed");
            return Err(CustodyError::Provider {
                status: status.as_u16(),
                body: parsed,
            });
        }

        Ok(parsed)
    }

    // === Wallets ===

    pub async fn create_wallet(&self, input: &CreateWalletRequest) -> CustodyResult<Value> {
        let body = serde_json::to_value(input)?;
        self.request(reqwest::Method::POST, "/wallets", &[], Some(&body), None)
            .await
    }

    pub async fn wallet_creation_status(&self, wallet_id: &str) -> CustodyResult<Value> {
        self.request(
            reqwest::Method::GET,
            &format!("/wallets/creation-status/{wallet_id}"),
            &[],
            None,
            None,
        )
        .await
    }

    pub async fn list_wallets(&self, query: &[(&str, String)]) -> CustodyResult<Value> {
        self.request(reqwest::Method::GET, "/wallets", query, None, None)
            .await
    }

    // === Withdrawals ===

    /// Request a withdrawal from a wallet.
    ///
    /// `idempotency_key` must be generated fresh per logical withdrawal
    /// attempt by the caller; the provider deduplicates retries bearing
    /// the same key.
    pub async fn request_withdrawal(
        &self,
        wallet_external_id: &str,
        input: &WithdrawalRequest,
        idempotency_key: &str,
    ) -> CustodyResult<Value> {
        let body = serde_json::to_value(input)?;
        self.request(
            reqwest::Method::POST,
            &format!("/wallets/{wallet_external_id}/request-withdrawal"),
            &[],
            Some(&body),
            Some(idempotency_key),
        )
        .await
    }

    pub async fn get_withdrawal(&self, withdrawal_id: &str) -> CustodyResult<Value> {
        self.request(
            reqwest::Method::GET,
            &format!("/withdrawals/{withdrawal_id}"),
            &[],
            None,
            None,
        )
        .await
    }

    // === Assets / Networks ===

    pub async fn list_assets(&self) -> CustodyResult<Value> {
        self.request(reqwest::Method::GET, "/assets", &[], None, None)
            .await
    }

    pub async fn list_networks(&self) -> CustodyResult<Value> {
        self.request(reqwest::Method::GET, "/networks", &[], None, None)
            .await
    }

    pub async fn workspace_stats(&self) -> CustodyResult<Value> {
        self.request(reqwest::Method::GET, "/workspaces", &[], None, None)
            .await
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Pull the provider wallet id out of a creation response.
///
/// The provider has returned it under several shapes; `null` means the
/// wallet is created asynchronously and must be polled for.
pub fn extract_wallet_id(response: &Value) -> Option<String> {
    response
        .pointer("/data/wallet_id")
        .and_then(value_to_id)
        .or_else(|| response.pointer("/data/id").and_then(value_to_id))
        .or_else(|| response.get("wallet_id").and_then(value_to_id))
}

/// Pull the withdrawal id out of a withdrawal response.
pub fn extract_withdrawal_id(response: &Value) -> Option<String> {
    response
        .pointer("/data/id")
        .and_then(value_to_id)
        .or_else(|| response.get("id").and_then(value_to_id))
}
