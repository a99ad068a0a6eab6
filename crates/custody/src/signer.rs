//! Request signer for the custody provider
//!
//! Every outbound call carries an HMAC-SHA256 tag over a canonical,
//! sorted query string built from the request parameters. Signing is a
//! pure function of the inputs and the shared secret: same inputs, same
//! tag, no side effects.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Methods whose body participates in the signed string.
fn is_mutating(method: &str) -> bool {
    matches!(method, "POST" | "PUT" | "PATCH")
}

/// Holds the shared secret and produces signatures.
#[derive(Clone)]
pub struct RequestSigner {
    secret: String,
}

impl RequestSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign one request.
    ///
    /// `path_with_query` is the path exactly as sent on the wire,
    /// including any query string. `body` is the exact serialized body;
    /// it is signed only for POST/PUT/PATCH — a body handed in with a
    /// non-mutating method is excluded, since the server will not see
    /// one when it recomputes the tag.
    pub fn sign(
        &self,
        method: &str,
        path_with_query: &str,
        timestamp_seconds: i64,
        body: Option<&str>,
    ) -> String {
        let method = method.to_uppercase();

        let mut params = BTreeMap::new();
        params.insert("method", method.clone());
        params.insert("path", path_with_query.to_string());
        params.insert("timestamp", timestamp_seconds.to_string());
        if let Some(body) = body {
            if is_mutating(&method) {
                params.insert("body", body.to_string());
            }
        }

        // BTreeMap iteration gives the lexicographic key order the
        // server expects; values are joined as-is.
        let canonical = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(canonical.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
