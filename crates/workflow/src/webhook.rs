//! Webhook ingest - durable inbox for provider callbacks
//!
//! Persists each payload verbatim for reconciliation. No authenticity
//! check and no state mutation happens here: the inbox records what the
//! provider said, it does not act on it.

use crate::error::WorkflowResult;
use chrono::Utc;
use kubera_persistence::{WebhookEventRow, WebhookRepo};
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Persist one provider callback.
///
/// Field extraction is best-effort; an unrecognized payload shape still
/// lands in the inbox under the event name "unknown".
pub async fn ingest(pool: &SqlitePool, payload: &Value) -> WorkflowResult<WebhookEventRow> {
    let event = payload
        .get("event")
        .and_then(value_as_string)
        .unwrap_or_else(|| "unknown".to_string());
    let resource_id = payload
        .get("resource_id")
        .and_then(value_as_string)
        .or_else(|| payload.pointer("/payload/id").and_then(value_as_string));
    let webhook_id = payload.get("webhook_id").and_then(value_as_string);

    let row = WebhookEventRow {
        id: Uuid::new_v4(),
        event,
        resource_id,
        webhook_id,
        payload: payload.to_string(),
        received_at: Utc::now(),
    };
    WebhookRepo::insert(pool, &row).await?;

    tracing::info!(event = %row.event, resource_id = ?row.resource_id, "webhook event stored");
    Ok(row)
}
