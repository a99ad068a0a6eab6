//! Database schema and row types
//!
//! Amounts are stored as TEXT-encoded decimals, timestamps as RFC 3339
//! TEXT, ids as UUIDs. Row types map tables 1:1; typed accessors parse
//! the stringly columns into `kubera-core` types.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};
use kubera_core::{Amount, CurrencyCode, Decision, ProposalStatus, Role};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create all tables and indexes if they do not exist.
pub async fn init_database(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS workspaces (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            currency TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS workspace_members (
            workspace_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            role TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (workspace_id, user_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS planning_cycles (
            id TEXT PRIMARY KEY,
            workspace_id TEXT NOT NULL,
            name TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS budget_lines (
            id TEXT PRIMARY KEY,
            cycle_id TEXT NOT NULL,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            allocated TEXT NOT NULL,
            parent_id TEXT,
            pic TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (cycle_id, code)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS operations (
            id TEXT PRIMARY KEY,
            cycle_id TEXT NOT NULL,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            hypothesis TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'on_track',
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS kpis (
            id TEXT PRIMARY KEY,
            operation_id TEXT NOT NULL,
            name TEXT NOT NULL,
            target_value TEXT NOT NULL,
            current_value TEXT NOT NULL DEFAULT '0'
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS budget_line_operations (
            budget_line_id TEXT NOT NULL,
            operation_id TEXT NOT NULL,
            PRIMARY KEY (budget_line_id, operation_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS spending_proposals (
            id TEXT PRIMARY KEY,
            workspace_id TEXT NOT NULL,
            cycle_id TEXT NOT NULL,
            budget_line_id TEXT NOT NULL,
            submitter_id TEXT NOT NULL,
            amount TEXT NOT NULL,
            description TEXT NOT NULL,
            justification TEXT,
            vendor_name TEXT,
            expected_date TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            rejection_reason TEXT,
            fystack_withdrawal_id TEXT,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS proposal_approvals (
            id TEXT PRIMARY KEY,
            proposal_id TEXT NOT NULL,
            approver_id TEXT NOT NULL,
            decision TEXT NOT NULL,
            comment TEXT,
            decided_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS wallets (
            id TEXT PRIMARY KEY,
            workspace_id TEXT NOT NULL,
            name TEXT NOT NULL,
            fystack_wallet_id TEXT,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS webhook_events (
            id TEXT PRIMARY KEY,
            event TEXT NOT NULL,
            resource_id TEXT,
            webhook_id TEXT,
            payload TEXT NOT NULL,
            received_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // Indexes for the hot lookup paths
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_proposals_workspace
         ON spending_proposals(workspace_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_approvals_proposal
         ON proposal_approvals(proposal_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_cycles_workspace
         ON planning_cycles(workspace_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Row type for `workspaces`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct WorkspaceRow {
    pub id: Uuid,
    pub name: String,
    pub currency: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl WorkspaceRow {
    pub fn currency(&self) -> PersistenceResult<CurrencyCode> {
        self.currency
            .parse()
            .map_err(|_| PersistenceError::Decode(format!("currency: {}", self.currency)))
    }
}

/// Row type for `workspace_members`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct MemberRow {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl MemberRow {
    pub fn role(&self) -> PersistenceResult<Role> {
        self.role
            .parse()
            .map_err(|_| PersistenceError::Decode(format!("role: {}", self.role)))
    }
}

/// Row type for `planning_cycles`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct CycleRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Row type for `budget_lines`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct BudgetLineRow {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub code: String,
    pub name: String,
    pub allocated: String, // Decimal stored as TEXT
    pub parent_id: Option<Uuid>,
    pub pic: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BudgetLineRow {
    pub fn allocated(&self) -> PersistenceResult<Amount> {
        Amount::parse(&self.allocated)
            .map_err(|e| PersistenceError::Decode(format!("allocated: {e}")))
    }
}

/// Row type for `operations`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct OperationRow {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub code: String,
    pub name: String,
    pub hypothesis: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Row type for `kpis`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct KpiRow {
    pub id: Uuid,
    pub operation_id: Uuid,
    pub name: String,
    pub target_value: String,
    pub current_value: String,
}

/// Row type for `budget_line_operations`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct BudgetLineOperationRow {
    pub budget_line_id: Uuid,
    pub operation_id: Uuid,
}

/// Row type for `spending_proposals`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ProposalRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub cycle_id: Uuid,
    pub budget_line_id: Uuid,
    pub submitter_id: Uuid,
    pub amount: String, // Decimal stored as TEXT
    pub description: String,
    pub justification: Option<String>,
    pub vendor_name: Option<String>,
    pub expected_date: Option<DateTime<Utc>>,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub fystack_withdrawal_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProposalRow {
    pub fn status(&self) -> PersistenceResult<ProposalStatus> {
        self.status
            .parse()
            .map_err(|_| PersistenceError::Decode(format!("status: {}", self.status)))
    }

    pub fn amount(&self) -> PersistenceResult<Amount> {
        Amount::parse(&self.amount)
            .map_err(|e| PersistenceError::Decode(format!("amount: {e}")))
    }
}

/// Row type for `proposal_approvals` (append-only)
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ApprovalRow {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub approver_id: Uuid,
    pub decision: String,
    pub comment: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl ApprovalRow {
    pub fn decision(&self) -> PersistenceResult<Decision> {
        self.decision
            .parse()
            .map_err(|_| PersistenceError::Decode(format!("decision: {}", self.decision)))
    }
}

/// Row type for `wallets`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct WalletRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub fystack_wallet_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row type for `webhook_events` (append-only)
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct WebhookEventRow {
    pub id: Uuid,
    pub event: String,
    pub resource_id: Option<String>,
    pub webhook_id: Option<String>,
    pub payload: String, // JSON stored as TEXT
    pub received_at: DateTime<Utc>,
}

impl WebhookEventRow {
    pub fn payload(&self) -> PersistenceResult<serde_json::Value> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}
