//! Repository implementations for SQLite
//!
//! Point lookups by id/unique key, ordered listings, and the two write
//! paths that must be atomic: recording a proposal decision and switching
//! the active planning cycle.

use crate::error::{PersistenceError, PersistenceResult};
use crate::schema::*;
use chrono::Utc;
use kubera_core::{Decision, ProposalStatus, Role};
use sqlx::SqlitePool;
use uuid::Uuid;

// ============================================================================
// Workspace Repository
// ============================================================================

pub struct WorkspaceRepo;

impl WorkspaceRepo {
    pub async fn get_by_id(pool: &SqlitePool, id: Uuid) -> PersistenceResult<WorkspaceRow> {
        sqlx::query_as::<_, WorkspaceRow>("SELECT * FROM workspaces WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Workspace", id))
    }

    /// List workspaces a user belongs to, newest first.
    pub async fn list_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> PersistenceResult<Vec<WorkspaceRow>> {
        let rows = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT w.* FROM workspaces w
             JOIN workspace_members m ON m.workspace_id = w.id
             WHERE m.user_id = ?
             ORDER BY w.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Create a workspace together with its owner membership and its single
    /// annual planning cycle, in one transaction.
    ///
    /// Current policy is one cycle per workspace, spanning the workspace
    /// period; this is the only place a cycle is ever created.
    pub async fn create_annual(
        pool: &SqlitePool,
        workspace: &WorkspaceRow,
        owner_id: Uuid,
    ) -> PersistenceResult<CycleRow> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO workspaces (id, name, currency, start_date, end_date, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(workspace.id)
        .bind(&workspace.name)
        .bind(&workspace.currency)
        .bind(workspace.start_date)
        .bind(workspace.end_date)
        .bind(workspace.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO workspace_members (workspace_id, user_id, role, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(workspace.id)
        .bind(owner_id)
        .bind(Role::Owner.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let cycle = CycleRow {
            id: Uuid::new_v4(),
            workspace_id: workspace.id,
            name: "Initial".to_string(),
            start_date: workspace.start_date,
            end_date: workspace.end_date,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO planning_cycles
             (id, workspace_id, name, start_date, end_date, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(cycle.id)
        .bind(cycle.workspace_id)
        .bind(&cycle.name)
        .bind(cycle.start_date)
        .bind(cycle.end_date)
        .bind(cycle.is_active)
        .bind(cycle.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(cycle)
    }
}

// ============================================================================
// Member Repository
// ============================================================================

pub struct MemberRepo;

impl MemberRepo {
    /// Point lookup on the (workspace, user) unique pair.
    pub async fn find(
        pool: &SqlitePool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> PersistenceResult<Option<MemberRow>> {
        let row = sqlx::query_as::<_, MemberRow>(
            "SELECT * FROM workspace_members WHERE workspace_id = ? AND user_id = ?",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Insert a member or update their role if the pair already exists.
    pub async fn upsert(
        pool: &SqlitePool,
        workspace_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> PersistenceResult<MemberRow> {
        sqlx::query(
            "INSERT INTO workspace_members (workspace_id, user_id, role, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (workspace_id, user_id) DO UPDATE SET role = excluded.role",
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Self::find(pool, workspace_id, user_id)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Member", user_id))
    }
}

// ============================================================================
// Planning Cycle Repository
// ============================================================================

pub struct CycleRepo;

impl CycleRepo {
    pub async fn get_by_id(pool: &SqlitePool, id: Uuid) -> PersistenceResult<CycleRow> {
        sqlx::query_as::<_, CycleRow>("SELECT * FROM planning_cycles WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Cycle", id))
    }

    pub async fn list_for_workspace(
        pool: &SqlitePool,
        workspace_id: Uuid,
    ) -> PersistenceResult<Vec<CycleRow>> {
        let rows = sqlx::query_as::<_, CycleRow>(
            "SELECT * FROM planning_cycles WHERE workspace_id = ? ORDER BY created_at DESC",
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Make one cycle the active cycle of its workspace.
    ///
    /// Deactivating the others and activating the target happen inside one
    /// transaction, so the at-most-one-active invariant holds at every
    /// point an outside reader can observe.
    pub async fn activate(
        pool: &SqlitePool,
        workspace_id: Uuid,
        cycle_id: Uuid,
    ) -> PersistenceResult<CycleRow> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE planning_cycles SET is_active = 0 WHERE workspace_id = ?")
            .bind(workspace_id)
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query(
            "UPDATE planning_cycles SET is_active = 1 WHERE id = ? AND workspace_id = ?",
        )
        .bind(cycle_id)
        .bind(workspace_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(PersistenceError::not_found("Cycle", cycle_id));
        }

        let row = sqlx::query_as::<_, CycleRow>("SELECT * FROM planning_cycles WHERE id = ?")
            .bind(cycle_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }
}

// ============================================================================
// Budget Line Repository
// ============================================================================

pub struct BudgetLineRepo;

impl BudgetLineRepo {
    pub async fn get_by_id(pool: &SqlitePool, id: Uuid) -> PersistenceResult<BudgetLineRow> {
        sqlx::query_as::<_, BudgetLineRow>("SELECT * FROM budget_lines WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("BudgetLine", id))
    }

    pub async fn list_for_cycle(
        pool: &SqlitePool,
        cycle_id: Uuid,
    ) -> PersistenceResult<Vec<BudgetLineRow>> {
        let rows = sqlx::query_as::<_, BudgetLineRow>(
            "SELECT * FROM budget_lines WHERE cycle_id = ? ORDER BY code ASC",
        )
        .bind(cycle_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert(pool: &SqlitePool, line: &BudgetLineRow) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO budget_lines
             (id, cycle_id, code, name, allocated, parent_id, pic, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(line.id)
        .bind(line.cycle_id)
        .bind(&line.code)
        .bind(&line.name)
        .bind(&line.allocated)
        .bind(line.parent_id)
        .bind(&line.pic)
        .bind(&line.notes)
        .bind(line.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Associate a budget line with an operation (presence only, no weight).
    pub async fn link_operation(
        pool: &SqlitePool,
        budget_line_id: Uuid,
        operation_id: Uuid,
    ) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO budget_line_operations (budget_line_id, operation_id)
             VALUES (?, ?)",
        )
        .bind(budget_line_id)
        .bind(operation_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn links_for_cycle(
        pool: &SqlitePool,
        cycle_id: Uuid,
    ) -> PersistenceResult<Vec<BudgetLineOperationRow>> {
        let rows = sqlx::query_as::<_, BudgetLineOperationRow>(
            "SELECT l.budget_line_id, l.operation_id
             FROM budget_line_operations l
             JOIN budget_lines b ON b.id = l.budget_line_id
             WHERE b.cycle_id = ?",
        )
        .bind(cycle_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

// ============================================================================
// Operation Repository
// ============================================================================

pub struct OperationRepo;

impl OperationRepo {
    pub async fn get_by_id(pool: &SqlitePool, id: Uuid) -> PersistenceResult<OperationRow> {
        sqlx::query_as::<_, OperationRow>("SELECT * FROM operations WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Operation", id))
    }

    pub async fn list_for_cycle(
        pool: &SqlitePool,
        cycle_id: Uuid,
    ) -> PersistenceResult<Vec<OperationRow>> {
        let rows = sqlx::query_as::<_, OperationRow>(
            "SELECT * FROM operations WHERE cycle_id = ? ORDER BY code ASC",
        )
        .bind(cycle_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert(pool: &SqlitePool, op: &OperationRow) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO operations (id, cycle_id, code, name, hypothesis, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(op.id)
        .bind(op.cycle_id)
        .bind(&op.code)
        .bind(&op.name)
        .bind(&op.hypothesis)
        .bind(&op.status)
        .bind(op.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn insert_kpi(pool: &SqlitePool, kpi: &KpiRow) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO kpis (id, operation_id, name, target_value, current_value)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(kpi.id)
        .bind(kpi.operation_id)
        .bind(&kpi.name)
        .bind(&kpi.target_value)
        .bind(&kpi.current_value)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn kpis_for_operation(
        pool: &SqlitePool,
        operation_id: Uuid,
    ) -> PersistenceResult<Vec<KpiRow>> {
        let rows = sqlx::query_as::<_, KpiRow>("SELECT * FROM kpis WHERE operation_id = ?")
            .bind(operation_id)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }
}

// ============================================================================
// Spending Proposal Repository
// ============================================================================

/// Optional filters for proposal listings
#[derive(Debug, Clone, Default)]
pub struct ProposalFilter {
    pub cycle_id: Option<Uuid>,
    pub status: Option<ProposalStatus>,
}

pub struct ProposalRepo;

impl ProposalRepo {
    pub async fn get_by_id(pool: &SqlitePool, id: Uuid) -> PersistenceResult<ProposalRow> {
        sqlx::query_as::<_, ProposalRow>("SELECT * FROM spending_proposals WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Proposal", id))
    }

    pub async fn list(
        pool: &SqlitePool,
        workspace_id: Uuid,
        filter: &ProposalFilter,
    ) -> PersistenceResult<Vec<ProposalRow>> {
        // Optional filters collapse to always-true predicates when absent.
        let rows = sqlx::query_as::<_, ProposalRow>(
            "SELECT * FROM spending_proposals
             WHERE workspace_id = ?
               AND (? IS NULL OR cycle_id = ?)
               AND (? IS NULL OR status = ?)
             ORDER BY created_at DESC",
        )
        .bind(workspace_id)
        .bind(filter.cycle_id)
        .bind(filter.cycle_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert(pool: &SqlitePool, proposal: &ProposalRow) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO spending_proposals
             (id, workspace_id, cycle_id, budget_line_id, submitter_id, amount, description,
              justification, vendor_name, expected_date, status, rejection_reason,
              fystack_withdrawal_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(proposal.id)
        .bind(proposal.workspace_id)
        .bind(proposal.cycle_id)
        .bind(proposal.budget_line_id)
        .bind(proposal.submitter_id)
        .bind(&proposal.amount)
        .bind(&proposal.description)
        .bind(&proposal.justification)
        .bind(&proposal.vendor_name)
        .bind(proposal.expected_date)
        .bind(&proposal.status)
        .bind(&proposal.rejection_reason)
        .bind(&proposal.fystack_withdrawal_id)
        .bind(proposal.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Move a draft proposal to `submitted`.
    ///
    /// The draft precondition is part of the UPDATE itself; returns `None`
    /// when the proposal was not in `draft` at write time.
    pub async fn mark_submitted(
        pool: &SqlitePool,
        proposal_id: Uuid,
    ) -> PersistenceResult<Option<ProposalRow>> {
        let updated = sqlx::query(
            "UPDATE spending_proposals SET status = ? WHERE id = ? AND status = ?",
        )
        .bind(ProposalStatus::Submitted.as_str())
        .bind(proposal_id)
        .bind(ProposalStatus::Draft.as_str())
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(Self::get_by_id(pool, proposal_id).await?))
    }

    /// Record an approve/reject decision atomically.
    ///
    /// One transaction appends the audit row and moves the proposal out of
    /// `submitted`. The submitted precondition is re-checked by the UPDATE
    /// inside the same transaction, so two racing decisions cannot both
    /// land: the loser's UPDATE matches zero rows and everything it wrote
    /// rolls back. Returns `None` for the loser.
    pub async fn record_decision(
        pool: &SqlitePool,
        proposal_id: Uuid,
        approver_id: Uuid,
        decision: Decision,
        comment: Option<&str>,
        rejection_reason: Option<&str>,
    ) -> PersistenceResult<Option<ProposalRow>> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO proposal_approvals (id, proposal_id, approver_id, decision, comment, decided_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(proposal_id)
        .bind(approver_id)
        .bind(decision.as_str())
        .bind(comment)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query(
            "UPDATE spending_proposals
             SET status = ?, rejection_reason = COALESCE(?, rejection_reason)
             WHERE id = ? AND status = ?",
        )
        .bind(decision.resulting_status().as_str())
        .bind(rejection_reason)
        .bind(proposal_id)
        .bind(ProposalStatus::Submitted.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, ProposalRow>(
            "SELECT * FROM spending_proposals WHERE id = ?",
        )
        .bind(proposal_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row))
    }

    /// Persist the provider's withdrawal reference after a successful
    /// execution. Set once; an existing reference is never overwritten.
    pub async fn set_withdrawal_reference(
        pool: &SqlitePool,
        proposal_id: Uuid,
        withdrawal_id: &str,
    ) -> PersistenceResult<()> {
        let updated = sqlx::query(
            "UPDATE spending_proposals
             SET fystack_withdrawal_id = ?
             WHERE id = ? AND fystack_withdrawal_id IS NULL",
        )
        .bind(withdrawal_id)
        .bind(proposal_id)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Proposal", proposal_id));
        }
        Ok(())
    }
}

// ============================================================================
// Approval Repository (read side; writes go through ProposalRepo)
// ============================================================================

pub struct ApprovalRepo;

impl ApprovalRepo {
    pub async fn list_for_proposal(
        pool: &SqlitePool,
        proposal_id: Uuid,
    ) -> PersistenceResult<Vec<ApprovalRow>> {
        let rows = sqlx::query_as::<_, ApprovalRow>(
            "SELECT * FROM proposal_approvals WHERE proposal_id = ? ORDER BY decided_at ASC",
        )
        .bind(proposal_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

// ============================================================================
// Wallet Repository
// ============================================================================

pub struct WalletRepo;

impl WalletRepo {
    pub async fn get_by_id(pool: &SqlitePool, id: Uuid) -> PersistenceResult<WalletRow> {
        sqlx::query_as::<_, WalletRow>("SELECT * FROM wallets WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Wallet", id))
    }

    pub async fn list_for_workspace(
        pool: &SqlitePool,
        workspace_id: Uuid,
    ) -> PersistenceResult<Vec<WalletRow>> {
        let rows = sqlx::query_as::<_, WalletRow>(
            "SELECT * FROM wallets WHERE workspace_id = ? ORDER BY created_at DESC",
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert(pool: &SqlitePool, wallet: &WalletRow) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO wallets (id, workspace_id, name, fystack_wallet_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(wallet.id)
        .bind(wallet.workspace_id)
        .bind(&wallet.name)
        .bind(&wallet.fystack_wallet_id)
        .bind(wallet.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}

// ============================================================================
// Webhook Event Repository (append-only inbox)
// ============================================================================

pub struct WebhookRepo;

impl WebhookRepo {
    pub async fn insert(pool: &SqlitePool, event: &WebhookEventRow) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO webhook_events (id, event, resource_id, webhook_id, payload, received_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id)
        .bind(&event.event)
        .bind(&event.resource_id)
        .bind(&event.webhook_id)
        .bind(&event.payload)
        .bind(event.received_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list(pool: &SqlitePool) -> PersistenceResult<Vec<WebhookEventRow>> {
        let rows = sqlx::query_as::<_, WebhookEventRow>(
            "SELECT * FROM webhook_events ORDER BY received_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}
