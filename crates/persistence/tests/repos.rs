//! Repository integration tests against an in-memory SQLite database

use chrono::{TimeZone, Utc};
use kubera_core::{Decision, ProposalStatus, Role};
use kubera_persistence::{
    ApprovalRepo, BudgetLineRepo, BudgetLineRow, CycleRepo, CycleRow, Database, KpiRow,
    MemberRepo, OperationRepo, OperationRow, ProposalFilter, ProposalRepo, ProposalRow,
    WorkspaceRepo, WorkspaceRow,
};
use uuid::Uuid;

fn annual_workspace() -> WorkspaceRow {
    WorkspaceRow {
        id: Uuid::new_v4(),
        name: "Superteam 2026".to_string(),
        currency: "USD".to_string(),
        start_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        end_date: Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap(),
        created_at: Utc::now(),
    }
}

fn draft_proposal(workspace_id: Uuid, cycle_id: Uuid, line_id: Uuid, submitter: Uuid) -> ProposalRow {
    ProposalRow {
        id: Uuid::new_v4(),
        workspace_id,
        cycle_id,
        budget_line_id: line_id,
        submitter_id: submitter,
        amount: "500".to_string(),
        description: "Conference sponsorship".to_string(),
        justification: None,
        vendor_name: None,
        expected_date: None,
        status: ProposalStatus::Draft.as_str().to_string(),
        rejection_reason: None,
        fystack_withdrawal_id: None,
        created_at: Utc::now(),
    }
}

async fn seed(db: &Database) -> (WorkspaceRow, CycleRow, BudgetLineRow, Uuid) {
    let owner = Uuid::new_v4();
    let workspace = annual_workspace();
    let cycle = WorkspaceRepo::create_annual(db.pool(), &workspace, owner)
        .await
        .unwrap();

    let line = BudgetLineRow {
        id: Uuid::new_v4(),
        cycle_id: cycle.id,
        code: "MKT-01".to_string(),
        name: "Marketing".to_string(),
        allocated: "10000".to_string(),
        parent_id: None,
        pic: None,
        notes: None,
        created_at: Utc::now(),
    };
    BudgetLineRepo::insert(db.pool(), &line).await.unwrap();

    (workspace, cycle, line, owner)
}

#[tokio::test]
async fn create_annual_seeds_owner_and_active_cycle() {
    let db = Database::in_memory().await.unwrap();
    let (workspace, cycle, _, owner) = seed(&db).await;

    let member = MemberRepo::find(db.pool(), workspace.id, owner)
        .await
        .unwrap()
        .expect("owner membership");
    assert_eq!(member.role().unwrap(), Role::Owner);

    assert!(cycle.is_active);
    assert_eq!(cycle.start_date, workspace.start_date);
    assert_eq!(cycle.end_date, workspace.end_date);

    let found = WorkspaceRepo::list_for_user(db.pool(), owner).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, workspace.id);
    assert_eq!(found[0].currency().unwrap().as_str(), "USD");
}

#[tokio::test]
async fn mark_submitted_requires_draft() {
    let db = Database::in_memory().await.unwrap();
    let (workspace, cycle, line, owner) = seed(&db).await;

    let proposal = draft_proposal(workspace.id, cycle.id, line.id, owner);
    ProposalRepo::insert(db.pool(), &proposal).await.unwrap();

    let submitted = ProposalRepo::mark_submitted(db.pool(), proposal.id)
        .await
        .unwrap()
        .expect("draft submits");
    assert_eq!(submitted.status().unwrap(), ProposalStatus::Submitted);

    // Already submitted: the conditional update matches nothing.
    let again = ProposalRepo::mark_submitted(db.pool(), proposal.id)
        .await
        .unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn record_decision_is_at_most_once() {
    let db = Database::in_memory().await.unwrap();
    let (workspace, cycle, line, owner) = seed(&db).await;
    let approver = Uuid::new_v4();

    let proposal = draft_proposal(workspace.id, cycle.id, line.id, owner);
    ProposalRepo::insert(db.pool(), &proposal).await.unwrap();
    ProposalRepo::mark_submitted(db.pool(), proposal.id)
        .await
        .unwrap();

    let approved = ProposalRepo::record_decision(
        db.pool(),
        proposal.id,
        approver,
        Decision::Approved,
        Some("lgtm"),
        None,
    )
    .await
    .unwrap()
    .expect("first decision lands");
    assert_eq!(approved.status().unwrap(), ProposalStatus::Approved);

    // Second decision loses the submitted precondition and must not
    // append a second audit row.
    let second = ProposalRepo::record_decision(
        db.pool(),
        proposal.id,
        approver,
        Decision::Rejected,
        None,
        Some("too late"),
    )
    .await
    .unwrap();
    assert!(second.is_none());

    let approvals = ApprovalRepo::list_for_proposal(db.pool(), proposal.id)
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].decision().unwrap(), Decision::Approved);

    let current = ProposalRepo::get_by_id(db.pool(), proposal.id).await.unwrap();
    assert_eq!(current.status().unwrap(), ProposalStatus::Approved);
    assert!(current.rejection_reason.is_none());
}

#[tokio::test]
async fn reject_persists_reason() {
    let db = Database::in_memory().await.unwrap();
    let (workspace, cycle, line, owner) = seed(&db).await;

    let proposal = draft_proposal(workspace.id, cycle.id, line.id, owner);
    ProposalRepo::insert(db.pool(), &proposal).await.unwrap();
    ProposalRepo::mark_submitted(db.pool(), proposal.id)
        .await
        .unwrap();

    let rejected = ProposalRepo::record_decision(
        db.pool(),
        proposal.id,
        Uuid::new_v4(),
        Decision::Rejected,
        None,
        Some("over budget"),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(rejected.status().unwrap(), ProposalStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("over budget"));
}

#[tokio::test]
async fn withdrawal_reference_set_once() {
    let db = Database::in_memory().await.unwrap();
    let (workspace, cycle, line, owner) = seed(&db).await;

    let proposal = draft_proposal(workspace.id, cycle.id, line.id, owner);
    ProposalRepo::insert(db.pool(), &proposal).await.unwrap();

    ProposalRepo::set_withdrawal_reference(db.pool(), proposal.id, "wd-123")
        .await
        .unwrap();
    let row = ProposalRepo::get_by_id(db.pool(), proposal.id).await.unwrap();
    assert_eq!(row.fystack_withdrawal_id.as_deref(), Some("wd-123"));

    // A second write must not overwrite the reference.
    assert!(
        ProposalRepo::set_withdrawal_reference(db.pool(), proposal.id, "wd-456")
            .await
            .is_err()
    );
    let row = ProposalRepo::get_by_id(db.pool(), proposal.id).await.unwrap();
    assert_eq!(row.fystack_withdrawal_id.as_deref(), Some("wd-123"));
}

#[tokio::test]
async fn list_filters_by_cycle_and_status() {
    let db = Database::in_memory().await.unwrap();
    let (workspace, cycle, line, owner) = seed(&db).await;

    let a = draft_proposal(workspace.id, cycle.id, line.id, owner);
    let b = draft_proposal(workspace.id, cycle.id, line.id, owner);
    ProposalRepo::insert(db.pool(), &a).await.unwrap();
    ProposalRepo::insert(db.pool(), &b).await.unwrap();
    ProposalRepo::mark_submitted(db.pool(), b.id).await.unwrap();

    let all = ProposalRepo::list(db.pool(), workspace.id, &ProposalFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let submitted = ProposalRepo::list(
        db.pool(),
        workspace.id,
        &ProposalFilter {
            cycle_id: Some(cycle.id),
            status: Some(ProposalStatus::Submitted),
        },
    )
    .await
    .unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].id, b.id);

    let other_cycle = ProposalRepo::list(
        db.pool(),
        workspace.id,
        &ProposalFilter {
            cycle_id: Some(Uuid::new_v4()),
            status: None,
        },
    )
    .await
    .unwrap();
    assert!(other_cycle.is_empty());
}

#[tokio::test]
async fn operations_kpis_and_line_links() {
    let db = Database::in_memory().await.unwrap();
    let (_, cycle, line, _) = seed(&db).await;

    let op = OperationRow {
        id: Uuid::new_v4(),
        cycle_id: cycle.id,
        code: "OP-01".to_string(),
        name: "Hackathon series".to_string(),
        hypothesis: "Monthly hackathons grow active builders".to_string(),
        status: "on_track".to_string(),
        created_at: Utc::now(),
    };
    OperationRepo::insert(db.pool(), &op).await.unwrap();

    let kpi = KpiRow {
        id: Uuid::new_v4(),
        operation_id: op.id,
        name: "Builders onboarded".to_string(),
        target_value: "120".to_string(),
        current_value: "0".to_string(),
    };
    OperationRepo::insert_kpi(db.pool(), &kpi).await.unwrap();

    BudgetLineRepo::link_operation(db.pool(), line.id, op.id)
        .await
        .unwrap();
    // Linking twice is a no-op on the (line, operation) pair.
    BudgetLineRepo::link_operation(db.pool(), line.id, op.id)
        .await
        .unwrap();

    let ops = OperationRepo::list_for_cycle(db.pool(), cycle.id).await.unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].code, "OP-01");

    let kpis = OperationRepo::kpis_for_operation(db.pool(), op.id).await.unwrap();
    assert_eq!(kpis.len(), 1);
    assert_eq!(kpis[0].target_value, "120");

    let links = BudgetLineRepo::links_for_cycle(db.pool(), cycle.id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].budget_line_id, line.id);
    assert_eq!(links[0].operation_id, op.id);
}

#[tokio::test]
async fn budget_line_code_unique_per_cycle() {
    let db = Database::in_memory().await.unwrap();
    let (_, cycle, line, _) = seed(&db).await;

    let duplicate = BudgetLineRow {
        id: Uuid::new_v4(),
        code: line.code.clone(),
        ..line.clone()
    };
    assert!(BudgetLineRepo::insert(db.pool(), &duplicate).await.is_err());

    let lines = BudgetLineRepo::list_for_cycle(db.pool(), cycle.id).await.unwrap();
    assert_eq!(lines.len(), 1);
}

#[tokio::test]
async fn at_most_one_active_cycle_after_activate() {
    let db = Database::in_memory().await.unwrap();
    let (workspace, first, _, _) = seed(&db).await;

    // A second cycle exists only below the policy layer; activation must
    // still keep the invariant.
    let second = CycleRow {
        id: Uuid::new_v4(),
        workspace_id: workspace.id,
        name: "Next".to_string(),
        start_date: first.start_date,
        end_date: first.end_date,
        is_active: false,
        created_at: Utc::now(),
    };
    sqlx::query(
        "INSERT INTO planning_cycles (id, workspace_id, name, start_date, end_date, is_active, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(second.id)
    .bind(second.workspace_id)
    .bind(&second.name)
    .bind(second.start_date)
    .bind(second.end_date)
    .bind(second.is_active)
    .bind(second.created_at)
    .execute(db.pool())
    .await
    .unwrap();

    let activated = CycleRepo::activate(db.pool(), workspace.id, second.id)
        .await
        .unwrap();
    assert!(activated.is_active);

    let cycles = CycleRepo::list_for_workspace(db.pool(), workspace.id)
        .await
        .unwrap();
    let active: Vec<_> = cycles.iter().filter(|c| c.is_active).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);
}
