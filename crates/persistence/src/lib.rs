//! # Kubera Persistence
//!
//! SQLite persistence for the budget-governance core. All state lives
//! here; nothing is cached across requests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kubera_persistence::{Database, ProposalRepo};
//!
//! let db = Database::connect("sqlite://kubera.db?mode=rwc").await?;
//! let proposal = ProposalRepo::get_by_id(db.pool(), id).await?;
//! ```

pub mod error;
pub mod repos;
pub mod schema;

pub use error::{PersistenceError, PersistenceResult};
pub use repos::{
    ApprovalRepo, BudgetLineRepo, CycleRepo, MemberRepo, OperationRepo, ProposalFilter,
    ProposalRepo, WalletRepo, WebhookRepo, WorkspaceRepo,
};
pub use schema::{
    init_database, ApprovalRow, BudgetLineOperationRow, BudgetLineRow, CycleRow, KpiRow,
    MemberRow, OperationRow, ProposalRow, WalletRow, WebhookEventRow, WorkspaceRow,
};

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Database facade: owns the connection pool and schema setup.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to a SQLite database and initialize the schema.
    pub async fn connect(url: &str) -> PersistenceResult<Self> {
        let pool = SqlitePoolOptions::new().connect(url).await?;
        init_database(&pool).await?;
        tracing::debug!(url, "database ready");
        Ok(Self { pool })
    }

    /// In-memory database (for testing).
    ///
    /// A single connection keeps every query on the same in-memory store.
    pub async fn in_memory() -> PersistenceResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        init_database(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
