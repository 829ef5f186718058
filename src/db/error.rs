//! Store error taxonomy

use thiserror::Error;

/// Errors surfaced by the persistence layer.
///
/// The store never retries and never logs; every failure is returned as
/// a value scoped to the single operation that raised it. Callers decide
/// what to log and whether to retry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write transaction could not be opened; no statements ran.
    #[error("storage unavailable: could not begin a write transaction")]
    Unavailable(#[source] sqlx::Error),

    /// A statement inside a write transaction failed and the unit was
    /// rolled back. When the rollback itself also failed, the secondary
    /// cause rides along instead of being dropped.
    #[error("write statement failed: {source}")]
    Statement {
        #[source]
        source: sqlx::Error,
        rollback: Option<sqlx::Error>,
    },

    /// The final commit failed; none of the unit's statements applied.
    #[error("commit failed")]
    Commit(#[source] sqlx::Error),

    /// A read query failed. For updates this covers the pre-read, which
    /// aborts the operation before any transaction is opened.
    #[error("read failed")]
    Read(#[source] sqlx::Error),

    /// An update pre-read found no row for the given id.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A persisted value could not be interpreted.
    #[error("corrupt row: {0}")]
    Decode(String),
}

impl StoreError {
    /// True when the rollback after a failed statement also failed,
    /// leaving the transaction state unknown to the server.
    pub fn is_dirty_rollback(&self) -> bool {
        matches!(
            self,
            StoreError::Statement {
                rollback: Some(_),
                ..
            }
        )
    }
}
