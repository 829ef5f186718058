//! Transactional write gateway
//!
//! Every mutating store operation funnels through these helpers: begin
//! a transaction on the write pool, run the unit's statements, then land
//! in exactly one of two terminal states. `finish_*` commits when the
//! statements succeeded; on a statement error it rolls back and folds an
//! eventual rollback failure into the returned error instead of dropping
//! it, so callers can tell a clean rollback from a dirty one.

use sqlx::{MySql, MySqlPool, Sqlite, SqlitePool, Transaction};

use super::error::StoreError;

/// Open a write transaction on the SQLite pool.
pub(crate) async fn begin_sqlite(
    pool: &SqlitePool,
) -> Result<Transaction<'static, Sqlite>, StoreError> {
    pool.begin().await.map_err(StoreError::Unavailable)
}

/// Terminate a SQLite write transaction: commit the unit when its
/// statements succeeded, roll it back otherwise.
pub(crate) async fn finish_sqlite<T>(
    tx: Transaction<'static, Sqlite>,
    outcome: Result<T, sqlx::Error>,
) -> Result<T, StoreError> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(StoreError::Commit)?;
            Ok(value)
        }
        Err(source) => Err(match tx.rollback().await {
            Ok(()) => StoreError::Statement {
                source,
                rollback: None,
            },
            Err(rollback) => StoreError::Statement {
                source,
                rollback: Some(rollback),
            },
        }),
    }
}

/// Open a write transaction on the MySQL pool.
pub(crate) async fn begin_mysql(
    pool: &MySqlPool,
) -> Result<Transaction<'static, MySql>, StoreError> {
    pool.begin().await.map_err(StoreError::Unavailable)
}

/// Terminate a MySQL write transaction.
pub(crate) async fn finish_mysql<T>(
    tx: Transaction<'static, MySql>,
    outcome: Result<T, sqlx::Error>,
) -> Result<T, StoreError> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(StoreError::Commit)?;
            Ok(value)
        }
        Err(source) => Err(match tx.rollback().await {
            Ok(()) => StoreError::Statement {
                source,
                rollback: None,
            },
            Err(rollback) => StoreError::Statement {
                source,
                rollback: Some(rollback),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_commit_applies_statements() {
        let pool = create_test_pool().await.expect("pool");
        pool.execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
            .await
            .expect("create table");
        let sqlite = pool.as_sqlite().expect("sqlite pool");

        let mut tx = begin_sqlite(sqlite).await.expect("begin");
        let outcome = sqlx::query("INSERT INTO notes (body) VALUES ('kept')")
            .execute(&mut *tx)
            .await
            .map(|_| ());
        finish_sqlite(tx, outcome).await.expect("commit");

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notes")
            .fetch_one(sqlite)
            .await
            .expect("count");
        assert_eq!(row.0, 1);
    }

    #[tokio::test]
    async fn test_statement_error_rolls_back_earlier_statements() {
        let pool = create_test_pool().await.expect("pool");
        pool.execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
            .await
            .expect("create table");
        let sqlite = pool.as_sqlite().expect("sqlite pool");

        let mut tx = begin_sqlite(sqlite).await.expect("begin");
        sqlx::query("INSERT INTO notes (body) VALUES ('doomed')")
            .execute(&mut *tx)
            .await
            .expect("first statement");
        let failure = sqlx::query("INSERT INTO missing (body) VALUES ('boom')")
            .execute(&mut *tx)
            .await
            .map(|_| ());
        assert!(failure.is_err());

        let err = finish_sqlite(tx, failure).await.expect_err("must fail");
        match err {
            StoreError::Statement { rollback, .. } => assert!(rollback.is_none()),
            other => panic!("unexpected error: {:?}", other),
        }

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notes")
            .fetch_one(sqlite)
            .await
            .expect("count");
        assert_eq!(row.0, 0, "rolled back insert must not be visible");
    }

    #[tokio::test]
    async fn test_begin_on_closed_pool_is_unavailable() {
        let pool = create_test_pool().await.expect("pool");
        let sqlite = pool.as_sqlite().expect("sqlite pool").clone();
        pool.close().await;

        let err = begin_sqlite(&sqlite).await.expect_err("must fail");
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
