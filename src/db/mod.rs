//! Database layer
//!
//! This module provides database abstraction for gazette. It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration.
//!
//! # Architecture
//!
//! The database layer uses a trait-based abstraction (`DatabasePool`) that
//! allows the application to work with either SQLite or MySQL without
//! knowing the specific backend. Repositories dispatch on `driver()` and
//! downcast with `as_sqlite()`/`as_mysql()`.
//!
//! Every mutating repository operation funnels through the transaction
//! helpers in [`tx`], which guarantee that a unit of statements either
//! commits in full or rolls back in full. Read queries run directly
//! against the pool.

pub mod error;
pub mod pool;
pub mod repositories;
pub mod schema;
pub(crate) mod tx;

pub use error::StoreError;
pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
