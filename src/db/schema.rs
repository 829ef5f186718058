//! Database schema bootstrap
//!
//! The schema is embedded as SQL strings for both SQLite and MySQL and
//! applied at startup with CREATE TABLE IF NOT EXISTS, so a fresh
//! database becomes usable without any external tooling. There is no
//! version tracking; the layout is stable and additive changes ride the
//! same statements.
//!
//! Slug and uuid columns carry no UNIQUE constraints: external ids are
//! random and slugs arrive from the calling layer, which owns collision
//! avoidance. posts_tags and roles_users declare no foreign keys either;
//! deletion ordering is a caller contract, not a database cascade.

use anyhow::{Context, Result};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

const SCHEMA_SQLITE: &str = r#"
    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid VARCHAR(36) NOT NULL,
        title VARCHAR(150) NOT NULL,
        slug VARCHAR(150) NOT NULL,
        markdown TEXT NOT NULL DEFAULT '',
        html TEXT NOT NULL DEFAULT '',
        featured BOOLEAN NOT NULL DEFAULT 0,
        page BOOLEAN NOT NULL DEFAULT 0,
        status VARCHAR(20) NOT NULL DEFAULT 'draft',
        meta_description VARCHAR(200) NOT NULL DEFAULT '',
        image TEXT NOT NULL DEFAULT '',
        author_id INTEGER NOT NULL,
        created_at TIMESTAMP NOT NULL,
        created_by INTEGER NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        updated_by INTEGER NOT NULL,
        published_at TIMESTAMP NULL,
        published_by INTEGER NULL
    );
    CREATE INDEX IF NOT EXISTS idx_posts_slug ON posts(slug);
    CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status);

    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid VARCHAR(36) NOT NULL,
        name VARCHAR(150) NOT NULL,
        slug VARCHAR(150) NOT NULL,
        password VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL,
        image TEXT NOT NULL DEFAULT '',
        cover TEXT NOT NULL DEFAULT '',
        bio TEXT NOT NULL DEFAULT '',
        website TEXT NOT NULL DEFAULT '',
        location TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMP NOT NULL,
        created_by INTEGER NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        updated_by INTEGER NOT NULL,
        last_login TIMESTAMP NULL
    );
    CREATE INDEX IF NOT EXISTS idx_users_slug ON users(slug);

    CREATE TABLE IF NOT EXISTS roles (
        id INTEGER PRIMARY KEY,
        name VARCHAR(150) NOT NULL
    );

    CREATE TABLE IF NOT EXISTS roles_users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        role_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_roles_users_user_id ON roles_users(user_id);

    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid VARCHAR(36) NOT NULL,
        name VARCHAR(150) NOT NULL,
        slug VARCHAR(150) NOT NULL,
        created_at TIMESTAMP NOT NULL,
        created_by INTEGER NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        updated_by INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tags_slug ON tags(slug);

    CREATE TABLE IF NOT EXISTS posts_tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_posts_tags_post_id ON posts_tags(post_id);

    CREATE TABLE IF NOT EXISTS settings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid VARCHAR(36) NOT NULL,
        `key` VARCHAR(150) NOT NULL,
        value TEXT NOT NULL DEFAULT '',
        type VARCHAR(150) NOT NULL DEFAULT 'blog',
        created_at TIMESTAMP NOT NULL,
        created_by INTEGER NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        updated_by INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_settings_key ON settings(`key`);
"#;

const SCHEMA_MYSQL: &str = r#"
    CREATE TABLE IF NOT EXISTS posts (
        id BIGINT PRIMARY KEY AUTO_INCREMENT,
        uuid VARCHAR(36) NOT NULL,
        title VARCHAR(150) NOT NULL,
        slug VARCHAR(150) NOT NULL,
        markdown TEXT NOT NULL,
        html TEXT NOT NULL,
        featured TINYINT(1) NOT NULL DEFAULT 0,
        page TINYINT(1) NOT NULL DEFAULT 0,
        status VARCHAR(20) NOT NULL DEFAULT 'draft',
        meta_description VARCHAR(200) NOT NULL DEFAULT '',
        image VARCHAR(255) NOT NULL DEFAULT '',
        author_id BIGINT NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        created_by BIGINT NOT NULL,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_by BIGINT NOT NULL,
        published_at TIMESTAMP NULL DEFAULT NULL,
        published_by BIGINT NULL,
        INDEX idx_posts_slug (slug),
        INDEX idx_posts_status (status)
    );

    CREATE TABLE IF NOT EXISTS users (
        id BIGINT PRIMARY KEY AUTO_INCREMENT,
        uuid VARCHAR(36) NOT NULL,
        name VARCHAR(150) NOT NULL,
        slug VARCHAR(150) NOT NULL,
        password VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL,
        image VARCHAR(255) NOT NULL DEFAULT '',
        cover VARCHAR(255) NOT NULL DEFAULT '',
        bio VARCHAR(200) NOT NULL DEFAULT '',
        website VARCHAR(255) NOT NULL DEFAULT '',
        location VARCHAR(255) NOT NULL DEFAULT '',
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        created_by BIGINT NOT NULL,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_by BIGINT NOT NULL,
        last_login TIMESTAMP NULL DEFAULT NULL,
        INDEX idx_users_slug (slug)
    );

    CREATE TABLE IF NOT EXISTS roles (
        id BIGINT PRIMARY KEY,
        name VARCHAR(150) NOT NULL
    );

    CREATE TABLE IF NOT EXISTS roles_users (
        id BIGINT PRIMARY KEY AUTO_INCREMENT,
        role_id BIGINT NOT NULL,
        user_id BIGINT NOT NULL,
        INDEX idx_roles_users_user_id (user_id)
    );

    CREATE TABLE IF NOT EXISTS tags (
        id BIGINT PRIMARY KEY AUTO_INCREMENT,
        uuid VARCHAR(36) NOT NULL,
        name VARCHAR(150) NOT NULL,
        slug VARCHAR(150) NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        created_by BIGINT NOT NULL,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_by BIGINT NOT NULL,
        INDEX idx_tags_slug (slug)
    );

    CREATE TABLE IF NOT EXISTS posts_tags (
        id BIGINT PRIMARY KEY AUTO_INCREMENT,
        post_id BIGINT NOT NULL,
        tag_id BIGINT NOT NULL,
        INDEX idx_posts_tags_post_id (post_id)
    );

    CREATE TABLE IF NOT EXISTS settings (
        id BIGINT PRIMARY KEY AUTO_INCREMENT,
        uuid VARCHAR(36) NOT NULL,
        `key` VARCHAR(150) NOT NULL,
        value TEXT NOT NULL,
        type VARCHAR(150) NOT NULL DEFAULT 'blog',
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        created_by BIGINT NOT NULL,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_by BIGINT NOT NULL,
        INDEX idx_settings_key (`key`)
    );
"#;

/// Role rows shipped with every install. Fixed ids; the inserts are
/// skipped when the rows already exist.
const SEED_ROLES_SQLITE: &str = "INSERT OR IGNORE INTO roles (id, name) VALUES \
    (1, 'Administrator'), (2, 'Editor'), (3, 'Author'), (4, 'Owner')";
const SEED_ROLES_MYSQL: &str = "INSERT IGNORE INTO roles (id, name) VALUES \
    (1, 'Administrator'), (2, 'Editor'), (3, 'Author'), (4, 'Owner')";

/// Create all tables and seed the fixed role rows.
///
/// Safe to run on every startup; existing tables and rows are left
/// untouched.
pub async fn ensure_schema(pool: &DynDatabasePool) -> Result<()> {
    let schema = match pool.driver() {
        DatabaseDriver::Sqlite => SCHEMA_SQLITE,
        DatabaseDriver::Mysql => SCHEMA_MYSQL,
    };

    for statement in split_sql_statements(schema) {
        pool.execute(statement)
            .await
            .with_context(|| format!("Failed to apply schema statement: {}", truncate(statement)))?;
    }

    let seed = match pool.driver() {
        DatabaseDriver::Sqlite => SEED_ROLES_SQLITE,
        DatabaseDriver::Mysql => SEED_ROLES_MYSQL,
    };
    pool.execute(seed).await.context("Failed to seed roles")?;

    tracing::debug!("Database schema ensured");
    Ok(())
}

/// Split a blob of SQL into individual statements on semicolons,
/// dropping empty chunks and comment-only chunks.
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_statement = false;

    for (i, c) in sql.char_indices() {
        match c {
            ';' => {
                if in_statement {
                    let stmt = sql[current_start..i].trim();
                    if !stmt.is_empty() && !is_comment_only(stmt) {
                        statements.push(stmt);
                    }
                    in_statement = false;
                }
                current_start = i + 1;
            }
            _ if !c.is_whitespace() && !in_statement => {
                current_start = i;
                in_statement = true;
            }
            _ => {}
        }
    }

    if in_statement {
        let stmt = sql[current_start..].trim();
        if !stmt.is_empty() && !is_comment_only(stmt) {
            statements.push(stmt);
        }
    }

    statements
}

fn is_comment_only(s: &str) -> bool {
    for line in s.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with("--") {
            return false;
        }
    }
    true
}

fn truncate(statement: &str) -> String {
    let line = statement.lines().next().unwrap_or("").trim();
    if line.len() > 60 {
        format!("{}...", &line[..60])
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INTEGER);\n-- comment\nCREATE TABLE b (id INTEGER)";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE a"));
        assert!(statements[1].starts_with("-- comment"));
    }

    #[test]
    fn test_split_skips_comment_only_chunks() {
        let sql = "-- just a comment;\n;;CREATE TABLE a (id INTEGER);";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_schema_creates_tables() {
        let pool = create_test_pool().await.expect("pool");
        ensure_schema(&pool).await.expect("schema");

        for table in [
            "posts",
            "users",
            "roles",
            "roles_users",
            "tags",
            "posts_tags",
            "settings",
        ] {
            let affected = pool
                .execute(&format!("DELETE FROM {}", table))
                .await
                .unwrap_or_else(|_| panic!("table {} missing", table));
            let _ = affected;
        }
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let pool = create_test_pool().await.expect("pool");
        ensure_schema(&pool).await.expect("first run");
        ensure_schema(&pool).await.expect("second run");

        let sqlite = pool.as_sqlite().expect("sqlite pool");
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM roles")
            .fetch_one(sqlite)
            .await
            .expect("count roles");
        assert_eq!(row.0, 4, "role seed must not duplicate");
    }
}
