//! Database initialization
//!
//! Opens (or creates) the SQLite database and makes sure every table exists.
//! All `CREATE` statements are idempotent, so this is safe to run on every start.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Foreign keys and busy timeout are per-connection settings, so they go
    // into the connect options rather than one-off PRAGMA statements
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Every connection to `:memory:` is a separate database, so the pool is
/// pinned to a single connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_knowledge_nodes_table(pool).await?;
    create_knowledge_links_table(pool).await?;
    create_questions_table(pool).await?;
    create_question_knowledge_nodes_table(pool).await?;
    create_practice_history_table(pool).await?;
    create_user_progress_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores application key-value pairs (e.g. the generated token signing secret).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            avatar TEXT,
            date_joined TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_knowledge_nodes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_nodes (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL UNIQUE,
            content TEXT NOT NULL,
            category TEXT NOT NULL,
            level INTEGER NOT NULL DEFAULT 1,
            difficulty INTEGER NOT NULL DEFAULT 1 CHECK (difficulty BETWEEN 1 AND 5),
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_knowledge_links_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_links (
            guid TEXT PRIMARY KEY,
            source_id TEXT NOT NULL REFERENCES knowledge_nodes(guid) ON DELETE CASCADE,
            target_id TEXT NOT NULL REFERENCES knowledge_nodes(guid) ON DELETE CASCADE,
            relation_type TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            UNIQUE (source_id, target_id, relation_type)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            answer TEXT NOT NULL,
            analysis TEXT NOT NULL DEFAULT '',
            difficulty INTEGER NOT NULL DEFAULT 1 CHECK (difficulty BETWEEN 1 AND 3),
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_question_knowledge_nodes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS question_knowledge_nodes (
            question_id TEXT NOT NULL REFERENCES questions(guid) ON DELETE CASCADE,
            node_id TEXT NOT NULL REFERENCES knowledge_nodes(guid) ON DELETE CASCADE,
            PRIMARY KEY (question_id, node_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_practice_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS practice_history (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            question_id TEXT NOT NULL REFERENCES questions(guid) ON DELETE CASCADE,
            user_answer TEXT NOT NULL,
            is_correct INTEGER NOT NULL,
            time_spent INTEGER NOT NULL CHECK (time_spent >= 0),
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_practice_history_user ON practice_history(user_id, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_progress_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_progress (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE REFERENCES users(guid) ON DELETE CASCADE,
            total_practices INTEGER NOT NULL DEFAULT 0,
            correct_practices INTEGER NOT NULL DEFAULT 0,
            total_time_spent INTEGER NOT NULL DEFAULT 0,
            last_practice_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            CHECK (correct_practices >= 0 AND correct_practices <= total_practices),
            CHECK (total_time_spent >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_has_schema() {
        let pool = init_memory_database().await.expect("memory database");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        for expected in [
            "knowledge_links",
            "knowledge_nodes",
            "practice_history",
            "question_knowledge_nodes",
            "questions",
            "settings",
            "user_progress",
            "users",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table {}", expected);
        }
    }

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        create_schema(&pool).await.expect("second run should succeed");
    }
}
