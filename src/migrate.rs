//! Idempotent schema creation for the intake database.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Connect and create every table. Safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create tables and indexes on an open pool.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One row per ingestion run
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingested_documents (
            id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            content_type TEXT NOT NULL DEFAULT '',
            is_private INTEGER NOT NULL DEFAULT 0,
            target_doctype TEXT NOT NULL,
            blueprint TEXT,
            ocr_engine TEXT NOT NULL,
            language_hint TEXT NOT NULL DEFAULT 'auto',
            stage TEXT NOT NULL,
            created_record TEXT,
            content_sha256 TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Extraction audit artifacts
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS extraction_results (
            id TEXT PRIMARY KEY,
            ingested_document TEXT NOT NULL,
            mode TEXT NOT NULL,
            pages INTEGER NOT NULL,
            text TEXT NOT NULL,
            tables_json TEXT NOT NULL DEFAULT '[]',
            meta_json TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            FOREIGN KEY (ingested_document) REFERENCES ingested_documents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Auto-created target records
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            doctype TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            source_ingested_document TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Human review queue
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS action_requests (
            id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            status TEXT NOT NULL,
            target_doctype TEXT NOT NULL,
            source_ingested_document TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            notes_json TEXT NOT NULL DEFAULT '[]',
            blocked_by TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_extraction_ingested ON extraction_results(ingested_document)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_doctype ON records(doctype)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_action_requests_status ON action_requests(status, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
