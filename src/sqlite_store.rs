//! SQLite-backed [`IntakeStore`] implementation.
//!
//! Timestamps are stored as Unix milliseconds; JSON-shaped fields
//! (tables, meta, payloads, notes) as serialized text.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use doc_intake_core::models::{
    ActionRequest, ActionStatus, BlockReason, ExtractionResult, IngestStage, IngestedDocument,
    OcrEngine, TargetRecordDraft,
};
use doc_intake_core::store::IntakeStore;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn row_to_action_request(row: &SqliteRow) -> Result<ActionRequest> {
    let status: String = row.try_get("status")?;
    let blocked_by: String = row.try_get("blocked_by")?;
    let payload: String = row.try_get("payload_json")?;
    let notes: String = row.try_get("notes_json")?;
    Ok(ActionRequest {
        id: row.try_get("id")?,
        action_type: row.try_get("action_type")?,
        status: status.parse::<ActionStatus>().map_err(|e: String| anyhow!(e))?,
        target_doctype: row.try_get("target_doctype")?,
        source_ingested_document: row.try_get("source_ingested_document")?,
        payload: serde_json::from_str(&payload).context("invalid action request payload")?,
        notes: serde_json::from_str(&notes).context("invalid action request notes")?,
        blocked_by: blocked_by.parse::<BlockReason>().map_err(|e: String| anyhow!(e))?,
        created_at: from_millis(row.try_get("created_at")?),
    })
}

fn row_to_ingested(row: &SqliteRow) -> Result<IngestedDocument> {
    let engine: String = row.try_get("ocr_engine")?;
    let stage: String = row.try_get("stage")?;
    Ok(IngestedDocument {
        id: row.try_get("id")?,
        file_name: row.try_get("file_name")?,
        content_type: row.try_get("content_type")?,
        is_private: row.try_get("is_private")?,
        target_doctype: row.try_get("target_doctype")?,
        blueprint: row.try_get("blueprint")?,
        ocr_engine: engine.parse::<OcrEngine>().map_err(|e: String| anyhow!(e))?,
        language_hint: row.try_get("language_hint")?,
        stage: stage.parse::<IngestStage>().map_err(|e: String| anyhow!(e))?,
        created_record: row.try_get("created_record")?,
        content_sha256: row.try_get("content_sha256")?,
        created_at: from_millis(row.try_get("created_at")?),
    })
}

#[async_trait]
impl IntakeStore for SqliteStore {
    async fn insert_ingested(&self, doc: &IngestedDocument) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ingested_documents (id, file_name, content_type, is_private,
                                            target_doctype, blueprint, ocr_engine,
                                            language_hint, stage, created_record,
                                            content_sha256, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.file_name)
        .bind(&doc.content_type)
        .bind(doc.is_private)
        .bind(&doc.target_doctype)
        .bind(&doc.blueprint)
        .bind(doc.ocr_engine.as_str())
        .bind(&doc.language_hint)
        .bind(doc.stage.as_str())
        .bind(&doc.created_record)
        .bind(&doc.content_sha256)
        .bind(doc.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_stage(&self, ingested_id: &str, stage: IngestStage) -> Result<()> {
        let done = sqlx::query("UPDATE ingested_documents SET stage = ? WHERE id = ?")
            .bind(stage.as_str())
            .bind(ingested_id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            bail!("ingested document not found: {}", ingested_id);
        }
        Ok(())
    }

    async fn set_created_record(&self, ingested_id: &str, record_id: &str) -> Result<()> {
        let done = sqlx::query("UPDATE ingested_documents SET created_record = ? WHERE id = ?")
            .bind(record_id)
            .bind(ingested_id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            bail!("ingested document not found: {}", ingested_id);
        }
        Ok(())
    }

    async fn insert_extraction(
        &self,
        ingested_id: &str,
        result: &ExtractionResult,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO extraction_results (id, ingested_document, mode, pages, text,
                                            tables_json, meta_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(ingested_id)
        .bind(result.mode())
        .bind(result.pages() as i64)
        .bind(&result.text)
        .bind(serde_json::to_string(&result.tables)?)
        .bind(serde_json::to_string(&result.meta)?)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn create_record(
        &self,
        draft: &TargetRecordDraft,
        source_ingested: &str,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO records (id, doctype, payload_json, source_ingested_document, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&draft.doctype)
        .bind(draft.to_payload().to_string())
        .bind(source_ingested)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_action_request(&self, request: &ActionRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO action_requests (id, action_type, status, target_doctype,
                                         source_ingested_document, payload_json,
                                         notes_json, blocked_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.action_type)
        .bind(request.status.as_str())
        .bind(&request.target_doctype)
        .bind(&request.source_ingested_document)
        .bind(request.payload.to_string())
        .bind(serde_json::to_string(&request.notes)?)
        .bind(request.blocked_by.as_str())
        .bind(request.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_action_request(&self, id: &str) -> Result<Option<ActionRequest>> {
        let row = sqlx::query("SELECT * FROM action_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_action_request).transpose()
    }

    async fn list_action_requests(
        &self,
        status: Option<ActionStatus>,
    ) -> Result<Vec<ActionRequest>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM action_requests
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_action_request).collect()
    }

    async fn get_ingested(&self, id: &str) -> Result<Option<IngestedDocument>> {
        let row = sqlx::query("SELECT * FROM ingested_documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_ingested).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::apply(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn ingested() -> IngestedDocument {
        IngestedDocument {
            id: "doc-1".into(),
            file_name: "quote.csv".into(),
            content_type: "text/csv".into(),
            is_private: true,
            target_doctype: "Purchase Order".into(),
            blueprint: Some("vendor_quote".into()),
            ocr_engine: OcrEngine::Cloud,
            language_hint: "en".into(),
            stage: IngestStage::Received,
            created_record: None,
            content_sha256: "abc".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn ingested_document_round_trips_with_stage_updates() {
        let store = memory_store().await;
        store.insert_ingested(&ingested()).await.unwrap();
        store
            .update_stage("doc-1", IngestStage::Created)
            .await
            .unwrap();
        store.set_created_record("doc-1", "rec-1").await.unwrap();

        let doc = store.get_ingested("doc-1").await.unwrap().unwrap();
        assert_eq!(doc.stage, IngestStage::Created);
        assert_eq!(doc.ocr_engine, OcrEngine::Cloud);
        assert!(doc.is_private);
        assert_eq!(doc.created_record.as_deref(), Some("rec-1"));
        assert!(store.update_stage("nope", IngestStage::Parsed).await.is_err());
    }

    #[tokio::test]
    async fn action_requests_list_by_status() {
        let store = memory_store().await;
        for (id, status) in [
            ("a", ActionStatus::Pending),
            ("b", ActionStatus::Rejected),
        ] {
            store
                .insert_action_request(&ActionRequest {
                    id: id.into(),
                    action_type: "Create Draft".into(),
                    status,
                    target_doctype: "Purchase Order".into(),
                    source_ingested_document: "doc-1".into(),
                    payload: json!({"doctype": "Purchase Order", "supplier": "ACME"}),
                    notes: vec!["Missing Items table".into()],
                    blocked_by: BlockReason::Validation,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let pending = store
            .list_action_requests(Some(ActionStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].notes, vec!["Missing Items table".to_string()]);
        assert_eq!(pending[0].payload["supplier"], json!("ACME"));
        assert_eq!(store.list_action_requests(None).await.unwrap().len(), 2);

        let b = store.get_action_request("b").await.unwrap().unwrap();
        assert_eq!(b.status, ActionStatus::Rejected);
        assert!(store.get_action_request("z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn extraction_and_record_rows_are_written() {
        let store = memory_store().await;
        let result = ExtractionResult::new("text".into(), 3, Vec::new(), "pdf_text");
        store.insert_extraction("doc-1", &result).await.unwrap();
        let draft = TargetRecordDraft {
            doctype: "Purchase Order".into(),
            fields: Default::default(),
        };
        let id = store.create_record(&draft, "doc-1").await.unwrap();

        let (pages, mode): (i64, String) =
            sqlx::query_as("SELECT pages, mode FROM extraction_results")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!((pages, mode.as_str()), (3, "pdf_text"));
        let doctype: String = sqlx::query_scalar("SELECT doctype FROM records WHERE id = ?")
            .bind(&id)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(doctype, "Purchase Order");
    }
}
