//! Storage abstraction for doc-intake.
//!
//! The [`IntakeStore`] trait covers every artifact an ingestion run writes:
//! the audit row, the extraction result, the created record, and the
//! review queue. The binary crate provides a SQLite implementation; tests
//! use [`memory::InMemoryStore`].
//!
//! Implementations must be `Send + Sync` to be shared across runs.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`insert_ingested`](IntakeStore::insert_ingested) | Record a new run at `Received` |
//! | [`update_stage`](IntakeStore::update_stage) | Advance a run's stage |
//! | [`set_created_record`](IntakeStore::set_created_record) | Link a run to the record it created |
//! | [`insert_extraction`](IntakeStore::insert_extraction) | Persist the extraction audit artifact |
//! | [`create_record`](IntakeStore::create_record) | Create the target business record |
//! | [`insert_action_request`](IntakeStore::insert_action_request) | Queue a draft for human review |
//! | [`get_action_request`](IntakeStore::get_action_request) | Fetch one queued request |
//! | [`list_action_requests`](IntakeStore::list_action_requests) | List requests, optionally by status |
//! | [`get_ingested`](IntakeStore::get_ingested) | Fetch one run's audit row |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    ActionRequest, ActionStatus, ExtractionResult, IngestStage, IngestedDocument,
    TargetRecordDraft,
};

#[async_trait]
pub trait IntakeStore: Send + Sync {
    async fn insert_ingested(&self, doc: &IngestedDocument) -> Result<()>;

    async fn update_stage(&self, ingested_id: &str, stage: IngestStage) -> Result<()>;

    async fn set_created_record(&self, ingested_id: &str, record_id: &str) -> Result<()>;

    /// Persist an extraction result. Returns the new row ID.
    async fn insert_extraction(
        &self,
        ingested_id: &str,
        result: &ExtractionResult,
    ) -> Result<String>;

    /// Create the target record from a draft. Returns the record ID.
    async fn create_record(&self, draft: &TargetRecordDraft, source_ingested: &str)
        -> Result<String>;

    async fn insert_action_request(&self, request: &ActionRequest) -> Result<()>;

    async fn get_action_request(&self, id: &str) -> Result<Option<ActionRequest>>;

    /// Newest first.
    async fn list_action_requests(&self, status: Option<ActionStatus>)
        -> Result<Vec<ActionRequest>>;

    async fn get_ingested(&self, id: &str) -> Result<Option<IngestedDocument>>;
}
