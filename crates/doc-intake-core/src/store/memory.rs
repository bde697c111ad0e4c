//! In-memory [`IntakeStore`] implementation for tests and dry runs.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. A poisoned lock is
//! reported as an error instead of panicking the caller.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::models::{
    ActionRequest, ActionStatus, ExtractionResult, IngestStage, IngestedDocument,
    TargetRecordDraft,
};

use super::IntakeStore;

/// A record created through [`IntakeStore::create_record`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub doctype: String,
    pub payload: Value,
    pub source_ingested: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredExtraction {
    pub id: String,
    pub ingested_id: String,
    pub result: ExtractionResult,
}

pub struct InMemoryStore {
    ingested: RwLock<HashMap<String, IngestedDocument>>,
    extractions: RwLock<Vec<StoredExtraction>>,
    records: RwLock<Vec<StoredRecord>>,
    requests: RwLock<Vec<ActionRequest>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            ingested: RwLock::new(HashMap::new()),
            extractions: RwLock::new(Vec::new()),
            records: RwLock::new(Vec::new()),
            requests: RwLock::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Result<Vec<StoredRecord>> {
        Ok(read(&self.records)?.clone())
    }

    pub fn extractions(&self) -> Result<Vec<StoredExtraction>> {
        Ok(read(&self.extractions)?.clone())
    }

    pub fn action_requests(&self) -> Result<Vec<ActionRequest>> {
        Ok(read(&self.requests)?.clone())
    }

    /// Audit rows in no particular order.
    pub fn ingested(&self) -> Result<Vec<IngestedDocument>> {
        Ok(read(&self.ingested)?.values().cloned().collect())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl IntakeStore for InMemoryStore {
    async fn insert_ingested(&self, doc: &IngestedDocument) -> Result<()> {
        write(&self.ingested)?.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn update_stage(&self, ingested_id: &str, stage: IngestStage) -> Result<()> {
        let mut docs = write(&self.ingested)?;
        match docs.get_mut(ingested_id) {
            Some(doc) => {
                doc.stage = stage;
                Ok(())
            }
            None => bail!("ingested document not found: {}", ingested_id),
        }
    }

    async fn set_created_record(&self, ingested_id: &str, record_id: &str) -> Result<()> {
        let mut docs = write(&self.ingested)?;
        match docs.get_mut(ingested_id) {
            Some(doc) => {
                doc.created_record = Some(record_id.to_string());
                Ok(())
            }
            None => bail!("ingested document not found: {}", ingested_id),
        }
    }

    async fn insert_extraction(
        &self,
        ingested_id: &str,
        result: &ExtractionResult,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        write(&self.extractions)?.push(StoredExtraction {
            id: id.clone(),
            ingested_id: ingested_id.to_string(),
            result: result.clone(),
        });
        Ok(id)
    }

    async fn create_record(
        &self,
        draft: &TargetRecordDraft,
        source_ingested: &str,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        write(&self.records)?.push(StoredRecord {
            id: id.clone(),
            doctype: draft.doctype.clone(),
            payload: draft.to_payload(),
            source_ingested: source_ingested.to_string(),
        });
        Ok(id)
    }

    async fn insert_action_request(&self, request: &ActionRequest) -> Result<()> {
        write(&self.requests)?.push(request.clone());
        Ok(())
    }

    async fn get_action_request(&self, id: &str) -> Result<Option<ActionRequest>> {
        Ok(read(&self.requests)?.iter().find(|r| r.id == id).cloned())
    }

    async fn list_action_requests(
        &self,
        status: Option<ActionStatus>,
    ) -> Result<Vec<ActionRequest>> {
        let mut out: Vec<ActionRequest> = read(&self.requests)?
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        out.reverse();
        Ok(out)
    }

    async fn get_ingested(&self, id: &str) -> Result<Option<IngestedDocument>> {
        Ok(read(&self.ingested)?.get(id).cloned())
    }
}
