//! Core data types flowing through the intake pipeline.
//!
//! Loosely-typed maps (table rows, canonical fields, draft fields) are
//! `serde_json::Map<String, Value>`: a closed sum of null, bool, number,
//! string, list, and map. Insertion order is preserved so column order and
//! mapping order survive every stage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::parse::DocType;

/// Field map used for canonical records, drafts, and template defaults.
pub type Fields = Map<String, Value>;

/// One table row: column name → scalar or null.
pub type RowRecord = Map<String, Value>;

/// Maximum characters kept in [`CanonicalRecord`]'s `raw_excerpt`.
pub const RAW_EXCERPT_CHARS: usize = 2500;

/// Raw file handed to the pipeline by the file store.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content_type: String,
    pub is_private: bool,
    pub bytes: Vec<u8>,
}

/// A named table of rows produced by an extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub name: String,
    pub rows: Vec<RowRecord>,
}

/// Normalized output of every content extractor.
///
/// `pages` is clamped to at least 1 on construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub text: String,
    pages: usize,
    pub tables: Vec<TableBlock>,
    pub meta: Map<String, Value>,
}

impl ExtractionResult {
    pub fn new(text: String, pages: usize, tables: Vec<TableBlock>, mode: &str) -> Self {
        let mut meta = Map::new();
        meta.insert("mode".to_string(), Value::String(mode.to_string()));
        Self {
            text,
            pages: pages.max(1),
            tables,
            meta,
        }
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Extraction strategy that produced this result (`pdf_text`, `excel`, ...).
    pub fn mode(&self) -> &str {
        self.meta.get("mode").and_then(Value::as_str).unwrap_or("")
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }
}

/// Format-agnostic record produced by a heuristic parser.
///
/// `fields` always carries `doc_type` and `raw_excerpt`; every other field
/// is either a value or explicit `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub doc_type: DocType,
    pub fields: Fields,
}

impl CanonicalRecord {
    pub fn new(doc_type: DocType, source_text: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(
            "doc_type".to_string(),
            Value::String(doc_type.as_str().to_string()),
        );
        fields.insert(
            "raw_excerpt".to_string(),
            Value::String(source_text.chars().take(RAW_EXCERPT_CHARS).collect()),
        );
        Self { doc_type, fields }
    }

    /// Set a field, storing `null` when the value was not found.
    pub fn set<V: Into<Value>>(&mut self, key: &str, value: Option<V>) {
        let value = value.map(Into::into).unwrap_or(Value::Null);
        self.fields.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn raw_excerpt(&self) -> &str {
        self.fields
            .get("raw_excerpt")
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// One user-authored mapping row: canonical key → target field path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaFieldMapping {
    #[serde(default)]
    pub field_key: String,
    #[serde(default)]
    pub maps_to: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_data_type")]
    pub data_type: String,
    #[serde(default)]
    pub required: bool,
}

fn default_data_type() -> String {
    "String".to_string()
}

/// Default values overlaid under mapped fields when the template is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingTemplate {
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub defaults: Fields,
}

fn default_true() -> bool {
    true
}

/// Which OCR strategy a blueprint or run selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OcrEngine {
    #[default]
    OnDevice,
    Cloud,
}

impl OcrEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrEngine::OnDevice => "on-device",
            OcrEngine::Cloud => "cloud",
        }
    }
}

impl FromStr for OcrEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "" | "on-device" | "on-prem" | "onprem" | "local" | "tesseract" => {
                Ok(OcrEngine::OnDevice)
            }
            _ if lower.starts_with("cloud") || lower.starts_with("azure") => Ok(OcrEngine::Cloud),
            other => Err(format!(
                "unknown OCR engine '{}'. Must be on-device or cloud.",
                other
            )),
        }
    }
}

impl TryFrom<String> for OcrEngine {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OcrEngine> for String {
    fn from(engine: OcrEngine) -> Self {
        engine.as_str().to_string()
    }
}

impl fmt::Display for OcrEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named intake configuration: target type, OCR choice, mapping rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub target_doctype: String,
    #[serde(default)]
    pub ocr_engine: OcrEngine,
    #[serde(default = "default_language")]
    pub language_hint: String,
    #[serde(default)]
    pub schema_fields: Vec<SchemaFieldMapping>,
    #[serde(default)]
    pub mapping_template: Option<String>,
}

pub fn default_language() -> String {
    "auto".to_string()
}

/// Mutable accumulator built by the mapping engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetRecordDraft {
    pub doctype: String,
    pub fields: Fields,
}

impl TargetRecordDraft {
    /// JSON payload with `doctype` first, then the draft fields.
    pub fn to_payload(&self) -> Value {
        let mut out = Map::new();
        out.insert("doctype".to_string(), Value::String(self.doctype.clone()));
        for (k, v) in &self.fields {
            if k != "doctype" {
                out.insert(k.clone(), v.clone());
            }
        }
        Value::Object(out)
    }
}

/// Progress of one ingestion run, persisted on its audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Received,
    Extracted,
    Parsed,
    Mapped,
    Validated,
    Created,
    ActionRequested,
    Failed,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Received => "received",
            IngestStage::Extracted => "extracted",
            IngestStage::Parsed => "parsed",
            IngestStage::Mapped => "mapped",
            IngestStage::Validated => "validated",
            IngestStage::Created => "created",
            IngestStage::ActionRequested => "action_requested",
            IngestStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IngestStage::Created | IngestStage::ActionRequested | IngestStage::Failed
        )
    }
}

impl FromStr for IngestStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(IngestStage::Received),
            "extracted" => Ok(IngestStage::Extracted),
            "parsed" => Ok(IngestStage::Parsed),
            "mapped" => Ok(IngestStage::Mapped),
            "validated" => Ok(IngestStage::Validated),
            "created" => Ok(IngestStage::Created),
            "action_requested" => Ok(IngestStage::ActionRequested),
            "failed" => Ok(IngestStage::Failed),
            other => Err(format!("unknown ingest stage: {}", other)),
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit row for one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestedDocument {
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    pub is_private: bool,
    pub target_doctype: String,
    pub blueprint: Option<String>,
    pub ocr_engine: OcrEngine,
    pub language_hint: String,
    pub stage: IngestStage,
    pub created_record: Option<String>,
    pub content_sha256: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "Pending",
            ActionStatus::Approved => "Approved",
            ActionStatus::Rejected => "Rejected",
        }
    }
}

impl FromStr for ActionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ActionStatus::Pending),
            "approved" => Ok(ActionStatus::Approved),
            "rejected" => Ok(ActionStatus::Rejected),
            other => Err(format!(
                "unknown action status '{}'. Must be pending, approved, or rejected.",
                other
            )),
        }
    }
}

/// Why auto-creation was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    Validation,
    Authorization,
    ValidationAndAuthorization,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::Validation => "validation",
            BlockReason::Authorization => "authorization",
            BlockReason::ValidationAndAuthorization => "validation+authorization",
        }
    }
}

impl FromStr for BlockReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validation" => Ok(BlockReason::Validation),
            "authorization" => Ok(BlockReason::Authorization),
            "validation+authorization" => Ok(BlockReason::ValidationAndAuthorization),
            other => Err(format!("unknown block reason: {}", other)),
        }
    }
}

/// Human-review task queued when auto-creation is blocked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRequest {
    pub id: String,
    pub action_type: String,
    pub status: ActionStatus,
    pub target_doctype: String,
    pub source_ingested_document: String,
    pub payload: Value,
    pub notes: Vec<String>,
    pub blocked_by: BlockReason,
    pub created_at: DateTime<Utc>,
}
