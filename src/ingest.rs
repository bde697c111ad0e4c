//! Ingestion run orchestration.
//!
//! One run takes a stored file from bytes to a terminal outcome:
//!
//! ```text
//! Received → Extracted → [Parsed] → Mapped → Validated → Created | ActionRequested
//! ```
//!
//! The audit row is written at `Received` and its stage advanced as the
//! run progresses. The extraction result is always persisted. Parsing runs
//! only when the target doctype has a parser AND the blueprint has mapping
//! rows; otherwise the draft is a text summary. Auto-creation requires a
//! passing validation AND create permission; anything else queues exactly
//! one action request.
//!
//! Configuration problems (unknown blueprint, no schema for the target)
//! and a file-read denial abort the run before anything is written.

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use doc_intake_core::auth::Authorizer;
use doc_intake_core::format::detect;
use doc_intake_core::gate::{decide, fallback_draft, Decision, CREATE_DRAFT_ACTION};
use doc_intake_core::mapping::{apply_schema_mapping, apply_template_defaults};
use doc_intake_core::models::{
    ActionRequest, ActionStatus, BlockReason, Blueprint, IngestStage, IngestedDocument,
    MappingTemplate, OcrEngine, TargetRecordDraft,
};
use doc_intake_core::parse::parser_for_target;
use doc_intake_core::schema::TargetSchema;
use doc_intake_core::store::IntakeStore;
use doc_intake_core::validation::{validate, Validation};

use crate::config::Config;
use crate::db;
use crate::error::IntakeError;
use crate::extract::Extractor;
use crate::files::{FileSource, LocalFileStore};
use crate::sqlite_store::SqliteStore;

/// Parameters of one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    /// Name of the file in the file store.
    pub file_name: String,
    pub is_private: bool,
    /// Declared content-type; empty means infer from the extension.
    pub content_type: String,
    /// Target doctype when no blueprint is given. With a blueprint it must
    /// match the blueprint's target.
    pub target_doctype: Option<String>,
    pub blueprint: Option<String>,
    /// Mapping template used when the blueprint names none.
    pub mapping_template: Option<String>,
    /// `false` stops after extraction.
    pub create_draft: bool,
}

/// Terminal branch of a run that went past extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestDecision {
    Created {
        record_id: String,
    },
    ActionRequested {
        request_id: String,
        blocked_by: BlockReason,
        notes: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub ingested_id: String,
    pub extraction_id: String,
    pub mode: String,
    pub stage: IngestStage,
    pub draft: Option<TargetRecordDraft>,
    pub validation: Option<Validation>,
    /// `None` when the run stopped after extraction.
    pub decision: Option<IngestDecision>,
}

/// Everything a run needs, borrowed from the caller.
pub struct Pipeline<'a> {
    pub config: &'a Config,
    pub extractor: &'a Extractor,
    pub files: &'a dyn FileSource,
    pub store: &'a dyn IntakeStore,
    pub auth: &'a dyn Authorizer,
}

/// Blueprint-derived settings for one run.
struct RunPlan<'c> {
    doctype: String,
    blueprint_name: Option<String>,
    blueprint: Option<&'c Blueprint>,
    schema: TargetSchema,
    template: Option<&'c MappingTemplate>,
    engine: OcrEngine,
    language: String,
}

impl<'a> Pipeline<'a> {
    fn plan(&self, req: &IngestRequest) -> Result<RunPlan<'a>, IntakeError> {
        let config = self.config;
        let blueprint = match req.blueprint.as_deref() {
            Some(name) => Some(
                config
                    .blueprint(name)
                    .ok_or_else(|| IntakeError::Config(format!("unknown blueprint '{}'", name)))?,
            ),
            None => None,
        };

        let explicit = req
            .target_doctype
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        let doctype = match (blueprint, explicit) {
            (Some(b), Some(target)) if !b.target_doctype.eq_ignore_ascii_case(target) => {
                return Err(IntakeError::Config(format!(
                    "blueprint '{}' targets '{}', not '{}'",
                    req.blueprint.as_deref().unwrap_or_default(),
                    b.target_doctype,
                    target
                )));
            }
            (Some(b), _) => b.target_doctype.clone(),
            (None, Some(target)) => target.to_string(),
            (None, None) => {
                return Err(IntakeError::Config(
                    "a target doctype or a blueprint is required".to_string(),
                ))
            }
        };

        let schema = config.target_schema(&doctype).ok_or_else(|| {
            IntakeError::Config(format!(
                "no schema configured for '{}'; add a [schemas.\"{}\"] section",
                doctype, doctype
            ))
        })?;

        let template_name = blueprint
            .and_then(|b| b.mapping_template.as_deref())
            .or(req.mapping_template.as_deref());
        let template = match template_name {
            Some(name) => Some(config.template(name).ok_or_else(|| {
                IntakeError::Config(format!("unknown mapping template '{}'", name))
            })?),
            None => None,
        };

        let (engine, language) = match blueprint {
            Some(b) => (b.ocr_engine, b.language_hint.clone()),
            None => (config.ocr.engine, config.ocr.language.clone()),
        };

        Ok(RunPlan {
            doctype,
            blueprint_name: req.blueprint.clone(),
            blueprint,
            schema,
            template,
            engine,
            language,
        })
    }

    pub async fn run(&self, req: &IngestRequest) -> Result<IngestOutcome, IntakeError> {
        let plan = self.plan(req)?;

        if !self.auth.may_read_file(&req.file_name) {
            return Err(IntakeError::Forbidden(format!(
                "reading file '{}'",
                req.file_name
            )));
        }
        let source = self
            .files
            .read(&req.file_name, req.is_private, &req.content_type)?;
        let format = detect(&source.name, &source.content_type);

        let ingested_id = Uuid::new_v4().to_string();
        let doc = IngestedDocument {
            id: ingested_id.clone(),
            file_name: source.name.clone(),
            content_type: format.mime.clone(),
            is_private: source.is_private,
            target_doctype: plan.doctype.clone(),
            blueprint: plan.blueprint_name.clone(),
            ocr_engine: plan.engine,
            language_hint: plan.language.clone(),
            stage: IngestStage::Received,
            created_record: None,
            content_sha256: format!("{:x}", Sha256::digest(&source.bytes)),
            created_at: Utc::now(),
        };
        self.store.insert_ingested(&doc).await?;
        info!(
            ingested = %ingested_id,
            file = %source.name,
            doctype = %plan.doctype,
            mime = %format.mime,
            "ingestion received"
        );

        let extraction = match self
            .extractor
            .extract(&source.bytes, &format, plan.engine, &plan.language)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(ingested = %ingested_id, error = %e, "extraction failed");
                self.store
                    .update_stage(&ingested_id, IngestStage::Failed)
                    .await?;
                return Err(e.into());
            }
        };
        let extraction_id = self.store.insert_extraction(&ingested_id, &extraction).await?;
        self.advance(&ingested_id, IngestStage::Extracted).await?;
        info!(
            ingested = %ingested_id,
            mode = extraction.mode(),
            pages = extraction.pages(),
            tables = extraction.tables.len(),
            "content extracted"
        );

        let mut outcome = IngestOutcome {
            ingested_id: ingested_id.clone(),
            extraction_id,
            mode: extraction.mode().to_string(),
            stage: IngestStage::Extracted,
            draft: None,
            validation: None,
            decision: None,
        };
        if !req.create_draft {
            return Ok(outcome);
        }

        let mapping_rows = plan
            .blueprint
            .map(|b| b.schema_fields.as_slice())
            .unwrap_or(&[]);
        let draft = match parser_for_target(&plan.doctype) {
            Some(parser) if !mapping_rows.is_empty() => {
                let canonical = parser.parse(&extraction.text, &extraction.tables, &plan.language);
                self.advance(&ingested_id, IngestStage::Parsed).await?;
                let mapped = apply_schema_mapping(&canonical, mapping_rows);
                TargetRecordDraft {
                    doctype: plan.doctype.clone(),
                    fields: apply_template_defaults(&plan.doctype, mapped, plan.template),
                }
            }
            _ => fallback_draft(&plan.doctype, &extraction.text),
        };
        self.advance(&ingested_id, IngestStage::Mapped).await?;

        let validation = validate(&plan.schema, &draft.fields);
        self.advance(&ingested_id, IngestStage::Validated).await?;

        let decision = match decide(&validation, self.auth.may_create(&plan.doctype)) {
            Decision::Create => {
                let record_id = self.store.create_record(&draft, &ingested_id).await?;
                self.store
                    .set_created_record(&ingested_id, &record_id)
                    .await?;
                self.advance(&ingested_id, IngestStage::Created).await?;
                outcome.stage = IngestStage::Created;
                info!(ingested = %ingested_id, record = %record_id, "record created");
                IngestDecision::Created { record_id }
            }
            Decision::RequestAction { blocked_by, notes } => {
                let request = ActionRequest {
                    id: Uuid::new_v4().to_string(),
                    action_type: CREATE_DRAFT_ACTION.to_string(),
                    status: ActionStatus::Pending,
                    target_doctype: plan.doctype.clone(),
                    source_ingested_document: ingested_id.clone(),
                    payload: draft.to_payload(),
                    notes: notes.clone(),
                    blocked_by,
                    created_at: Utc::now(),
                };
                self.store.insert_action_request(&request).await?;
                self.advance(&ingested_id, IngestStage::ActionRequested)
                    .await?;
                outcome.stage = IngestStage::ActionRequested;
                info!(
                    ingested = %ingested_id,
                    request = %request.id,
                    blocked_by = blocked_by.as_str(),
                    notes = notes.len(),
                    "action request queued"
                );
                IngestDecision::ActionRequested {
                    request_id: request.id,
                    blocked_by,
                    notes,
                }
            }
        };

        outcome.draft = Some(draft);
        outcome.validation = Some(validation);
        outcome.decision = Some(decision);
        Ok(outcome)
    }

    async fn advance(&self, ingested_id: &str, stage: IngestStage) -> Result<(), IntakeError> {
        self.store.update_stage(ingested_id, stage).await?;
        tracing::debug!(ingested = %ingested_id, stage = stage.as_str(), "stage advanced");
        Ok(())
    }
}

/// CLI entry point: run one ingestion against the configured SQLite store
/// and file store, then print the outcome.
pub async fn run_ingest(config: &Config, req: &IngestRequest) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let files = LocalFileStore::new(config.files.root.clone());
    let extractor = Extractor::from_config(config)?;

    let pipeline = Pipeline {
        config,
        extractor: &extractor,
        files: &files,
        store: &store,
        auth: &config.permissions,
    };
    let result = pipeline.run(req).await;
    store.pool().close().await;
    let outcome = result?;

    println!("ingested:   {}", outcome.ingested_id);
    println!("extraction: {} ({})", outcome.extraction_id, outcome.mode);
    println!("stage:      {}", outcome.stage);
    match &outcome.decision {
        None => {}
        Some(IngestDecision::Created { record_id }) => {
            println!("record:     {}", record_id);
        }
        Some(IngestDecision::ActionRequested {
            request_id,
            blocked_by,
            notes,
        }) => {
            println!("request:    {} (blocked by {})", request_id, blocked_by.as_str());
            for note in notes {
                println!("  - {}", note);
            }
        }
    }
    Ok(())
}
