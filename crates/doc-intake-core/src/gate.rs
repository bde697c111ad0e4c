//! Create-or-review decision.
//!
//! A draft is auto-created only when validation passed AND the caller may
//! create the target doctype. Every other combination queues exactly one
//! action request; the two outcomes are mutually exclusive by construction.

use serde_json::Value;

use crate::models::{BlockReason, TargetRecordDraft};
use crate::validation::Validation;

/// Characters of extracted text kept in a fallback draft.
pub const SUMMARY_CHARS: usize = 1400;

/// Field holding the text summary in a fallback draft.
pub const SUMMARY_FIELD: &str = "intake_source_summary";

/// Action type recorded on queued requests.
pub const CREATE_DRAFT_ACTION: &str = "Create Draft";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Create,
    RequestAction {
        blocked_by: BlockReason,
        notes: Vec<String>,
    },
}

impl Decision {
    pub fn is_create(&self) -> bool {
        matches!(self, Decision::Create)
    }
}

pub fn decide(validation: &Validation, may_create: bool) -> Decision {
    match (validation.ok, may_create) {
        (true, true) => Decision::Create,
        (ok, allowed) => {
            let blocked_by = match (ok, allowed) {
                (false, false) => BlockReason::ValidationAndAuthorization,
                (false, true) => BlockReason::Validation,
                _ => BlockReason::Authorization,
            };
            let mut notes = validation.errors.clone();
            if !allowed {
                notes.push("Not permitted to create this record type".to_string());
            }
            Decision::RequestAction { blocked_by, notes }
        }
    }
}

/// Summary-only draft used when no parser or no mapping rows apply.
pub fn fallback_draft(doctype: &str, text: &str) -> TargetRecordDraft {
    let mut draft = TargetRecordDraft {
        doctype: doctype.to_string(),
        fields: Default::default(),
    };
    draft.fields.insert(
        SUMMARY_FIELD.to_string(),
        Value::String(text.chars().take(SUMMARY_CHARS).collect()),
    );
    draft
}
