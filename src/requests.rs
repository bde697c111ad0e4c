//! Action request inspection for `intake requests list|show`.

use anyhow::{bail, Result};

use doc_intake_core::models::{ActionRequest, ActionStatus};
use doc_intake_core::store::IntakeStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Parse a `--status` filter value.
pub fn parse_status(value: &str) -> Result<ActionStatus> {
    value.parse::<ActionStatus>().map_err(anyhow::Error::msg)
}

/// One table line per request: id, status, doctype, blocker, note count.
pub fn format_row(r: &ActionRequest) -> String {
    format!(
        "{:<36}  {:<8}  {:<20}  {:<24}  {}",
        r.id,
        r.status.as_str(),
        r.target_doctype,
        r.blocked_by.as_str(),
        r.notes.len()
    )
}

pub fn format_detail(r: &ActionRequest) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("id:          {}\n", r.id));
    out.push_str(&format!("action:      {}\n", r.action_type));
    out.push_str(&format!("status:      {}\n", r.status.as_str()));
    out.push_str(&format!("doctype:     {}\n", r.target_doctype));
    out.push_str(&format!("source:      {}\n", r.source_ingested_document));
    out.push_str(&format!("blocked_by:  {}\n", r.blocked_by.as_str()));
    out.push_str(&format!("created_at:  {}\n", r.created_at.to_rfc3339()));
    out.push_str(&format!("\n--- Notes ({}) ---\n", r.notes.len()));
    for note in &r.notes {
        out.push_str(&format!("- {}\n", note));
    }
    out.push_str("\n--- Payload ---\n");
    out.push_str(&serde_json::to_string_pretty(&r.payload)?);
    out.push('\n');
    Ok(out)
}

pub async fn run_list(config: &Config, status: Option<&str>) -> Result<()> {
    let status = status.map(parse_status).transpose()?;
    let store = SqliteStore::new(db::connect(config).await?);
    let requests = store.list_action_requests(status).await;
    store.pool().close().await;
    let requests = requests?;

    if requests.is_empty() {
        println!("No action requests.");
        return Ok(());
    }
    println!(
        "{:<36}  {:<8}  {:<20}  {:<24}  NOTES",
        "ID", "STATUS", "DOCTYPE", "BLOCKED BY"
    );
    for r in &requests {
        println!("{}", format_row(r));
    }
    Ok(())
}

pub async fn run_show(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    let request = store.get_action_request(id).await;
    store.pool().close().await;

    match request? {
        Some(r) => {
            print!("{}", format_detail(&r)?);
            Ok(())
        }
        None => bail!("action request not found: {}", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use doc_intake_core::models::BlockReason;
    use serde_json::json;

    fn request() -> ActionRequest {
        ActionRequest {
            id: "req-1".into(),
            action_type: "Create Draft".into(),
            status: ActionStatus::Pending,
            target_doctype: "Purchase Order".into(),
            source_ingested_document: "doc-1".into(),
            payload: json!({"doctype": "Purchase Order", "supplier": "ACME"}),
            notes: vec!["Missing Items table".into()],
            blocked_by: BlockReason::ValidationAndAuthorization,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_filter_is_case_insensitive() {
        assert_eq!(parse_status("PENDING").unwrap(), ActionStatus::Pending);
        assert!(parse_status("done").is_err());
    }

    #[test]
    fn detail_lists_notes_and_payload() {
        let text = format_detail(&request()).unwrap();
        assert!(text.contains("blocked_by:  validation+authorization"));
        assert!(text.contains("- Missing Items table"));
        assert!(text.contains("\"supplier\": \"ACME\""));
        assert!(format_row(&request()).starts_with("req-1"));
    }
}
