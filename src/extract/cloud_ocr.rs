//! Cloud OCR via a Document Intelligence style "prebuilt-read" REST API.
//!
//! # Protocol
//!
//! 1. `POST {endpoint}/formrecognizer/documentModels/prebuilt-read:analyze?api-version=2023-07-31`
//!    with the file bytes and the `Ocp-Apim-Subscription-Key` header.
//!    200, 201 and 202 are accepted.
//! 2. If the response has no `operation-location` header, its body is the
//!    result: returned as raw JSON text with `meta.mode = "ocr_cloud_raw"`.
//! 3. Otherwise `GET` the operation location every `poll_interval`, at most
//!    `max_attempts` times, until `status` is `succeeded` or `failed`.
//!
//! On success the text is every recognized line, in page order, joined by
//! newlines. Recognized tables become [`TableBlock`]s named `Table1..n`.
//! A `failed` status or an exhausted poll budget is an error; remote
//! payloads in errors are truncated to 800 characters.
//!
//! The poll loop is a plain `async` loop: dropping the future cancels it.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};

use doc_intake_core::models::{ExtractionResult, RowRecord, TableBlock};

use crate::error::{truncate_diagnostic, ExtractError};

pub const MODE_OCR_CLOUD: &str = "ocr_cloud";
pub const MODE_OCR_CLOUD_RAW: &str = "ocr_cloud_raw";

const ANALYZE_PATH: &str =
    "/formrecognizer/documentModels/prebuilt-read:analyze?api-version=2023-07-31";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION: &str = "operation-location";
/// Widest table accepted from the service; cells beyond it are dropped.
const MAX_TABLE_COLUMNS: usize = 16_384;

/// Resolved cloud OCR settings. Build with
/// [`CloudOcrConfig::resolve`](crate::config::CloudOcrConfig::resolve).
#[derive(Debug, Clone)]
pub struct CloudOcrSettings {
    pub endpoint: Option<String>,
    pub key: Option<String>,
    /// Env-var names, quoted in the remediation hint when credentials are missing.
    pub endpoint_env: String,
    pub key_env: String,
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub request_timeout: Duration,
}

pub struct CloudOcrClient {
    settings: CloudOcrSettings,
    http: reqwest::Client,
}

impl CloudOcrClient {
    pub fn new(settings: CloudOcrSettings) -> Result<Self, ExtractError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| {
                ExtractError::config(
                    format!("cannot build the cloud OCR HTTP client: {}", e),
                    "check the TLS setup of this host",
                )
            })?;
        Ok(Self { settings, http })
    }

    fn credentials(&self) -> Result<(&str, &str), ExtractError> {
        match (self.settings.endpoint.as_deref(), self.settings.key.as_deref()) {
            (Some(endpoint), Some(key)) => Ok((endpoint, key)),
            _ => Err(ExtractError::config(
                "cloud OCR is not configured",
                format!(
                    "set {} and {} (or [ocr.cloud] endpoint), or choose the on-device OCR engine",
                    self.settings.endpoint_env, self.settings.key_env
                ),
            )),
        }
    }

    pub async fn analyze(&self, bytes: &[u8], mime: &str) -> Result<ExtractionResult, ExtractError> {
        let (endpoint, key) = self.credentials()?;
        let url = format!("{}{}", endpoint.trim_end_matches('/'), ANALYZE_PATH);

        info!(mime, bytes = bytes.len(), "submitting document to cloud OCR");
        let resp = self
            .http
            .post(&url)
            .header(KEY_HEADER, key)
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| ExtractError::CloudOcr(format!("analyze request failed: {}", e)))?;

        let status = resp.status();
        if !matches!(
            status,
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED
        ) {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractError::CloudOcr(format!(
                "analyze request failed: {} {}",
                status,
                truncate_diagnostic(&body)
            )));
        }

        let operation = resp
            .headers()
            .get(OPERATION_LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let Some(operation) = operation else {
            let body = resp
                .text()
                .await
                .map_err(|e| ExtractError::CloudOcr(format!("reading analyze response: {}", e)))?;
            let text = match serde_json::from_str::<Value>(&body) {
                Ok(v) => v.to_string(),
                Err(_) => body,
            };
            debug!("cloud OCR answered without an operation location");
            return Ok(ExtractionResult::new(text, 1, Vec::new(), MODE_OCR_CLOUD_RAW));
        };

        self.poll(&operation, key).await
    }

    async fn poll(&self, operation: &str, key: &str) -> Result<ExtractionResult, ExtractError> {
        let max = self.settings.max_attempts;
        for attempt in 1..=max {
            let data: Value = self
                .http
                .get(operation)
                .header(KEY_HEADER, key)
                .send()
                .await
                .map_err(|e| ExtractError::CloudOcr(format!("poll request failed: {}", e)))?
                .json()
                .await
                .map_err(|e| ExtractError::CloudOcr(format!("poll response is not JSON: {}", e)))?;

            let status = data
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_lowercase();
            debug!(attempt, max, status = %status, "polled cloud OCR");

            match status.as_str() {
                "succeeded" => return Ok(result_from_analysis(&data)),
                "failed" => {
                    warn!(attempt, "cloud OCR analysis failed");
                    return Err(ExtractError::CloudOcr(format!(
                        "analysis failed: {}",
                        truncate_diagnostic(&data.to_string())
                    )));
                }
                _ => tokio::time::sleep(self.settings.poll_interval).await,
            }
        }
        warn!(attempts = max, "cloud OCR polling exhausted");
        Err(ExtractError::CloudOcrTimeout { attempts: max })
    }
}

fn result_from_analysis(data: &Value) -> ExtractionResult {
    let analysis = data.get("analyzeResult").unwrap_or(&Value::Null);
    let pages = analysis
        .get("pages")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let lines: Vec<&str> = pages
        .iter()
        .filter_map(|p| p.get("lines").and_then(Value::as_array))
        .flatten()
        .filter_map(|l| l.get("content").and_then(Value::as_str))
        .filter(|c| !c.is_empty())
        .collect();

    let tables = analysis
        .get("tables")
        .and_then(Value::as_array)
        .map(|ts| {
            ts.iter()
                .enumerate()
                .map(|(i, t)| table_block(i + 1, t))
                .collect()
        })
        .unwrap_or_default();

    let raw_status = data.get("status").cloned().unwrap_or(Value::Null);
    ExtractionResult::new(lines.join("\n").trim().to_string(), pages.len(), tables, MODE_OCR_CLOUD)
        .with_meta("raw_status", raw_status)
}

/// Convert one recognized table. Column names come from `columnHeader`
/// cells (or the first row when none are marked); other rows become records.
fn table_block(number: usize, table: &Value) -> TableBlock {
    let cells: Vec<(usize, usize, String, bool)> = table
        .get("cells")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
        .iter()
        .filter_map(|c| {
            let row = c.get("rowIndex")?.as_u64()? as usize;
            let col = usize::try_from(c.get("columnIndex")?.as_u64()?).ok()?;
            if col >= MAX_TABLE_COLUMNS {
                debug!(table = number, col, "dropping cell beyond column limit");
                return None;
            }
            let content = c
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim()
                .to_string();
            let header = c.get("kind").and_then(Value::as_str) == Some("columnHeader");
            Some((row, col, content, header))
        })
        .collect();

    let mut header_rows: BTreeSet<usize> = cells
        .iter()
        .filter(|(_, _, _, h)| *h)
        .map(|(r, _, _, _)| *r)
        .collect();
    if header_rows.is_empty() {
        if let Some(first) = cells.iter().map(|(r, _, _, _)| *r).min() {
            header_rows.insert(first);
        }
    }

    let width = cells
        .iter()
        .map(|(_, c, _, _)| c + 1)
        .chain(
            table
                .get("columnCount")
                .and_then(Value::as_u64)
                .map(|n| n.min(MAX_TABLE_COLUMNS as u64) as usize),
        )
        .max()
        .unwrap_or(0);

    let mut names: Vec<String> = vec![String::new(); width];
    for (row, col, content, _) in &cells {
        if header_rows.contains(row) && !content.is_empty() {
            let name = &mut names[*col];
            if !name.is_empty() {
                name.push(' ');
            }
            name.push_str(content);
        }
    }
    for (i, name) in names.iter_mut().enumerate() {
        if name.is_empty() {
            *name = format!("Unnamed: {}", i);
        }
    }

    let mut body: BTreeMap<usize, Vec<(usize, &str)>> = BTreeMap::new();
    for (row, col, content, _) in &cells {
        if !header_rows.contains(row) {
            body.entry(*row).or_default().push((*col, content.as_str()));
        }
    }

    let rows = body
        .into_values()
        .map(|row_cells| {
            let mut record: RowRecord = names.iter().map(|n| (n.clone(), Value::Null)).collect();
            for (col, content) in row_cells {
                if !content.is_empty() {
                    record.insert(names[col].clone(), Value::String(content.to_string()));
                }
            }
            record
        })
        .collect();

    TableBlock {
        name: format!("Table{}", number),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn succeeded_analysis_joins_lines_and_counts_pages() {
        let data = json!({
            "status": "succeeded",
            "analyzeResult": {
                "pages": [
                    {"lines": [{"content": "Supplier: ACME"}, {"content": ""}]},
                    {"lines": [{"content": "Currency: SAR"}]}
                ]
            }
        });
        let r = result_from_analysis(&data);
        assert_eq!(r.text, "Supplier: ACME\nCurrency: SAR");
        assert_eq!(r.pages(), 2);
        assert_eq!(r.mode(), MODE_OCR_CLOUD);
        assert_eq!(r.meta["raw_status"], json!("succeeded"));
    }

    #[test]
    fn empty_analysis_still_has_one_page() {
        let r = result_from_analysis(&json!({"status": "succeeded"}));
        assert_eq!(r.text, "");
        assert_eq!(r.pages(), 1);
        assert!(r.tables.is_empty());
    }

    #[test]
    fn tables_are_keyed_by_column_headers() {
        let table = json!({
            "rowCount": 3,
            "columnCount": 2,
            "cells": [
                {"rowIndex": 0, "columnIndex": 0, "content": "Item", "kind": "columnHeader"},
                {"rowIndex": 0, "columnIndex": 1, "content": "Qty", "kind": "columnHeader"},
                {"rowIndex": 1, "columnIndex": 0, "content": "Bolt"},
                {"rowIndex": 1, "columnIndex": 1, "content": "4"},
                {"rowIndex": 2, "columnIndex": 0, "content": "Nut"}
            ]
        });
        let block = table_block(1, &table);
        assert_eq!(block.name, "Table1");
        assert_eq!(block.rows.len(), 2);
        assert_eq!(block.rows[0]["Item"], json!("Bolt"));
        assert_eq!(block.rows[0]["Qty"], json!("4"));
        assert_eq!(block.rows[1]["Qty"], Value::Null);
    }

    #[test]
    fn first_row_is_header_when_none_marked() {
        let table = json!({
            "cells": [
                {"rowIndex": 0, "columnIndex": 0, "content": "Name"},
                {"rowIndex": 1, "columnIndex": 0, "content": "Layla"},
                {"rowIndex": 1, "columnIndex": 1, "content": "extra"}
            ]
        });
        let block = table_block(2, &table);
        assert_eq!(block.name, "Table2");
        assert_eq!(block.rows[0]["Name"], json!("Layla"));
        assert_eq!(block.rows[0]["Unnamed: 1"], json!("extra"));
    }

    #[test]
    fn oversized_column_counts_are_capped() {
        let table = json!({
            "rowCount": 2,
            "columnCount": 4_000_000_000u64,
            "cells": [
                {"rowIndex": 0, "columnIndex": 0, "content": "Item", "kind": "columnHeader"},
                {"rowIndex": 1, "columnIndex": 0, "content": "W1"},
                {"rowIndex": 1, "columnIndex": 9_000_000_000u64, "content": "stray"}
            ]
        });
        let block = table_block(1, &table);
        assert_eq!(block.rows.len(), 1);
        assert_eq!(block.rows[0].len(), MAX_TABLE_COLUMNS);
        assert_eq!(block.rows[0]["Item"], json!("W1"));
        assert!(!block.rows[0].values().any(|v| v == "stray"));
    }

    #[test]
    fn client_builds_from_settings() {
        let settings = CloudOcrSettings {
            endpoint: None,
            key: None,
            endpoint_env: "E".into(),
            key_env: "K".into(),
            poll_interval: Duration::from_millis(1),
            max_attempts: 1,
            request_timeout: Duration::from_secs(1),
        };
        assert!(CloudOcrClient::new(settings).is_ok());
    }

    #[tokio::test]
    async fn missing_credentials_name_the_env_vars() {
        let client = CloudOcrClient::new(CloudOcrSettings {
            endpoint: Some("http://127.0.0.1:9".into()),
            key: None,
            endpoint_env: "MY_ENDPOINT".into(),
            key_env: "MY_KEY".into(),
            poll_interval: Duration::from_millis(1),
            max_attempts: 1,
            request_timeout: Duration::from_secs(1),
        })
        .unwrap();
        match client.analyze(b"x", "image/png").await.unwrap_err() {
            ExtractError::Config { hint, .. } => {
                assert!(hint.contains("MY_ENDPOINT") && hint.contains("MY_KEY"))
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
