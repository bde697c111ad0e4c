//! `intake detect` and `intake extract`: format detection and extraction
//! without parsing, mapping, or persistence.

use anyhow::{Context, Result};

use doc_intake_core::format::detect;
use doc_intake_core::models::{ExtractionResult, OcrEngine};

use crate::config::Config;
use crate::extract::Extractor;
use crate::files::{FileSource, LocalFileStore};

/// Characters of extracted text shown in the human-readable output.
const PREVIEW_CHARS: usize = 2000;

pub fn run_detect(name: &str, content_type: Option<&str>) {
    let format = detect(name, content_type.unwrap_or(""));
    println!("mime:      {}", format.mime);
    println!(
        "extension: {}",
        if format.extension.is_empty() {
            "-"
        } else {
            format.extension.as_str()
        }
    );
    println!("branch:    {}", format.branch().as_str());
}

/// Options for `intake extract`; `None` falls back to `[ocr]` settings.
#[derive(Debug, Default)]
pub struct ExtractOptions {
    pub is_private: bool,
    pub content_type: Option<String>,
    pub ocr_engine: Option<String>,
    pub language: Option<String>,
    pub json: bool,
}

pub async fn run_extract(config: &Config, name: &str, opts: &ExtractOptions) -> Result<()> {
    let engine = match opts.ocr_engine.as_deref() {
        Some(e) => e.parse::<OcrEngine>().map_err(anyhow::Error::msg)?,
        None => config.ocr.engine,
    };
    let language = opts
        .language
        .clone()
        .unwrap_or_else(|| config.ocr.language.clone());

    let files = LocalFileStore::new(config.files.root.clone());
    let source = files.read(name, opts.is_private, opts.content_type.as_deref().unwrap_or(""))?;
    let format = detect(&source.name, &source.content_type);
    let result = Extractor::from_config(config)?
        .extract(&source.bytes, &format, engine, &language)
        .await?;

    if opts.json {
        let out = serde_json::to_string_pretty(&result).context("serializing extraction")?;
        println!("{}", out);
    } else {
        print!("{}", render(&result));
    }
    Ok(())
}

fn render(result: &ExtractionResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("mode:   {}\n", result.mode()));
    out.push_str(&format!("pages:  {}\n", result.pages()));
    out.push_str(&format!("tables: {}\n", result.tables.len()));
    for table in &result.tables {
        out.push_str(&format!("  {} ({} rows)\n", table.name, table.rows.len()));
    }
    out.push_str("\n--- Text ---\n");
    let preview: String = result.text.chars().take(PREVIEW_CHARS).collect();
    out.push_str(&preview);
    if result.text.chars().count() > PREVIEW_CHARS {
        out.push_str("\n[...]");
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_intake_core::models::TableBlock;

    #[test]
    fn render_summarizes_tables_and_truncates_text() {
        let result = ExtractionResult::new("x".repeat(PREVIEW_CHARS + 5), 2, vec![], "pdf_text");
        let text = render(&result);
        assert!(text.starts_with("mode:   pdf_text\npages:  2\n"));
        assert!(text.ends_with("[...]\n"));

        let table = TableBlock {
            name: "Sheet1".into(),
            rows: vec![Default::default(), Default::default()],
        };
        let text = render(&ExtractionResult::new(String::new(), 1, vec![table], "excel"));
        assert!(text.contains("  Sheet1 (2 rows)"));
        assert!(!text.contains("[...]"));
    }
}
