//! On-device OCR through the `tesseract` command-line tool.
//!
//! The image is written to a temporary file and recognized with
//! `tesseract <image> stdout [-l <lang>]`. Only the `en` and `ar` language
//! hints select a model; every other hint uses tesseract's default.

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::process::Command;
use tracing::debug;

use doc_intake_core::models::ExtractionResult;

use crate::error::{truncate_diagnostic, ExtractError};

pub const MODE_OCR_ONPREM: &str = "ocr_onprem";

pub struct TesseractOcr {
    binary: PathBuf,
}

impl TesseractOcr {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    pub async fn recognize(
        &self,
        bytes: &[u8],
        extension: &str,
        language: &str,
    ) -> Result<ExtractionResult, ExtractError> {
        let dir = tempfile::tempdir()?;
        let ext = if extension.is_empty() { "img" } else { extension };
        let input = dir.path().join(format!("ocr_input.{}", ext));
        tokio::fs::write(&input, bytes).await?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(&input).arg("stdout");
        if let Some(model) = tesseract_language(language) {
            cmd.arg("-l").arg(model);
        }
        debug!(binary = %self.binary.display(), language, "running tesseract");

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ExtractError::config(
                    format!("tesseract binary not found at '{}'", self.binary.display()),
                    "install tesseract-ocr or set [ocr] tesseract_path in the config file",
                )
            } else {
                ExtractError::Ocr(format!(
                    "failed to run tesseract at '{}': {}",
                    self.binary.display(),
                    e
                ))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Ocr(format!(
                "tesseract exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                truncate_diagnostic(stderr.trim())
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(ExtractionResult::new(text, 1, Vec::new(), MODE_OCR_ONPREM))
    }
}

/// Tesseract model for a language hint; `None` means the default model.
pub fn tesseract_language(hint: &str) -> Option<&'static str> {
    match hint.trim().to_lowercase().as_str() {
        "en" => Some("eng"),
        "ar" => Some("ara"),
        _ => None,
    }
}
