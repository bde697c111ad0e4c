//! Content extraction: file bytes → [`ExtractionResult`].
//!
//! One strategy per format family, chosen by [`DetectedFormat::branch`]:
//!
//! | Branch | Strategy | `meta.mode` |
//! |--------|----------|-------------|
//! | tabular (`xlsx`, `csv`) | [`spreadsheet`] | `excel` |
//! | PDF with a text layer | [`pdf`] | `pdf_text` |
//! | PDF without text, cloud engine | [`cloud_ocr`] | `ocr_cloud` |
//! | PDF without text, on-device engine | none | `pdf_scanned_unhandled` |
//! | image, cloud engine | [`cloud_ocr`] | `ocr_cloud` |
//! | image, on-device engine | [`ocr`] (tesseract) | `ocr_onprem` |
//! | anything else | lossy UTF-8 decode | `raw` |
//!
//! Every result also carries `meta.mime` and `meta.extension`.

pub mod cloud_ocr;
pub mod ocr;
pub mod pdf;
pub mod spreadsheet;

use std::path::PathBuf;

use tracing::{debug, info};

use doc_intake_core::format::{DetectedFormat, FormatBranch, MIME_PDF};
use doc_intake_core::models::{ExtractionResult, OcrEngine};

use crate::config::Config;
use crate::error::ExtractError;
use cloud_ocr::{CloudOcrClient, CloudOcrSettings};
use ocr::TesseractOcr;

pub const MODE_RAW: &str = "raw";
pub const MODE_PDF_SCANNED_UNHANDLED: &str = "pdf_scanned_unhandled";

/// Format-dispatching extractor holding the OCR backends.
pub struct Extractor {
    tesseract: TesseractOcr,
    cloud: CloudOcrClient,
}

impl Extractor {
    pub fn new(tesseract_path: PathBuf, cloud: CloudOcrSettings) -> Result<Self, ExtractError> {
        Ok(Self {
            tesseract: TesseractOcr::new(tesseract_path),
            cloud: CloudOcrClient::new(cloud)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ExtractError> {
        Self::new(config.ocr.tesseract_path.clone(), config.ocr.cloud.resolve())
    }

    pub async fn extract(
        &self,
        bytes: &[u8],
        format: &DetectedFormat,
        engine: OcrEngine,
        language: &str,
    ) -> Result<ExtractionResult, ExtractError> {
        let branch = format.branch();
        debug!(
            mime = %format.mime,
            extension = %format.extension,
            branch = branch.as_str(),
            engine = engine.as_str(),
            "selecting extractor"
        );

        let result = match branch {
            FormatBranch::Tabular => spreadsheet::extract_table(bytes, &format.extension)?,
            FormatBranch::Pdf => {
                let digital = pdf::extract_pdf_text(bytes)?;
                if !digital.text.is_empty() {
                    digital
                } else if engine == OcrEngine::Cloud {
                    info!(pages = digital.pages(), "PDF has no text layer, using cloud OCR");
                    self.cloud.analyze(bytes, MIME_PDF).await?
                } else {
                    info!(
                        pages = digital.pages(),
                        "PDF has no text layer and on-device OCR does not handle PDFs"
                    );
                    ExtractionResult::new(
                        String::new(),
                        digital.pages(),
                        Vec::new(),
                        MODE_PDF_SCANNED_UNHANDLED,
                    )
                }
            }
            FormatBranch::Image => match engine {
                OcrEngine::Cloud => self.cloud.analyze(bytes, &format.mime).await?,
                OcrEngine::OnDevice => {
                    self.tesseract
                        .recognize(bytes, &format.extension, language)
                        .await?
                }
            },
            FormatBranch::RawText => extract_raw(bytes),
        };

        Ok(result
            .with_meta("mime", format.mime.as_str())
            .with_meta("extension", format.extension.as_str()))
    }
}

/// Decode bytes as UTF-8, dropping invalid sequences, and trim.
pub fn extract_raw(bytes: &[u8]) -> ExtractionResult {
    let text: String = bytes.utf8_chunks().map(|c| c.valid()).collect();
    ExtractionResult::new(text.trim().to_string(), 1, Vec::new(), MODE_RAW)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_intake_core::format::detect;
    use serde_json::json;
    use std::time::Duration;

    fn offline_extractor() -> Extractor {
        Extractor::new(
            PathBuf::from("/nonexistent/tesseract"),
            CloudOcrSettings {
                endpoint: None,
                key: None,
                endpoint_env: "INTAKE_OCR_ENDPOINT".into(),
                key_env: "INTAKE_OCR_KEY".into(),
                poll_interval: Duration::from_millis(1),
                max_attempts: 1,
                request_timeout: Duration::from_secs(1),
            },
        )
        .unwrap()
    }

    #[test]
    fn raw_decode_drops_invalid_utf8_and_trims() {
        let r = extract_raw(b"  Supplier: ACME\xff\xfe Ltd \n");
        assert_eq!(r.text, "Supplier: ACME Ltd");
        assert_eq!(r.pages(), 1);
        assert_eq!(r.mode(), MODE_RAW);
    }

    #[tokio::test]
    async fn csv_dispatch_adds_mime_and_extension() {
        let ex = offline_extractor();
        let format = detect("quote.csv", "");
        let r = ex
            .extract(b"item_code,qty\nW1,2\n", &format, OcrEngine::OnDevice, "auto")
            .await
            .unwrap();
        assert_eq!(r.mode(), "excel");
        assert_eq!(r.meta["mime"], json!("text/csv"));
        assert_eq!(r.meta["extension"], json!("csv"));
        assert_eq!(r.tables[0].rows[0]["item_code"], json!("W1"));
    }

    #[tokio::test]
    async fn unknown_format_falls_back_to_raw_text() {
        let ex = offline_extractor();
        let format = detect("notes.txt", "");
        let r = ex
            .extract(b"hello\n", &format, OcrEngine::Cloud, "auto")
            .await
            .unwrap();
        assert_eq!(r.text, "hello");
        assert_eq!(r.meta["mime"], json!("application/octet-stream"));
    }

    #[tokio::test]
    async fn image_without_tesseract_is_a_config_error() {
        let ex = offline_extractor();
        let format = detect("scan.png", "");
        let err = ex
            .extract(b"\x89PNG", &format, OcrEngine::OnDevice, "en")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Config { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn image_with_cloud_engine_and_no_credentials_is_a_config_error() {
        let ex = offline_extractor();
        let format = detect("scan.jpg", "");
        let err = ex
            .extract(b"jpeg", &format, OcrEngine::Cloud, "auto")
            .await
            .unwrap_err();
        match err {
            ExtractError::Config { hint, .. } => assert!(hint.contains("INTAKE_OCR_ENDPOINT")),
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
