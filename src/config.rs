//! Configuration parsing and validation.
//!
//! doc-intake is configured via a TOML file (default: `config/intake.toml`).
//! The file names the database, the file-store root, the OCR settings, the
//! permission grants, and the per-doctype target schemas, mapping templates
//! and intake blueprints.
//!
//! # Example
//!
//! ```toml
//! [db]
//! path = "./data/intake.sqlite"
//!
//! [files]
//! root = "./files"
//!
//! [ocr]
//! engine = "on-device"
//! language = "auto"
//!
//! [ocr.cloud]
//! endpoint_env = "INTAKE_OCR_ENDPOINT"
//! key_env = "INTAKE_OCR_KEY"
//!
//! [permissions]
//! create = ["Purchase Order"]
//!
//! [schemas."Purchase Order"]
//! fields = [
//!   { fieldname = "supplier", label = "Supplier", fieldtype = "Link", reqd = true },
//!   { fieldname = "items", label = "Items", fieldtype = "Table", reqd = true },
//! ]
//!
//! [templates.po_defaults]
//! defaults = { currency = "SAR" }
//!
//! [blueprints.vendor_quote]
//! target_doctype = "Purchase Order"
//! mapping_template = "po_defaults"
//! schema_fields = [
//!   { field_key = "supplier", maps_to = "supplier" },
//!   { field_key = "items", maps_to = "items.item_code" },
//! ]
//! ```
//!
//! # Validation
//!
//! After parsing, [`load_config`] checks:
//! - `ocr.cloud.poll_interval_ms`, `ocr.cloud.max_attempts` and
//!   `ocr.cloud.request_timeout_secs` are > 0
//! - every blueprint's `target_doctype` has a configured schema
//! - every blueprint's `mapping_template` names a configured template

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use doc_intake_core::auth::StaticAuthorizer;
use doc_intake_core::models::{default_language, Blueprint, MappingTemplate, OcrEngine};
use doc_intake_core::schema::{FieldMeta, TargetSchema};

use crate::extract::cloud_ocr::CloudOcrSettings;

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub permissions: StaticAuthorizer,
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaConfig>,
    #[serde(default)]
    pub templates: BTreeMap<String, MappingTemplate>,
    #[serde(default)]
    pub blueprints: BTreeMap<String, Blueprint>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    /// Created on first `intake init` along with its parent directories.
    pub path: PathBuf,
}

/// Root of the local file store. Public files live under `<root>/public`,
/// private ones under `<root>/private`.
#[derive(Debug, Deserialize, Clone)]
pub struct FilesConfig {
    #[serde(default = "default_files_root")]
    pub root: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: default_files_root(),
        }
    }
}

fn default_files_root() -> PathBuf {
    PathBuf::from("./files")
}

/// Default OCR choice for runs without a blueprint.
#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default)]
    pub engine: OcrEngine,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: PathBuf,
    #[serde(default)]
    pub cloud: CloudOcrConfig,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngine::default(),
            language: default_language(),
            tesseract_path: default_tesseract_path(),
            cloud: CloudOcrConfig::default(),
        }
    }
}

fn default_tesseract_path() -> PathBuf {
    PathBuf::from("tesseract")
}

/// Cloud OCR endpoint settings.
///
/// The endpoint and key are read from the environment variables named by
/// `endpoint_env` and `key_env`. `endpoint` may be set inline instead; the
/// key is never read from the file.
#[derive(Debug, Deserialize, Clone)]
pub struct CloudOcrConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_endpoint_env")]
    pub endpoint_env: String,
    #[serde(default = "default_key_env")]
    pub key_env: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for CloudOcrConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            endpoint_env: default_endpoint_env(),
            key_env: default_key_env(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_endpoint_env() -> String {
    "INTAKE_OCR_ENDPOINT".to_string()
}
fn default_key_env() -> String {
    "INTAKE_OCR_KEY".to_string()
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_max_attempts() -> u32 {
    30
}
fn default_request_timeout_secs() -> u64 {
    90
}

impl CloudOcrConfig {
    /// Resolve endpoint and key from the environment.
    ///
    /// Missing values stay `None`; the cloud client reports them as a
    /// configuration error only when a run actually needs cloud OCR.
    pub fn resolve(&self) -> CloudOcrSettings {
        let from_env = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        CloudOcrSettings {
            endpoint: self
                .endpoint
                .clone()
                .filter(|e| !e.trim().is_empty())
                .or_else(|| from_env(&self.endpoint_env)),
            key: from_env(&self.key_env),
            endpoint_env: self.endpoint_env.clone(),
            key_env: self.key_env.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_attempts,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Field list of one target doctype.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SchemaConfig {
    #[serde(default)]
    pub fields: Vec<FieldMeta>,
}

impl Config {
    /// Configuration for commands that work without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/intake.sqlite"),
            },
            files: FilesConfig::default(),
            ocr: OcrConfig::default(),
            permissions: StaticAuthorizer::default(),
            schemas: BTreeMap::new(),
            templates: BTreeMap::new(),
            blueprints: BTreeMap::new(),
        }
    }

    pub fn target_schema(&self, doctype: &str) -> Option<TargetSchema> {
        self.schemas
            .get(doctype)
            .map(|s| TargetSchema::new(doctype, s.fields.clone()))
    }

    pub fn blueprint(&self, name: &str) -> Option<&Blueprint> {
        self.blueprints.get(name)
    }

    pub fn template(&self, name: &str) -> Option<&MappingTemplate> {
        self.templates.get(name)
    }
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    let cloud = &config.ocr.cloud;
    if cloud.poll_interval_ms == 0 {
        bail!("ocr.cloud.poll_interval_ms must be > 0");
    }
    if cloud.max_attempts == 0 {
        bail!("ocr.cloud.max_attempts must be > 0");
    }
    if cloud.request_timeout_secs == 0 {
        bail!("ocr.cloud.request_timeout_secs must be > 0");
    }

    for (name, bp) in &config.blueprints {
        if bp.target_doctype.trim().is_empty() {
            bail!("blueprints.{}.target_doctype must not be empty", name);
        }
        if !config.schemas.contains_key(&bp.target_doctype) {
            bail!(
                "blueprints.{} targets '{}' but no [schemas.\"{}\"] section is configured",
                name,
                bp.target_doctype,
                bp.target_doctype
            );
        }
        if let Some(template) = &bp.mapping_template {
            if !config.templates.contains_key(template) {
                bail!(
                    "blueprints.{}.mapping_template '{}' is not a configured template",
                    name,
                    template
                );
            }
        }
    }

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}
