//! # Doc Intake
//!
//! Document intake pipeline: turns an uploaded file into a draft business
//! record, or into a review task when the draft cannot be created
//! automatically.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌─────────┐   ┌─────────┐   ┌──────────┐
//! │ File store │──▶│  Detect + │──▶│  Parse  │──▶│  Map +  │──▶│   Gate   │
//! │ pub / priv │   │  Extract  │   │ PO / HR │   │Validate │   │create/ask│
//! └────────────┘   └─────┬─────┘   └─────────┘   └─────────┘   └────┬─────┘
//!                        │ PDF text, xlsx/csv, tesseract, cloud OCR │
//!                        ▼                                          ▼
//!                   ┌──────────────────────────────────────────────────┐
//!                   │ SQLite: ingested documents, extractions, records, │
//!                   │         action requests                          │
//!                   └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! intake init
//! intake detect quote.pdf
//! intake ingest quote.pdf --blueprint vendor_quote
//! intake requests list --status pending
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Extraction and pipeline error types |
//! | [`extract`] | Format-dispatching content extraction |
//! | [`files`] | Public/private local file store |
//! | [`ingest`] | Pipeline orchestration and stage tracking |
//! | [`sqlite_store`] | SQLite persistence |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! Parsers, mapping, validation, the decision gate and the store trait live
//! in the `doc_intake_core` crate.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod extract_cmd;
pub mod files;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod requests;
pub mod sqlite_store;
