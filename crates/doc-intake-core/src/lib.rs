//! # doc-intake core
//!
//! Pure pipeline logic for doc-intake: the data model, format detection,
//! heuristic parsers, schema-driven field mapping, validation, and the
//! create-or-review decision gate.
//!
//! This crate contains no tokio, sqlx, HTTP, or process I/O. Content
//! extraction (PDF, spreadsheet, OCR) and persistence adapters live in the
//! `doc-intake` binary crate, which drives the types defined here.

pub mod auth;
pub mod format;
pub mod gate;
pub mod mapping;
pub mod models;
pub mod parse;
pub mod schema;
pub mod store;
pub mod validation;
