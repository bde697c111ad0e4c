//! Heuristic parsers: free text and table rows → [`CanonicalRecord`].
//!
//! Each supported document type is a [`DocType`] variant with one
//! [`DocumentParser`] implementation. [`parser_for_target`] resolves the
//! parser for a target doctype name; unsupported targets get `None` and the
//! ingestion run falls back to a summary-only draft.
//!
//! Parsing never fails. Fields that cannot be found, dates that do not
//! parse, and numbers that do not coerce all come back as `null`.

mod common;
mod employee;
mod purchase_order;

use std::fmt;

use crate::models::{CanonicalRecord, TableBlock};

pub use common::{parse_date, pick_key, to_float};
pub use employee::EmployeeParser;
pub use purchase_order::PurchaseOrderParser;

/// Closed set of document types with a heuristic parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocType {
    PurchaseOrder,
    Employee,
}

impl DocType {
    pub const ALL: [DocType; 2] = [DocType::PurchaseOrder, DocType::Employee];

    /// Canonical tag stored in the record's `doc_type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::PurchaseOrder => "purchase_order",
            DocType::Employee => "employee",
        }
    }

    /// Target doctype name this parser feeds.
    pub fn target_doctype(&self) -> &'static str {
        match self {
            DocType::PurchaseOrder => "Purchase Order",
            DocType::Employee => "Employee",
        }
    }

    pub fn from_target(doctype: &str) -> Option<DocType> {
        DocType::ALL
            .into_iter()
            .find(|d| d.target_doctype() == doctype.trim())
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common capability of every per-type parser.
pub trait DocumentParser: Send + Sync {
    fn doc_type(&self) -> DocType;

    /// Build a canonical record from extracted text and tables.
    ///
    /// `language` is the run's language hint; current parsers match
    /// English labels only and ignore it.
    fn parse(&self, text: &str, tables: &[TableBlock], language: &str) -> CanonicalRecord;
}

static PURCHASE_ORDER: PurchaseOrderParser = PurchaseOrderParser;
static EMPLOYEE: EmployeeParser = EmployeeParser;

pub fn parser_for(doc_type: DocType) -> &'static dyn DocumentParser {
    match doc_type {
        DocType::PurchaseOrder => &PURCHASE_ORDER,
        DocType::Employee => &EMPLOYEE,
    }
}

pub fn parser_for_target(doctype: &str) -> Option<&'static dyn DocumentParser> {
    DocType::from_target(doctype).map(parser_for)
}
