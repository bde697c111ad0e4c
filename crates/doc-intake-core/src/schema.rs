//! Target-schema metadata: the field list of the record type that
//! ingested data is mapped into.

use serde::{Deserialize, Serialize};

/// Field kinds that only shape the form layout; never validated.
pub const LAYOUT_FIELD_TYPES: &[&str] = &["Section Break", "Column Break", "Tab Break"];

/// Field kinds hidden from the available-fields listing.
pub const NON_DATA_FIELD_TYPES: &[&str] = &[
    "Section Break",
    "Column Break",
    "Tab Break",
    "HTML",
    "Button",
    "Fold",
    "Heading",
];

/// Field kinds holding child rows.
pub const TABLE_FIELD_TYPES: &[&str] = &["Table", "Table MultiSelect"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    #[serde(default)]
    pub fieldname: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_fieldtype")]
    pub fieldtype: String,
    #[serde(default)]
    pub reqd: bool,
    #[serde(default)]
    pub options: Option<String>,
}

fn default_fieldtype() -> String {
    "Data".to_string()
}

impl FieldMeta {
    /// Label for messages, falling back to the field name.
    pub fn display_name(&self) -> &str {
        match self.label.as_deref() {
            Some(l) if !l.trim().is_empty() => l,
            _ => &self.fieldname,
        }
    }

    pub fn is_layout(&self) -> bool {
        LAYOUT_FIELD_TYPES.contains(&self.fieldtype.as_str())
    }

    pub fn is_table(&self) -> bool {
        TABLE_FIELD_TYPES.contains(&self.fieldtype.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSchema {
    pub doctype: String,
    pub fields: Vec<FieldMeta>,
}

impl TargetSchema {
    pub fn new(doctype: impl Into<String>, fields: Vec<FieldMeta>) -> Self {
        Self {
            doctype: doctype.into(),
            fields,
        }
    }

    /// Data-bearing fields a mapping may target.
    pub fn available_fields(&self) -> Vec<&FieldMeta> {
        self.fields
            .iter()
            .filter(|f| !f.fieldname.is_empty())
            .filter(|f| !NON_DATA_FIELD_TYPES.contains(&f.fieldtype.as_str()))
            .collect()
    }

    /// Required, named, non-layout fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields
            .iter()
            .filter(|f| f.reqd && !f.fieldname.is_empty() && !f.is_layout())
    }
}
