//! Draft validation against target-schema requiredness and per-doctype
//! business rules.
//!
//! Validation reads the draft and never mutates it. It never fails either:
//! problems come back as human-readable error strings that become the notes
//! of an action request.

use serde::Serialize;
use serde_json::Value;

use crate::models::Fields;
use crate::schema::TargetSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub ok: bool,
    pub errors: Vec<String>,
}

impl Validation {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }
}

pub fn validate(schema: &TargetSchema, fields: &Fields) -> Validation {
    let mut errors = Vec::new();

    for meta in schema.required_fields() {
        let value = fields.get(&meta.fieldname);
        let missing = if meta.is_table() {
            !is_non_empty_list(value)
        } else {
            is_blank(value)
        };
        if missing {
            errors.push(format!("Missing required field: {}", meta.display_name()));
        }
    }

    match schema.doctype.as_str() {
        "Purchase Order" => {
            if is_blank(fields.get("supplier")) {
                errors.push("Missing Supplier".to_string());
            }
            if !is_non_empty_list(fields.get("items")) {
                errors.push("Missing Items table".to_string());
            }
        }
        "Employee" => {
            if is_blank(fields.get("employee_name")) && is_blank(fields.get("first_name")) {
                errors.push("Missing Employee Name".to_string());
            }
        }
        _ => {}
    }

    Validation::from_errors(errors)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn is_non_empty_list(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Array(list)) if !list.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldMeta;
    use serde_json::json;

    fn field(name: &str, label: Option<&str>, ty: &str, reqd: bool) -> FieldMeta {
        FieldMeta {
            fieldname: name.to_string(),
            label: label.map(str::to_string),
            fieldtype: ty.to_string(),
            reqd,
            options: None,
        }
    }

    fn fields(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    fn po_schema() -> TargetSchema {
        TargetSchema::new(
            "Purchase Order",
            vec![
                field("supplier", Some("Supplier"), "Link", true),
                field("items", Some("Items"), "Table", true),
                field("details", None, "Section Break", true),
            ],
        )
    }

    #[test]
    fn missing_supplier_reports_both_required_and_business_errors() {
        let draft = fields(json!({"items": [{"item_code": "A"}]}));
        let v = validate(&po_schema(), &draft);
        assert!(!v.ok);
        assert!(v.errors.contains(&"Missing required field: Supplier".to_string()));
        assert!(v.errors.contains(&"Missing Supplier".to_string()));
        assert_eq!(v.errors.len(), 2);
    }

    #[test]
    fn complete_purchase_order_passes() {
        let draft = fields(json!({"supplier": "ACME", "items": [{"item_code": "A"}]}));
        let v = validate(&po_schema(), &draft);
        assert!(v.ok, "unexpected errors: {:?}", v.errors);
        assert!(v.errors.is_empty());
    }

    #[test]
    fn empty_items_table_fails_twice() {
        let draft = fields(json!({"supplier": "ACME", "items": []}));
        let v = validate(&po_schema(), &draft);
        assert_eq!(
            v.errors,
            vec![
                "Missing required field: Items".to_string(),
                "Missing Items table".to_string()
            ]
        );
    }

    #[test]
    fn empty_string_counts_as_missing_but_zero_does_not() {
        let schema = TargetSchema::new(
            "Item",
            vec![
                field("item_name", None, "Data", true),
                field("stock_qty", None, "Float", true),
            ],
        );
        let v = validate(&schema, &fields(json!({"item_name": "", "stock_qty": 0})));
        assert_eq!(v.errors, vec!["Missing required field: item_name".to_string()]);
    }

    #[test]
    fn employee_accepts_first_name_instead_of_full_name() {
        let schema = TargetSchema::new("Employee", vec![]);
        assert!(validate(&schema, &fields(json!({"first_name": "Layla"}))).ok);
        let v = validate(&schema, &fields(json!({"gender": "Female"})));
        assert_eq!(v.errors, vec!["Missing Employee Name".to_string()]);
    }

    #[test]
    fn validation_does_not_mutate_the_draft() {
        let draft = fields(json!({"supplier": ""}));
        let before = draft.clone();
        let _ = validate(&po_schema(), &draft);
        assert_eq!(draft, before);
    }
}
