//! Schema-driven field mapping and template-defaults overlay.
//!
//! # Mapping rules
//!
//! | `maps_to` | Source value | Effect |
//! |-----------|--------------|--------|
//! | `field` | any non-empty | `fields[field] = value`, later rows win |
//! | `items.<sub>` | list | every map row merged into `fields["items"]`, once per source key |
//! | `items.<sub>` | not a list | ignored |
//! | `other.<sub>` | any | ignored (only `items` children are supported) |
//!
//! Rows with an empty `field_key` or `maps_to` are skipped, as are source
//! values that are `null` or the empty string.
//!
//! Several `items.<sub>` rows naming the same source list (one per child
//! column) contribute its rows a single time. Appending once per mapping
//! row would repeat every line item for each mapped column.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::models::{CanonicalRecord, Fields, MappingTemplate, SchemaFieldMapping};

/// Child-table parent supported in dotted `maps_to` paths.
pub const ITEMS_PARENT: &str = "items";

pub fn apply_schema_mapping(canonical: &CanonicalRecord, rows: &[SchemaFieldMapping]) -> Fields {
    let mut out = Fields::new();
    let mut items_acc: Vec<Value> = Vec::new();
    let mut merged_sources: HashSet<&str> = HashSet::new();

    for row in rows {
        let src = row.field_key.trim();
        let tgt = row.maps_to.trim();
        if src.is_empty() || tgt.is_empty() {
            continue;
        }

        let value = match canonical.get(src) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) if s.is_empty() => continue,
            Some(v) => v,
        };

        match tgt.split_once('.') {
            Some((parent, _child)) if parent == ITEMS_PARENT => {
                let Value::Array(list) = value else {
                    debug!(field_key = src, maps_to = tgt, "non-list value for child path ignored");
                    continue;
                };
                // Each source list is merged once, however many child columns map from it.
                if !merged_sources.insert(src) {
                    continue;
                }
                items_acc.extend(list.iter().filter(|v| v.is_object()).cloned());
            }
            Some(_) => {
                debug!(field_key = src, maps_to = tgt, "unsupported nested path ignored");
            }
            None => {
                out.insert(tgt.to_string(), value.clone());
            }
        }
    }

    if !items_acc.is_empty() {
        out.insert(ITEMS_PARENT.to_string(), Value::Array(items_acc));
    }
    out
}

/// Overlay mapped fields on top of an active template's defaults.
pub fn apply_template_defaults(
    doctype: &str,
    mapped: Fields,
    template: Option<&MappingTemplate>,
) -> Fields {
    let template = match template {
        Some(t) if t.active => t,
        _ => return mapped,
    };

    debug!(
        doctype,
        defaults = template.defaults.len(),
        "applying template defaults"
    );
    let mut out = template.defaults.clone();
    for (k, v) in mapped {
        out.insert(k, v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::DocType;
    use serde_json::json;

    fn rows(pairs: &[(&str, &str)]) -> Vec<SchemaFieldMapping> {
        pairs
            .iter()
            .map(|(k, t)| SchemaFieldMapping {
                field_key: k.to_string(),
                maps_to: t.to_string(),
                ..Default::default()
            })
            .collect()
    }

    fn canonical(fields: Value) -> CanonicalRecord {
        let mut rec = CanonicalRecord::new(DocType::PurchaseOrder, "");
        for (k, v) in fields.as_object().unwrap() {
            rec.set(k, Some(v.clone()));
        }
        rec
    }

    #[test]
    fn items_child_path_merges_dict_rows() {
        let rec = canonical(json!({"items": [{"item_code": "A"}, {"item_code": "B"}]}));
        let out = apply_schema_mapping(&rec, &rows(&[("items", "items.item_code")]));
        assert_eq!(out["items"], json!([{"item_code": "A"}, {"item_code": "B"}]));
    }

    #[test]
    fn several_child_columns_from_one_list_merge_once() {
        let rec = canonical(json!({"items": [{"item_code": "A", "qty": 1.0}]}));
        let out = apply_schema_mapping(
            &rec,
            &rows(&[("items", "items.item_code"), ("items", "items.qty")]),
        );
        assert_eq!(out["items"], json!([{"item_code": "A", "qty": 1.0}]));
    }

    #[test]
    fn non_dict_list_entries_are_dropped() {
        let rec = canonical(json!({"items": [{"item_code": "A"}, "stray", 3]}));
        let out = apply_schema_mapping(&rec, &rows(&[("items", "items.item_code")]));
        assert_eq!(out["items"], json!([{"item_code": "A"}]));
    }

    #[test]
    fn empty_rows_and_empty_values_are_ignored() {
        let rec = canonical(json!({"supplier": "ACME", "currency": "", "schedule_date": null}));
        let out = apply_schema_mapping(
            &rec,
            &rows(&[
                ("", "supplier"),
                ("supplier", ""),
                ("currency", "currency"),
                ("schedule_date", "schedule_date"),
                ("not_there", "x"),
            ]),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn plain_paths_set_directly_and_later_rows_win() {
        let rec = canonical(json!({"supplier": "ACME", "currency": "SAR"}));
        let out = apply_schema_mapping(
            &rec,
            &rows(&[("supplier", "supplier"), ("currency", "supplier")]),
        );
        assert_eq!(out["supplier"], json!("SAR"));
    }

    #[test]
    fn other_nested_paths_and_scalar_child_values_are_dropped() {
        let rec = canonical(json!({"supplier": "ACME", "currency": "SAR"}));
        let out = apply_schema_mapping(
            &rec,
            &rows(&[("supplier", "address.line1"), ("currency", "items.currency")]),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn template_defaults_are_overlaid_by_mapped_values() {
        let mut mapped = Fields::new();
        mapped.insert("currency".into(), json!("USD"));
        let template = MappingTemplate {
            active: true,
            defaults: json!({"currency": "SAR", "company": "AlphaX"})
                .as_object()
                .cloned()
                .unwrap(),
        };
        let out = apply_template_defaults("Purchase Order", mapped, Some(&template));
        assert_eq!(out["currency"], json!("USD"));
        assert_eq!(out["company"], json!("AlphaX"));
    }

    #[test]
    fn inactive_or_missing_template_leaves_fields_unchanged() {
        let mut mapped = Fields::new();
        mapped.insert("supplier".into(), json!("ACME"));
        let template = MappingTemplate {
            active: false,
            defaults: json!({"company": "AlphaX"}).as_object().cloned().unwrap(),
        };
        let out = apply_template_defaults("Purchase Order", mapped.clone(), Some(&template));
        assert_eq!(out, mapped);
        let out = apply_template_defaults("Purchase Order", mapped.clone(), None);
        assert_eq!(out, mapped);
    }
}
