//! Purchase-order-like documents: vendor quotes, PO drafts, proformas.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::common::{cell_text, find_first, label_patterns, parse_date, pick_key, table_rows, to_float};
use super::{DocType, DocumentParser};
use crate::models::{CanonicalRecord, RowRecord, TableBlock};

static SUPPLIER: Lazy<Vec<Regex>> = Lazy::new(|| {
    label_patterns(&[
        r"Supplier\s*[:\-]\s*(.+)",
        r"Vendor\s*[:\-]\s*(.+)",
        r"From\s*[:\-]\s*(.+)",
    ])
});

static TRANSACTION_DATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    label_patterns(&[
        r"Date\s*[:\-]\s*([0-9/\-.]+)",
        r"PO\s*Date\s*[:\-]\s*([0-9/\-.]+)",
    ])
});

static SCHEDULE_DATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    label_patterns(&[
        r"Delivery\s*Date\s*[:\-]\s*([0-9/\-.]+)",
        r"Expected\s*Date\s*[:\-]\s*([0-9/\-.]+)",
    ])
});

static CURRENCY: Lazy<Vec<Regex>> = Lazy::new(|| label_patterns(&[r"Currency\s*[:\-]\s*([A-Z]{3})"]));

/// `<line no> <description> <qty> <rate> <amount>`
static ITEM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s+(.+?)\s+(\d+(?:\.\d+)?)\s+(\d+(?:\.\d+)?)\s+(\d+(?:\.\d+)?)$")
        .unwrap_or_else(|e| panic!("invalid item line pattern: {}", e))
});

/// Shortest text line considered for item-line matching.
const MIN_ITEM_LINE_CHARS: usize = 10;

const ITEM_ALIASES: &[&str] = &["item_code", "item", "description", "product", "name"];
const QTY_ALIASES: &[&str] = &["qty", "quantity", "q'ty", "qnty"];
const RATE_ALIASES: &[&str] = &["rate", "price", "unit_price", "unit price", "unitprice"];
const UOM_ALIASES: &[&str] = &["uom", "unit", "unit_of_measure"];
const AMOUNT_ALIASES: &[&str] = &["amount", "total", "line_total", "line total"];

pub struct PurchaseOrderParser;

impl DocumentParser for PurchaseOrderParser {
    fn doc_type(&self) -> DocType {
        DocType::PurchaseOrder
    }

    fn parse(&self, text: &str, tables: &[TableBlock], _language: &str) -> CanonicalRecord {
        let mut record = CanonicalRecord::new(DocType::PurchaseOrder, text);

        record.set("supplier", find_first(&SUPPLIER, text));
        record.set(
            "transaction_date",
            find_first(&TRANSACTION_DATE, text).and_then(|s| parse_date(&s)),
        );
        record.set(
            "schedule_date",
            find_first(&SCHEDULE_DATE, text).and_then(|s| parse_date(&s)),
        );
        record.set("currency", find_first(&CURRENCY, text));

        let rows = table_rows(tables);
        let items = if rows.is_empty() {
            items_from_text(text)
        } else {
            items_from_rows(&rows)
        };
        record.set(
            "items",
            Some(Value::Array(items.into_iter().map(Value::Object).collect())),
        );

        record
    }
}

fn items_from_rows(rows: &[&RowRecord]) -> Vec<Map<String, Value>> {
    let mut items = Vec::new();
    for row in rows {
        let col_item = pick_key(row.keys(), ITEM_ALIASES);
        let col_qty = pick_key(row.keys(), QTY_ALIASES);
        let col_rate = pick_key(row.keys(), RATE_ALIASES);
        let col_uom = pick_key(row.keys(), UOM_ALIASES);
        let col_amount = pick_key(row.keys(), AMOUNT_ALIASES);

        let description = col_item
            .as_ref()
            .and_then(|c| row.get(c))
            .map(cell_text)
            .unwrap_or_default();
        if description.is_empty() {
            continue;
        }

        let number = |col: &Option<String>| col.as_ref().and_then(|c| row.get(c)).and_then(to_float);
        let uom = col_uom
            .as_ref()
            .and_then(|c| row.get(c))
            .map(cell_text)
            .filter(|s| !s.is_empty());

        let mut item = Map::new();
        item.insert("description".into(), Value::String(description));
        insert_present(&mut item, "qty", number(&col_qty).map(Value::from));
        insert_present(&mut item, "rate", number(&col_rate).map(Value::from));
        insert_present(&mut item, "uom", uom.map(Value::String));
        insert_present(&mut item, "amount", number(&col_amount).map(Value::from));
        items.push(item);
    }
    items
}

fn items_from_text(text: &str) -> Vec<Map<String, Value>> {
    let mut items = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.chars().count() < MIN_ITEM_LINE_CHARS {
            continue;
        }
        let Some(caps) = ITEM_LINE.captures(line) else {
            continue;
        };
        let num = |i: usize| to_float(&Value::String(caps[i].to_string())).map(Value::from);

        let mut item = Map::new();
        item.insert(
            "description".into(),
            Value::String(caps[2].trim().to_string()),
        );
        insert_present(&mut item, "qty", num(3));
        insert_present(&mut item, "rate", num(4));
        insert_present(&mut item, "amount", num(5));
        items.push(item);
    }
    items
}

fn insert_present(item: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if s.is_empty() => {}
        Some(v) => {
            item.insert(key.to_string(), v);
        }
    }
}
