//! Tabular extraction for spreadsheets (OOXML `.xlsx`) and CSV.
//!
//! The first row is the header. Every following row becomes one
//! [`RowRecord`] keyed by header name, with missing or empty cells as
//! `null`. Rows with no values at all are skipped. The result has a single
//! table named `Sheet1`, empty text, and `meta.columns` in header order.
//!
//! Only the first worksheet of a workbook is read. Legacy binary `.xls`
//! files are rejected with a configuration error.

use std::collections::HashMap;
use std::io::Read;

use quick_xml::events::{BytesStart, Event};
use serde_json::{Number, Value};
use tracing::debug;

use doc_intake_core::models::{ExtractionResult, RowRecord, TableBlock};

use crate::error::ExtractError;

pub const MODE_EXCEL: &str = "excel";

/// Name given to the single extracted table.
pub const TABLE_NAME: &str = "Sheet1";

/// Maximum cells read from a worksheet (avoids unbounded memory).
const XLSX_MAX_CELLS: usize = 100_000;
/// Columns per sheet, `A` through `XFD`.
const MAX_COLUMNS: usize = 16_384;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const WORKSHEET_PREFIX: &str = "xl/worksheets/sheet";

/// Cell texts read as missing values.
const NA_VALUES: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-NaN", "-nan", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a",
    "nan", "null",
];

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

/// Extract the first table of a spreadsheet. `extension` has no leading dot.
pub fn extract_table(bytes: &[u8], extension: &str) -> Result<ExtractionResult, ExtractError> {
    let grid = match extension {
        "csv" => read_csv(bytes)?,
        "xlsx" => read_xlsx(bytes)?,
        "xls" => {
            return Err(ExtractError::config(
                "legacy .xls spreadsheets cannot be read",
                "re-save the file as .xlsx or .csv and upload it again",
            ))
        }
        other => {
            return Err(ExtractError::Spreadsheet(format!(
                "unsupported spreadsheet extension: {:?}",
                other
            )))
        }
    };

    let (columns, rows) = tabulate(grid);
    debug!(columns = columns.len(), rows = rows.len(), "spreadsheet tabulated");

    let result = ExtractionResult::new(
        String::new(),
        1,
        vec![TableBlock {
            name: TABLE_NAME.to_string(),
            rows,
        }],
        MODE_EXCEL,
    );
    Ok(result.with_meta(
        "columns",
        Value::Array(columns.into_iter().map(Value::String).collect()),
    ))
}

/// Sparse grid: each row is a list of `(column index, value)`.
type Grid = Vec<Vec<(usize, Value)>>;

/// Turn a grid into header names plus keyed rows.
fn tabulate(grid: Grid) -> (Vec<String>, Vec<RowRecord>) {
    let mut rows = grid
        .into_iter()
        .filter(|r| r.iter().any(|(_, v)| !v.is_null()));

    let Some(header) = rows.next() else {
        return (Vec::new(), Vec::new());
    };
    let body: Vec<Vec<(usize, Value)>> = rows.collect();

    let width = header
        .iter()
        .chain(body.iter().flatten())
        .map(|(col, _)| col + 1)
        .max()
        .unwrap_or(0);

    let mut names: Vec<Option<String>> = vec![None; width];
    for (col, value) in header {
        let name = cell_to_header(&value);
        if !name.is_empty() {
            names[col] = Some(name);
        }
    }
    let columns = dedupe_headers(names);

    let records = body
        .into_iter()
        .map(|cells| {
            let mut by_col: HashMap<usize, Value> = cells.into_iter().collect();
            columns
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), by_col.remove(&i).unwrap_or(Value::Null)))
                .collect::<RowRecord>()
        })
        .collect();

    (columns, records)
}

fn cell_to_header(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Fill blank headers with `Unnamed: <i>` and suffix repeats with `.1`, `.2`, ...
fn dedupe_headers(names: Vec<Option<String>>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = name.unwrap_or_else(|| format!("Unnamed: {}", i));
            let count = seen.entry(base.clone()).or_insert(0);
            let out = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            out
        })
        .collect()
}

/// Type a text cell: missing markers → null, numbers, booleans, else trimmed text.
fn typed_cell(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() || NA_VALUES.contains(&s) {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    match s.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

fn read_csv(bytes: &[u8]) -> Result<Grid, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut grid = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;
        if record.len() > MAX_COLUMNS {
            return Err(too_wide(record.len()));
        }
        let row = record
            .iter()
            .enumerate()
            .map(|(i, field)| (i, typed_cell(&String::from_utf8_lossy(field))))
            .collect();
        grid.push(row);
    }
    Ok(grid)
}

fn read_zip_entry_bounded(
    archive: &mut Archive<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Spreadsheet(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn read_xlsx(bytes: &[u8]) -> Result<Grid, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;

    let shared_strings = if archive.file_names().any(|n| n == SHARED_STRINGS) {
        let xml = read_zip_entry_bounded(&mut archive, SHARED_STRINGS, MAX_XML_ENTRY_BYTES)?;
        parse_shared_strings(&xml)?
    } else {
        Vec::new()
    };

    let sheet = first_worksheet_name(&archive)
        .ok_or_else(|| ExtractError::Spreadsheet("workbook has no worksheets".to_string()))?;
    let xml = read_zip_entry_bounded(&mut archive, &sheet, MAX_XML_ENTRY_BYTES)?;
    parse_sheet(&xml, &shared_strings)
}

fn first_worksheet_name(archive: &Archive<'_>) -> Option<String> {
    archive
        .file_names()
        .filter(|n| n.starts_with(WORKSHEET_PREFIX) && n.ends_with(".xml"))
        .min_by_key(|name| {
            name.trim_start_matches(WORKSHEET_PREFIX)
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        })
        .map(str::to_string)
}

/// Each `<si>` yields one string: the concatenation of all its `<t>` runs.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = current.is_some(),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => {
                    if let Some(s) = current.take() {
                        strings.push(s);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Spreadsheet(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Cell kinds distinguished by the `t` attribute of `<c>`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CellKind {
    Number,
    Shared,
    Inline,
    FormulaString,
    Bool,
    Error,
}

impl CellKind {
    fn from_attr(t: Option<&[u8]>) -> Self {
        match t {
            Some(b"s") => CellKind::Shared,
            Some(b"inlineStr") => CellKind::Inline,
            Some(b"str") => CellKind::FormulaString,
            Some(b"b") => CellKind::Bool,
            Some(b"e") => CellKind::Error,
            _ => CellKind::Number,
        }
    }
}

struct OpenCell {
    col: usize,
    kind: CellKind,
    text: String,
}

fn parse_sheet(xml: &[u8], shared_strings: &[String]) -> Result<Grid, ExtractError> {
    let mut grid: Grid = Vec::new();
    let mut row: Option<Vec<(usize, Value)>> = None;
    let mut cell: Option<OpenCell> = None;
    let mut capture = false;
    let mut next_col = 0usize;
    let mut cell_count = 0usize;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        if cell_count >= XLSX_MAX_CELLS {
            debug!(limit = XLSX_MAX_CELLS, "worksheet cell limit reached");
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(Vec::new());
                    next_col = 0;
                }
                b"c" => {
                    let (col, kind) = cell_header(&e, next_col)?;
                    cell = Some(OpenCell {
                        col,
                        kind,
                        text: String::new(),
                    });
                }
                // `<v>` holds the value; `<t>` inside `<is>` holds inline text.
                b"v" | b"t" => capture = cell.is_some(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"c" => {
                    let (col, _) = cell_header(&e, next_col)?;
                    next_col = col + 1;
                }
                b"row" => grid.push(Vec::new()),
                _ => {}
            },
            Ok(Event::Text(te)) if capture => {
                if let Some(c) = cell.as_mut() {
                    c.text.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let Some(c) = cell.take() {
                        next_col = c.col + 1;
                        let value = cell_value(&c, shared_strings);
                        if let Some(r) = row.as_mut() {
                            r.push((c.col, value));
                            cell_count += 1;
                        }
                    }
                }
                b"row" => {
                    if let Some(r) = row.take() {
                        grid.push(r);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Spreadsheet(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(grid)
}

/// Column index (from the `r` reference, else the next position) and kind.
fn cell_header(e: &BytesStart<'_>, next_col: usize) -> Result<(usize, CellKind), ExtractError> {
    let mut col = None;
    let mut kind = None;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => col = column_index(&attr.value)?,
            b"t" => kind = Some(CellKind::from_attr(Some(attr.value.as_ref()))),
            _ => {}
        }
    }
    let col = col.unwrap_or(next_col);
    if col >= MAX_COLUMNS {
        return Err(too_wide(col + 1));
    }
    Ok((col, kind.unwrap_or_else(|| CellKind::from_attr(None))))
}

/// Zero-based column of an A1-style reference (`"C7"` → 2). `None` when the
/// reference has no column letters; an error past column `XFD`.
fn column_index(reference: &[u8]) -> Result<Option<usize>, ExtractError> {
    let mut col = 0usize;
    let mut letters = 0;
    for b in reference.iter().take_while(|b| b.is_ascii_alphabetic()) {
        col = col * 26 + (b.to_ascii_uppercase() - b'A' + 1) as usize;
        letters += 1;
        if col > MAX_COLUMNS {
            return Err(ExtractError::Spreadsheet(format!(
                "cell reference {:?} is beyond column XFD",
                String::from_utf8_lossy(reference)
            )));
        }
    }
    Ok(if letters == 0 { None } else { Some(col - 1) })
}

fn too_wide(columns: usize) -> ExtractError {
    ExtractError::Spreadsheet(format!(
        "sheet has {} columns, more than the {} allowed",
        columns, MAX_COLUMNS
    ))
}

fn cell_value(cell: &OpenCell, shared_strings: &[String]) -> Value {
    let raw = cell.text.as_str();
    match cell.kind {
        CellKind::Shared => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared_strings.get(i))
            .map(|s| text_value(s))
            .unwrap_or(Value::Null),
        CellKind::Inline | CellKind::FormulaString | CellKind::Error => text_value(raw),
        CellKind::Bool => match raw.trim() {
            "1" => Value::Bool(true),
            "0" => Value::Bool(false),
            _ => Value::Null,
        },
        CellKind::Number => typed_cell(raw),
    }
}

fn text_value(s: &str) -> Value {
    let t = s.trim();
    if t.is_empty() {
        Value::Null
    } else {
        Value::String(t.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn xlsx(sheet_xml: &str, shared: Option<&str>) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let opts = zip::write::SimpleFileOptions::default();
            if let Some(ss) = shared {
                zip.start_file(SHARED_STRINGS, opts).unwrap();
                zip.write_all(ss.as_bytes()).unwrap();
            }
            zip.start_file("xl/worksheets/sheet1.xml", opts).unwrap();
            zip.write_all(sheet_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    const SHARED: &str = r#"<?xml version="1.0"?><sst><si><t>item_code</t></si><si><t>qty</t></si><si><t>rate</t></si><si><r><t>W</t></r><r><t>1</t></r></si></sst>"#;

    #[test]
    fn xlsx_rows_are_keyed_by_header() {
        let sheet = r#"<?xml version="1.0"?><worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c></row>
            <row r="2"><c r="A2" t="s"><v>3</v></c><c r="B2"><v>2</v></c><c r="C2"><v>10.5</v></c></row>
            <row r="3"><c r="A3" t="inlineStr"><is><t>Bolt</t></is></c><c r="C3" t="b"><v>1</v></c></row>
        </sheetData></worksheet>"#;
        let r = extract_table(&xlsx(sheet, Some(SHARED)), "xlsx").unwrap();
        assert_eq!(r.mode(), MODE_EXCEL);
        assert_eq!(r.meta["columns"], json!(["item_code", "qty", "rate"]));
        let rows = &r.tables[0].rows;
        assert_eq!(r.tables[0].name, "Sheet1");
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            json!({"item_code": "W1", "qty": 2, "rate": 10.5})
                .as_object()
                .cloned()
                .unwrap()
        );
        assert_eq!(rows[1]["qty"], Value::Null);
        assert_eq!(rows[1]["rate"], json!(true));
    }

    #[test]
    fn xlsx_without_shared_strings_reads_inline_text() {
        let sheet = r#"<worksheet><sheetData>
            <row><c t="inlineStr"><is><t>name</t></is></c></row>
            <row><c t="inlineStr"><is><t>Layla</t></is></c></row>
        </sheetData></worksheet>"#;
        let r = extract_table(&xlsx(sheet, None), "xlsx").unwrap();
        assert_eq!(r.tables[0].rows[0]["name"], json!("Layla"));
    }

    #[test]
    fn csv_cells_are_typed_and_blank_headers_named() {
        let data = b"item_code,qty,,qty\nW1,2,x,3\n,,,\nW2,,y,true\n";
        let r = extract_table(data, "csv").unwrap();
        assert_eq!(
            r.meta["columns"],
            json!(["item_code", "qty", "Unnamed: 2", "qty.1"])
        );
        let rows = &r.tables[0].rows;
        assert_eq!(rows.len(), 2, "blank row should be skipped");
        assert_eq!(rows[0]["qty"], json!(2));
        assert_eq!(rows[0]["Unnamed: 2"], json!("x"));
        assert_eq!(rows[1]["qty"], Value::Null);
        assert_eq!(rows[1]["qty.1"], json!(true));
    }

    #[test]
    fn csv_ragged_rows_fill_with_null() {
        let r = extract_table(b"a,b\n1\n2,3,4\n", "csv").unwrap();
        assert_eq!(r.meta["columns"], json!(["a", "b", "Unnamed: 2"]));
        let rows = &r.tables[0].rows;
        assert_eq!(rows[0]["b"], Value::Null);
        assert_eq!(rows[1]["Unnamed: 2"], json!(4));
    }

    #[test]
    fn missing_markers_become_null() {
        assert_eq!(typed_cell("N/A"), Value::Null);
        assert_eq!(typed_cell("  "), Value::Null);
        assert_eq!(typed_cell("1,200"), json!("1,200"));
        assert_eq!(typed_cell("-3"), json!(-3));
        assert_eq!(typed_cell("FALSE"), json!(false));
    }

    #[test]
    fn legacy_xls_is_a_config_error() {
        let err = extract_table(b"\xd0\xcf\x11\xe0", "xls").unwrap_err();
        match err {
            ExtractError::Config { hint, .. } => assert!(hint.contains(".xlsx")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_zip_is_a_spreadsheet_error() {
        let err = extract_table(b"not a zip", "xlsx").unwrap_err();
        assert!(matches!(err, ExtractError::Spreadsheet(_)));
    }

    #[test]
    fn column_references_decode() {
        assert_eq!(column_index(b"A1").unwrap(), Some(0));
        assert_eq!(column_index(b"C7").unwrap(), Some(2));
        assert_eq!(column_index(b"AA10").unwrap(), Some(26));
        assert_eq!(column_index(b"XFD1").unwrap(), Some(16_383));
        assert_eq!(column_index(b"12").unwrap(), None);
        assert!(column_index(b"XFE1").is_err());
        assert!(column_index(b"ZZZZZZZZZZZZZZZZ1").is_err());
    }

    #[test]
    fn out_of_range_cell_reference_is_rejected() {
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>name</t></is></c></row>
            <row r="2"><c r="ZZZZZ2" t="inlineStr"><is><t>x</t></is></c></row>
        </sheetData></worksheet>"#;
        let err = extract_table(&xlsx(sheet, None), "xlsx").unwrap_err();
        match err {
            ExtractError::Spreadsheet(msg) => assert!(msg.contains("ZZZZZ2"), "{}", msg),
            other => panic!("expected spreadsheet error, got {:?}", other),
        }
    }

    #[test]
    fn last_excel_column_is_accepted() {
        let sheet = r#"<worksheet><sheetData>
            <row><c r="A1" t="inlineStr"><is><t>a</t></is></c><c r="XFD1" t="inlineStr"><is><t>z</t></is></c></row>
            <row><c r="XFD2"><v>7</v></c></row>
        </sheetData></worksheet>"#;
        let r = extract_table(&xlsx(sheet, None), "xlsx").unwrap();
        let columns = r.meta["columns"].as_array().unwrap();
        assert_eq!(columns.len(), 16_384);
        assert_eq!(r.tables[0].rows[0]["z"], json!(7));
    }

    #[test]
    fn csv_wider_than_a_sheet_is_rejected() {
        let wide = vec!["x"; 16_385].join(",");
        let err = extract_table(wide.as_bytes(), "csv").unwrap_err();
        assert!(matches!(err, ExtractError::Spreadsheet(_)));
    }

    #[test]
    fn empty_input_has_no_columns() {
        let r = extract_table(b"", "csv").unwrap();
        assert_eq!(r.meta["columns"], json!([]));
        assert!(r.tables[0].rows.is_empty());
        assert_eq!(r.pages(), 1);
    }
}
