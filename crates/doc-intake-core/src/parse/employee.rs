//! Person-profile documents: passport, residence permit, CV summary forms.

use once_cell::sync::Lazy;
use regex::Regex;

use super::common::{find_first, label_patterns, parse_date};
use super::{DocType, DocumentParser};
use crate::models::{CanonicalRecord, TableBlock};

static FULL_NAME: Lazy<Vec<Regex>> = Lazy::new(|| {
    label_patterns(&[
        r"Name\s*[:\-]\s*(.+)",
        r"Employee\s*Name\s*[:\-]\s*(.+)",
        r"Full\s*Name\s*[:\-]\s*(.+)",
    ])
});
static NATIONALITY: Lazy<Vec<Regex>> = Lazy::new(|| label_patterns(&[r"Nationality\s*[:\-]\s*(.+)"]));
static GENDER: Lazy<Vec<Regex>> = Lazy::new(|| label_patterns(&[r"Gender\s*[:\-]\s*(Male|Female)"]));
static BIRTH_DATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    label_patterns(&[
        r"Date\s*of\s*Birth\s*[:\-]\s*([0-9/\-.]+)",
        r"DOB\s*[:\-]\s*([0-9/\-.]+)",
    ])
});
static JOINING_DATE: Lazy<Vec<Regex>> =
    Lazy::new(|| label_patterns(&[r"Joining\s*Date\s*[:\-]\s*([0-9/\-.]+)"]));
static MOBILE: Lazy<Vec<Regex>> = Lazy::new(|| {
    label_patterns(&[
        r"Mobile\s*[:\-]\s*([+0-9\s\-]{8,})",
        r"Phone\s*[:\-]\s*([+0-9\s\-]{8,})",
    ])
});
static EMAIL: Lazy<Vec<Regex>> = Lazy::new(|| {
    label_patterns(&[r"Email\s*[:\-]\s*([A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,})"])
});
static NATIONAL_ID: Lazy<Vec<Regex>> = Lazy::new(|| {
    label_patterns(&[
        r"National\s*ID\s*[:\-]\s*([0-9]{6,})",
        r"Iqama\s*No\s*[:\-]\s*([0-9]{6,})",
        r"ID\s*No\s*[:\-]\s*([0-9]{6,})",
    ])
});
static DESIGNATION: Lazy<Vec<Regex>> = Lazy::new(|| {
    label_patterns(&[
        r"Designation\s*[:\-]\s*(.+)",
        r"Job\s*Title\s*[:\-]\s*(.+)",
    ])
});

pub struct EmployeeParser;

impl DocumentParser for EmployeeParser {
    fn doc_type(&self) -> DocType {
        DocType::Employee
    }

    fn parse(&self, text: &str, _tables: &[TableBlock], _language: &str) -> CanonicalRecord {
        let mut record = CanonicalRecord::new(DocType::Employee, text);
        record.set("employee_name", find_first(&FULL_NAME, text));
        record.set("nationality", find_first(&NATIONALITY, text));
        record.set("gender", find_first(&GENDER, text));
        record.set(
            "date_of_birth",
            find_first(&BIRTH_DATE, text).and_then(|s| parse_date(&s)),
        );
        record.set(
            "date_of_joining",
            find_first(&JOINING_DATE, text).and_then(|s| parse_date(&s)),
        );
        record.set("cell_number", find_first(&MOBILE, text));
        record.set("personal_email", find_first(&EMAIL, text));
        record.set("national_id", find_first(&NATIONAL_ID, text));
        record.set("designation", find_first(&DESIGNATION, text));
        record
    }
}
