//! Configuration listings: `intake fields` and `intake blueprints`.

use anyhow::{bail, Result};

use crate::config::Config;

pub fn list_fields(config: &Config, doctype: &str) -> Result<()> {
    let Some(schema) = config.target_schema(doctype) else {
        bail!(
            "no schema configured for '{}'; add a [schemas.\"{}\"] section",
            doctype,
            doctype
        );
    };

    println!("{:<28} {:<20} {:<18} REQUIRED", "FIELD", "TYPE", "LABEL");
    for f in schema.available_fields() {
        println!(
            "{:<28} {:<20} {:<18} {}",
            f.fieldname,
            f.fieldtype,
            f.label.as_deref().unwrap_or("-"),
            if f.reqd { "yes" } else { "" }
        );
    }
    Ok(())
}

pub fn list_blueprints(config: &Config) -> Result<()> {
    if config.blueprints.is_empty() {
        println!("No blueprints configured.");
        return Ok(());
    }

    println!(
        "{:<20} {:<20} {:<10} {:<8} {:<8} TEMPLATE",
        "BLUEPRINT", "DOCTYPE", "OCR", "LANG", "MAPPINGS"
    );
    for (name, bp) in &config.blueprints {
        println!(
            "{:<20} {:<20} {:<10} {:<8} {:<8} {}",
            name,
            bp.target_doctype,
            bp.ocr_engine.as_str(),
            bp.language_hint,
            bp.schema_fields.len(),
            bp.mapping_template.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
