//! File format detection.
//!
//! Maps a declared file name and content-type onto a MIME type, a
//! lowercase extension, and the extraction branch that handles it.

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_XLS: &str = "application/vnd.ms-excel";
pub const MIME_CSV: &str = "text/csv";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// Extensions routed to tabular extraction regardless of MIME type.
pub const TABULAR_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

/// Extraction branch, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatBranch {
    Tabular,
    Pdf,
    Image,
    RawText,
}

impl FormatBranch {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatBranch::Tabular => "tabular",
            FormatBranch::Pdf => "pdf",
            FormatBranch::Image => "image",
            FormatBranch::RawText => "raw",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFormat {
    pub mime: String,
    /// Lowercase suffix after the last `.`, without the dot; empty if none.
    pub extension: String,
}

impl DetectedFormat {
    /// First matching branch wins: tabular extension, PDF, image, raw text.
    pub fn branch(&self) -> FormatBranch {
        if TABULAR_EXTENSIONS.contains(&self.extension.as_str()) {
            FormatBranch::Tabular
        } else if self.mime == MIME_PDF {
            FormatBranch::Pdf
        } else if self.mime.starts_with("image/") {
            FormatBranch::Image
        } else {
            FormatBranch::RawText
        }
    }
}

/// Detect MIME type and extension for a file.
///
/// A non-empty declared content-type wins (lowercased, parameters such as
/// `; charset=utf-8` dropped). Otherwise the MIME type is inferred from the
/// extension.
pub fn detect(name: &str, declared_content_type: &str) -> DetectedFormat {
    let extension = extension_of(name);
    let declared = declared_content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let mime = if declared.is_empty() {
        mime_for_extension(&extension).to_string()
    } else {
        declared
    };
    DetectedFormat { mime, extension }
}

pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(pos) => name[pos + 1..].to_lowercase(),
        None => String::new(),
    }
}

pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "pdf" => MIME_PDF,
        "png" => MIME_PNG,
        "jpg" | "jpeg" => MIME_JPEG,
        "xlsx" => MIME_XLSX,
        "xls" => MIME_XLS,
        "csv" => MIME_CSV,
        _ => MIME_OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_mime_from_extension_when_undeclared() {
        let cases = [
            ("a.pdf", MIME_PDF),
            ("scan.PNG", MIME_PNG),
            ("photo.jpg", MIME_JPEG),
            ("photo.JPEG", MIME_JPEG),
            ("book.xlsx", MIME_XLSX),
            ("old.xls", MIME_XLS),
            ("rows.csv", MIME_CSV),
            ("notes.txt", MIME_OCTET_STREAM),
            ("README", MIME_OCTET_STREAM),
        ];
        for (name, mime) in cases {
            assert_eq!(detect(name, "").mime, mime, "for {}", name);
        }
    }

    #[test]
    fn declared_content_type_wins_and_is_normalized() {
        let f = detect("upload.bin", "Application/PDF; charset=binary");
        assert_eq!(f.mime, MIME_PDF);
        assert_eq!(f.extension, "bin");
        assert_eq!(f.branch(), FormatBranch::Pdf);
    }

    #[test]
    fn extension_is_last_suffix_lowercased() {
        assert_eq!(extension_of("q3.report.XLSX"), "xlsx");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of("trailing."), "");
    }

    #[test]
    fn tabular_extension_beats_declared_mime() {
        let f = detect("rows.csv", "text/plain");
        assert_eq!(f.branch(), FormatBranch::Tabular);
    }

    #[test]
    fn branches_for_images_and_text() {
        assert_eq!(detect("a.png", "").branch(), FormatBranch::Image);
        assert_eq!(detect("a.txt", "text/plain").branch(), FormatBranch::RawText);
        assert_eq!(detect("a", "").branch(), FormatBranch::RawText);
    }
}
