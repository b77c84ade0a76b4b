//! Invoice number formatting and the number-to-filename transform.
//!
//! Numbers follow `FV/YYYY/MM/NNNN`: four-digit year, zero-padded month,
//! monthly sequence zero-padded to at least four digits with no upper
//! cap. Allocation itself is transactional and lives in the persistence
//! layer; this module is the pure formatting half.

use chrono::{Datelike, NaiveDate};

use super::error::{CoreError, CoreResult};

/// Format an invoice number from its numbering bucket and sequence value.
pub fn format_invoice_number(year: i32, month: u32, seq: i64) -> String {
    format!("FV/{year}/{month:02}/{seq:04}")
}

/// Extract the numbering bucket from an issue date. Years outside
/// 2000–9999 are rejected so the formatted number keeps its shape.
pub fn year_month(issue_date: NaiveDate) -> CoreResult<(i32, u32)> {
    let year = issue_date.year();
    if !(2000..=9999).contains(&year) {
        return Err(CoreError::field(
            "issue_date",
            format!("year must be between 2000 and 9999, got {year}"),
        ));
    }
    Ok((year, issue_date.month()))
}

/// Derive the artifact filename for an invoice number.
///
/// Path separators become `-`, any run of characters outside
/// `[A-Za-z0-9._-]` collapses to a single `-`, consecutive `-` collapse,
/// and leading/trailing `.`/`_`/`-` are stripped before the extension is
/// appended. The result must be non-empty, relative, free of `..` and at
/// most 255 bytes; anything else rejects the invoice number.
pub fn invoice_filename(invoice_number: &str, extension: &str) -> CoreResult<String> {
    let mut sanitized = String::with_capacity(invoice_number.len());
    for c in invoice_number.chars() {
        let mapped = match c {
            '/' | '\\' => '-',
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => c,
            _ => '-',
        };
        if mapped == '-' && sanitized.ends_with('-') {
            continue;
        }
        sanitized.push(mapped);
    }

    let stem = sanitized.trim_matches(|c| matches!(c, '.' | '_' | '-'));
    if stem.is_empty() {
        return Err(invalid_filename(invoice_number, "empty after sanitisation"));
    }
    if stem.contains("..") {
        return Err(invalid_filename(invoice_number, "contains '..'"));
    }

    let filename = format!("{stem}.{extension}");
    if filename.len() > 255 {
        return Err(invalid_filename(invoice_number, "longer than 255 bytes"));
    }
    if std::path::Path::new(&filename).is_absolute() {
        return Err(invalid_filename(invoice_number, "absolute path"));
    }
    Ok(filename)
}

fn invalid_filename(invoice_number: &str, reason: &str) -> CoreError {
    CoreError::field(
        "invoice_number",
        format!("invalid filename derived from '{invoice_number}': {reason}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn number_format() {
        assert_eq!(format_invoice_number(2026, 1, 1), "FV/2026/01/0001");
        assert_eq!(format_invoice_number(2026, 12, 42), "FV/2026/12/0042");
        // sequence grows past four digits without truncation
        assert_eq!(format_invoice_number(2026, 3, 12345), "FV/2026/03/12345");
    }

    #[test]
    fn year_month_extraction() {
        assert_eq!(year_month(date(2026, 1, 15)).unwrap(), (2026, 1));
        assert!(year_month(date(1999, 12, 31)).is_err());
    }

    #[test]
    fn filename_from_standard_number() {
        assert_eq!(
            invoice_filename("FV/2026/01/0001", "xml").unwrap(),
            "FV-2026-01-0001.xml"
        );
        assert_eq!(
            invoice_filename("FV/2026/01/0001", "pdf").unwrap(),
            "FV-2026-01-0001.pdf"
        );
    }

    #[test]
    fn filename_sanitises_hostile_numbers() {
        assert_eq!(
            invoice_filename("..\\..\\etc/passwd", "xml").unwrap(),
            "etc-passwd.xml"
        );
        assert_eq!(invoice_filename("a//b", "xml").unwrap(), "a-b.xml");
        assert_eq!(invoice_filename("föktura nr 1", "xml").unwrap(), "f-ktura-nr-1.xml");
        assert_eq!(invoice_filename("/abs/path", "xml").unwrap(), "abs-path.xml");
    }

    #[test]
    fn filename_rejects_degenerate_numbers() {
        assert!(invoice_filename("///", "xml").is_err());
        assert!(invoice_filename("...", "xml").is_err());
        assert!(invoice_filename("", "xml").is_err());
        assert!(invoice_filename("a..b", "xml").is_err());
        assert!(invoice_filename(&"x".repeat(300), "xml").is_err());
    }

    #[test]
    fn filename_never_escapes_output_dir() {
        let base = std::path::Path::new("/data/invoices/xml");
        for number in ["FV/2026/01/0001", "..\\evil", "a/../../b", "名前/1"] {
            if let Ok(name) = invoice_filename(number, "xml") {
                let joined = base.join(&name);
                assert!(joined.starts_with(base));
                assert!(!name.contains(".."));
            }
        }
    }
}
