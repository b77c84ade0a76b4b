//! Input normalisation and format checks.
//!
//! Everything here is format-level: NIP digit count (no checksum),
//! strict `YYYY-MM-DD` dates, currency shape, required/optional text
//! with length caps, and a basic email shape check.

use chrono::NaiveDate;

use super::error::{CoreError, CoreResult};

/// Maximum length for names (client, item) and unit/notes fields; keeps
/// the XML and PDF layouts predictable.
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_UNIT_LEN: usize = 32;
pub const MAX_NOTES_LEN: usize = 2000;

/// Normalise a NIP: strip every non-digit, require exactly 10 digits.
///
/// Checksum verification is deliberately not performed.
pub fn normalize_nip(raw: &str) -> CoreResult<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 10 {
        return Err(CoreError::field(
            "nip",
            format!("must contain exactly 10 digits, got {}", digits.len()),
        ));
    }
    Ok(digits)
}

/// Parse a strict `YYYY-MM-DD` date. Rejects non-padded or otherwise
/// reshaped inputs that chrono's lenient parser would accept.
pub fn parse_date(field: &str, value: &str) -> CoreResult<NaiveDate> {
    let bytes = value.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shape_ok {
        return Err(CoreError::field(
            field,
            format!("must be a YYYY-MM-DD date, got '{value}'"),
        ));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| CoreError::field(field, format!("not a valid calendar date: '{value}'")))
}

/// Currency code: 3–8 characters, no whitespace. Not otherwise parsed.
pub fn validate_currency(raw: &str) -> CoreResult<String> {
    let code = raw.trim();
    if code.len() < 3 || code.len() > 8 || code.chars().any(char::is_whitespace) {
        return Err(CoreError::field(
            "currency",
            format!("must be 3-8 characters without whitespace, got '{raw}'"),
        ));
    }
    Ok(code.to_string())
}

/// Trim and require a non-empty value bounded by `max` bytes.
pub fn required_text(field: &str, value: &str, max: usize) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::field(field, "must not be empty"));
    }
    if trimmed.len() > max {
        return Err(CoreError::field(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional value; empty collapses to `None`.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> CoreResult<Option<String>> {
    match value.map(str::trim) {
        None => Ok(None),
        Some("") => Ok(None),
        Some(trimmed) => {
            if trimmed.len() > max {
                return Err(CoreError::field(
                    field,
                    format!("must be at most {max} characters"),
                ));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

/// Standard email shape: exactly one `@`, non-empty local part, domain
/// with a dot that is neither first nor last.
pub fn validate_email(field: &str, raw: &str) -> CoreResult<String> {
    let email = raw.trim();
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    let valid = !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);
    if !valid {
        return Err(CoreError::field(
            field,
            format!("'{raw}' is not a valid email address"),
        ));
    }
    Ok(email.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nip_strips_separators() {
        assert_eq!(normalize_nip("123-456-78-90").unwrap(), "1234567890");
        assert_eq!(normalize_nip("PL 1234567890").unwrap(), "1234567890");
        assert!(normalize_nip("123456789").is_err());
        assert!(normalize_nip("12345678901").is_err());
    }

    #[test]
    fn date_shape_is_strict() {
        assert!(parse_date("issue_date", "2026-01-15").is_ok());
        for bad in ["2026-1-15", "15-01-2026", "2026/01/15", "2026-13-01", ""] {
            assert!(parse_date("issue_date", bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn currency_bounds() {
        assert_eq!(validate_currency(" PLN ").unwrap(), "PLN");
        assert_eq!(validate_currency("USDT-ERC").unwrap(), "USDT-ERC");
        assert!(validate_currency("ZL").is_err());
        assert!(validate_currency("VERYLONGCODE").is_err());
        assert!(validate_currency("P N").is_err());
    }

    #[test]
    fn text_rules() {
        assert_eq!(required_text("name", "  Acme  ", 255).unwrap(), "Acme");
        assert!(required_text("name", "   ", 255).is_err());
        assert!(required_text("unit", &"x".repeat(33), 32).is_err());
        assert_eq!(optional_text("notes", Some("  "), 2000).unwrap(), None);
        assert_eq!(
            optional_text("notes", Some(" hi "), 2000).unwrap().as_deref(),
            Some("hi")
        );
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("email", "jan@firma.pl").is_ok());
        for bad in ["jan", "@firma.pl", "jan@", "jan@firma", "a b@c.pl", "a@b@c.pl"] {
            assert!(validate_email("email", bad).is_err(), "accepted {bad:?}");
        }
    }
}
