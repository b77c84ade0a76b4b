use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Polish VAT rate tag carried by each invoice line.
///
/// Numeric percentages plus the two alphabetic markers: "ZW" (exempt)
/// and "NP" (not subject to tax). Stored as text in the database so both
/// shapes share one column; readers parse back via [`VatRate::from_db_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VatRate {
    /// 23% — standard rate.
    Standard,
    /// 8% — reduced rate.
    Reduced8,
    /// 5% — reduced rate.
    Reduced5,
    /// 0% — zero-rated domestic supply.
    Zero,
    /// "ZW" — exempt (zwolnione).
    Exempt,
    /// "NP" — not subject to tax (nie podlega).
    NotSubject,
}

impl VatRate {
    /// Percentage for numeric rates; `None` for ZW/NP.
    pub fn percent(&self) -> Option<u32> {
        match self {
            Self::Standard => Some(23),
            Self::Reduced8 => Some(8),
            Self::Reduced5 => Some(5),
            Self::Zero => Some(0),
            Self::Exempt | Self::NotSubject => None,
        }
    }

    /// Canonical database text.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Standard => "23",
            Self::Reduced8 => "8",
            Self::Reduced5 => "5",
            Self::Zero => "0",
            Self::Exempt => "ZW",
            Self::NotSubject => "NP",
        }
    }

    /// Parse the database text back to the tag.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "23" => Some(Self::Standard),
            "8" => Some(Self::Reduced8),
            "5" => Some(Self::Reduced5),
            "0" => Some(Self::Zero),
            "ZW" => Some(Self::Exempt),
            "NP" => Some(Self::NotSubject),
            _ => None,
        }
    }

    /// FA(3) `P_12` line-level tax tag.
    pub fn p12_code(&self) -> &'static str {
        match self {
            Self::Standard => "23",
            Self::Reduced8 => "8",
            Self::Reduced5 => "5",
            Self::Zero => "0 KR",
            Self::Exempt => "zw",
            Self::NotSubject => "np I",
        }
    }
}

impl std::fmt::Display for VatRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Invoice lifecycle status. Draft is the initial state; issued is
/// terminal for editing; cancelled is reserved and never entered
/// automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Issued => "issued",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "issued" => Some(Self::Issued),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Payment method enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::Card => "card",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(Self::Cash),
            "bank_transfer" => Some(Self::BankTransfer),
            "card" => Some(Self::Card),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        Self::BankTransfer
    }
}

/// A buyer on file. The tax number (NIP) is unique across all clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    /// Legal name, trimmed, non-empty.
    pub name: String,
    /// Exactly 10 decimal digits after normalisation.
    pub nip: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub nip: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Field-by-field client update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub nip: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// An invoice as persisted, items included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    /// Human identifier, `FV/YYYY/MM/NNNN`, unique across all invoices.
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub sale_date: NaiveDate,
    pub client_id: i64,
    pub status: InvoiceStatus,
    pub payment_method: PaymentMethod,
    pub payment_deadline: Option<NaiveDate>,
    /// 3–8 characters, typically "PLN".
    pub currency: String,
    /// Informational only; all tax arithmetic stays in grosze.
    pub exchange_rate: Option<f64>,
    pub notes: Option<String>,
    pub subtotal_grosze: i64,
    pub tax_grosze: i64,
    pub total_grosze: i64,
    /// Absolute path, set only after a successful write plus schema validation.
    pub xml_path: Option<String>,
    /// Absolute path, set only after a successful write.
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<InvoiceItem>,
}

/// A single invoice line as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub name: String,
    /// Canonical decimal string, up to 3 fractional digits.
    pub quantity: String,
    /// Free short unit text, e.g. "h", "szt".
    pub unit: String,
    pub unit_price_grosze: i64,
    pub vat_rate: VatRate,
    pub net_grosze: i64,
    pub vat_grosze: i64,
    pub gross_grosze: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating an invoice. Dates arrive as `YYYY-MM-DD` strings
/// and are validated by the service before anything touches the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInvoice {
    /// Explicit number bypasses the monthly sequence (uniqueness still enforced).
    pub invoice_number: Option<String>,
    pub issue_date: String,
    pub sale_date: String,
    pub client_id: i64,
    /// Defaults to draft.
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub payment_deadline: Option<String>,
    /// Defaults to "PLN".
    pub currency: Option<String>,
    pub exchange_rate: Option<f64>,
    pub notes: Option<String>,
    pub items: Vec<NewInvoiceItem>,
}

/// Input for a single invoice line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoiceItem {
    pub name: String,
    /// Decimal string, `,` or `.` separator, up to 3 fractional digits.
    pub quantity: String,
    pub unit: String,
    pub unit_price_grosze: i64,
    pub vat_rate: VatRate,
}

/// Draft update; `None` leaves the field unchanged. When `items` is
/// present the existing lines are wholly replaced in the same transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceUpdate {
    pub invoice_number: Option<String>,
    pub issue_date: Option<String>,
    pub sale_date: Option<String>,
    pub client_id: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_deadline: Option<String>,
    pub currency: Option<String>,
    pub exchange_rate: Option<f64>,
    pub notes: Option<String>,
    pub items: Option<Vec<NewInvoiceItem>>,
}

/// Monthly numbering bucket. `(year, month)` is unique; `last_number`
/// only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSequence {
    pub id: i64,
    pub year: i32,
    pub month: u32,
    pub last_number: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Assemble the single-line postal address used by both the FA(3)
/// `AdresL1` element and the PDF party blocks: `"<street>, <postal> <city>"`
/// with empty parts elided. Returns `None` when every part is empty.
pub fn single_line_address(
    street: Option<&str>,
    postal_code: Option<&str>,
    city: Option<&str>,
) -> Option<String> {
    let street = street.map(str::trim).filter(|s| !s.is_empty());
    let postal_city = {
        let postal = postal_code.map(str::trim).filter(|s| !s.is_empty());
        let city = city.map(str::trim).filter(|s| !s.is_empty());
        match (postal, city) {
            (Some(p), Some(c)) => Some(format!("{p} {c}")),
            (Some(p), None) => Some(p.to_string()),
            (None, Some(c)) => Some(c.to_string()),
            (None, None) => None,
        }
    };
    match (street, postal_city) {
        (Some(s), Some(pc)) => Some(format!("{s}, {pc}")),
        (Some(s), None) => Some(s.to_string()),
        (None, Some(pc)) => Some(pc),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vat_rate_db_round_trip() {
        for rate in [
            VatRate::Standard,
            VatRate::Reduced8,
            VatRate::Reduced5,
            VatRate::Zero,
            VatRate::Exempt,
            VatRate::NotSubject,
        ] {
            assert_eq!(VatRate::from_db_str(rate.as_db_str()), Some(rate));
        }
        assert_eq!(VatRate::from_db_str("19"), None);
    }

    #[test]
    fn p12_mapping() {
        assert_eq!(VatRate::Standard.p12_code(), "23");
        assert_eq!(VatRate::Zero.p12_code(), "0 KR");
        assert_eq!(VatRate::Exempt.p12_code(), "zw");
        assert_eq!(VatRate::NotSubject.p12_code(), "np I");
    }

    #[test]
    fn address_line_elides_empty_parts() {
        assert_eq!(
            single_line_address(Some("ul. Prosta 1"), Some("00-001"), Some("Warszawa")),
            Some("ul. Prosta 1, 00-001 Warszawa".to_string())
        );
        assert_eq!(
            single_line_address(None, Some("00-001"), Some("Warszawa")),
            Some("00-001 Warszawa".to_string())
        );
        assert_eq!(
            single_line_address(Some("ul. Prosta 1"), None, None),
            Some("ul. Prosta 1".to_string())
        );
        assert_eq!(single_line_address(Some("  "), None, Some("")), None);
    }
}
