//! Core configuration: data-root layout, seller identity, validator assets.
//!
//! A single [`CoreConfig`] is created at process start and handed to
//! [`crate::service::CoreContext`]; the core reads it, never mutates it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Static configuration for the invoice core.
///
/// The data root follows a fixed layout:
///
/// ```text
/// <data_dir>/
///   invoices/
///     xml/<invoice-filename>.xml
///     pdf/<invoice-filename>.pdf
///   dashboard.db
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Root of all persisted state.
    pub data_dir: PathBuf,
    /// The invoicing party; single-tenant, so configuration rather than a table.
    pub seller: SellerInfo,
    /// Free string identifying the producing system (`SystemInfo` in the XML).
    pub system_info: String,
    /// The FA(3) XSD shipped alongside the deployment.
    pub schema_path: PathBuf,
    /// Optional XML catalog resolving the schema's imports offline.
    pub catalog_path: Option<PathBuf>,
}

impl CoreConfig {
    /// Config with the default schema location (`<data_dir>/schema/FA-3.xsd`).
    pub fn new(data_dir: impl Into<PathBuf>, seller: SellerInfo) -> Self {
        let data_dir = data_dir.into();
        let schema_path = data_dir.join("schema").join("FA-3.xsd");
        Self {
            data_dir,
            seller,
            system_info: concat!("fakturka ", env!("CARGO_PKG_VERSION")).to_string(),
            schema_path,
            catalog_path: None,
        }
    }

    pub fn with_schema(mut self, schema_path: impl Into<PathBuf>) -> Self {
        self.schema_path = schema_path.into();
        self
    }

    pub fn with_catalog(mut self, catalog_path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(catalog_path.into());
        self
    }

    pub fn with_system_info(mut self, system_info: impl Into<String>) -> Self {
        self.system_info = system_info.into();
        self
    }

    /// Path of the embedded database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("dashboard.db")
    }

    /// Directory for generated FA(3) XML artifacts.
    pub fn xml_dir(&self) -> PathBuf {
        self.data_dir.join("invoices").join("xml")
    }

    /// Directory for generated PDF artifacts.
    pub fn pdf_dir(&self) -> PathBuf {
        self.data_dir.join("invoices").join("pdf")
    }
}

/// Identity of the selling party, emitted as `Podmiot1` and printed on
/// the PDF. The address parts feed the single-line `AdresL1` assembly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SellerInfo {
    pub name: String,
    /// 10 digits; normalised at context construction.
    pub nip: String,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Printed on the PDF when present; never emitted in the XML.
    pub bank_account: Option<String>,
}

impl SellerInfo {
    /// The seller's single-line postal address, `None` when no part is set.
    pub fn address_line(&self) -> Option<String> {
        crate::core::single_line_address(
            self.street.as_deref(),
            self.postal_code.as_deref(),
            self.city.as_deref(),
        )
    }
}
