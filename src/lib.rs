//! # fakturka
//!
//! Offline Polish e-invoicing core: deterministic grosze arithmetic,
//! an embedded SQLite store, transactional monthly invoice numbering,
//! an FA(3)/KSeF XML codec gated by an external XSD validator, and a
//! fixed A4 PDF renderer.
//!
//! All monetary values are non-negative `i64` amounts in grosze, never
//! floating point. Rounding is half-up. Network submission to KSeF is
//! out of scope: the core produces validated local artifacts only.
//!
//! ## Quick start
//!
//! ```no_run
//! use fakturka::{CoreConfig, CoreContext, NewClient, NewInvoice, NewInvoiceItem, SellerInfo, VatRate};
//!
//! let seller = SellerInfo {
//!     name: "Jan Kowalski IT".into(),
//!     nip: "111-111-11-11".into(),
//!     street: Some("ul. Długa 5".into()),
//!     postal_code: Some("00-238".into()),
//!     city: Some("Warszawa".into()),
//!     ..SellerInfo::default()
//! };
//! let ctx = CoreContext::new(CoreConfig::new("./data", seller))?;
//!
//! let client = ctx.clients().create(NewClient {
//!     name: "Nabywca Sp. z o.o.".into(),
//!     nip: "2222222222".into(),
//!     ..NewClient::default()
//! })?;
//!
//! let invoice = ctx.invoices().create(NewInvoice {
//!     issue_date: "2026-01-15".into(),
//!     sale_date: "2026-01-15".into(),
//!     client_id: client.id,
//!     items: vec![NewInvoiceItem {
//!         name: "Usługa programistyczna".into(),
//!         quantity: "10".into(),
//!         unit: "h".into(),
//!         unit_price_grosze: 15000,
//!         vat_rate: VatRate::Standard,
//!     }],
//!     ..NewInvoice::default()
//! })?;
//!
//! // commits the status change, then writes + validates the XML and renders the PDF
//! let issued = ctx.invoices().issue(invoice.id)?;
//! assert!(issued.xml_path.is_some() && issued.pdf_path.is_some());
//! # Ok::<(), fakturka::CoreError>(())
//! ```

pub mod config;
pub mod core;
pub mod db;
pub mod fa3;
pub mod pdf;
pub mod service;

pub use crate::config::{CoreConfig, SellerInfo};
pub use crate::core::*;
pub use crate::service::{ClientService, CoreContext, InvoiceService};
