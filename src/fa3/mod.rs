//! FA(3) XML generation and external schema validation.
//!
//! The codec produces the structured-invoice document consumed by the
//! national KSeF platform; upload itself is out of scope. Generation is
//! pure ([`build_invoice_xml`]), writing and gating on the external XSD
//! validator are orchestrated by the invoice service.

mod validator;
mod xml;

pub use validator::{AcceptAllValidator, SchemaValidator, XmllintValidator};
pub use xml::{FA3_NAMESPACE, build_invoice_xml};
