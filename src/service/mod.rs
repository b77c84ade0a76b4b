//! Service layer: the invoice state machine and client operations,
//! wired together by a long-lived [`CoreContext`].

mod clients;
mod context;
mod invoices;

pub use clients::ClientService;
pub use context::CoreContext;
pub use invoices::InvoiceService;
