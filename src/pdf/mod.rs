//! PDF rendering of issued invoices.
//!
//! One fixed A4 page per invoice. Fonts are discovered through
//! [`FontResolver`] so the layout code never touches absolute paths.

mod fonts;
mod render;

pub use fonts::{FontCandidate, FontResolver};
pub use render::render_invoice_pdf;
