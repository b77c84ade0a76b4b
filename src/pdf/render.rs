//! Fixed A4 invoice layout.
//!
//! Single portrait page with Polish labels: centred title and number,
//! seller/buyer blocks side by side, a dates/terms block, the items
//! table, totals, optional bank account and notes, and a footer
//! disclaimer. Amounts go through [`format_money`] only, never through
//! locale formatting.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::{BuiltinFont, Color, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb};
use tracing::debug;

use super::fonts::FontResolver;
use crate::config::SellerInfo;
use crate::core::{Client, CoreError, CoreResult, Invoice, PaymentMethod, format_money};

const WIDTH: Mm = Mm(210.0);
const HEIGHT: Mm = Mm(297.0);
const MARGIN: f32 = 15.0;
const LEFT: Mm = Mm(MARGIN);
const RIGHT: Mm = Mm(210.0 - MARGIN);
const TOP: Mm = Mm(297.0 - MARGIN);

const TITLE_SIZE: f32 = 16.0;
const HEADER_SIZE: f32 = 11.0;
const TEXT_SIZE: f32 = 9.0;
const SMALL_SIZE: f32 = 7.0;
const LINE_HEIGHT: f32 = 5.0;

// items table column offsets (mm from the left page edge)
const COL_ORDINAL: Mm = Mm(15.0);
const COL_NAME: Mm = Mm(24.0);
const COL_QTY: Mm = Mm(98.0);
const COL_UNIT: Mm = Mm(114.0);
const COL_PRICE: Mm = Mm(126.0);
const COL_RATE: Mm = Mm(148.0);
const COL_NET: Mm = Mm(160.0);
const COL_GROSS: Mm = Mm(182.0);
const NAME_CUTOFF_CHARS: usize = 42;

// rough glyph advance for centring: ~0.5 em, 1 pt = 0.3528 mm
const PT_TO_MM: f32 = 0.3528;

fn pdf_err(e: printpdf::Error) -> CoreError {
    CoreError::Internal(format!("PDF generation failed: {e}"))
}

fn centered_x(text: &str, font_size: f32) -> Mm {
    let width = text.chars().count() as f32 * font_size * 0.5 * PT_TO_MM;
    Mm((WIDTH.0 - width) / 2.0)
}

fn payment_method_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "gotówka",
        PaymentMethod::BankTransfer => "przelew bankowy",
        PaymentMethod::Card => "karta",
        PaymentMethod::Other => "inna",
    }
}

fn vat_rate_label(item: &crate::core::InvoiceItem) -> String {
    match item.vat_rate.percent() {
        Some(p) => format!("{p}%"),
        None => item.vat_rate.as_db_str().to_string(),
    }
}

fn truncated(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn separator(layer: &PdfLayerReference, y: Mm) {
    let line = Line {
        points: vec![
            (Point::new(LEFT, y), false),
            (Point::new(RIGHT, y), false),
        ],
        is_closed: false,
    };
    layer.add_line(line);
}

/// Render the invoice to `out_path`. The file is created (or truncated
/// and overwritten; filenames are deterministic, so retries of a
/// cancelled write are safe) and fully written before returning.
pub fn render_invoice_pdf(
    invoice: &Invoice,
    seller: &SellerInfo,
    buyer: &Client,
    fonts: &FontResolver,
    out_path: &Path,
) -> CoreResult<()> {
    let title = format!("Faktura {}", invoice.invoice_number);
    let (doc, page, layer) = PdfDocument::new(&title, WIDTH, HEIGHT, "invoice");

    let (font, bold) = match fonts.resolve() {
        Some(candidate) => {
            debug!(font = %candidate.regular.display(), "using platform font");
            let regular = doc
                .add_external_font(File::open(&candidate.regular)?)
                .map_err(pdf_err)?;
            let bold = doc
                .add_external_font(File::open(&candidate.bold)?)
                .map_err(pdf_err)?;
            (regular, bold)
        }
        None => {
            debug!("no platform font found, falling back to builtin monospace");
            let regular = doc.add_builtin_font(BuiltinFont::Courier).map_err(pdf_err)?;
            let bold = doc
                .add_builtin_font(BuiltinFont::CourierBold)
                .map_err(pdf_err)?;
            (regular, bold)
        }
    };

    let layer = doc.get_page(page).get_layer(layer);
    layer.set_outline_color(Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None)));
    layer.set_outline_thickness(0.3);

    // title + number
    let title_text = "FAKTURA VAT";
    layer.use_text(title_text, TITLE_SIZE, centered_x(title_text, TITLE_SIZE), TOP, &bold);
    let number_y = Mm(TOP.0 - 7.0);
    layer.use_text(
        invoice.invoice_number.as_str(),
        HEADER_SIZE,
        centered_x(&invoice.invoice_number, HEADER_SIZE),
        number_y,
        &font,
    );
    separator(&layer, Mm(number_y.0 - 3.0));

    // seller and buyer blocks
    let block_top = Mm(number_y.0 - 10.0);
    let seller_lines = party_lines(
        &seller.name,
        &seller.nip,
        seller.street.as_deref(),
        seller.postal_code.as_deref(),
        seller.city.as_deref(),
        seller.email.as_deref(),
        seller.phone.as_deref(),
    );
    let buyer_lines = party_lines(
        &buyer.name,
        &buyer.nip,
        buyer.address.as_deref(),
        buyer.postal_code.as_deref(),
        buyer.city.as_deref(),
        buyer.email.as_deref(),
        buyer.phone.as_deref(),
    );
    let seller_x = LEFT;
    let buyer_x = Mm(112.0);
    layer.use_text("Sprzedawca", HEADER_SIZE, seller_x, block_top, &bold);
    layer.use_text("Nabywca", HEADER_SIZE, buyer_x, block_top, &bold);
    let mut y = block_top.0 - LINE_HEIGHT - 1.0;
    let rows = seller_lines.len().max(buyer_lines.len());
    for i in 0..rows {
        if let Some(line) = seller_lines.get(i) {
            layer.use_text(line.as_str(), TEXT_SIZE, seller_x, Mm(y), &font);
        }
        if let Some(line) = buyer_lines.get(i) {
            layer.use_text(line.as_str(), TEXT_SIZE, buyer_x, Mm(y), &font);
        }
        y -= LINE_HEIGHT;
    }

    // dates and terms
    y -= 4.0;
    let mut terms: Vec<String> = vec![
        format!("Data wystawienia: {}", invoice.issue_date),
        format!("Data sprzedaży: {}", invoice.sale_date),
    ];
    if let Some(deadline) = invoice.payment_deadline {
        terms.push(format!("Termin płatności: {deadline}"));
    }
    terms.push(format!(
        "Metoda płatności: {}",
        payment_method_label(invoice.payment_method)
    ));
    terms.push(format!("Waluta: {}", invoice.currency));
    for term in &terms {
        layer.use_text(term.as_str(), TEXT_SIZE, LEFT, Mm(y), &font);
        y -= LINE_HEIGHT;
    }

    // items table
    y -= 4.0;
    let header_y = Mm(y);
    layer.use_text("Lp.", TEXT_SIZE, COL_ORDINAL, header_y, &bold);
    layer.use_text("Nazwa", TEXT_SIZE, COL_NAME, header_y, &bold);
    layer.use_text("Ilość", TEXT_SIZE, COL_QTY, header_y, &bold);
    layer.use_text("J.m.", TEXT_SIZE, COL_UNIT, header_y, &bold);
    layer.use_text("Cena netto", TEXT_SIZE, COL_PRICE, header_y, &bold);
    layer.use_text("VAT", TEXT_SIZE, COL_RATE, header_y, &bold);
    layer.use_text("Netto", TEXT_SIZE, COL_NET, header_y, &bold);
    layer.use_text("Brutto", TEXT_SIZE, COL_GROSS, header_y, &bold);
    y -= 2.0;
    separator(&layer, Mm(y));
    y -= LINE_HEIGHT;

    for (index, item) in invoice.items.iter().enumerate() {
        let row_y = Mm(y);
        layer.use_text((index + 1).to_string(), TEXT_SIZE, COL_ORDINAL, row_y, &font);
        layer.use_text(
            truncated(&item.name, NAME_CUTOFF_CHARS),
            TEXT_SIZE,
            COL_NAME,
            row_y,
            &font,
        );
        layer.use_text(item.quantity.as_str(), TEXT_SIZE, COL_QTY, row_y, &font);
        layer.use_text(item.unit.as_str(), TEXT_SIZE, COL_UNIT, row_y, &font);
        layer.use_text(
            format_money(item.unit_price_grosze),
            TEXT_SIZE,
            COL_PRICE,
            row_y,
            &font,
        );
        layer.use_text(vat_rate_label(item), TEXT_SIZE, COL_RATE, row_y, &font);
        layer.use_text(format_money(item.net_grosze), TEXT_SIZE, COL_NET, row_y, &font);
        layer.use_text(
            format_money(item.gross_grosze),
            TEXT_SIZE,
            COL_GROSS,
            row_y,
            &font,
        );
        y -= LINE_HEIGHT;
    }
    separator(&layer, Mm(y + 2.0));

    // totals
    y -= 3.0;
    let totals = [
        ("Razem netto:", invoice.subtotal_grosze, &font),
        ("Suma VAT:", invoice.tax_grosze, &font),
        ("Razem brutto:", invoice.total_grosze, &bold),
    ];
    for (label, grosze, face) in totals {
        layer.use_text(label, TEXT_SIZE, Mm(140.0), Mm(y), face);
        layer.use_text(
            format!("{} {}", format_money(grosze), invoice.currency),
            TEXT_SIZE,
            Mm(170.0),
            Mm(y),
            face,
        );
        y -= LINE_HEIGHT;
    }

    // bank account and notes
    y -= 4.0;
    if let Some(account) = &seller.bank_account {
        layer.use_text(
            format!("Konto bankowe: {account}"),
            TEXT_SIZE,
            LEFT,
            Mm(y),
            &font,
        );
        y -= LINE_HEIGHT;
    }
    if let Some(notes) = &invoice.notes {
        layer.use_text("Uwagi:", TEXT_SIZE, LEFT, Mm(y), &bold);
        y -= LINE_HEIGHT;
        for line in notes.lines() {
            layer.use_text(line, TEXT_SIZE, LEFT, Mm(y), &font);
            y -= LINE_HEIGHT;
        }
    }

    // footer
    let footer = "Dokument wygenerowany elektronicznie, nie wymaga podpisu.";
    layer.use_text(
        footer,
        SMALL_SIZE,
        centered_x(footer, SMALL_SIZE),
        Mm(MARGIN),
        &font,
    );

    let file = File::create(out_path)?;
    doc.save(&mut BufWriter::new(file)).map_err(pdf_err)?;
    debug!(path = %out_path.display(), "invoice PDF written");
    Ok(())
}

fn party_lines(
    name: &str,
    nip: &str,
    street: Option<&str>,
    postal_code: Option<&str>,
    city: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
) -> Vec<String> {
    let mut lines = vec![name.to_string(), format!("NIP: {nip}")];
    if let Some(street) = street {
        lines.push(street.to_string());
    }
    match (postal_code, city) {
        (Some(p), Some(c)) => lines.push(format!("{p} {c}")),
        (Some(p), None) => lines.push(p.to_string()),
        (None, Some(c)) => lines.push(c.to_string()),
        (None, None) => {}
    }
    if let Some(email) = email {
        lines.push(email.to_string());
    }
    if let Some(phone) = phone {
        lines.push(format!("tel. {phone}"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_lines_skip_missing_parts() {
        let lines = party_lines("Acme", "1234567890", None, None, Some("Warszawa"), None, None);
        assert_eq!(lines, vec!["Acme", "NIP: 1234567890", "Warszawa"]);
    }

    #[test]
    fn truncation_is_char_aware() {
        assert_eq!(truncated("krótka", 42), "krótka");
        let long = "ł".repeat(50);
        let cut = truncated(&long, 10);
        assert!(cut.chars().count() <= 10);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn payment_labels() {
        assert_eq!(payment_method_label(PaymentMethod::Cash), "gotówka");
        assert_eq!(
            payment_method_label(PaymentMethod::BankTransfer),
            "przelew bankowy"
        );
    }
}
