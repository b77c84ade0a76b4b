//! Invoice and item persistence.
//!
//! The service layer computes amounts and validates before anything
//! lands here; these functions assume well-formed values and run inside
//! whatever transaction the caller opened. VAT rates are stored as text
//! and parsed back to [`VatRate`] on read.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::core::{
    CoreError, CoreResult, Invoice, InvoiceItem, InvoiceStatus, PaymentMethod, VatRate,
};

const SELECT_INVOICE: &str = "SELECT id, invoice_number, issue_date, sale_date, client_id,
    status, payment_method, payment_deadline, currency, exchange_rate, notes,
    subtotal_grosze, tax_grosze, total_grosze, xml_path, pdf_path, created_at, updated_at
    FROM invoices";

const SELECT_ITEMS: &str = "SELECT id, invoice_id, name, quantity, unit, unit_price_grosze,
    vat_rate, net_grosze, vat_grosze, gross_grosze, created_at
    FROM invoice_items WHERE invoice_id = ?1 ORDER BY id";

fn map_invoice(row: &Row<'_>) -> rusqlite::Result<Invoice> {
    let status_text: String = row.get("status")?;
    let method_text: String = row.get("payment_method")?;
    Ok(Invoice {
        id: row.get("id")?,
        invoice_number: row.get("invoice_number")?,
        issue_date: row.get("issue_date")?,
        sale_date: row.get("sale_date")?,
        client_id: row.get("client_id")?,
        status: InvoiceStatus::from_str(&status_text).unwrap_or(InvoiceStatus::Draft),
        payment_method: PaymentMethod::from_str(&method_text).unwrap_or(PaymentMethod::Other),
        payment_deadline: row.get("payment_deadline")?,
        currency: row.get("currency")?,
        exchange_rate: row.get("exchange_rate")?,
        notes: row.get("notes")?,
        subtotal_grosze: row.get("subtotal_grosze")?,
        tax_grosze: row.get("tax_grosze")?,
        total_grosze: row.get("total_grosze")?,
        xml_path: row.get("xml_path")?,
        pdf_path: row.get("pdf_path")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        items: Vec::new(),
    })
}

fn map_item(row: &Row<'_>) -> rusqlite::Result<InvoiceItem> {
    let rate_text: String = row.get("vat_rate")?;
    Ok(InvoiceItem {
        id: row.get("id")?,
        invoice_id: row.get("invoice_id")?,
        name: row.get("name")?,
        quantity: row.get("quantity")?,
        unit: row.get("unit")?,
        unit_price_grosze: row.get("unit_price_grosze")?,
        vat_rate: VatRate::from_db_str(&rate_text).unwrap_or(VatRate::NotSubject),
        net_grosze: row.get("net_grosze")?,
        vat_grosze: row.get("vat_grosze")?,
        gross_grosze: row.get("gross_grosze")?,
        created_at: row.get("created_at")?,
    })
}

fn load_items(conn: &Connection, invoice_id: i64) -> CoreResult<Vec<InvoiceItem>> {
    let mut stmt = conn.prepare(SELECT_ITEMS)?;
    let rows = stmt.query_map(params![invoice_id], map_item)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Insert the invoice row plus all items; returns the stored invoice.
pub fn insert(conn: &Connection, invoice: &Invoice) -> CoreResult<Invoice> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO invoices (invoice_number, issue_date, sale_date, client_id, status,
            payment_method, payment_deadline, currency, exchange_rate, notes,
            subtotal_grosze, tax_grosze, total_grosze, xml_path, pdf_path,
            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
        params![
            invoice.invoice_number,
            invoice.issue_date,
            invoice.sale_date,
            invoice.client_id,
            invoice.status.as_str(),
            invoice.payment_method.as_str(),
            invoice.payment_deadline,
            invoice.currency,
            invoice.exchange_rate,
            invoice.notes,
            invoice.subtotal_grosze,
            invoice.tax_grosze,
            invoice.total_grosze,
            invoice.xml_path,
            invoice.pdf_path,
            now,
        ],
    )
    .map_err(|e| friendly_number_conflict(e, &invoice.invoice_number))?;
    let id = conn.last_insert_rowid();
    insert_items(conn, id, &invoice.items)?;
    get(conn, id)
}

fn insert_items(conn: &Connection, invoice_id: i64, items: &[InvoiceItem]) -> CoreResult<()> {
    let now = Utc::now();
    let mut stmt = conn.prepare(
        "INSERT INTO invoice_items (invoice_id, name, quantity, unit, unit_price_grosze,
            vat_rate, net_grosze, vat_grosze, gross_grosze, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for item in items {
        stmt.execute(params![
            invoice_id,
            item.name,
            item.quantity,
            item.unit,
            item.unit_price_grosze,
            item.vat_rate.as_db_str(),
            item.net_grosze,
            item.vat_grosze,
            item.gross_grosze,
            now,
        ])?;
    }
    Ok(())
}

/// Delete and re-insert all items of an invoice.
pub fn replace_items(conn: &Connection, invoice_id: i64, items: &[InvoiceItem]) -> CoreResult<()> {
    conn.execute(
        "DELETE FROM invoice_items WHERE invoice_id = ?1",
        params![invoice_id],
    )?;
    insert_items(conn, invoice_id, items)
}

pub fn get(conn: &Connection, id: i64) -> CoreResult<Invoice> {
    let mut invoice = conn
        .query_row(
            &format!("{SELECT_INVOICE} WHERE id = ?1"),
            params![id],
            map_invoice,
        )
        .optional()?
        .ok_or(CoreError::NotFound {
            entity: "invoice",
            id,
        })?;
    invoice.items = load_items(conn, id)?;
    Ok(invoice)
}

pub fn list(conn: &Connection) -> CoreResult<Vec<Invoice>> {
    let mut stmt = conn.prepare(&format!("{SELECT_INVOICE} ORDER BY issue_date DESC, id DESC"))?;
    let rows = stmt.query_map([], map_invoice)?;
    let mut invoices = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    for invoice in &mut invoices {
        invoice.items = load_items(conn, invoice.id)?;
    }
    Ok(invoices)
}

/// True when the number is taken by an invoice other than `exclude_id`.
pub fn number_exists(
    conn: &Connection,
    invoice_number: &str,
    exclude_id: Option<i64>,
) -> CoreResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM invoices WHERE invoice_number = ?1 AND id != ?2",
        params![invoice_number, exclude_id.unwrap_or(-1)],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Rewrite the mutable columns of a draft.
pub fn update_row(conn: &Connection, invoice: &Invoice) -> CoreResult<()> {
    conn.execute(
        "UPDATE invoices SET invoice_number = ?1, issue_date = ?2, sale_date = ?3,
            client_id = ?4, status = ?5, payment_method = ?6, payment_deadline = ?7,
            currency = ?8, exchange_rate = ?9, notes = ?10,
            subtotal_grosze = ?11, tax_grosze = ?12, total_grosze = ?13, updated_at = ?14
         WHERE id = ?15",
        params![
            invoice.invoice_number,
            invoice.issue_date,
            invoice.sale_date,
            invoice.client_id,
            invoice.status.as_str(),
            invoice.payment_method.as_str(),
            invoice.payment_deadline,
            invoice.currency,
            invoice.exchange_rate,
            invoice.notes,
            invoice.subtotal_grosze,
            invoice.tax_grosze,
            invoice.total_grosze,
            Utc::now(),
            invoice.id,
        ],
    )
    .map_err(|e| friendly_number_conflict(e, &invoice.invoice_number))?;
    Ok(())
}

pub fn set_status(conn: &Connection, id: i64, status: InvoiceStatus) -> CoreResult<()> {
    conn.execute(
        "UPDATE invoices SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), Utc::now(), id],
    )?;
    Ok(())
}

pub fn set_xml_path(conn: &Connection, id: i64, path: &str) -> CoreResult<()> {
    conn.execute(
        "UPDATE invoices SET xml_path = ?1, updated_at = ?2 WHERE id = ?3",
        params![path, Utc::now(), id],
    )?;
    Ok(())
}

pub fn set_pdf_path(conn: &Connection, id: i64, path: &str) -> CoreResult<()> {
    conn.execute(
        "UPDATE invoices SET pdf_path = ?1, updated_at = ?2 WHERE id = ?3",
        params![path, Utc::now(), id],
    )?;
    Ok(())
}

/// Remove the invoice; items cascade.
pub fn delete(conn: &Connection, id: i64) -> CoreResult<()> {
    let deleted = conn.execute("DELETE FROM invoices WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(CoreError::NotFound {
            entity: "invoice",
            id,
        });
    }
    Ok(())
}

fn friendly_number_conflict(err: rusqlite::Error, number: &str) -> CoreError {
    match CoreError::from(err) {
        CoreError::Conflict(_) => {
            CoreError::Conflict(format!("invoice number {number} already in use"))
        }
        other => other,
    }
}
