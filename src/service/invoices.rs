//! Invoice lifecycle orchestration.
//!
//! Creation and update are single database transactions; issuance
//! commits the status change first and generates artifacts afterwards,
//! so a failure between the steps leaves a self-healing state: calling
//! [`InvoiceService::issue`] again regenerates only what is missing.

use std::fs;
use std::path::Path;

use chrono::Utc;
use rusqlite::TransactionBehavior;
use tracing::{info, warn};

use super::context::CoreContext;
use crate::core::{
    Client, CoreError, CoreResult, Invoice, InvoiceItem, InvoiceStatus, InvoiceUpdate,
    LineAmounts, MAX_NAME_LEN, MAX_NOTES_LEN, MAX_UNIT_LEN, NewInvoice, NewInvoiceItem,
    format_invoice_number, invoice_filename, invoice_totals, line_amounts, normalise_quantity,
    optional_text, parse_date, parse_quantity, required_text, validate_currency, year_month,
};
use crate::db::{clients, invoices, sequences};
use crate::fa3;
use crate::pdf;

pub struct InvoiceService<'a> {
    pub(crate) ctx: &'a CoreContext,
}

impl InvoiceService<'_> {
    /// Create an invoice (draft unless the payload requests otherwise).
    ///
    /// Validates all fields, computes line amounts and totals, allocates
    /// or accepts the invoice number, and writes the invoice, its items,
    /// and the sequence bump in one transaction.
    pub fn create(&self, input: NewInvoice) -> CoreResult<Invoice> {
        let issue_date = parse_date("issue_date", &input.issue_date)?;
        let sale_date = parse_date("sale_date", &input.sale_date)?;
        let payment_deadline = input
            .payment_deadline
            .as_deref()
            .map(|d| parse_date("payment_deadline", d))
            .transpose()?;
        let currency = validate_currency(input.currency.as_deref().unwrap_or("PLN"))?;
        let notes = optional_text("notes", input.notes.as_deref(), MAX_NOTES_LEN)?;
        let items = build_items(&input.items)?;
        let totals = invoice_totals(&amounts_of(&items))?;

        let mut conn = self.ctx.db.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        clients::get(&tx, input.client_id)?;

        let invoice_number = match input.invoice_number.as_deref() {
            Some(explicit) => {
                let number = explicit.trim();
                if number.is_empty() {
                    return Err(CoreError::field("invoice_number", "must not be empty"));
                }
                if invoices::number_exists(&tx, number, None)? {
                    return Err(CoreError::Conflict(format!(
                        "invoice number {number} already in use"
                    )));
                }
                number.to_string()
            }
            None => {
                let (year, month) = year_month(issue_date)?;
                let seq = sequences::allocate(&tx, year, month)?;
                let number = format_invoice_number(year, month, seq);
                // the sequence owns the number space; a collision here
                // means someone inserted a manual number into it
                if invoices::number_exists(&tx, &number, None)? {
                    return Err(CoreError::Conflict(format!(
                        "allocated invoice number {number} collides with an existing invoice"
                    )));
                }
                number
            }
        };

        let now = Utc::now();
        let invoice = Invoice {
            id: 0,
            invoice_number,
            issue_date,
            sale_date,
            client_id: input.client_id,
            status: input.status.unwrap_or(InvoiceStatus::Draft),
            payment_method: input.payment_method,
            payment_deadline,
            currency,
            exchange_rate: input.exchange_rate,
            notes,
            subtotal_grosze: totals.subtotal_grosze,
            tax_grosze: totals.tax_grosze,
            total_grosze: totals.total_grosze,
            xml_path: None,
            pdf_path: None,
            created_at: now,
            updated_at: now,
            items,
        };
        let stored = invoices::insert(&tx, &invoice)?;
        tx.commit()?;

        info!(
            invoice = %stored.invoice_number,
            total = stored.total_grosze,
            "invoice created"
        );
        Ok(stored)
    }

    pub fn get(&self, id: i64) -> CoreResult<Invoice> {
        invoices::get(&self.ctx.db.lock(), id)
    }

    pub fn list(&self) -> CoreResult<Vec<Invoice>> {
        invoices::list(&self.ctx.db.lock())
    }

    /// Update a draft: merge non-null fields, replace items when given,
    /// recompute totals, rewrite the row, all in one transaction.
    pub fn update(&self, id: i64, patch: InvoiceUpdate) -> CoreResult<Invoice> {
        let mut conn = self.ctx.db.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = invoices::get(&tx, id)?;
        if existing.status != InvoiceStatus::Draft {
            return Err(CoreError::Conflict(format!(
                "invoice {} is {} and can no longer be modified",
                existing.invoice_number,
                existing.status.as_str()
            )));
        }

        let invoice_number = match patch.invoice_number.as_deref() {
            Some(number) => {
                let number = number.trim();
                if number.is_empty() {
                    return Err(CoreError::field("invoice_number", "must not be empty"));
                }
                if number != existing.invoice_number
                    && invoices::number_exists(&tx, number, Some(id))?
                {
                    return Err(CoreError::Conflict(format!(
                        "invoice number {number} already in use"
                    )));
                }
                number.to_string()
            }
            None => existing.invoice_number.clone(),
        };

        let issue_date = patch
            .issue_date
            .as_deref()
            .map(|d| parse_date("issue_date", d))
            .transpose()?
            .unwrap_or(existing.issue_date);
        let sale_date = patch
            .sale_date
            .as_deref()
            .map(|d| parse_date("sale_date", d))
            .transpose()?
            .unwrap_or(existing.sale_date);
        let payment_deadline = patch
            .payment_deadline
            .as_deref()
            .map(|d| parse_date("payment_deadline", d))
            .transpose()?
            .or(existing.payment_deadline);
        let currency = match patch.currency.as_deref() {
            Some(c) => validate_currency(c)?,
            None => existing.currency.clone(),
        };
        let notes = optional_text("notes", patch.notes.as_deref(), MAX_NOTES_LEN)?
            .or_else(|| existing.notes.clone());

        let client_id = patch.client_id.unwrap_or(existing.client_id);
        clients::get(&tx, client_id)?;

        let (items, items_replaced) = match &patch.items {
            Some(inputs) => (build_items(inputs)?, true),
            None => (existing.items.clone(), false),
        };
        let totals = invoice_totals(&amounts_of(&items))?;

        let updated = Invoice {
            invoice_number,
            issue_date,
            sale_date,
            client_id,
            payment_method: patch.payment_method.unwrap_or(existing.payment_method),
            payment_deadline,
            currency,
            exchange_rate: patch.exchange_rate.or(existing.exchange_rate),
            notes,
            subtotal_grosze: totals.subtotal_grosze,
            tax_grosze: totals.tax_grosze,
            total_grosze: totals.total_grosze,
            items: Vec::new(),
            ..existing
        };
        invoices::update_row(&tx, &updated)?;
        if items_replaced {
            invoices::replace_items(&tx, id, &items)?;
        }
        let stored = invoices::get(&tx, id)?;
        tx.commit()?;

        info!(invoice = %stored.invoice_number, "invoice updated");
        Ok(stored)
    }

    /// Issue an invoice: commit the status transition, then generate the
    /// XML (write, externally validate, record path) and the PDF (write,
    /// record path), in that order. Idempotent: re-issuing regenerates
    /// only missing artifacts and never touches the number or status.
    pub fn issue(&self, id: i64) -> CoreResult<Invoice> {
        {
            let mut conn = self.ctx.db.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let invoice = invoices::get(&tx, id)?;
            match invoice.status {
                InvoiceStatus::Issued => {}
                InvoiceStatus::Draft => {
                    invoices::set_status(&tx, id, InvoiceStatus::Issued)?;
                    info!(invoice = %invoice.invoice_number, "invoice issued");
                }
                InvoiceStatus::Cancelled => {
                    return Err(CoreError::Conflict(format!(
                        "invoice {} is cancelled and cannot be issued",
                        invoice.invoice_number
                    )));
                }
            }
            tx.commit()?;
        }
        self.ensure_artifacts(id)
    }

    /// Delete an invoice; items cascade. Guarding issued invoices
    /// against deletion is the boundary's responsibility.
    pub fn delete(&self, id: i64) -> CoreResult<()> {
        invoices::delete(&self.ctx.db.lock(), id)?;
        info!(invoice_id = id, "invoice deleted");
        Ok(())
    }

    fn ensure_artifacts(&self, id: i64) -> CoreResult<Invoice> {
        let (invoice, buyer) = {
            let conn = self.ctx.db.lock();
            let invoice = invoices::get(&conn, id)?;
            let buyer = clients::get(&conn, invoice.client_id)?;
            (invoice, buyer)
        };

        if artifact_missing(invoice.xml_path.as_deref()) {
            if invoice.xml_path.is_some() {
                warn!(invoice = %invoice.invoice_number, "recorded XML artifact missing, regenerating");
            }
            let path = self.write_xml(&invoice, &buyer)?;
            invoices::set_xml_path(&self.ctx.db.lock(), id, &path)?;
        }

        if artifact_missing(invoice.pdf_path.as_deref()) {
            if invoice.pdf_path.is_some() {
                warn!(invoice = %invoice.invoice_number, "recorded PDF artifact missing, regenerating");
            }
            let path = self.write_pdf(&invoice, &buyer)?;
            invoices::set_pdf_path(&self.ctx.db.lock(), id, &path)?;
        }

        invoices::get(&self.ctx.db.lock(), id)
    }

    fn write_xml(&self, invoice: &Invoice, buyer: &Client) -> CoreResult<String> {
        let dir = self.ctx.config.xml_dir();
        fs::create_dir_all(&dir)?;
        let filename = invoice_filename(&invoice.invoice_number, "xml")?;
        let path = dir.join(filename);

        let xml = fa3::build_invoice_xml(
            invoice,
            &self.ctx.config.seller,
            buyer,
            Utc::now(),
            &self.ctx.config.system_info,
        )?;
        fs::write(&path, xml.as_bytes())?;
        self.ctx.schema_validator.validate(&path)?;

        let absolute = path.canonicalize()?;
        info!(path = %absolute.display(), "FA(3) XML written and validated");
        Ok(absolute.to_string_lossy().into_owned())
    }

    fn write_pdf(&self, invoice: &Invoice, buyer: &Client) -> CoreResult<String> {
        let dir = self.ctx.config.pdf_dir();
        fs::create_dir_all(&dir)?;
        let filename = invoice_filename(&invoice.invoice_number, "pdf")?;
        let path = dir.join(filename);

        pdf::render_invoice_pdf(invoice, &self.ctx.config.seller, buyer, &self.ctx.fonts, &path)?;

        let absolute = path.canonicalize()?;
        info!(path = %absolute.display(), "invoice PDF written");
        Ok(absolute.to_string_lossy().into_owned())
    }
}

fn artifact_missing(path: Option<&str>) -> bool {
    match path {
        Some(p) => !Path::new(p).is_file(),
        None => true,
    }
}

fn amounts_of(items: &[InvoiceItem]) -> Vec<LineAmounts> {
    items
        .iter()
        .map(|item| LineAmounts {
            net_grosze: item.net_grosze,
            vat_grosze: item.vat_grosze,
            gross_grosze: item.gross_grosze,
        })
        .collect()
}

/// Validate item inputs and compute their amounts.
fn build_items(inputs: &[NewInvoiceItem]) -> CoreResult<Vec<InvoiceItem>> {
    if inputs.is_empty() {
        return Err(CoreError::validation("invoice must have at least one item"));
    }
    let now = Utc::now();
    let mut items = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let name = required_text(&format!("items[{index}].name"), &input.name, MAX_NAME_LEN)?;
        let unit = required_text(&format!("items[{index}].unit"), &input.unit, MAX_UNIT_LEN)?;
        let quantity = normalise_quantity(&input.quantity)?;
        let quantity_milli = parse_quantity(&input.quantity)?;
        let amounts = line_amounts(input.unit_price_grosze, quantity_milli, input.vat_rate)?;
        items.push(InvoiceItem {
            id: 0,
            invoice_id: 0,
            name,
            quantity,
            unit,
            unit_price_grosze: input.unit_price_grosze,
            vat_rate: input.vat_rate,
            net_grosze: amounts.net_grosze,
            vat_grosze: amounts.vat_grosze,
            gross_grosze: amounts.gross_grosze,
            created_at: now,
        });
    }
    Ok(items)
}
