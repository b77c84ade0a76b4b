//! Self-creating, idempotent schema.
//!
//! Every statement is `IF NOT EXISTS`; running the bootstrap against an
//! existing database is a no-op. Migrations are add-if-missing only.

use rusqlite::Connection;

use crate::core::CoreResult;

const DDL: &str = "
CREATE TABLE IF NOT EXISTS clients (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,
    nip          TEXT NOT NULL UNIQUE,
    address      TEXT,
    city         TEXT,
    postal_code  TEXT,
    email        TEXT,
    phone        TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS invoices (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_number   TEXT NOT NULL UNIQUE,
    issue_date       TEXT NOT NULL,
    sale_date        TEXT NOT NULL,
    client_id        INTEGER NOT NULL REFERENCES clients(id) ON DELETE RESTRICT,
    status           TEXT NOT NULL DEFAULT 'draft',
    payment_method   TEXT NOT NULL DEFAULT 'bank_transfer',
    payment_deadline TEXT,
    currency         TEXT NOT NULL DEFAULT 'PLN',
    exchange_rate    REAL,
    notes            TEXT,
    subtotal_grosze  INTEGER NOT NULL DEFAULT 0,
    tax_grosze       INTEGER NOT NULL DEFAULT 0,
    total_grosze     INTEGER NOT NULL DEFAULT 0,
    xml_path         TEXT,
    pdf_path         TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_invoices_issue_date ON invoices(issue_date);
CREATE INDEX IF NOT EXISTS idx_invoices_number     ON invoices(invoice_number);
CREATE INDEX IF NOT EXISTS idx_invoices_client     ON invoices(client_id);

CREATE TABLE IF NOT EXISTS invoice_items (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id        INTEGER NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    name              TEXT NOT NULL,
    quantity          TEXT NOT NULL,
    unit              TEXT NOT NULL,
    unit_price_grosze INTEGER NOT NULL,
    vat_rate          TEXT NOT NULL,
    net_grosze        INTEGER NOT NULL,
    vat_grosze        INTEGER NOT NULL,
    gross_grosze      INTEGER NOT NULL,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_invoice_items_invoice ON invoice_items(invoice_id);

CREATE TABLE IF NOT EXISTS invoice_sequences (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    year        INTEGER NOT NULL,
    month       INTEGER NOT NULL,
    last_number INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE(year, month)
);
";

/// Create all tables and indexes that do not exist yet.
pub fn init(conn: &Connection) -> CoreResult<()> {
    conn.execute_batch(DDL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();
        init(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('clients', 'invoices', 'invoice_items', 'invoice_sequences')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
    }
}
