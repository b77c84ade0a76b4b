//! Embedded relational store.
//!
//! One SQLite database holds clients, invoices, items, and the numbering
//! sequences. The handle is process-wide and internally serialised; all
//! multi-row mutations run inside a single transaction opened by the
//! service layer. Durability comes from WAL journaling, integrity from
//! enforced foreign keys and the unique indexes on `invoices.invoice_number`,
//! `clients.nip`, and `invoice_sequences(year, month)`.

pub mod clients;
pub mod invoices;
mod schema;
pub mod sequences;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;

use crate::core::CoreResult;

/// Shared handle to the embedded database.
///
/// Cloning is cheap; all clones serialise on one connection, which is
/// what gives concurrent callers their transaction isolation.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Open (creating if missing) the database at `path`, switch it to
    /// WAL journaling, enforce foreign keys, and bootstrap the schema.
    pub fn open(path: &Path) -> CoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database with the full schema, for tests.
    pub fn open_in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure(conn: &Connection) -> CoreResult<()> {
        // journal_mode returns a row; in-memory databases answer "memory".
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        schema::init(conn)?;
        Ok(())
    }

    /// Lock the underlying connection. A poisoned lock is recovered;
    /// SQLite state is consistent regardless of a panicked sibling thread.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_keys_enforced() {
        let db = Db::open_in_memory().unwrap();
        let conn = db.lock();
        let err = conn.execute(
            "INSERT INTO invoices (invoice_number, issue_date, sale_date, client_id, created_at, updated_at)
             VALUES ('FV/2026/01/0001', '2026-01-15', '2026-01-15', 999, '2026-01-15T00:00:00Z', '2026-01-15T00:00:00Z')",
            [],
        );
        assert!(err.is_err(), "foreign keys must be enforced");
    }
}
