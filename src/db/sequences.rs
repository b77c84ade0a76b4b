//! Atomic monthly sequence allocation.
//!
//! One row per `(year, month)` bucket; allocation is a single upsert
//! that increments and returns the new value, so two concurrent
//! creations in the same month serialise at the unique index. Gaps are
//! permitted: a rolled-back creation consumes its number, which is
//! preferable to ever reusing one.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::core::CoreResult;

/// Increment and return the sequence value for the bucket, creating the
/// row on first use. Must run inside the caller's write transaction so
/// the bump commits or rolls back together with the invoice insert.
pub fn allocate(conn: &Connection, year: i32, month: u32) -> CoreResult<i64> {
    let now = Utc::now();
    let value: i64 = conn.query_row(
        "INSERT INTO invoice_sequences (year, month, last_number, created_at, updated_at)
         VALUES (?1, ?2, 1, ?3, ?3)
         ON CONFLICT(year, month)
         DO UPDATE SET last_number = last_number + 1, updated_at = ?3
         RETURNING last_number",
        params![year, month, now],
        |r| r.get(0),
    )?;
    debug!(year, month, value, "allocated invoice sequence number");
    Ok(value)
}

/// Current `last_number` for a bucket, 0 when no row exists yet.
pub fn last_number(conn: &Connection, year: i32, month: u32) -> CoreResult<i64> {
    let value: Option<i64> = conn
        .query_row(
            "SELECT last_number FROM invoice_sequences WHERE year = ?1 AND month = ?2",
            params![year, month],
            |r| r.get(0),
        )
        .optional()?;
    Ok(value.unwrap_or(0))
}
