//! Client CRUD. Inputs arrive already normalised by the service layer.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::core::{Client, ClientPatch, CoreError, CoreResult, NewClient};

fn map_client(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get("id")?,
        name: row.get("name")?,
        nip: row.get("nip")?,
        address: row.get("address")?,
        city: row.get("city")?,
        postal_code: row.get("postal_code")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

const SELECT: &str = "SELECT id, name, nip, address, city, postal_code, email, phone,
                      created_at, updated_at FROM clients";

pub fn insert(conn: &Connection, new: &NewClient) -> CoreResult<Client> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO clients (name, nip, address, city, postal_code, email, phone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            new.name,
            new.nip,
            new.address,
            new.city,
            new.postal_code,
            new.email,
            new.phone,
            now,
        ],
    )
    .map_err(|e| friendly_nip_conflict(e, &new.nip))?;
    get(conn, conn.last_insert_rowid())
}

pub fn get(conn: &Connection, id: i64) -> CoreResult<Client> {
    conn.query_row(&format!("{SELECT} WHERE id = ?1"), params![id], map_client)
        .optional()?
        .ok_or(CoreError::NotFound {
            entity: "client",
            id,
        })
}

pub fn find_by_nip(conn: &Connection, nip: &str) -> CoreResult<Option<Client>> {
    Ok(conn
        .query_row(&format!("{SELECT} WHERE nip = ?1"), params![nip], map_client)
        .optional()?)
}

pub fn list(conn: &Connection) -> CoreResult<Vec<Client>> {
    let mut stmt = conn.prepare(&format!("{SELECT} ORDER BY name, id"))?;
    let rows = stmt.query_map([], map_client)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Merge the patch over the stored row and rewrite it.
pub fn update(conn: &Connection, id: i64, patch: &ClientPatch) -> CoreResult<Client> {
    let mut merged = get(conn, id)?;
    if let Some(name) = &patch.name {
        merged.name = name.clone();
    }
    if let Some(nip) = &patch.nip {
        merged.nip = nip.clone();
    }
    merged.address = patch.address.clone().or(merged.address);
    merged.city = patch.city.clone().or(merged.city);
    merged.postal_code = patch.postal_code.clone().or(merged.postal_code);
    merged.email = patch.email.clone().or(merged.email);
    merged.phone = patch.phone.clone().or(merged.phone);
    conn.execute(
        "UPDATE clients SET name = ?1, nip = ?2, address = ?3, city = ?4, postal_code = ?5,
         email = ?6, phone = ?7, updated_at = ?8 WHERE id = ?9",
        params![
            merged.name,
            merged.nip,
            merged.address,
            merged.city,
            merged.postal_code,
            merged.email,
            merged.phone,
            Utc::now(),
            id,
        ],
    )
    .map_err(|e| friendly_nip_conflict(e, &merged.nip))?;
    get(conn, id)
}

/// Delete a client. Rejected while any invoice still references it.
pub fn delete(conn: &Connection, id: i64) -> CoreResult<()> {
    let references: i64 = conn.query_row(
        "SELECT count(*) FROM invoices WHERE client_id = ?1",
        params![id],
        |r| r.get(0),
    )?;
    if references > 0 {
        return Err(CoreError::ReferenceInUse { entity: "client" });
    }
    let deleted = conn.execute("DELETE FROM clients WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(CoreError::NotFound {
            entity: "client",
            id,
        });
    }
    Ok(())
}

fn friendly_nip_conflict(err: rusqlite::Error, nip: &str) -> CoreError {
    match CoreError::from(err) {
        CoreError::Conflict(_) => {
            CoreError::Conflict(format!("client with NIP {nip} already exists"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;

    fn new_client(name: &str, nip: &str) -> NewClient {
        NewClient {
            name: name.into(),
            nip: nip.into(),
            ..NewClient::default()
        }
    }

    #[test]
    fn crud_round_trip() {
        let db = Db::open_in_memory().unwrap();
        let conn = db.lock();

        let created = insert(&conn, &new_client("Acme Sp. z o.o.", "1234567890")).unwrap();
        assert!(created.id > 0);

        let fetched = get(&conn, created.id).unwrap();
        assert_eq!(fetched.name, "Acme Sp. z o.o.");

        let patched = update(
            &conn,
            created.id,
            &ClientPatch {
                city: Some("Kraków".into()),
                ..ClientPatch::default()
            },
        )
        .unwrap();
        assert_eq!(patched.city.as_deref(), Some("Kraków"));
        assert_eq!(patched.name, "Acme Sp. z o.o.");

        delete(&conn, created.id).unwrap();
        assert!(matches!(
            get(&conn, created.id),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn duplicate_nip_conflicts() {
        let db = Db::open_in_memory().unwrap();
        let conn = db.lock();

        insert(&conn, &new_client("A", "1234567890")).unwrap();
        let err = insert(&conn, &new_client("B", "1234567890")).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)), "got {err:?}");
    }
}
