//! Client operations: validation and normalisation in front of the store.

use tracing::info;

use super::context::CoreContext;
use crate::core::{
    Client, ClientPatch, CoreError, CoreResult, MAX_NAME_LEN, NewClient, normalize_nip,
    optional_text, required_text, validate_email,
};
use crate::db::clients;

pub struct ClientService<'a> {
    pub(crate) ctx: &'a CoreContext,
}

impl ClientService<'_> {
    pub fn create(&self, input: NewClient) -> CoreResult<Client> {
        let normalized = NewClient {
            name: required_text("name", &input.name, MAX_NAME_LEN)?,
            nip: normalize_nip(&input.nip)?,
            address: optional_text("address", input.address.as_deref(), MAX_NAME_LEN)?,
            city: optional_text("city", input.city.as_deref(), MAX_NAME_LEN)?,
            postal_code: optional_text("postal_code", input.postal_code.as_deref(), MAX_NAME_LEN)?,
            email: normalized_email(input.email.as_deref())?,
            phone: optional_text("phone", input.phone.as_deref(), MAX_NAME_LEN)?,
        };

        let conn = self.ctx.db.lock();
        if clients::find_by_nip(&conn, &normalized.nip)?.is_some() {
            return Err(CoreError::Conflict(format!(
                "client with NIP {} already exists",
                normalized.nip
            )));
        }
        let client = clients::insert(&conn, &normalized)?;
        info!(client_id = client.id, "client created");
        Ok(client)
    }

    pub fn get(&self, id: i64) -> CoreResult<Client> {
        clients::get(&self.ctx.db.lock(), id)
    }

    pub fn list(&self) -> CoreResult<Vec<Client>> {
        clients::list(&self.ctx.db.lock())
    }

    pub fn update(&self, id: i64, patch: ClientPatch) -> CoreResult<Client> {
        let normalized = ClientPatch {
            name: patch
                .name
                .as_deref()
                .map(|n| required_text("name", n, MAX_NAME_LEN))
                .transpose()?,
            nip: patch.nip.as_deref().map(normalize_nip).transpose()?,
            address: optional_text("address", patch.address.as_deref(), MAX_NAME_LEN)?,
            city: optional_text("city", patch.city.as_deref(), MAX_NAME_LEN)?,
            postal_code: optional_text("postal_code", patch.postal_code.as_deref(), MAX_NAME_LEN)?,
            email: normalized_email(patch.email.as_deref())?,
            phone: optional_text("phone", patch.phone.as_deref(), MAX_NAME_LEN)?,
        };

        let conn = self.ctx.db.lock();
        if let Some(nip) = &normalized.nip {
            if let Some(other) = clients::find_by_nip(&conn, nip)? {
                if other.id != id {
                    return Err(CoreError::Conflict(format!(
                        "client with NIP {nip} already exists"
                    )));
                }
            }
        }
        clients::update(&conn, id, &normalized)
    }

    /// Delete a client; rejected while invoices still reference it.
    pub fn delete(&self, id: i64) -> CoreResult<()> {
        clients::delete(&self.ctx.db.lock(), id)?;
        info!(client_id = id, "client deleted");
        Ok(())
    }
}

fn normalized_email(raw: Option<&str>) -> CoreResult<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(email) => Ok(Some(validate_email("email", email)?)),
    }
}
