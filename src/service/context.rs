//! Long-lived core context.
//!
//! Created once at process start and passed (by reference) into the
//! services. Holds the shared database handle, the static configuration,
//! and the two injected capabilities: the external schema validator and
//! the font resolver.

use crate::config::CoreConfig;
use crate::core::{CoreResult, normalize_nip, required_text, MAX_NAME_LEN};
use crate::db::Db;
use crate::fa3::{SchemaValidator, XmllintValidator};
use crate::pdf::FontResolver;
use crate::service::{ClientService, InvoiceService};

pub struct CoreContext {
    pub db: Db,
    pub config: CoreConfig,
    pub schema_validator: Box<dyn SchemaValidator>,
    pub fonts: FontResolver,
}

impl CoreContext {
    /// Open (or create) the data root and database described by the
    /// config. The seller identity is normalised here so later stages
    /// can rely on it.
    pub fn new(config: CoreConfig) -> CoreResult<Self> {
        let mut config = config;
        config.seller.name = required_text("seller.name", &config.seller.name, MAX_NAME_LEN)?;
        config.seller.nip = normalize_nip(&config.seller.nip)?;

        let db = Db::open(&config.db_path())?;
        let schema_validator = Box::new(XmllintValidator::new(
            config.schema_path.clone(),
            config.catalog_path.clone(),
        ));
        Ok(Self {
            db,
            config,
            schema_validator,
            fonts: FontResolver::with_platform_defaults(),
        })
    }

    /// Substitute the schema-validation capability (tests, hosts with
    /// their own validator binary).
    pub fn with_validator(mut self, validator: Box<dyn SchemaValidator>) -> Self {
        self.schema_validator = validator;
        self
    }

    /// Substitute the font resolver.
    pub fn with_fonts(mut self, fonts: FontResolver) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn invoices(&self) -> InvoiceService<'_> {
        InvoiceService { ctx: self }
    }

    pub fn clients(&self) -> ClientService<'_> {
        ClientService { ctx: self }
    }
}

impl std::fmt::Debug for CoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
