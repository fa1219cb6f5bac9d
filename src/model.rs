use std::sync::Arc;

use log::info;

use crate::core::{Params, Result};
use crate::schema::EntityType;
use crate::sql::Statement;
use crate::storage::StorageBackend;

/// The central handle tying a set of resolved entity types to one storage
/// backend.
///
/// The model owns nothing about connection lifecycle — the backend arrives
/// pooled and ready. It offers schema installation, teardown and statement
/// introspection over every registered type.
pub struct Model {
    backend: Arc<dyn StorageBackend>,
    types: Vec<Arc<EntityType>>,
}

impl Model {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            types: Vec::new(),
        }
    }

    /// Register a resolved entity type. Registration order is installation
    /// order, so referenced types must be registered before their referrers.
    pub fn register(mut self, ty: Arc<EntityType>) -> Self {
        self.types.push(ty);
        self
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    pub fn types(&self) -> &[Arc<EntityType>] {
        &self.types
    }

    pub fn entity_type(&self, name: &str) -> Option<&Arc<EntityType>> {
        self.types.iter().find(|t| t.name() == name)
    }

    /// Create every registered type's table, in registration order.
    pub async fn install(&self) -> Result<()> {
        for ty in &self.types {
            info!("installing table for '{}'", ty.name());
            ty.statements().create_table.exec(self.backend(), &Params::new()).await?;
        }
        Ok(())
    }

    /// Drop every registered type's table, in reverse registration order.
    pub async fn uninstall(&self) -> Result<()> {
        for ty in self.types.iter().rev() {
            info!("dropping table for '{}'", ty.name());
            ty.statements().drop_table.exec(self.backend(), &Params::new()).await?;
        }
        Ok(())
    }

    /// Every compiled statement template of every registered type.
    pub fn statements(&self) -> impl Iterator<Item = (&str, &'static str, &Statement)> {
        self.types
            .iter()
            .flat_map(|ty| ty.statements().iter().map(|(kind, s)| (ty.name(), kind, s)))
    }
}
