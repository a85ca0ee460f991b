//! `db_storage` extension factory.

use tokio_util::sync::CancellationToken;

use crate::component::{
    Component, ComponentError, ComponentId, ComponentKind, ComponentType, CreateSettings, Factory,
    StabilityLevel,
};
use crate::config::ConfigSchema;

use super::config::{DbStorageConfig, TYPE_STR};
use super::extension::DbStorage;

/// Factory for the database storage extension.
#[derive(Debug, Clone)]
pub struct DbStorageFactory {
    component_type: ComponentType,
    schema: ConfigSchema,
}

impl DbStorageFactory {
    /// Create a factory for the `db_storage` type.
    pub fn new() -> Self {
        Self {
            component_type: ComponentType::from_static(TYPE_STR),
            schema: DbStorageConfig::schema(),
        }
    }
}

impl Default for DbStorageFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Factory for DbStorageFactory {
    type Config = DbStorageConfig;

    fn kind(&self) -> ComponentKind {
        ComponentKind::Extension
    }

    fn component_type(&self) -> &ComponentType {
        &self.component_type
    }

    fn stability(&self) -> StabilityLevel {
        StabilityLevel::Alpha
    }

    fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    fn create_default_config(&self) -> DbStorageConfig {
        DbStorageConfig {
            settings: crate::component::ComponentSettings::new(ComponentId::new(
                self.component_type.clone(),
            )),
            ..DbStorageConfig::default()
        }
    }

    async fn create(
        &self,
        _cancel: &CancellationToken,
        settings: CreateSettings,
        config: &DbStorageConfig,
    ) -> Result<Box<dyn Component>, ComponentError> {
        let extension = DbStorage::new(settings, config)?;
        tracing::debug!(component = %extension.id(), "Storage extension created");
        Ok(Box::new(extension))
    }
}
