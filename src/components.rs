//! Built-in component table.

use crate::component::FactoryRegistry;
use crate::config::ConfigError;
use crate::extension::dbstorage::DbStorageFactory;
use crate::receiver::kafka::KafkaReceiverFactory;

/// Registry with every built-in factory.
///
/// # Errors
/// Returns `ConfigError::DuplicateType` if two built-ins share a type.
pub fn components() -> Result<FactoryRegistry, ConfigError> {
    let mut builder = FactoryRegistry::builder();
    builder
        .register(DbStorageFactory::new())?
        .register(KafkaReceiverFactory::new())?;
    Ok(builder.build())
}
