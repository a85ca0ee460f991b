//! Factory registry: write-once type lookup for every component kind.

use std::collections::HashMap;
use std::sync::Arc;

use serde_yaml::Value;
use tokio_util::sync::CancellationToken;

use crate::component::{
    AnyConfig, Component, ComponentConfig, ComponentError, ComponentId, ComponentKind,
    ComponentType, CreateSettings, Factory, StabilityLevel,
};
use crate::config::{ConfigError, ConfigSchema};

/// Type-erased view of a [`Factory`], as stored in the registry.
#[async_trait::async_trait]
pub trait AnyFactory: Send + Sync {
    /// Document section the factory belongs to.
    fn kind(&self) -> ComponentKind;

    /// Registered type token.
    fn component_type(&self) -> &ComponentType;

    /// Maturity of the implementation.
    fn stability(&self) -> StabilityLevel;

    /// Declared fields of the config.
    fn schema(&self) -> &ConfigSchema;

    /// Fresh default config.
    fn default_config(&self) -> AnyConfig;

    /// Default config rendered as a generic document tree.
    fn default_tree(&self) -> Result<Value, ConfigError>;

    /// Decode a merged tree into the typed config and stamp `id` on it.
    ///
    /// Does not validate.
    fn decode(&self, id: &ComponentId, tree: Value) -> Result<AnyConfig, ConfigError>;

    /// Build an instance, aborting with [`ComponentError::Cancelled`] when
    /// `cancel` fires before the instance is complete.
    async fn create_component(
        &self,
        cancel: &CancellationToken,
        settings: CreateSettings,
        config: &AnyConfig,
    ) -> Result<Box<dyn Component>, ComponentError>;
}

#[async_trait::async_trait]
impl<F: Factory> AnyFactory for F {
    fn kind(&self) -> ComponentKind {
        Factory::kind(self)
    }

    fn component_type(&self) -> &ComponentType {
        Factory::component_type(self)
    }

    fn stability(&self) -> StabilityLevel {
        Factory::stability(self)
    }

    fn schema(&self) -> &ConfigSchema {
        Factory::schema(self)
    }

    fn default_config(&self) -> AnyConfig {
        AnyConfig::new(self.create_default_config())
    }

    fn default_tree(&self) -> Result<Value, ConfigError> {
        Ok(serde_yaml::to_value(self.create_default_config())?)
    }

    fn decode(&self, id: &ComponentId, tree: Value) -> Result<AnyConfig, ConfigError> {
        let mut config: F::Config =
            serde_yaml::from_value(tree).map_err(|e| ConfigError::Decode {
                id: id.to_string(),
                reason: e.to_string(),
            })?;
        config.settings_mut().set_id(id.clone());
        Ok(AnyConfig::new(config))
    }

    async fn create_component(
        &self,
        cancel: &CancellationToken,
        settings: CreateSettings,
        config: &AnyConfig,
    ) -> Result<Box<dyn Component>, ComponentError> {
        let id = config.id().to_string();
        let typed = config
            .downcast_ref::<F::Config>()
            .ok_or_else(|| ComponentError::ConfigType {
                id: id.clone(),
                expected: Factory::component_type(self).to_string(),
            })?;

        if matches!(
            Factory::stability(self),
            StabilityLevel::Deprecated | StabilityLevel::Unmaintained
        ) {
            tracing::warn!(
                component = %id,
                stability = %Factory::stability(self),
                "Component is not actively supported"
            );
        }

        if cancel.is_cancelled() {
            return Err(ComponentError::Cancelled { id });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(component = %id, "Component creation cancelled");
                Err(ComponentError::Cancelled { id })
            }
            result = self.create(cancel, settings, typed) => result,
        }
    }
}

type RegistryKey = (ComponentKind, ComponentType);

/// Builder collecting factories before the registry is frozen.
#[derive(Default)]
pub struct FactoryRegistryBuilder {
    factories: HashMap<RegistryKey, Arc<dyn AnyFactory>>,
}

impl FactoryRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory.
    ///
    /// # Errors
    /// Returns `ConfigError::DuplicateType` if the kind already has a factory
    /// for the same type.
    pub fn register<F: Factory>(&mut self, factory: F) -> Result<&mut Self, ConfigError> {
        self.register_shared(Arc::new(factory))
    }

    /// Register an already shared factory.
    pub fn register_shared(
        &mut self,
        factory: Arc<dyn AnyFactory>,
    ) -> Result<&mut Self, ConfigError> {
        let key = (factory.kind(), factory.component_type().clone());
        if self.factories.contains_key(&key) {
            return Err(ConfigError::DuplicateType {
                kind: key.0,
                component_type: key.1.to_string(),
            });
        }

        tracing::debug!(
            kind = %key.0,
            component_type = %key.1,
            stability = %factory.stability(),
            "Factory registered"
        );
        self.factories.insert(key, factory);
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> FactoryRegistry {
        FactoryRegistry {
            factories: Arc::new(self.factories),
        }
    }
}

/// Read-only mapping from (kind, type) to factory.
///
/// Cheap to clone; clones share the same frozen table.
#[derive(Clone)]
pub struct FactoryRegistry {
    factories: Arc<HashMap<RegistryKey, Arc<dyn AnyFactory>>>,
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("factory_count", &self.factories.len())
            .finish_non_exhaustive()
    }
}

impl FactoryRegistry {
    /// Start building a registry.
    pub fn builder() -> FactoryRegistryBuilder {
        FactoryRegistryBuilder::new()
    }

    /// Look up the factory for `component_type` in section `kind`.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownType` if nothing is registered.
    pub fn lookup(
        &self,
        kind: ComponentKind,
        component_type: &ComponentType,
    ) -> Result<Arc<dyn AnyFactory>, ConfigError> {
        self.factories
            .get(&(kind, component_type.clone()))
            .cloned()
            .ok_or_else(|| ConfigError::UnknownType {
                kind,
                component_type: component_type.to_string(),
            })
    }

    /// Look up a factory by its textual type token.
    ///
    /// Malformed tokens are reported as unknown types.
    pub fn lookup_str(
        &self,
        kind: ComponentKind,
        component_type: &str,
    ) -> Result<Arc<dyn AnyFactory>, ConfigError> {
        let unknown = || ConfigError::UnknownType {
            kind,
            component_type: component_type.to_string(),
        };
        let parsed = ComponentType::new(component_type).map_err(|_| unknown())?;
        self.lookup(kind, &parsed)
    }

    /// Registered types of `kind`, sorted.
    pub fn types(&self, kind: ComponentKind) -> Vec<ComponentType> {
        let mut types: Vec<_> = self
            .factories
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, t)| t.clone())
            .collect();
        types.sort();
        types
    }

    /// Number of registered factories across all kinds.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no factory is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
