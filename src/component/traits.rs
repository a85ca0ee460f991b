//! Core component traits and types.

use std::any::Any;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::component::{ComponentId, ComponentKind, ComponentType};
use crate::config::{ConfigSchema, ValidationError};

/// Errors that can occur while constructing or running a component.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// Operational failure while building the instance.
    #[error("failed to create '{id}': {context}: {source}")]
    Construction {
        /// Identity of the component being built.
        id: String,
        /// What was being attempted.
        context: String,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Filesystem or network I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation failed (sqlx error).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Construction aborted because the cancellation token fired.
    #[error("creation of '{id}' cancelled")]
    Cancelled {
        /// Identity of the component being built.
        id: String,
    },

    /// Config value does not belong to the factory it was handed to.
    #[error("config for '{id}' is not a '{expected}' config")]
    ConfigType {
        /// Identity carried by the config.
        id: String,
        /// Type token of the factory.
        expected: String,
    },

    /// Operation requires a started component.
    #[error("component '{id}' is not started")]
    NotStarted {
        /// Identity of the component.
        id: String,
    },
}

impl ComponentError {
    /// Wrap an operational failure for component `id`.
    pub fn construction<E>(id: &ComponentId, context: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Construction {
            id: id.to_string(),
            context: context.into(),
            source: source.into(),
        }
    }

    /// Whether the host may retry the failed operation later.
    ///
    /// Transient I/O and database failures are retryable; cancellation and
    /// programming errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) | Self::Database(_) => true,
            Self::Construction { source, .. } => {
                source.is::<std::io::Error>() || source.is::<sqlx::Error>()
            }
            Self::Cancelled { .. } | Self::ConfigType { .. } | Self::NotStarted { .. } => false,
        }
    }

    /// Whether this error reports a cancelled construction.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Maturity of a component implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StabilityLevel {
    Development,
    Alpha,
    Beta,
    Stable,
    Deprecated,
    Unmaintained,
}

/// Base settings embedded by value in every component config.
///
/// The identity is never read from the document: defaults carry the bare
/// type, and the loader stamps the requested identity after a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSettings {
    id: ComponentId,
}

impl ComponentSettings {
    /// Settings for `id`.
    pub fn new(id: ComponentId) -> Self {
        Self { id }
    }

    /// Identity the config was produced for.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Replace the identity.
    pub fn set_id(&mut self, id: ComponentId) {
        self.id = id;
    }
}

/// Typed configuration of one component type.
///
/// Implementations serialize to, and deserialize from, the generic document
/// tree. The embedded [`ComponentSettings`] must be skipped by serde.
pub trait ComponentConfig:
    fmt::Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Embedded base settings.
    fn settings(&self) -> &ComponentSettings;

    /// Mutable access to the embedded base settings.
    fn settings_mut(&mut self) -> &mut ComponentSettings;

    /// Check structural invariants.
    ///
    /// Must be pure: no filesystem, network or clock access. Operational
    /// checks belong in [`Factory::create`].
    fn validate(&self) -> Result<(), ValidationError>;

    /// Copy of the config that is safe to print, with credentials masked
    /// as [`REDACTED`].
    ///
    /// Only display paths use it; merging and decoding see the real values.
    fn redacted(&self) -> Self {
        self.clone()
    }
}

/// Placeholder printed instead of a credential.
pub const REDACTED: &str = "***";

/// Cross-cutting telemetry handed to every component.
#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    /// Span components log within.
    pub span: tracing::Span,
}

impl TelemetrySettings {
    /// Telemetry scoped to one component.
    pub fn for_component(kind: ComponentKind, id: &ComponentId) -> Self {
        Self {
            span: tracing::info_span!("component", kind = %kind, id = %id),
        }
    }
}

/// Information about the running host binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    /// Executable name.
    pub command: String,
    /// Host version.
    pub version: String,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            command: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Shared settings supplied by the host at construction time.
///
/// Not part of the component's configuration identity.
#[derive(Debug, Clone)]
pub struct CreateSettings {
    /// Identity of the component being created.
    pub id: ComponentId,
    /// Logging and telemetry scope.
    pub telemetry: TelemetrySettings,
    /// Host build information.
    pub build_info: BuildInfo,
}

impl CreateSettings {
    /// Settings for component `id` of `kind` with a fresh telemetry span.
    pub fn new(kind: ComponentKind, id: ComponentId) -> Self {
        Self {
            telemetry: TelemetrySettings::for_component(kind, &id),
            id,
            build_info: BuildInfo::default(),
        }
    }
}

/// Running component instance.
///
/// Constructed by a [`Factory`]; the host owns its start/stop lifecycle.
#[async_trait::async_trait]
pub trait Component: fmt::Debug + Send + Sync + 'static {
    /// Start the component.
    async fn start(&self) -> Result<(), ComponentError>;

    /// Stop the component and release its resources.
    ///
    /// Shutting down a component that was never started succeeds.
    async fn shutdown(&self) -> Result<(), ComponentError>;

    /// Access to the concrete type, for hosts that need more than the
    /// lifecycle surface (e.g. a storage client).
    fn as_any(&self) -> &dyn Any;
}

/// Factory binding a component type to its schema, default config and
/// construction function.
///
/// Factories are stateless: two `create` calls with equal configs produce two
/// independent instances.
#[async_trait::async_trait]
pub trait Factory: Send + Sync + 'static {
    /// Associated configuration type.
    type Config: ComponentConfig;

    /// Document section this factory belongs to.
    fn kind(&self) -> ComponentKind;

    /// Registered type token.
    fn component_type(&self) -> &ComponentType;

    /// Maturity of the implementation.
    fn stability(&self) -> StabilityLevel {
        StabilityLevel::Development
    }

    /// Declared fields of [`Self::Config`].
    fn schema(&self) -> &ConfigSchema;

    /// Fresh default configuration. Must return a new value on every call.
    fn create_default_config(&self) -> Self::Config;

    /// Build an instance from a validated config.
    ///
    /// Performs the operational work validation skipped (opening files,
    /// resolving addresses). Long waits must observe `cancel`.
    async fn create(
        &self,
        cancel: &CancellationToken,
        settings: CreateSettings,
        config: &Self::Config,
    ) -> Result<Box<dyn Component>, ComponentError>;
}

trait ErasedConfig: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn ErasedConfig>;
    fn eq_dyn(&self, other: &dyn ErasedConfig) -> bool;
    fn id(&self) -> &ComponentId;
    fn validate(&self) -> Result<(), ValidationError>;
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;
}

impl<C: ComponentConfig> ErasedConfig for C {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn ErasedConfig> {
        Box::new(self.clone())
    }

    fn eq_dyn(&self, other: &dyn ErasedConfig) -> bool {
        other.as_any().downcast_ref::<C>() == Some(self)
    }

    fn id(&self) -> &ComponentId {
        self.settings().id()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        ComponentConfig::validate(self)
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.redacted())
    }
}

/// A loaded config of any component type.
///
/// Produced by the loader and consumed by the registry's erased factories.
pub struct AnyConfig(Box<dyn ErasedConfig>);

impl AnyConfig {
    /// Erase a typed config.
    pub fn new<C: ComponentConfig>(config: C) -> Self {
        Self(Box::new(config))
    }

    /// Identity the config was loaded for.
    pub fn id(&self) -> &ComponentId {
        self.0.id()
    }

    /// Re-run the type's validation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.0.validate()
    }

    /// Typed view of the config, if it is a `C`.
    pub fn downcast_ref<C: ComponentConfig>(&self) -> Option<&C> {
        self.0.as_any().downcast_ref::<C>()
    }

    /// Render the user-visible fields as JSON, credentials masked.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        self.0.to_json()
    }
}

impl Clone for AnyConfig {
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl PartialEq for AnyConfig {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_dyn(other.0.as_ref())
    }
}

impl fmt::Debug for AnyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct NopConfig {
        #[serde(skip, default = "nop_settings")]
        settings: ComponentSettings,
        level: i64,
    }

    fn nop_settings() -> ComponentSettings {
        ComponentSettings::new(ComponentId::new(ComponentType::new("nop").unwrap()))
    }

    impl ComponentConfig for NopConfig {
        fn settings(&self) -> &ComponentSettings {
            &self.settings
        }

        fn settings_mut(&mut self) -> &mut ComponentSettings {
            &mut self.settings
        }

        fn validate(&self) -> Result<(), ValidationError> {
            if self.level < 0 {
                return Err(ValidationError::new("level", "must be non-negative"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_any_config_roundtrip_typed_view() {
        let config = AnyConfig::new(NopConfig {
            settings: nop_settings(),
            level: 3,
        });
        assert_eq!(config.id().to_string(), "nop");
        assert_eq!(config.downcast_ref::<NopConfig>().unwrap().level, 3);
        assert!(config.validate().is_ok());
        assert_eq!(config.to_json().unwrap(), serde_json::json!({ "level": 3 }));
    }

    #[test]
    fn test_any_config_equality_and_clone() {
        let a = AnyConfig::new(NopConfig {
            settings: nop_settings(),
            level: 1,
        });
        let b = a.clone();
        assert_eq!(a, b);

        let c = AnyConfig::new(NopConfig {
            settings: nop_settings(),
            level: -1,
        });
        assert_ne!(a, c);
        assert_eq!(c.validate().unwrap_err().field, "level");
    }

    #[test]
    fn test_error_classification() {
        let id = ComponentId::new(ComponentType::new("kafka").unwrap());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "ca.pem");
        let err = ComponentError::construction(&id, "reading tls ca_file", io);
        assert!(err.is_retryable());
        assert!(!err.is_cancelled());
        assert!(err.to_string().contains("reading tls ca_file"));

        let err = ComponentError::construction(&id, "parsing", "bad certificate");
        assert!(!err.is_retryable());

        let err = ComponentError::Cancelled { id: id.to_string() };
        assert!(err.is_cancelled());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_stability_level_strings() {
        assert_eq!(StabilityLevel::Alpha.to_string(), "alpha");
        assert_eq!("BETA".parse::<StabilityLevel>().unwrap(), StabilityLevel::Beta);
    }
}
