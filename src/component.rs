//! Component Layer
//!
//! Identity, factory and instance contracts shared by every pluggable
//! component. Concrete components live under [`crate::extension`] and
//! [`crate::receiver`].
//!
//! # Architecture
//!
//! - [`ComponentId`]: `type` or `type/name` identity of a configured instance
//! - [`ComponentConfig`]: typed config with pure validation
//! - [`Factory`]: default config plus construction for one component type
//! - [`Component`]: start/shutdown surface handed back to the host
//! - [`FactoryRegistry`]: write-once lookup from (kind, type) to factory
//!
//! # Example
//!
//! ```rust
//! use collector_factory::component::ComponentKind;
//! use collector_factory::components;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = components()?;
//! let factory = registry.lookup_str(ComponentKind::Receiver, "kafka")?;
//! let defaults = factory.default_config();
//!
//! // Kafka ships without brokers or topic: defaults alone do not validate.
//! assert!(defaults.validate().is_err());
//! # Ok(())
//! # }
//! ```

mod id;
mod registry;
mod traits;

pub use id::{ComponentId, ComponentKind, ComponentType, NAME_SEPARATOR};
pub use registry::{AnyFactory, FactoryRegistry, FactoryRegistryBuilder};
pub use traits::{
    AnyConfig, BuildInfo, Component, ComponentConfig, ComponentError, ComponentSettings,
    CreateSettings, Factory, REDACTED, StabilityLevel, TelemetrySettings,
};
