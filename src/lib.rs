//! Collector Factory - typed component configuration
//!
//! Core of a pluggable telemetry collector: every component type registers a
//! factory that knows its configuration schema, produces a fresh default
//! config, and builds running instances from validated configs.
//!
//! # Architecture
//!
//! - **Component**: identities, factory and instance traits, registry
//! - **Config**: raw YAML documents, schemas, loading and validation
//! - **Extension**: `db_storage`, a SQL-backed storage extension
//! - **Receiver**: `kafka`, a queue-consuming receiver
//!
//! # Example
//!
//! ```rust,no_run
//! use collector_factory::config::CollectorConfig;
//! use collector_factory::components;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = components()?;
//! let config = CollectorConfig::load("configs/collector.yaml", &registry, true)?;
//! for receiver in &config.receivers {
//!     println!("{}", receiver.id());
//! }
//! # Ok(())
//! # }
//! ```

pub mod component;
pub mod components;
pub mod config;
pub mod extension;
pub mod receiver;

pub use component::{
    AnyConfig, AnyFactory, Component, ComponentConfig, ComponentError, ComponentId,
    ComponentKind, ComponentType, CreateSettings, Factory, FactoryRegistry, StabilityLevel,
};
pub use components::components;
pub use config::{CollectorConfig, ConfigError, ConfigLoader, RawConfig, ValidationError};
pub use extension::dbstorage::{DbStorage, DbStorageConfig, DbStorageFactory};
pub use receiver::kafka::{KafkaReceiver, KafkaReceiverConfig, KafkaReceiverFactory};
