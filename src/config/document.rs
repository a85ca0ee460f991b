//! Collector configuration document.
//!
//! A document groups component configs by section and names the extensions
//! the service enables:
//!
//! ```yaml
//! extensions:
//!   db_storage:
//!     driver: sqlite3
//!     datasource: ./data/storage.db
//! receivers:
//!   kafka:
//!     topic: spans
//!     brokers: ["kafka-0:9092"]
//! service:
//!   extensions: [db_storage]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::component::{AnyConfig, ComponentId, ComponentKind, FactoryRegistry};

use super::loader::{ConfigLoader, RawConfig};
use super::validation::{ConfigError, ValidationError};

/// Top-level keys a document may contain.
pub const SECTIONS: &[&str] = &["extensions", "receivers", "service"];

/// Service wiring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Extensions to start, by identity text.
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Fully loaded and validated collector document.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    /// Extension configs in document order.
    pub extensions: Vec<AnyConfig>,
    /// Receiver configs in document order.
    pub receivers: Vec<AnyConfig>,
    /// Service wiring.
    pub service: ServiceConfig,
}

impl CollectorConfig {
    /// Load a document from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(
        path: impl AsRef<Path>,
        registry: &FactoryRegistry,
        strict: bool,
    ) -> Result<Self, ConfigError> {
        let raw = RawConfig::from_file(path)?;
        Self::from_raw(&raw, registry, strict)
    }

    /// Load every section of an already parsed document.
    pub fn from_raw(
        raw: &RawConfig,
        registry: &FactoryRegistry,
        strict: bool,
    ) -> Result<Self, ConfigError> {
        for key in raw.keys()? {
            if SECTIONS.contains(&key) {
                continue;
            }
            if strict {
                return Err(ConfigError::UnknownField {
                    field: key.to_string(),
                });
            }
            tracing::warn!(section = %key, "Ignoring unknown configuration section");
        }

        let extensions_raw = raw.section("extensions")?;
        let extensions = ConfigLoader::new(registry, ComponentKind::Extension, &extensions_raw)
            .strict(strict)
            .load_all()?;

        let receivers_raw = raw.section("receivers")?;
        let receivers = ConfigLoader::new(registry, ComponentKind::Receiver, &receivers_raw)
            .strict(strict)
            .load_all()?;

        let service = match raw.get("service") {
            None | Some(Value::Null) => ServiceConfig::default(),
            Some(value) => serde_yaml::from_value(value.clone())?,
        };

        let config = Self {
            extensions,
            receivers,
            service,
        };
        config.validate()?;

        tracing::info!(
            extensions = config.extensions.len(),
            receivers = config.receivers.len(),
            "Collector configuration loaded"
        );
        Ok(config)
    }

    /// Check cross-section references.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidId` for a malformed service entry and
    /// `ConfigError::ValidationError` for a duplicate or unconfigured one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let configured: HashSet<&ComponentId> = self.extensions.iter().map(|c| c.id()).collect();
        let mut enabled = HashSet::new();

        for (i, entry) in self.service.extensions.iter().enumerate() {
            let id: ComponentId = entry.parse()?;
            let field = format!("service.extensions[{i}]");
            if !configured.contains(&id) {
                return Err(ValidationError::new(
                    field,
                    format!("extension '{id}' is not configured"),
                )
                .into());
            }
            if !enabled.insert(id.clone()) {
                return Err(ValidationError::new(
                    field,
                    format!("extension '{id}' is listed more than once"),
                )
                .into());
            }
        }
        Ok(())
    }

    /// Extension configs enabled by the service, in service order.
    pub fn enabled_extensions(&self) -> Vec<&AnyConfig> {
        self.service
            .extensions
            .iter()
            .filter_map(|entry| entry.parse::<ComponentId>().ok())
            .filter_map(|id| self.extensions.iter().find(|c| c.id() == &id))
            .collect()
    }
}
