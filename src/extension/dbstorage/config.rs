//! `db_storage` extension configuration.

use serde::{Deserialize, Serialize};
use strum::VariantNames;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::component::{ComponentConfig, ComponentId, ComponentSettings, ComponentType, REDACTED};
use crate::config::{ConfigSchema, Field, ValidationError};

/// The value of extension "type" in configuration.
pub const TYPE_STR: &str = "db_storage";

/// Supported database drivers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    strum_macros::VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DbDriver {
    /// SQLite file or in-memory database.
    Sqlite3,
    /// PostgreSQL server.
    Pgx,
}

fn default_settings() -> ComponentSettings {
    ComponentSettings::new(ComponentId::new(ComponentType::from_static(TYPE_STR)))
}

/// Configuration for the database storage extension.
///
/// Ships without a driver or datasource: the operator must point it at a
/// backend explicitly.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DbStorageConfig {
    /// Identity-derived base settings.
    #[serde(skip, default = "default_settings")]
    pub settings: ComponentSettings,
    /// Database driver name.
    #[serde(default)]
    pub driver: Option<DbDriver>,
    /// Driver-specific datasource (file path, `:memory:` or URL).
    #[serde(default)]
    pub datasource: String,
}

impl std::fmt::Debug for DbStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbStorageConfig")
            .field("settings", &self.settings)
            .field("driver", &self.driver)
            .field("datasource", &redact_datasource(&self.datasource))
            .finish()
    }
}

/// Mask the password of a URL datasource. Paths and URLs without a password
/// are returned unchanged.
fn redact_datasource(datasource: &str) -> String {
    match url::Url::parse(datasource) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some(REDACTED)).is_err() {
                return REDACTED.to_string();
            }
            url.to_string()
        }
        _ => datasource.to_string(),
    }
}

impl Default for DbStorageConfig {
    fn default() -> Self {
        Self {
            settings: default_settings(),
            driver: None,
            datasource: String::new(),
        }
    }
}

impl DbStorageConfig {
    /// Declared fields.
    pub fn schema() -> ConfigSchema {
        ConfigSchema::new(vec![
            Field::one_of("driver", DbDriver::VARIANTS),
            Field::string("datasource"),
        ])
    }

    /// Set the driver.
    pub fn with_driver(mut self, driver: DbDriver) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Set the datasource.
    pub fn with_datasource(mut self, datasource: impl Into<String>) -> Self {
        self.datasource = datasource.into();
        self
    }
}

impl ComponentConfig for DbStorageConfig {
    fn settings(&self) -> &ComponentSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut ComponentSettings {
        &mut self.settings
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let Some(driver) = self.driver else {
            return Err(ValidationError::new("driver", "missing driver name"));
        };

        let datasource = self.datasource.trim();
        if datasource.is_empty() {
            return Err(ValidationError::new("datasource", "missing datasource"));
        }

        if driver == DbDriver::Pgx {
            let url = url::Url::parse(datasource).map_err(|e| {
                ValidationError::new("datasource", format!("invalid postgres URL: {e}"))
            })?;
            if !matches!(url.scheme(), "postgres" | "postgresql") {
                return Err(ValidationError::new(
                    "datasource",
                    format!("unsupported URL scheme '{}' for pgx", url.scheme()),
                ));
            }
        }

        Ok(())
    }

    fn redacted(&self) -> Self {
        Self {
            datasource: redact_datasource(&self.datasource),
            ..self.clone()
        }
    }
}
