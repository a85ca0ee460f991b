//! Component identity: kind, type token and `type/name` identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::config::ConfigError;

/// Separator between type and instance name in the text form of an id.
pub const NAME_SEPARATOR: char = '/';

/// Section of the configuration document a component belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ComponentKind {
    /// Auxiliary service (storage, auth, health) not part of a pipeline.
    Extension,
    /// Pipeline entry point that ingests telemetry.
    Receiver,
}

/// Registered component type token (e.g. `kafka`, `db_storage`).
///
/// A token starts with an ASCII letter and continues with ASCII letters,
/// digits or `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentType(String);

impl ComponentType {
    /// Create a type token, rejecting malformed input.
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        let mut chars = token.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ConfigError::InvalidId {
                id: token,
                reason: "type must start with a letter and contain only letters, digits or '_'"
                    .to_string(),
            });
        }
        Ok(Self(token))
    }

    /// Type token of a built-in factory.
    ///
    /// Built-in tokens are literals known to be well formed.
    pub(crate) fn from_static(token: &'static str) -> Self {
        debug_assert!(Self::new(token).is_ok(), "malformed built-in type '{token}'");
        Self(token.to_string())
    }

    /// Token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one configured component instance.
///
/// The pair (type, name) is unique within a document section. An empty name
/// denotes the unnamed instance of the type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId {
    component_type: ComponentType,
    name: String,
}

impl ComponentId {
    /// Identity of the unnamed instance of `component_type`.
    pub fn new(component_type: ComponentType) -> Self {
        Self {
            component_type,
            name: String::new(),
        }
    }

    /// Identity of a named instance of `component_type`.
    ///
    /// An empty `name` is the same as [`ComponentId::new`].
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidId` if `name` contains whitespace, since
    /// the text form could not be parsed back.
    pub fn with_name(
        component_type: ComponentType,
        name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidId {
                id: format!("{component_type}{NAME_SEPARATOR}{name}"),
                reason: "name must not contain whitespace".to_string(),
            });
        }
        Ok(Self {
            component_type,
            name,
        })
    }

    /// Component type token.
    pub fn component_type(&self) -> &ComponentType {
        &self.component_type
    }

    /// Instance name (may be empty).
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.component_type)
        } else {
            write!(f, "{}{}{}", self.component_type, NAME_SEPARATOR, self.name)
        }
    }
}

impl FromStr for ComponentId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((type_part, name)) = s.split_once(NAME_SEPARATOR) else {
            return Ok(Self::new(ComponentType::new(s)?));
        };

        let invalid = |reason: &str| ConfigError::InvalidId {
            id: s.to_string(),
            reason: reason.to_string(),
        };
        if name.is_empty() {
            return Err(invalid("name must not be empty after the separator"));
        }

        let component_type = ComponentType::new(type_part.trim()).map_err(|_| {
            invalid("type must start with a letter and contain only letters, digits or '_'")
        })?;
        Self::with_name(component_type, name)
            .map_err(|_| invalid("name must not contain whitespace"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kafka() -> ComponentType {
        ComponentType::new("kafka").unwrap()
    }

    #[test]
    fn test_component_type_valid() {
        assert_eq!(ComponentType::new("db_storage").unwrap().as_str(), "db_storage");
        assert_eq!(ComponentType::new("otlp2").unwrap().to_string(), "otlp2");
    }

    #[test]
    fn test_component_type_invalid() {
        assert!(ComponentType::new("").is_err());
        assert!(ComponentType::new("2otlp").is_err());
        assert!(ComponentType::new("kafka/logs").is_err());
        assert!(ComponentType::new("db-storage").is_err());
    }

    #[test]
    fn test_component_id_display() {
        assert_eq!(ComponentId::new(kafka()).to_string(), "kafka");
        assert_eq!(
            ComponentId::with_name(kafka(), "logs").unwrap().to_string(),
            "kafka/logs"
        );
        assert_eq!(ComponentId::with_name(kafka(), "").unwrap().to_string(), "kafka");
    }

    #[test]
    fn test_with_name_round_trips() {
        assert!(ComponentId::with_name(kafka(), "my logs").is_err());
        assert!(ComponentId::with_name(kafka(), "logs\t").is_err());

        let id = ComponentId::with_name(kafka(), "logs/eu").unwrap();
        assert_eq!(id.to_string().parse::<ComponentId>().unwrap(), id);
    }

    #[test]
    fn test_component_id_parse() {
        let id: ComponentId = "kafka".parse().unwrap();
        assert_eq!(id, ComponentId::new(kafka()));

        let id: ComponentId = "kafka/logs".parse().unwrap();
        assert_eq!(id.component_type(), &kafka());
        assert_eq!(id.name(), "logs");

        // Only the first separator splits type from name.
        let id: ComponentId = "kafka/logs/eu".parse().unwrap();
        assert_eq!(id.name(), "logs/eu");
    }

    #[test]
    fn test_component_id_parse_invalid() {
        assert!("kafka/".parse::<ComponentId>().is_err());
        assert!("/logs".parse::<ComponentId>().is_err());
        assert!("kafka/my logs".parse::<ComponentId>().is_err());
        assert!("".parse::<ComponentId>().is_err());
    }

    #[test]
    fn test_component_kind_strings() {
        assert_eq!(ComponentKind::Receiver.to_string(), "receiver");
        assert_eq!(
            "Extension".parse::<ComponentKind>().unwrap(),
            ComponentKind::Extension
        );
        assert_eq!(ComponentKind::Extension.as_ref(), "extension");
    }
}
