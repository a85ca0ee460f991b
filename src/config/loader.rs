//! Raw configuration documents and the typed config loader.
//!
//! Loading an identity runs a fixed pipeline: resolve the factory, render its
//! default config as a tree, overlay the user's subtree field by field while
//! coercing scalars, decode the merged tree, stamp the identity and validate.
//! The first failure aborts the load.

use std::collections::HashSet;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::component::{
    AnyConfig, ComponentConfig, ComponentId, ComponentKind, ComponentType, FactoryRegistry,
    NAME_SEPARATOR,
};

use super::schema::{Field, FieldType};
use super::validation::{ConfigError, expand_env_vars};

/// Untyped hierarchical configuration (a YAML mapping).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawConfig {
    root: Mapping,
}

impl RawConfig {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML text after expanding `${VAR}` / `${VAR:-default}` references.
    ///
    /// # Errors
    /// Returns `ConfigError::ParseError` for malformed YAML and
    /// `ConfigError::TypeMismatch` if the document root is not a mapping.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(text);
        let value: Value = serde_yaml::from_str(&expanded)?;
        Self::from_value(value)
    }

    /// Read and parse a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Wrap an already parsed tree.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Ok(Self::default()),
            _ => Err(ConfigError::TypeMismatch {
                field: String::new(),
                expected: "mapping".to_string(),
            }),
        }
    }

    /// Subtree stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Nested document stored under `key`; empty if absent or `null`.
    pub fn section(&self, key: &str) -> Result<RawConfig, ConfigError> {
        match self.root.get(key) {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Mapping(m)) => Ok(Self { root: m.clone() }),
            Some(_) => Err(ConfigError::TypeMismatch {
                field: key.to_string(),
                expected: "mapping".to_string(),
            }),
        }
    }

    /// Top-level keys in document order.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidId` for a key that is not a string.
    pub fn keys(&self) -> Result<Vec<&str>, ConfigError> {
        self.root
            .keys()
            .map(|k| {
                k.as_str().ok_or_else(|| ConfigError::InvalidId {
                    id: format!("{k:?}"),
                    reason: "keys must be strings".to_string(),
                })
            })
            .collect()
    }

    /// Whether the document has no keys.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

/// Loads typed configs for one document section.
///
/// Strict by default: keys a component does not declare are rejected.
#[derive(Debug)]
pub struct ConfigLoader<'a> {
    registry: &'a FactoryRegistry,
    kind: ComponentKind,
    raw: &'a RawConfig,
    strict: bool,
}

impl<'a> ConfigLoader<'a> {
    /// Loader for section `kind` of `raw`, resolving types in `registry`.
    pub fn new(registry: &'a FactoryRegistry, kind: ComponentKind, raw: &'a RawConfig) -> Self {
        Self {
            registry,
            kind,
            raw,
            strict: true,
        }
    }

    /// Enable or disable rejection of unknown keys.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Load, merge and validate the config of `id`.
    ///
    /// An identity absent from the document loads the type's defaults, which
    /// must pass validation on their own.
    ///
    /// # Errors
    /// `UnknownType`, `TypeMismatch`, `UnknownField`, `Decode` or
    /// `ValidationError`, whichever is hit first.
    pub fn load(&self, id: &ComponentId) -> Result<AnyConfig, ConfigError> {
        let factory = self.registry.lookup(self.kind, id.component_type())?;

        let mut merged = match factory.default_tree()? {
            Value::Mapping(m) => m,
            Value::Null => Mapping::new(),
            _ => {
                return Err(ConfigError::Decode {
                    id: id.to_string(),
                    reason: "default config is not a record".to_string(),
                });
            }
        };

        let key = id.to_string();
        match self.raw.get(&key) {
            None | Some(Value::Null) => {
                tracing::debug!(kind = %self.kind, component = %key, "No overrides, using defaults");
            }
            Some(Value::Mapping(overlay)) => {
                overlay_record(&mut merged, overlay, factory.schema().fields(), "", self.strict)?;
            }
            Some(_) => {
                return Err(ConfigError::TypeMismatch {
                    field: key,
                    expected: "record".to_string(),
                });
            }
        }

        let config = factory.decode(id, Value::Mapping(merged))?;
        config.validate()?;

        tracing::debug!(kind = %self.kind, component = %id, "Configuration loaded");
        Ok(config)
    }

    /// Load `id` and return it as the concrete config type `C`.
    pub fn load_as<C: ComponentConfig>(&self, id: &ComponentId) -> Result<C, ConfigError> {
        let config = self.load(id)?;
        config
            .downcast_ref::<C>()
            .cloned()
            .ok_or_else(|| ConfigError::Decode {
                id: id.to_string(),
                reason: "config has a different concrete type".to_string(),
            })
    }

    /// Load every identity present in the section, in document order.
    ///
    /// Keys must be written in canonical `type` or `type/name` form, so each
    /// identity appears at most once. Errors carry the failing key.
    pub fn load_all(&self) -> Result<Vec<AnyConfig>, ConfigError> {
        let mut seen = HashSet::new();
        let mut configs = Vec::new();

        for key in self.raw.keys()? {
            let loaded = self.parse_key(key).and_then(|id| {
                if !seen.insert(id.clone()) {
                    return Err(ConfigError::InvalidId {
                        id: key.to_string(),
                        reason: format!("identity '{id}' is configured more than once"),
                    });
                }
                self.load(&id)
            });
            configs.push(loaded.map_err(|e| e.in_component(self.kind, key))?);
        }
        Ok(configs)
    }

    /// Parse a section key into the identity it names.
    ///
    /// A type token that cannot name any factory is reported as
    /// `UnknownType`, the same as a well-formed token nobody registered.
    fn parse_key(&self, key: &str) -> Result<ComponentId, ConfigError> {
        let id = match key.parse::<ComponentId>() {
            Ok(id) => id,
            Err(err) => {
                let type_part = key.split_once(NAME_SEPARATOR).map_or(key, |(t, _)| t);
                if ComponentType::new(type_part.trim()).is_err() {
                    return Err(ConfigError::UnknownType {
                        kind: self.kind,
                        component_type: type_part.to_string(),
                    });
                }
                return Err(err);
            }
        };

        let canonical = id.to_string();
        if canonical != key {
            return Err(ConfigError::InvalidId {
                id: key.to_string(),
                reason: format!("write the identity as '{canonical}'"),
            });
        }
        Ok(id)
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Overlay `overlay` onto `base` field by field.
///
/// Nested records merge recursively so untouched siblings survive; lists and
/// scalars replace the default; `null` keeps the default except for optional
/// records, where it clears the value.
fn overlay_record(
    base: &mut Mapping,
    overlay: &Mapping,
    fields: &[Field],
    path: &str,
    strict: bool,
) -> Result<(), ConfigError> {
    for (key, value) in overlay {
        let Some(name) = key.as_str() else {
            return Err(ConfigError::UnknownField {
                field: join_path(path, &format!("{key:?}")),
            });
        };
        let field_path = join_path(path, name);

        let Some(field) = fields.iter().find(|f| f.name == name) else {
            if strict {
                return Err(ConfigError::UnknownField { field: field_path });
            }
            tracing::warn!(field = %field_path, "Ignoring unknown configuration field");
            continue;
        };

        let slot_key = Value::String(name.to_string());
        match (&field.field_type, value) {
            (FieldType::Record(_), Value::Null) => {}
            (FieldType::Optional(_), Value::Null) => {
                base.insert(slot_key, Value::Null);
            }
            (FieldType::Record(sub) | FieldType::Optional(sub), Value::Mapping(nested)) => {
                let mut slot = match base.remove(&slot_key) {
                    Some(Value::Mapping(m)) => m,
                    _ => Mapping::new(),
                };
                overlay_record(&mut slot, nested, sub, &field_path, strict)?;
                base.insert(slot_key, Value::Mapping(slot));
            }
            (_, Value::Null) => {}
            (field_type, value) => {
                let coerced = field_type.coerce(value.clone(), &field_path)?;
                base.insert(slot_key, coerced);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry_fields() -> Vec<Field> {
        vec![
            Field::bool("full"),
            Field::record("retry", vec![Field::int("max"), Field::duration("backoff")]),
        ]
    }

    fn mapping(yaml: &str) -> Mapping {
        match serde_yaml::from_str(yaml).unwrap() {
            Value::Mapping(m) => m,
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn test_overlay_is_field_local() {
        let mut base = mapping("full: true\nretry:\n  max: 10\n  backoff: 5s\n");
        let overlay = mapping("retry:\n  max: 20\n");

        overlay_record(&mut base, &overlay, &retry_fields(), "metadata", true).unwrap();
        assert_eq!(base, mapping("full: true\nretry:\n  max: 20\n  backoff: 5s\n"));
    }

    #[test]
    fn test_overlay_null_keeps_default() {
        let mut base = mapping("full: true\nretry:\n  max: 10\n  backoff: 5s\n");
        let overlay = mapping("full: ~\nretry: ~\n");

        overlay_record(&mut base, &overlay, &retry_fields(), "", true).unwrap();
        assert_eq!(base, mapping("full: true\nretry:\n  max: 10\n  backoff: 5s\n"));
    }

    #[test]
    fn test_overlay_optional_record() {
        let fields = vec![Field::optional("tls", vec![Field::string("ca_file")])];

        let mut base = mapping("tls: ~\n");
        overlay_record(&mut base, &mapping("tls:\n  ca_file: ca.pem\n"), &fields, "", true)
            .unwrap();
        assert_eq!(base, mapping("tls:\n  ca_file: ca.pem\n"));

        overlay_record(&mut base, &mapping("tls: ~\n"), &fields, "", true).unwrap();
        assert_eq!(base, mapping("tls: ~\n"));
    }

    #[test]
    fn test_overlay_unknown_field_strict() {
        let mut base = mapping("full: true\n");
        let overlay = mapping("retry:\n  maximum: 3\n");

        let err = overlay_record(&mut base, &overlay, &retry_fields(), "metadata", true)
            .unwrap_err();
        match err {
            ConfigError::UnknownField { field } => assert_eq!(field, "metadata.retry.maximum"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_overlay_unknown_field_lenient() {
        let mut base = mapping("full: true\n");
        let overlay = mapping("fulll: false\nfull: false\n");

        overlay_record(&mut base, &overlay, &retry_fields(), "", false).unwrap();
        assert_eq!(base, mapping("full: false\n"));
    }

    #[test]
    fn test_overlay_type_mismatch_path() {
        let mut base = mapping("full: true\nretry:\n  max: 10\n");
        let overlay = mapping("retry:\n  max: lots\n");

        let err = overlay_record(&mut base, &overlay, &retry_fields(), "metadata", true)
            .unwrap_err();
        match err {
            ConfigError::TypeMismatch { field, expected } => {
                assert_eq!(field, "metadata.retry.max");
                assert_eq!(expected, "int");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = overlay_record(&mut base, &mapping("retry: 5\n"), &retry_fields(), "", true)
            .unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { .. }));
    }

    #[test]
    fn test_raw_config_sections() {
        let raw = RawConfig::from_yaml("receivers:\n  kafka:\n    topic: spans\nextensions: ~\n")
            .unwrap();
        let receivers = raw.section("receivers").unwrap();
        assert_eq!(receivers.keys().unwrap(), vec!["kafka"]);
        assert!(raw.section("extensions").unwrap().is_empty());
        assert!(raw.section("exporters").unwrap().is_empty());

        let raw = RawConfig::from_yaml("receivers: [kafka]\n").unwrap();
        assert!(raw.section("receivers").is_err());
    }

    #[test]
    fn test_raw_config_root_must_be_mapping() {
        assert!(RawConfig::from_yaml("").unwrap().is_empty());
        assert!(matches!(
            RawConfig::from_yaml("- kafka\n"),
            Err(ConfigError::TypeMismatch { .. })
        ));
        assert!(matches!(
            RawConfig::from_yaml("kafka: [unclosed\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_raw_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "kafka:\n  topic: ${NONEXISTENT_TOPIC_98765:-logs}\n").unwrap();

        let raw = RawConfig::from_file(&path).unwrap();
        let topic = raw.get("kafka").and_then(|v| v.get("topic")).and_then(Value::as_str);
        assert_eq!(topic, Some("logs"));

        assert!(matches!(
            RawConfig::from_file(dir.path().join("missing.yaml")),
            Err(ConfigError::IoError(_))
        ));
    }
}
