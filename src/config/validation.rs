//! Configuration errors and validation utilities.

use std::time::Duration;

use thiserror::Error;

use crate::component::ComponentKind;

/// Configuration error types.
///
/// Every variant describes a defect in the configuration document or in the
/// way factories were registered; none of them is worth retrying.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Malformed component identity (`type` or `type/name`).
    #[error("invalid component id '{id}': {reason}")]
    InvalidId {
        /// The offending text.
        id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No factory registered for the requested type.
    #[error("unknown {kind} type '{component_type}'")]
    UnknownType {
        /// Section the lookup was made in.
        kind: ComponentKind,
        /// Requested type token.
        component_type: String,
    },

    /// A factory for this type was already registered.
    #[error("duplicate {kind} type '{component_type}'")]
    DuplicateType {
        /// Section of the conflicting registration.
        kind: ComponentKind,
        /// Conflicting type token.
        component_type: String,
    },

    /// A scalar could not be coerced into the declared field type.
    #[error("'{field}': expected {expected}")]
    TypeMismatch {
        /// Dotted path of the field.
        field: String,
        /// Human-readable name of the declared type.
        expected: String,
    },

    /// A key that the component does not declare (strict mode only).
    #[error("'{field}': unknown field")]
    UnknownField {
        /// Dotted path of the key.
        field: String,
    },

    /// Merged configuration is semantically invalid.
    #[error("config validation error: {0}")]
    ValidationError(#[from] ValidationError),

    /// Coerced tree did not decode into the typed config.
    #[error("failed to decode '{id}': {reason}")]
    Decode {
        /// Identity being loaded.
        id: String,
        /// Decoder message.
        reason: String,
    },

    /// Error raised while loading one component of a larger document.
    #[error("{kind} '{id}': {source}")]
    Component {
        /// Section of the component.
        kind: ComponentKind,
        /// Identity text of the component.
        id: String,
        /// Underlying error.
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    /// Attach component context to an error raised while loading `id`.
    pub fn in_component(self, kind: ComponentKind, id: impl Into<String>) -> Self {
        Self::Component {
            kind,
            id: id.into(),
            source: Box::new(self),
        }
    }
}

/// A semantically invalid field in a merged configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// Dotted path of the field (e.g. `metadata.retry.max`).
    pub field: String,
    /// Human-readable reason.
    pub reason: String,
}

impl ValidationError {
    /// Create a validation error for `field`.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Prefix the field path with the enclosing record's name.
    #[must_use]
    pub fn within(mut self, parent: &str) -> Self {
        self.field = if self.field.is_empty() {
            parent.to_string()
        } else {
            format!("{parent}.{}", self.field)
        };
        self
    }
}

/// Parse a humantime duration such as `250ms`, `5s` or `1h30m`.
///
/// A bare number without a unit is rejected.
///
/// # Examples
///
/// ```
/// use collector_factory::config::parse_duration;
///
/// assert_eq!(parse_duration("30s").unwrap().as_secs(), 30);
/// assert_eq!(parse_duration("1m").unwrap().as_secs(), 60);
/// assert_eq!(parse_duration("250ms").unwrap().as_millis(), 250);
/// assert_eq!(parse_duration("1h30m").unwrap().as_secs(), 5400);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Render a duration in the canonical humantime form (`5s`, `250ms`).
pub fn format_duration(d: Duration) -> String {
    humantime::format_duration(d).to_string()
}

/// Substitute `${VAR}` and `${VAR:-default}` references from the process
/// environment. Unset variables without a default expand to nothing.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}
