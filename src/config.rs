//! Configuration module.
//!
//! Turns untyped YAML documents into typed, validated component configs:
//! - [`RawConfig`]: format-agnostic document tree with `${VAR}` expansion
//! - [`ConfigSchema`]: declared fields and semantic types of one component type
//! - [`ConfigLoader`]: defaults, overlay, coercion and validation per identity
//! - [`CollectorConfig`]: whole document with extension and receiver sections

mod document;
mod loader;
mod schema;
mod validation;

pub use document::{CollectorConfig, SECTIONS, ServiceConfig};
pub use loader::{ConfigLoader, RawConfig};
pub use schema::{ConfigSchema, Field, FieldType};
pub use validation::{ConfigError, ValidationError, expand_env_vars, format_duration, parse_duration};
