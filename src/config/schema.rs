//! Field declarations used to overlay and coerce raw configuration.
//!
//! A [`ConfigSchema`] lists the fields a component accepts and the semantic
//! type of each one. The loader walks user input against it: unknown keys are
//! detected, scalars are coerced, and nested records are merged field by field.

use std::fmt;

use serde_yaml::Value;

use super::validation::{ConfigError, format_duration, parse_duration};

/// Semantic type of a configuration field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Free-form string. Numbers and booleans are accepted and stringified.
    String,
    /// Signed integer. Numeric strings are accepted.
    Int,
    /// Boolean. `"true"`/`"false"` strings are accepted.
    Bool,
    /// Duration in humantime form (`5s`, `250ms`, `1m30s`).
    Duration,
    /// One of a fixed set of strings.
    Enum(&'static [&'static str]),
    /// Sequence of values of the inner type. Replaced wholesale on overlay.
    List(Box<FieldType>),
    /// Nested record, merged field by field.
    Record(Vec<Field>),
    /// Nested record that may be absent (`null`).
    Optional(Vec<Field>),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Int => f.write_str("int"),
            Self::Bool => f.write_str("bool"),
            Self::Duration => f.write_str("duration"),
            Self::Enum(options) => write!(f, "one of [{}]", options.join(", ")),
            Self::List(inner) => write!(f, "list of {inner}"),
            Self::Record(_) => f.write_str("record"),
            Self::Optional(_) => f.write_str("record or null"),
        }
    }
}

impl FieldType {
    /// Coerce a user-supplied value into this type.
    ///
    /// Records are passed through untouched when they are mappings; merging
    /// them is the loader's job.
    pub fn coerce(&self, value: Value, path: &str) -> Result<Value, ConfigError> {
        let mismatch = || ConfigError::TypeMismatch {
            field: path.to_string(),
            expected: self.to_string(),
        };

        match (self, value) {
            (Self::String, Value::String(s)) => Ok(Value::String(s)),
            (Self::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (Self::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),

            (Self::Int, Value::Number(n)) => n.as_i64().map(Value::from).ok_or_else(mismatch),
            (Self::Int, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| mismatch()),

            (Self::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (Self::Bool, Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            (Self::Bool, Value::String(s)) if s.eq_ignore_ascii_case("false") => {
                Ok(Value::Bool(false))
            }

            (Self::Duration, Value::String(s)) => parse_duration(&s)
                .map(|d| Value::String(format_duration(d)))
                .map_err(|_| mismatch()),

            (Self::Enum(options), Value::String(s)) if options.iter().any(|o| *o == s.as_str()) => {
                Ok(Value::String(s))
            }

            (Self::List(inner), Value::Sequence(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| inner.coerce(item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),

            (Self::Record(_) | Self::Optional(_), Value::Mapping(m)) => Ok(Value::Mapping(m)),
            (Self::Optional(_), Value::Null) => Ok(Value::Null),

            _ => Err(mismatch()),
        }
    }
}

/// A named field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Key as it appears in the document.
    pub name: &'static str,
    /// Declared semantic type.
    pub field_type: FieldType,
}

impl Field {
    /// Declare a field of any type.
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self { name, field_type }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, FieldType::Int)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn duration(name: &'static str) -> Self {
        Self::new(name, FieldType::Duration)
    }

    pub fn one_of(name: &'static str, options: &'static [&'static str]) -> Self {
        Self::new(name, FieldType::Enum(options))
    }

    pub fn list(name: &'static str, inner: FieldType) -> Self {
        Self::new(name, FieldType::List(Box::new(inner)))
    }

    pub fn record(name: &'static str, fields: Vec<Field>) -> Self {
        Self::new(name, FieldType::Record(fields))
    }

    pub fn optional(name: &'static str, fields: Vec<Field>) -> Self {
        Self::new(name, FieldType::Optional(fields))
    }
}

/// Declared shape of one component type's configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSchema {
    fields: Vec<Field>,
}

impl ConfigSchema {
    /// Create a schema from its top-level fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Top-level fields.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a top-level field by key.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCODINGS: &[&str] = &["otlp_proto", "direct"];

    fn expected_of(err: ConfigError) -> (String, String) {
        match err {
            ConfigError::TypeMismatch { field, expected } => (field, expected),
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_coerce_string_weak() {
        let v = FieldType::String.coerce(Value::from(123), "client_id").unwrap();
        assert_eq!(v, Value::String("123".into()));
        let v = FieldType::String.coerce(Value::Bool(true), "client_id").unwrap();
        assert_eq!(v, Value::String("true".into()));
        assert!(FieldType::String.coerce(Value::Sequence(vec![]), "client_id").is_err());
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(FieldType::Int.coerce(Value::from(10), "max").unwrap(), Value::from(10));
        assert_eq!(
            FieldType::Int.coerce(Value::String(" 20 ".into()), "max").unwrap(),
            Value::from(20)
        );
        let (field, expected) =
            expected_of(FieldType::Int.coerce(Value::String("ten".into()), "retry.max").unwrap_err());
        assert_eq!(field, "retry.max");
        assert_eq!(expected, "int");
        assert!(FieldType::Int.coerce(Value::from(1.5), "max").is_err());
    }

    #[test]
    fn test_coerce_bool() {
        assert_eq!(
            FieldType::Bool.coerce(Value::String("TRUE".into()), "full").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            FieldType::Bool.coerce(Value::String("false".into()), "full").unwrap(),
            Value::Bool(false)
        );
        assert!(FieldType::Bool.coerce(Value::String("yes".into()), "full").is_err());
        assert!(FieldType::Bool.coerce(Value::from(1), "full").is_err());
    }

    #[test]
    fn test_coerce_duration_normalizes() {
        let v = FieldType::Duration.coerce(Value::String("1000ms".into()), "interval").unwrap();
        assert_eq!(v, Value::String("1s".into()));

        let (_, expected) = expected_of(
            FieldType::Duration
                .coerce(Value::String("soon".into()), "interval")
                .unwrap_err(),
        );
        assert_eq!(expected, "duration");
        assert!(FieldType::Duration.coerce(Value::from(5), "interval").is_err());
    }

    #[test]
    fn test_coerce_enum() {
        let ty = FieldType::Enum(ENCODINGS);
        assert!(ty.coerce(Value::String("direct".into()), "encoding").is_ok());
        let (field, expected) =
            expected_of(ty.coerce(Value::String("avro".into()), "encoding").unwrap_err());
        assert_eq!(field, "encoding");
        assert_eq!(expected, "one of [otlp_proto, direct]");
    }

    #[test]
    fn test_coerce_list_reports_index() {
        let ty = FieldType::List(Box::new(FieldType::String));
        let items = Value::Sequence(vec![Value::String("foo:123".into()), Value::Sequence(vec![])]);
        let (field, expected) = expected_of(ty.coerce(items, "brokers").unwrap_err());
        assert_eq!(field, "brokers[1]");
        assert_eq!(expected, "string");

        assert!(ty.coerce(Value::String("foo:123".into()), "brokers").is_err());
    }

    #[test]
    fn test_coerce_optional_accepts_null() {
        let ty = FieldType::Optional(vec![Field::string("ca_file")]);
        assert_eq!(ty.coerce(Value::Null, "tls").unwrap(), Value::Null);
        assert!(FieldType::Record(vec![]).coerce(Value::Null, "metadata").is_err());
    }

    #[test]
    fn test_schema_field_lookup() {
        let schema = ConfigSchema::new(vec![Field::string("topic"), Field::one_of("encoding", ENCODINGS)]);
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.field("encoding").unwrap().field_type, FieldType::Enum(ENCODINGS));
        assert!(schema.field("brokers").is_none());
    }
}
