//! Kafka receiver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::VariantNames;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::component::{ComponentConfig, ComponentId, ComponentSettings, ComponentType, REDACTED};
use crate::config::{ConfigSchema, Field, FieldType, ValidationError};

/// The value of receiver "type" in configuration.
pub const TYPE_STR: &str = "kafka";

/// Default client and consumer group id.
pub const DEFAULT_CLIENT_ID: &str = "otel-collector";

/// Default number of metadata retries.
pub const DEFAULT_METADATA_RETRY_MAX: i64 = 3;

/// Default backoff between metadata retries (250 milliseconds).
pub const DEFAULT_METADATA_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Default offset commit interval (1 second).
pub const DEFAULT_AUTO_COMMIT_INTERVAL: Duration = Duration::from_secs(1);

/// Payload encoding of consumed messages.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    strum_macros::VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Encoding {
    /// OTLP protobuf.
    #[default]
    OtlpProto,
    /// Jaeger protobuf spans.
    JaegerProto,
    /// Jaeger JSON spans.
    JaegerJson,
    /// Zipkin protobuf spans.
    ZipkinProto,
    /// Zipkin JSON spans.
    ZipkinJson,
    /// Zipkin thrift spans.
    ZipkinThrift,
    /// Message body as an opaque log record.
    Raw,
    /// Records passed through without decoding.
    Direct,
}

/// Where a new consumer group starts reading.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    strum_macros::VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InitialOffset {
    #[default]
    Latest,
    Earliest,
}

/// SASL authentication mechanism.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    strum_macros::VariantNames,
)]
pub enum SaslMechanism {
    #[default]
    #[serde(rename = "PLAIN")]
    #[strum(serialize = "PLAIN")]
    Plain,
    #[serde(rename = "SCRAM-SHA-256")]
    #[strum(serialize = "SCRAM-SHA-256")]
    ScramSha256,
    #[serde(rename = "SCRAM-SHA-512")]
    #[strum(serialize = "SCRAM-SHA-512")]
    ScramSha512,
}

/// TLS client material. Paths are checked for readability at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsClientSetting {
    /// CA certificate bundle.
    pub ca_file: Option<String>,
    /// Client certificate.
    pub cert_file: Option<String>,
    /// Client private key.
    pub key_file: Option<String>,
    /// Skip server certificate verification.
    pub insecure_skip_verify: bool,
}

impl TlsClientSetting {
    /// Fields with their configured paths, in declaration order.
    pub fn files(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("ca_file", self.ca_file.as_deref()),
            ("cert_file", self.cert_file.as_deref()),
            ("key_file", self.key_file.as_deref()),
        ]
    }

    fn validate(&self) -> Result<(), ValidationError> {
        for (field, path) in self.files() {
            if path.is_some_and(|p| p.trim().is_empty()) {
                return Err(ValidationError::new(field, "path must not be empty"));
            }
        }
        match (&self.cert_file, &self.key_file) {
            (Some(_), None) => Err(ValidationError::new(
                "key_file",
                "key_file is required when cert_file is set",
            )),
            (None, Some(_)) => Err(ValidationError::new(
                "cert_file",
                "cert_file is required when key_file is set",
            )),
            _ => Ok(()),
        }
    }
}

/// Plain-text username/password authentication.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlainTextConfig {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for PlainTextConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainTextConfig")
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .finish()
    }
}

/// SASL authentication.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaslConfig {
    pub username: String,
    pub password: String,
    pub mechanism: SaslMechanism,
}

impl std::fmt::Debug for SaslConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaslConfig")
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("mechanism", &self.mechanism)
            .finish()
    }
}

/// Masked form of a password. Empty stays empty so a missing value is visible.
fn mask(password: &str) -> String {
    if password.is_empty() {
        String::new()
    } else {
        REDACTED.to_string()
    }
}

fn validate_credentials(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::new("username", "must not be empty"));
    }
    if password.is_empty() {
        return Err(ValidationError::new("password", "must not be empty"));
    }
    Ok(())
}

/// Broker authentication settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Authentication {
    /// TLS client settings.
    pub tls: Option<TlsClientSetting>,
    /// Plain-text credentials.
    pub plain_text: Option<PlainTextConfig>,
    /// SASL credentials.
    pub sasl: Option<SaslConfig>,
}

impl Authentication {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(tls) = &self.tls {
            tls.validate().map_err(|e| e.within("tls"))?;
        }
        if let Some(plain) = &self.plain_text {
            validate_credentials(&plain.username, &plain.password)
                .map_err(|e| e.within("plain_text"))?;
        }
        if let Some(sasl) = &self.sasl {
            validate_credentials(&sasl.username, &sasl.password).map_err(|e| e.within("sasl"))?;
        }
        Ok(())
    }
}

/// Retry policy for cluster metadata requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRetry {
    /// Number of retries after the first attempt.
    pub max: i64,
    /// Wait between attempts.
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
}

impl Default for MetadataRetry {
    fn default() -> Self {
        Self {
            max: DEFAULT_METADATA_RETRY_MAX,
            backoff: DEFAULT_METADATA_RETRY_BACKOFF,
        }
    }
}

/// Cluster metadata settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Fetch metadata for all topics, not only the consumed one.
    pub full: bool,
    /// Retry policy.
    pub retry: MetadataRetry,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            full: true,
            retry: MetadataRetry::default(),
        }
    }
}

/// Offset auto-commit settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoCommit {
    /// Commit consumed offsets periodically.
    pub enable: bool,
    /// Commit period.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for AutoCommit {
    fn default() -> Self {
        Self {
            enable: true,
            interval: DEFAULT_AUTO_COMMIT_INTERVAL,
        }
    }
}

fn default_settings() -> ComponentSettings {
    ComponentSettings::new(ComponentId::new(ComponentType::from_static(TYPE_STR)))
}

/// Configuration for the Kafka receiver.
///
/// Ships with an empty topic and no brokers: both must be configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaReceiverConfig {
    /// Identity-derived base settings.
    #[serde(skip, default = "default_settings")]
    pub settings: ComponentSettings,
    /// Topic to consume.
    pub topic: String,
    /// Payload encoding.
    pub encoding: Encoding,
    /// Bootstrap brokers as `host:port`.
    pub brokers: Vec<String>,
    /// Client id reported to the brokers.
    pub client_id: String,
    /// Consumer group id.
    pub group_id: String,
    /// Starting offset for a new consumer group.
    pub initial_offset: InitialOffset,
    /// Broker authentication.
    pub authentication: Authentication,
    /// Cluster metadata settings.
    pub metadata: Metadata,
    /// Offset auto-commit settings.
    pub auto_commit: AutoCommit,
}

impl Default for KafkaReceiverConfig {
    fn default() -> Self {
        Self {
            settings: default_settings(),
            topic: String::new(),
            encoding: Encoding::default(),
            brokers: Vec::new(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            group_id: DEFAULT_CLIENT_ID.to_string(),
            initial_offset: InitialOffset::default(),
            authentication: Authentication::default(),
            metadata: Metadata::default(),
            auto_commit: AutoCommit::default(),
        }
    }
}

impl KafkaReceiverConfig {
    /// Declared fields.
    pub fn schema() -> ConfigSchema {
        let credentials = || vec![Field::string("username"), Field::string("password")];
        let mut sasl = credentials();
        sasl.push(Field::one_of("mechanism", SaslMechanism::VARIANTS));

        ConfigSchema::new(vec![
            Field::string("topic"),
            Field::one_of("encoding", Encoding::VARIANTS),
            Field::list("brokers", FieldType::String),
            Field::string("client_id"),
            Field::string("group_id"),
            Field::one_of("initial_offset", InitialOffset::VARIANTS),
            Field::record(
                "authentication",
                vec![
                    Field::optional(
                        "tls",
                        vec![
                            Field::string("ca_file"),
                            Field::string("cert_file"),
                            Field::string("key_file"),
                            Field::bool("insecure_skip_verify"),
                        ],
                    ),
                    Field::optional("plain_text", credentials()),
                    Field::optional("sasl", sasl),
                ],
            ),
            Field::record(
                "metadata",
                vec![
                    Field::bool("full"),
                    Field::record(
                        "retry",
                        vec![Field::int("max"), Field::duration("backoff")],
                    ),
                ],
            ),
            Field::record(
                "auto_commit",
                vec![Field::bool("enable"), Field::duration("interval")],
            ),
        ])
    }

    /// Set the topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the bootstrap brokers.
    pub fn with_brokers<I, S>(mut self, brokers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.brokers = brokers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the payload encoding.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set TLS client settings.
    pub fn with_tls(mut self, tls: TlsClientSetting) -> Self {
        self.authentication.tls = Some(tls);
        self
    }
}

/// Check that a broker address is `host:port` with a numeric port.
fn validate_broker(broker: &str) -> Result<(), String> {
    let Some((host, port)) = broker.rsplit_once(':') else {
        return Err(format!("expected host:port, got '{broker}'"));
    };
    if host.trim().is_empty() {
        return Err(format!("missing host in '{broker}'"));
    }
    port.parse::<u16>()
        .map_err(|_| format!("invalid port in '{broker}'"))?;
    Ok(())
}

impl ComponentConfig for KafkaReceiverConfig {
    fn settings(&self) -> &ComponentSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut ComponentSettings {
        &mut self.settings
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(ValidationError::new("topic", "must not be empty"));
        }

        if self.brokers.is_empty() {
            return Err(ValidationError::new("brokers", "at least one broker is required"));
        }
        for (i, broker) in self.brokers.iter().enumerate() {
            validate_broker(broker).map_err(|reason| {
                ValidationError::new(format!("brokers[{i}]"), reason)
            })?;
        }

        if self.client_id.trim().is_empty() {
            return Err(ValidationError::new("client_id", "must not be empty"));
        }
        if self.group_id.trim().is_empty() {
            return Err(ValidationError::new("group_id", "must not be empty"));
        }

        self.authentication
            .validate()
            .map_err(|e| e.within("authentication"))?;

        if self.metadata.retry.max < 0 {
            return Err(ValidationError::new(
                "metadata.retry.max",
                "must be non-negative",
            ));
        }

        if self.auto_commit.enable && self.auto_commit.interval.is_zero() {
            return Err(ValidationError::new(
                "auto_commit.interval",
                "must be positive when auto_commit is enabled",
            ));
        }

        Ok(())
    }

    fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(plain) = copy.authentication.plain_text.as_mut() {
            plain.password = mask(&plain.password);
        }
        if let Some(sasl) = copy.authentication.sasl.as_mut() {
            sasl.password = mask(&sasl.password);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> KafkaReceiverConfig {
        KafkaReceiverConfig::default()
            .with_topic("spans")
            .with_brokers(["foo:123", "bar:456"])
    }

    #[test]
    fn test_default_config() {
        let config = KafkaReceiverConfig::default();
        assert_eq!(config.settings.id().to_string(), "kafka");
        assert!(config.topic.is_empty());
        assert!(config.brokers.is_empty());
        assert_eq!(config.encoding, Encoding::OtlpProto);
        assert_eq!(config.client_id, "otel-collector");
        assert_eq!(config.group_id, "otel-collector");
        assert!(config.metadata.full);
        assert_eq!(config.metadata.retry.max, 3);
        assert_eq!(config.metadata.retry.backoff, Duration::from_millis(250));
        assert!(config.auto_commit.enable);
        assert_eq!(config.auto_commit.interval, Duration::from_secs(1));
        assert_eq!(config.authentication, Authentication::default());
    }

    #[test]
    fn test_default_config_is_invalid() {
        let err = KafkaReceiverConfig::default().validate().unwrap_err();
        assert_eq!(err.field, "topic");

        let err = KafkaReceiverConfig::default()
            .with_topic("spans")
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "brokers");
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_broker_format() {
        let err = valid().with_brokers(["foo:123", "bar"]).validate().unwrap_err();
        assert_eq!(err.field, "brokers[1]");

        let err = valid().with_brokers([":9092"]).validate().unwrap_err();
        assert!(err.reason.contains("missing host"));

        let err = valid().with_brokers(["foo:http"]).validate().unwrap_err();
        assert!(err.reason.contains("invalid port"));

        assert!(valid().with_brokers(["[::1]:9092"]).validate().is_ok());
    }

    #[test]
    fn test_negative_retry_max() {
        let mut config = valid();
        config.metadata.retry.max = -1;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "metadata.retry.max");
    }

    #[test]
    fn test_auto_commit_interval() {
        let mut config = valid();
        config.auto_commit.interval = Duration::ZERO;
        assert_eq!(config.validate().unwrap_err().field, "auto_commit.interval");

        config.auto_commit.enable = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tls_paths() {
        let config = valid().with_tls(TlsClientSetting {
            ca_file: Some(String::new()),
            ..TlsClientSetting::default()
        });
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "authentication.tls.ca_file");

        let config = valid().with_tls(TlsClientSetting {
            cert_file: Some("cert.pem".to_string()),
            ..TlsClientSetting::default()
        });
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "authentication.tls.key_file");

        // Existence is not checked here.
        let config = valid().with_tls(TlsClientSetting {
            ca_file: Some("/does/not/exist/ca.pem".to_string()),
            cert_file: Some("cert.pem".to_string()),
            key_file: Some("key.pem".to_string()),
            insecure_skip_verify: false,
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials() {
        let mut config = valid();
        config.authentication.sasl = Some(SaslConfig {
            username: "otel".to_string(),
            password: String::new(),
            mechanism: SaslMechanism::ScramSha512,
        });
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "authentication.sasl.password");

        config.authentication.sasl = None;
        config.authentication.plain_text = Some(PlainTextConfig::default());
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "authentication.plain_text.username");
    }

    #[test]
    fn test_credentials_are_masked_for_display() {
        let mut config = valid();
        config.authentication.sasl = Some(SaslConfig {
            username: "otel".to_string(),
            password: "hunter2".to_string(),
            mechanism: SaslMechanism::Plain,
        });
        config.authentication.plain_text = Some(PlainTextConfig {
            username: "otel".to_string(),
            password: "s3cret".to_string(),
        });

        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("otel"));

        let json = crate::component::AnyConfig::new(config.clone())
            .to_json()
            .unwrap();
        assert_eq!(json["authentication"]["sasl"]["password"], REDACTED);
        assert_eq!(json["authentication"]["plain_text"]["password"], REDACTED);
        assert!(!json.to_string().contains("hunter2"));

        // The config itself keeps the real values for construction.
        assert_eq!(config.authentication.sasl.unwrap().password, "hunter2");
    }

    #[test]
    fn test_enum_names_match_serde() {
        assert!(Encoding::VARIANTS.contains(&"otlp_proto"));
        assert!(Encoding::VARIANTS.contains(&"direct"));
        assert_eq!(SaslMechanism::VARIANTS, &["PLAIN", "SCRAM-SHA-256", "SCRAM-SHA-512"]);
        assert_eq!(
            serde_yaml::to_string(&SaslMechanism::ScramSha256).unwrap().trim(),
            "SCRAM-SHA-256"
        );
        assert_eq!("zipkin_json".parse::<Encoding>().unwrap(), Encoding::ZipkinJson);
    }
}
