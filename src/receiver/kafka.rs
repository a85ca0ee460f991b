//! Kafka receiver.
//!
//! Consumes telemetry from a topic. Defaults carry no topic and no brokers,
//! so every instance must configure both.

mod config;
mod factory;
mod receiver;

pub use config::{
    AutoCommit, Authentication, DEFAULT_AUTO_COMMIT_INTERVAL, DEFAULT_CLIENT_ID,
    DEFAULT_METADATA_RETRY_BACKOFF, DEFAULT_METADATA_RETRY_MAX, Encoding, InitialOffset,
    KafkaReceiverConfig, Metadata, MetadataRetry, PlainTextConfig, SaslConfig, SaslMechanism,
    TYPE_STR, TlsClientSetting,
};
pub use factory::KafkaReceiverFactory;
pub use receiver::{KafkaReceiver, TlsMaterial};
