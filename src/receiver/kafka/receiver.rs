//! Kafka receiver instance.
//!
//! Construction does the operational work: TLS material is read from disk
//! and broker addresses are resolved. Consuming messages is left to the
//! pipeline the host wires the receiver into.

use std::any::Any;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use crate::component::{Component, ComponentError, ComponentId, CreateSettings};

use super::config::{Encoding, KafkaReceiverConfig, MetadataRetry, TlsClientSetting};

/// TLS material loaded at construction.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    /// CA bundle bytes.
    pub ca: Option<Vec<u8>>,
    /// Client certificate bytes.
    pub cert: Option<Vec<u8>>,
    /// Client key bytes.
    pub key: Option<Vec<u8>>,
    /// Skip server certificate verification.
    pub insecure_skip_verify: bool,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("ca", &self.ca.as_ref().map(Vec::len))
            .field("cert", &self.cert.as_ref().map(Vec::len))
            .field("key", &self.key.is_some())
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

/// Receiver consuming telemetry from a Kafka topic.
pub struct KafkaReceiver {
    id: ComponentId,
    topic: String,
    encoding: Encoding,
    group_id: String,
    client_id: String,
    brokers: Vec<SocketAddr>,
    tls: Option<TlsMaterial>,
    span: tracing::Span,
    running: AtomicBool,
}

impl std::fmt::Debug for KafkaReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaReceiver")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("encoding", &self.encoding)
            .field("brokers", &self.brokers)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl KafkaReceiver {
    pub(crate) async fn new(
        cancel: &CancellationToken,
        settings: CreateSettings,
        config: &KafkaReceiverConfig,
    ) -> Result<Self, ComponentError> {
        let CreateSettings { id, telemetry, .. } = settings;
        let span = telemetry.span;

        let tls = match &config.authentication.tls {
            Some(tls) => Some(load_tls(&id, tls).await?),
            None => None,
        };

        let mut brokers = Vec::with_capacity(config.brokers.len());
        for broker in &config.brokers {
            let resolved = resolve_broker(cancel, &id, broker, &config.metadata.retry).await?;
            tracing::debug!(
                parent: &span,
                broker = %broker,
                addresses = resolved.len(),
                "Broker resolved"
            );
            brokers.extend(resolved);
        }

        Ok(Self {
            id,
            topic: config.topic.clone(),
            encoding: config.encoding,
            group_id: config.group_id.clone(),
            client_id: config.client_id.clone(),
            brokers,
            tls,
            span,
            running: AtomicBool::new(false),
        })
    }

    /// Identity of this receiver.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Resolved broker addresses, in configuration order.
    pub fn brokers(&self) -> &[SocketAddr] {
        &self.brokers
    }

    /// TLS material, when TLS is configured.
    pub fn tls(&self) -> Option<&TlsMaterial> {
        self.tls.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

async fn read_optional(
    id: &ComponentId,
    field: &str,
    path: Option<&str>,
) -> Result<Option<Vec<u8>>, ComponentError> {
    let Some(path) = path else {
        return Ok(None);
    };
    tokio::fs::read(Path::new(path))
        .await
        .map(Some)
        .map_err(|e| ComponentError::construction(id, format!("reading {field} '{path}'"), e))
}

async fn load_tls(
    id: &ComponentId,
    tls: &TlsClientSetting,
) -> Result<TlsMaterial, ComponentError> {
    Ok(TlsMaterial {
        ca: read_optional(id, "ca_file", tls.ca_file.as_deref()).await?,
        cert: read_optional(id, "cert_file", tls.cert_file.as_deref()).await?,
        key: read_optional(id, "key_file", tls.key_file.as_deref()).await?,
        insecure_skip_verify: tls.insecure_skip_verify,
    })
}

/// Resolve one `host:port` broker, retrying failed lookups.
async fn resolve_broker(
    cancel: &CancellationToken,
    id: &ComponentId,
    broker: &str,
    retry: &MetadataRetry,
) -> Result<Vec<SocketAddr>, ComponentError> {
    let retries = u64::try_from(retry.max).unwrap_or(0);
    let mut attempt: u64 = 0;

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ComponentError::Cancelled { id: id.to_string() });
            }
            result = tokio::net::lookup_host(broker) => result,
        };

        let err = match result {
            Ok(addrs) => {
                let addrs: Vec<SocketAddr> = addrs.collect();
                if !addrs.is_empty() {
                    return Ok(addrs);
                }
                std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found")
            }
            Err(e) => e,
        };

        if attempt >= retries {
            return Err(ComponentError::construction(
                id,
                format!("resolving broker '{broker}'"),
                err,
            ));
        }
        attempt += 1;

        tracing::warn!(
            component = %id,
            broker = %broker,
            attempt,
            backoff = ?retry.backoff,
            error = %err,
            "Broker lookup failed, retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ComponentError::Cancelled { id: id.to_string() });
            }
            _ = tokio::time::sleep(retry.backoff) => {}
        }
    }
}

#[async_trait::async_trait]
impl Component for KafkaReceiver {
    async fn start(&self) -> Result<(), ComponentError> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!(parent: &self.span, "Receiver already running");
            return Ok(());
        }
        tracing::info!(
            parent: &self.span,
            topic = %self.topic,
            group_id = %self.group_id,
            encoding = %self.encoding,
            brokers = self.brokers.len(),
            "Receiver started"
        );
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ComponentError> {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!(parent: &self.span, "Receiver stopped");
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::component::{ComponentKind, ComponentType};

    fn settings(name: &str) -> CreateSettings {
        let id = ComponentId::with_name(ComponentType::from_static("kafka"), name).unwrap();
        CreateSettings::new(ComponentKind::Receiver, id)
    }

    fn config() -> KafkaReceiverConfig {
        KafkaReceiverConfig::default()
            .with_topic("spans")
            .with_brokers(["127.0.0.1:9092", "127.0.0.1:9093"])
    }

    #[tokio::test]
    async fn test_new_resolves_brokers() {
        let receiver = KafkaReceiver::new(&CancellationToken::new(), settings(""), &config())
            .await
            .unwrap();
        assert_eq!(receiver.id().to_string(), "kafka");
        assert_eq!(receiver.topic(), "spans");
        assert_eq!(receiver.brokers().len(), 2);
        assert_eq!(receiver.brokers()[1].port(), 9093);
        assert!(receiver.tls().is_none());
    }

    #[tokio::test]
    async fn test_new_reads_tls_files() {
        let dir = TempDir::new().unwrap();
        let ca = dir.path().join("ca.pem");
        std::fs::write(&ca, b"ca-bytes").unwrap();

        let config = config().with_tls(TlsClientSetting {
            ca_file: Some(ca.display().to_string()),
            insecure_skip_verify: true,
            ..TlsClientSetting::default()
        });
        let receiver = KafkaReceiver::new(&CancellationToken::new(), settings("tls"), &config)
            .await
            .unwrap();

        let tls = receiver.tls().unwrap();
        assert_eq!(tls.ca.as_deref(), Some(&b"ca-bytes"[..]));
        assert!(tls.cert.is_none());
        assert!(tls.insecure_skip_verify);
    }

    #[tokio::test]
    async fn test_missing_tls_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.pem");
        let config = config().with_tls(TlsClientSetting {
            ca_file: Some(missing.display().to_string()),
            ..TlsClientSetting::default()
        });

        let err = KafkaReceiver::new(&CancellationToken::new(), settings(""), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ComponentError::Construction { .. }));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("ca_file"));
    }

    #[tokio::test]
    async fn test_cancelled_before_resolution() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = KafkaReceiver::new(&cancel, settings(""), &config())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_unparseable_broker_exhausts_retries() {
        let mut config = config().with_brokers(["not-an-address"]);
        config.metadata.retry.max = 1;
        config.metadata.retry.backoff = Duration::from_millis(1);

        let err = KafkaReceiver::new(&CancellationToken::new(), settings(""), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ComponentError::Construction { .. }));
        assert!(err.to_string().contains("not-an-address"));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let receiver = KafkaReceiver::new(&CancellationToken::new(), settings(""), &config())
            .await
            .unwrap();
        assert!(!receiver.is_running());

        receiver.start().await.unwrap();
        receiver.start().await.unwrap();
        assert!(receiver.is_running());

        receiver.shutdown().await.unwrap();
        assert!(!receiver.is_running());
        receiver.shutdown().await.unwrap();
    }
}
