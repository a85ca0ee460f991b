//! `kafka` receiver factory.

use tokio_util::sync::CancellationToken;

use crate::component::{
    Component, ComponentError, ComponentId, ComponentKind, ComponentSettings, ComponentType,
    CreateSettings, Factory, StabilityLevel,
};
use crate::config::ConfigSchema;

use super::config::{KafkaReceiverConfig, TYPE_STR};
use super::receiver::KafkaReceiver;

/// Factory for the Kafka receiver.
#[derive(Debug, Clone)]
pub struct KafkaReceiverFactory {
    component_type: ComponentType,
    schema: ConfigSchema,
}

impl KafkaReceiverFactory {
    pub fn new() -> Self {
        Self {
            component_type: ComponentType::from_static(TYPE_STR),
            schema: KafkaReceiverConfig::schema(),
        }
    }
}

impl Default for KafkaReceiverFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Factory for KafkaReceiverFactory {
    type Config = KafkaReceiverConfig;

    fn kind(&self) -> ComponentKind {
        ComponentKind::Receiver
    }

    fn component_type(&self) -> &ComponentType {
        &self.component_type
    }

    fn stability(&self) -> StabilityLevel {
        StabilityLevel::Beta
    }

    fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    fn create_default_config(&self) -> KafkaReceiverConfig {
        KafkaReceiverConfig {
            settings: ComponentSettings::new(ComponentId::new(self.component_type.clone())),
            ..KafkaReceiverConfig::default()
        }
    }

    async fn create(
        &self,
        cancel: &CancellationToken,
        settings: CreateSettings,
        config: &KafkaReceiverConfig,
    ) -> Result<Box<dyn Component>, ComponentError> {
        let receiver = KafkaReceiver::new(cancel, settings, config).await?;
        tracing::debug!(
            component = %receiver.id(),
            brokers = receiver.brokers().len(),
            "Kafka receiver created"
        );
        Ok(Box::new(receiver))
    }
}
