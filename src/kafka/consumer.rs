use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::config::{ClientConfig, RDKafkaLogLevel};
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::Message;
use tracing::{debug, info};

use crate::config::KafkaConfig;
use crate::{Error, Result};

/// Topic reported for transport errors that are not tied to a topic.
pub const UNKNOWN_TOPIC: &str = "<unknown>";

/// A message as seen by the follower: either a payload or a transport error.
#[derive(Debug, Clone)]
pub struct StreamMessage {
    pub topic: String,
    pub payload: Option<Bytes>,
    pub error: Option<String>,
}

impl StreamMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: Some(payload.into()),
            error: None,
        }
    }

    pub fn failed(topic: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: None,
            error: Some(error.into()),
        }
    }
}

/// One live connection to the broker.
#[async_trait]
pub trait StreamClient: Send {
    async fn subscribe(&mut self, topics: &[String]) -> Result<()>;

    /// Waits up to `timeout` for the next message.
    ///
    /// `Ok(None)` means nothing arrived in time. Per-message problems come
    /// back as a [`StreamMessage`] carrying an error; `Err` is reserved for
    /// failures of the connection itself.
    async fn poll(&mut self, timeout: Duration) -> Result<Option<StreamMessage>>;
}

/// Creates a fresh [`StreamClient`] for every connection attempt.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    type Client: StreamClient;

    async fn connect(&self) -> Result<Self::Client>;
}

pub struct KafkaConnector {
    config: KafkaConfig,
}

impl KafkaConnector {
    pub fn new(config: KafkaConfig) -> Self {
        Self { config }
    }

    pub(crate) fn client_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", self.config.brokers.join(","))
            .set("group.id", &self.config.group_id)
            .set("security.protocol", &self.config.security_protocol)
            .set("sasl.mechanism", &self.config.sasl_mechanism)
            .set_log_level(RDKafkaLogLevel::Warning);

        if let Some(username) = &self.config.sasl_username {
            client_config.set("sasl.username", username);
        }
        if let Some(password) = &self.config.sasl_password {
            client_config.set("sasl.password", password);
        }
        if let Some(ca_location) = &self.config.ssl_ca_location {
            client_config.set("ssl.ca.location", ca_location);
        }
        if let Some(offset_reset) = &self.config.auto_offset_reset {
            client_config.set("auto.offset.reset", offset_reset);
        }
        client_config
    }
}

#[async_trait]
impl StreamConnector for KafkaConnector {
    type Client = KafkaStreamClient;

    async fn connect(&self) -> Result<KafkaStreamClient> {
        info!(brokers = ?self.config.brokers, group_id = %self.config.group_id, "Connecting to Kafka broker");
        let consumer: StreamConsumer = self.client_config().create()?;
        Ok(KafkaStreamClient { consumer })
    }
}

pub struct KafkaStreamClient {
    consumer: StreamConsumer,
}

#[async_trait]
impl StreamClient for KafkaStreamClient {
    async fn subscribe(&mut self, topics: &[String]) -> Result<()> {
        let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
        self.consumer.subscribe(&topics)?;
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<StreamMessage>> {
        let received = match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Ok(received) => received,
            Err(_) => return Ok(None),
        };

        match received {
            Ok(message) => Ok(Some(StreamMessage {
                topic: message.topic().to_string(),
                payload: message.payload().map(Bytes::copy_from_slice),
                error: None,
            })),
            Err(e) => classify_error(e).map(Some),
        }
    }
}

/// Splits a `recv` error into a per-message failure and a connection failure.
///
/// librdkafka does not say which topic a consumer error belongs to, so
/// per-message failures carry [`UNKNOWN_TOPIC`].
pub(crate) fn classify_error(error: KafkaError) -> Result<StreamMessage> {
    if is_connection_error(&error) {
        return Err(Error::Kafka(error));
    }
    debug!("Message level error from Kafka: {:?}", error);
    Ok(StreamMessage::failed(UNKNOWN_TOPIC, error.to_string()))
}

/// Errors after which the consumer has to be rebuilt rather than polled again.
pub fn is_connection_error(error: &KafkaError) -> bool {
    matches!(
        error.rdkafka_error_code(),
        Some(
            RDKafkaErrorCode::AllBrokersDown
                | RDKafkaErrorCode::Authentication
                | RDKafkaErrorCode::SaslAuthenticationFailed
                | RDKafkaErrorCode::Fatal
        )
    )
}
