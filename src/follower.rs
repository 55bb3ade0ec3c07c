//! Stream follower: keeps the ingestion queue fed from the broker.
//!
//! An outer loop makes up to `max_retries` connection attempts. Each attempt
//! connects, subscribes to the configured topics and polls until a
//! connection level error escapes; the follower then waits a fixed delay and
//! starts over with a brand new client. Problems with individual messages
//! never leave the poll loop.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::ConsumerConfig;
use crate::kafka::{StreamClient, StreamConnector, StreamMessage};
use crate::queue::ReadingSender;
use crate::reading::{RawEvent, SensorReading};
use crate::{Error, Result};

/// What happened to a single polled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Enqueued,
    Dropped,
}

pub struct Follower<C> {
    connector: C,
    queue: ReadingSender,
    topics: Vec<String>,
    max_retries: u32,
    retry_delay: Duration,
    poll_timeout: Duration,
}

impl<C: StreamConnector> Follower<C> {
    pub fn new(
        connector: C,
        queue: ReadingSender,
        topics: Vec<String>,
        config: &ConsumerConfig,
    ) -> Self {
        Self {
            connector,
            queue,
            topics,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            poll_timeout: config.poll_timeout(),
        }
    }

    /// Follows the stream until the retry budget is spent or the queue
    /// closes. The poll loop has no other exit, so this only returns errors.
    pub async fn run(&self) -> Result<()> {
        for attempt in 1..=self.max_retries {
            match self.follow().await {
                Err(Error::QueueClosed) => {
                    error!("Ingestion queue closed, stopping follower");
                    return Err(Error::QueueClosed);
                }
                Err(e) => {
                    error!(attempt, max_retries = self.max_retries, "Stream consumer failed: {}", e);
                }
                Ok(()) => return Ok(()),
            }

            if attempt < self.max_retries {
                debug!(
                    attempt,
                    "Attempting to reconnect in {}s",
                    self.retry_delay.as_secs_f64()
                );
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(Error::RetriesExhausted {
            attempts: self.max_retries,
        })
    }

    async fn follow(&self) -> Result<()> {
        let mut client = self.connector.connect().await?;
        info!("Successfully connected to Kafka broker");

        client.subscribe(&self.topics).await?;
        info!(topics = ?self.topics, "Subscribed to topics, waiting for messages");

        loop {
            let Some(message) = client.poll(self.poll_timeout).await? else {
                continue;
            };
            self.handle_message(message)?;
        }
    }

    /// Decodes, normalizes and enqueues one message. Only a closed queue is
    /// an error; bad messages are logged and dropped.
    pub fn handle_message(&self, message: StreamMessage) -> Result<MessageOutcome> {
        if let Some(err) = &message.error {
            error!(topic = %message.topic, "Received a topic error {}", err);
            return Ok(MessageOutcome::Dropped);
        }

        let event = match decode(&message) {
            Ok(event) => event,
            Err(e) => {
                warn!(topic = %message.topic, "Failed to decode JSON msg from Kafka: {}", e);
                return Ok(MessageOutcome::Dropped);
            }
        };
        debug!(topic = %message.topic, ?event, "Received sensor info");

        self.queue.enqueue(SensorReading::from_event(&event))?;
        Ok(MessageOutcome::Enqueued)
    }
}

fn decode(message: &StreamMessage) -> Result<RawEvent> {
    let payload = message.payload.as_deref().ok_or_else(|| Error::InvalidMessage {
        message: "empty payload".to_string(),
    })?;
    Ok(serde_json::from_slice(payload)?)
}
