use std::future::Future;

use tracing::{error, info};

use crate::config::Config;
use crate::follower::Follower;
use crate::kafka::{KafkaConnector, StreamConnector};
use crate::postgres::PostgresSink;
use crate::queue;
use crate::sink::{InsertStatement, Sink};
use crate::writer::BatchWriter;
use crate::Result;

/// Wires the follower, the ingestion queue and the batch writer together.
pub struct Historian {
    config: Config,
}

impl Historian {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs against PostgreSQL and Kafka until Ctrl+C or a fatal error.
    pub async fn run(self) -> Result<()> {
        let statement = InsertStatement::new(&self.config.sink.schema, &self.config.sink.table);
        let sink = PostgresSink::open(&self.config.sink, &statement).await?;
        let connector = KafkaConnector::new(self.config.kafka.clone());

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        };

        self.run_until(sink, connector, shutdown).await
    }

    /// Runs with the given sink and connector until `shutdown` resolves or
    /// the follower gives up. The writer is always closed before returning,
    /// so whatever is still queued gets one last chance to be written.
    pub async fn run_until<S, C, F>(&self, sink: S, connector: C, shutdown: F) -> Result<()>
    where
        S: Sink + 'static,
        C: StreamConnector,
        F: Future<Output = ()>,
    {
        let (sender, receiver) = queue::channel();
        let writer = BatchWriter::new(sink, receiver, &self.config.writer).spawn();
        let follower = Follower::new(
            connector,
            sender,
            self.config.kafka.topics.clone(),
            &self.config.consumer,
        );

        info!("Historian started");
        let outcome = tokio::select! {
            result = follower.run() => result,
            _ = shutdown => {
                info!("Shutdown requested");
                Ok(())
            }
        };

        if let Err(e) = &outcome {
            error!("Stream follower stopped: {}", e);
        }

        drop(follower);
        writer.close().await?;
        info!("Historian stopped");
        outcome
    }
}
