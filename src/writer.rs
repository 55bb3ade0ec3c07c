//! Periodic batch writer.
//!
//! The writer sleeps for the flush interval, drains at most
//! `max_batch_size` readings from the queue and hands them to the sink in a
//! single bulk call. Sink failures, a lost connection included, are logged and
//! the batch is dropped; the loop itself only stops when the owner closes the
//! sink or the writer through [`WriterHandle::close`].

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::WriterConfig;
use crate::queue::ReadingReceiver;
use crate::sink::Sink;
use crate::Result;

pub struct BatchWriter<S> {
    sink: S,
    queue: ReadingReceiver,
    max_batch_size: usize,
    flush_interval: Duration,
}

/// Owner's side of a spawned [`BatchWriter`].
pub struct WriterHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
}

impl<S: Sink + 'static> BatchWriter<S> {
    pub fn new(sink: S, queue: ReadingReceiver, config: &WriterConfig) -> Self {
        Self {
            sink,
            queue,
            max_batch_size: config.max_batch_size.max(1),
            flush_interval: config.flush_interval(),
        }
    }

    /// Writes one batch. Returns the number of readings written, zero when
    /// the queue was empty. On error the drained readings are gone.
    pub async fn flush(&mut self) -> Result<usize> {
        let batch = self.queue.drain_up_to(self.max_batch_size);
        if batch.is_empty() {
            return Ok(0);
        }

        if batch.len() == self.max_batch_size {
            debug!(
                max_batch_size = self.max_batch_size,
                remaining = self.queue.len(),
                "Batch limit reached, leaving the rest for the next flush"
            );
        }

        match self.sink.bulk_insert(&batch).await {
            Ok(rows) => {
                info!(rows, "Written rows");
                Ok(batch.len())
            }
            Err(e) => {
                error!(dropped = batch.len(), "Error while writing to database: {}", e);
                Err(e)
            }
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            flush_interval = ?self.flush_interval,
            max_batch_size = self.max_batch_size,
            "Batch writer started"
        );

        let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.sink.is_open() {
            tokio::select! {
                _ = ticker.tick() => {
                    // Errors are already logged; the next tick tries again.
                    let _ = self.flush().await;
                }
                _ = shutdown.changed() => {
                    info!("Batch writer shutdown requested");
                    self.drain_remaining().await;
                    break;
                }
            }
        }

        self.sink.close().await?;
        info!("Batch writer stopped");
        Ok(())
    }

    async fn drain_remaining(&mut self) {
        while self.sink.is_open() && !self.queue.is_empty() {
            match self.flush().await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    }

    pub fn spawn(self) -> WriterHandle {
        let (shutdown, signal) = watch::channel(false);
        let task = tokio::spawn(self.run(signal));
        WriterHandle { shutdown, task }
    }
}

impl WriterHandle {
    /// Signals the writer to flush what is queued, close the sink and stop.
    pub async fn close(self) -> Result<()> {
        // The writer may already be gone if its sink closed on its own.
        let _ = self.shutdown.send(true);
        self.task.await?
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
