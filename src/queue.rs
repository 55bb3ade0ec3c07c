//! Unbounded FIFO hand-off between the stream follower and the batch writer.
//!
//! The queue is a tokio unbounded mpsc channel. The sending half may be
//! cloned; the receiving half is owned by the single writer, which makes
//! [`ReadingReceiver::drain_up_to`] atomic with respect to other consumers.
//! There is no capacity limit, so a slow sink shows up as growing memory.

use crate::reading::SensorReading;
use crate::{Error, Result};
use tokio::sync::mpsc;

pub fn channel() -> (ReadingSender, ReadingReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ReadingSender { tx }, ReadingReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct ReadingSender {
    tx: mpsc::UnboundedSender<SensorReading>,
}

impl ReadingSender {
    /// Appends a reading to the tail. Fails only once the receiver is gone.
    pub fn enqueue(&self, reading: SensorReading) -> Result<()> {
        self.tx.send(reading).map_err(|_| Error::QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct ReadingReceiver {
    rx: mpsc::UnboundedReceiver<SensorReading>,
}

impl ReadingReceiver {
    /// Removes up to `max` readings from the head without waiting for more.
    pub fn drain_up_to(&mut self, max: usize) -> Vec<SensorReading> {
        let mut batch = Vec::with_capacity(max.min(self.rx.len()));
        while batch.len() < max {
            match self.rx.try_recv() {
                Ok(reading) => batch.push(reading),
                Err(_) => break,
            }
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
