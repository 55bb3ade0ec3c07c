//! In-memory stand-ins for the sink and the broker.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::kafka::{StreamClient, StreamConnector, StreamMessage};
use crate::reading::SensorReading;
use crate::sink::Sink;
use crate::{Error, Result};

/// A reading that only differs from others by its key.
pub fn reading(key: &str) -> SensorReading {
    SensorReading {
        timestamp: "2025-01-28T12:38:55+00:00".to_string(),
        key: key.to_string(),
        description: String::new(),
        building_name: String::new(),
        floor_name: String::new(),
        room_name: String::new(),
        service_type: String::new(),
        object_name: String::new(),
        measurement_type: String::new(),
        unit_of_measure: String::new(),
        data: "2.0".to_string(),
        float_data: Some(2.0),
    }
}

#[derive(Default)]
struct SinkState {
    batches: Vec<Vec<SensorReading>>,
    insert_calls: usize,
    failures_left: usize,
    disconnected: bool,
    closed: bool,
}

/// Records every successful batch. Clones share state.
#[derive(Clone, Default)]
pub struct MockSink {
    state: Arc<Mutex<SinkState>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` bulk inserts fail.
    pub fn fail_next(&self, n: usize) {
        self.state.lock().unwrap().failures_left = n;
    }

    /// Simulates the server dropping the connection: the next bulk insert
    /// fails and the one after it goes through on a fresh connection.
    pub fn disconnect(&self) {
        self.state.lock().unwrap().disconnected = true;
    }

    pub fn insert_calls(&self) -> usize {
        self.state.lock().unwrap().insert_calls
    }

    /// Keys of each written batch, in write order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.state
            .lock()
            .unwrap()
            .batches
            .iter()
            .map(|batch| batch.iter().map(|r| r.key.clone()).collect())
            .collect()
    }

    pub fn rows(&self) -> Vec<SensorReading> {
        self.state.lock().unwrap().batches.concat()
    }

    pub fn is_open_now(&self) -> bool {
        !self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl Sink for MockSink {
    async fn bulk_insert(&mut self, rows: &[SensorReading]) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.insert_calls += 1;
        if state.disconnected {
            state.disconnected = false;
            return Err(Error::Connection("server closed the connection".to_string()));
        }
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(Error::Write {
                message: "connection reset by peer".to_string(),
            });
        }
        state.batches.push(rows.to_vec());
        Ok(rows.len() as u64)
    }

    fn is_open(&self) -> bool {
        self.is_open_now()
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// One scripted response to `poll`.
#[derive(Debug, Clone)]
pub enum PollStep {
    Message(StreamMessage),
    Empty,
    Disconnect,
}

#[derive(Default)]
struct ConnectorState {
    scripts: VecDeque<Vec<PollStep>>,
    connects: usize,
    subscriptions: Vec<Vec<String>>,
}

/// Hands out one scripted client per connection; fails to connect once the
/// scripts run out. A client whose script is exhausted idles like an empty
/// topic.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<Vec<PollStep>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ConnectorState {
                scripts: scripts.into(),
                ..Default::default()
            })),
        }
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn subscriptions(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().subscriptions.clone()
    }
}

pub struct ScriptedClient {
    steps: VecDeque<PollStep>,
    connector: Arc<Mutex<ConnectorState>>,
}

#[async_trait]
impl StreamConnector for ScriptedConnector {
    type Client = ScriptedClient;

    async fn connect(&self) -> Result<ScriptedClient> {
        let mut state = self.state.lock().unwrap();
        state.connects += 1;
        let steps = state
            .scripts
            .pop_front()
            .ok_or_else(|| Error::Connection("broker unreachable".to_string()))?;
        Ok(ScriptedClient {
            steps: steps.into(),
            connector: Arc::clone(&self.state),
        })
    }
}

#[async_trait]
impl StreamClient for ScriptedClient {
    async fn subscribe(&mut self, topics: &[String]) -> Result<()> {
        self.connector
            .lock()
            .unwrap()
            .subscriptions
            .push(topics.to_vec());
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<StreamMessage>> {
        match self.steps.pop_front() {
            Some(PollStep::Message(message)) => Ok(Some(message)),
            Some(PollStep::Empty) => Ok(None),
            Some(PollStep::Disconnect) => {
                Err(Error::Connection("connection to broker lost".to_string()))
            }
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }
}
