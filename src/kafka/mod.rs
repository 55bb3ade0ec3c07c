pub mod consumer;


pub use consumer::{
    is_connection_error, KafkaConnector, KafkaStreamClient, StreamClient, StreamConnector,
    StreamMessage, UNKNOWN_TOPIC,
};
