pub mod config;
pub mod error;
pub mod follower;
pub mod historian;
pub mod queue;
pub mod reading;
pub mod sink;
pub mod writer;

pub mod kafka;
pub mod postgres;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use error::{Error, Result};
pub use historian::Historian;
pub use reading::SensorReading;
