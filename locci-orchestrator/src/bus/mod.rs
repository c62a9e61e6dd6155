//! Message bus abstraction
//!
//! A [`MessageBus`] opens one [`BusSession`] (connection + channel) per
//! notification. Sessions are closed by their owner on every path.

mod amqp;

pub use amqp::AmqpBus;

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by the broker or its client
#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to connect to broker: {0}")]
    Connect(String),

    #[error("failed to open channel: {0}")]
    Channel(String),

    #[error("failed to declare queue '{queue}': {reason}")]
    Declare { queue: String, reason: String },

    #[error("failed to publish to '{queue}': {reason}")]
    Publish { queue: String, reason: String },

    #[error("failed to close session: {0}")]
    Close(String),
}

/// Broker that can open publishing sessions
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BusSession>, BusError>;
}

/// One connection and channel to the broker
#[async_trait]
pub trait BusSession: Send {
    /// Declares a non-durable, non-exclusive queue
    async fn declare_queue(&mut self, queue: &str) -> Result<(), BusError>;

    /// Publishes `body` to `queue` through the default exchange
    ///
    /// Resolves once the broker has confirmed the message.
    async fn publish(&mut self, queue: &str, content_type: &str, body: &[u8])
    -> Result<(), BusError>;

    /// Closes the channel, then the connection
    async fn close(&mut self) -> Result<(), BusError>;
}
