//! AMQP 0-9-1 bus backed by lapin

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{debug, warn};

use super::{BusError, BusSession, MessageBus};

/// Reply code sent when closing cleanly
const REPLY_SUCCESS: u16 = 200;

/// [`MessageBus`] connecting to an AMQP broker such as RabbitMQ
#[derive(Debug, Clone)]
pub struct AmqpBus {
    url: String,
}

impl AmqpBus {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl MessageBus for AmqpBus {
    async fn open(&self) -> Result<Box<dyn BusSession>, BusError> {
        let connection = Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .map_err(|e| BusError::Connect(e.to_string()))?;

        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                // Don't leave the connection open on the broker
                if let Err(close_err) = connection.close(REPLY_SUCCESS, "channel failed").await {
                    warn!("Failed to close AMQP connection: {}", close_err);
                }
                return Err(BusError::Channel(e.to_string()));
            }
        };

        debug!("Opened AMQP channel {}", channel.id());
        Ok(Box::new(AmqpSession {
            connection,
            channel,
        }))
    }
}

struct AmqpSession {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl BusSession for AmqpSession {
    async fn declare_queue(&mut self, queue: &str) -> Result<(), BusError> {
        let options = QueueDeclareOptions {
            durable: false,
            auto_delete: false,
            exclusive: false,
            nowait: false,
            passive: false,
        };

        self.channel
            .queue_declare(queue, options, FieldTable::default())
            .await
            .map_err(|e| BusError::Declare {
                queue: queue.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn publish(
        &mut self,
        queue: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<(), BusError> {
        let publish_err = |e: lapin::Error| BusError::Publish {
            queue: queue.to_string(),
            reason: e.to_string(),
        };

        // Default exchange, queue name as routing key, no mandatory/immediate
        let confirm = self
            .channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_content_type(content_type.into()),
            )
            .await
            .map_err(publish_err)?;

        confirm.await.map_err(publish_err)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BusError> {
        let channel = self.channel.close(REPLY_SUCCESS, "done").await;
        let connection = self.connection.close(REPLY_SUCCESS, "done").await;

        channel
            .and(connection)
            .map_err(|e| BusError::Close(e.to_string()))
    }
}
