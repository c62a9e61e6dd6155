//! Completion notification
//!
//! Publishes the completion event to the deploy queue. The session is
//! closed after the publish attempt on every path, including timeouts and
//! a cancelled run.

use async_trait::async_trait;
use locci_core::domain::event::CompletionEvent;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::bus::{BusError, BusSession, MessageBus};

/// Content type of queue messages
pub const CONTENT_TYPE: &str = "text/plain";

/// Notify stage errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to serialize completion event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("broker did not confirm the publish within {0:?}")]
    Timeout(Duration),
}

/// Publishes completion events to a named queue
#[derive(Clone)]
pub struct EventNotifier {
    bus: Arc<dyn MessageBus>,
    queue: String,
    publish_timeout: Duration,
}

impl EventNotifier {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        queue: impl Into<String>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            bus,
            queue: queue.into(),
            publish_timeout,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Publishes `event`; resolves once the broker acknowledged it
    pub async fn notify(&self, event: &CompletionEvent) -> Result<(), NotifyError> {
        let payload = event.to_payload()?;

        let mut session = SessionGuard::new(self.bus.open().await?);
        let outcome = self.publish(session.session.as_mut(), &payload).await;
        session.close().await;

        if outcome.is_ok() {
            info!("[x] Sent {}", String::from_utf8_lossy(&payload));
        }
        outcome
    }

    async fn publish(
        &self,
        session: &mut dyn BusSession,
        payload: &[u8],
    ) -> Result<(), NotifyError> {
        session.declare_queue(&self.queue).await?;

        match tokio::time::timeout(
            self.publish_timeout,
            session.publish(&self.queue, CONTENT_TYPE, payload),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(NotifyError::Timeout(self.publish_timeout)),
        }
    }
}

/// Closes a bus session when dropped
///
/// A guard dropped before [`SessionGuard::close`] hands the session to a
/// task on the current runtime to be closed there.
struct SessionGuard {
    session: Box<dyn BusSession>,
    open: bool,
}

impl SessionGuard {
    fn new(session: Box<dyn BusSession>) -> Self {
        Self {
            session,
            open: true,
        }
    }

    async fn close(mut self) {
        self.open = false;
        close_session(self.session.as_mut()).await;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.open {
            return;
        }

        let mut session = std::mem::replace(&mut self.session, Box::new(Released));
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { close_session(session.as_mut()).await });
            }
            Err(_) => warn!("No runtime left to close bus session"),
        }
    }
}

async fn close_session(session: &mut dyn BusSession) {
    if let Err(e) = session.close().await {
        warn!("Failed to close bus session: {}", e);
    }
}

/// Stands in for a session that was moved out of its guard
struct Released;

#[async_trait]
impl BusSession for Released {
    async fn declare_queue(&mut self, _queue: &str) -> Result<(), BusError> {
        Err(BusError::Channel("session released".to_string()))
    }

    async fn publish(
        &mut self,
        queue: &str,
        _content_type: &str,
        _body: &[u8],
    ) -> Result<(), BusError> {
        Err(BusError::Publish {
            queue: queue.to_string(),
            reason: "session released".to_string(),
        })
    }

    async fn close(&mut self) -> Result<(), BusError> {
        Ok(())
    }
}
