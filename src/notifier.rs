//! Event notification seam.
//!
//! Everything that reports to the connector manager (task acknowledgements,
//! the log bridge, the error tracker, mitigations) goes through [`Notifier`].
//! [`EventNotifier`] is the HTTP implementation.

use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::event::{Envelope, Event};
use crate::transport::Transport;

/// Pushes events to the connector manager.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: Event) -> Result<()>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    async fn notify(&self, event: Event) -> Result<()> {
        (**self).notify(event).await
    }
}

/// Tags each event with its wire type and posts it to the events endpoint.
#[derive(Clone)]
pub struct EventNotifier {
    transport: Transport,
}

impl EventNotifier {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Notifier for EventNotifier {
    async fn notify(&self, event: Event) -> Result<()> {
        let envelope = Envelope::wrap(&event)?;
        debug!(event_type = %envelope.event_type, "posting event");
        self.transport
            .send(Method::POST, "events", Some(&envelope))
            .await
    }
}
