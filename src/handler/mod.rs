//! What a connector uses to report to the manager console: errors and their
//! resolutions (deduplicated by [`ErrorStateTracker`]), mitigations, and logs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::error_state::ErrorStateTracker;
use crate::event::{
    EmailInfos, ErrorKind, FileInfos, MitigationAction, MitigationEvent, MitigationReason,
    UrlInfos,
};
use crate::log_bridge::{LevelVar, LogHandler, Logger};
use crate::notifier::Notifier;

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Reports an error of `kind`; identical repeats are suppressed until resolved.
    async fn notify_error(&self, kind: ErrorKind, error: &(dyn Display + Sync)) -> Result<()>;

    /// Reports that the given kinds are resolved.
    async fn notify_resolution(&self, message: &str, kinds: &[ErrorKind]) -> Result<()>;

    async fn notify_file_mitigation(
        &self,
        action: MitigationAction,
        element_id: &str,
        reason: MitigationReason,
        info: FileInfos,
    ) -> Result<()>;

    async fn notify_email_mitigation(
        &self,
        action: MitigationAction,
        element_id: &str,
        reason: MitigationReason,
        info: EmailInfos,
    ) -> Result<()>;

    async fn notify_url_mitigation(
        &self,
        action: MitigationAction,
        element_id: &str,
        reason: MitigationReason,
        info: UrlInfos,
    ) -> Result<()>;

    /// Logger forwarding to the manager console.
    fn logger(&self) -> Logger;
}

/// Event handler backed by the connector manager.
pub struct ConsoleEventHandler {
    tracker: ErrorStateTracker,
    notifier: Arc<dyn Notifier>,
    logger: Logger,
}

impl ConsoleEventHandler {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        level: LevelVar,
        unresolved: HashMap<ErrorKind, String>,
        notify_timeout: Duration,
    ) -> Self {
        let log_handler = LogHandler::new(Arc::clone(&notifier), level).with_timeout(notify_timeout);
        Self {
            tracker: ErrorStateTracker::new(Arc::clone(&notifier), unresolved),
            notifier,
            logger: Logger::new(log_handler),
        }
    }

    /// Errors currently flagged as unresolved.
    pub async fn unresolved(&self) -> HashMap<ErrorKind, String> {
        self.tracker.unresolved().await
    }
}

#[async_trait]
impl EventHandler for ConsoleEventHandler {
    async fn notify_error(&self, kind: ErrorKind, error: &(dyn Display + Sync)) -> Result<()> {
        self.tracker.notify_error(kind, error).await
    }

    async fn notify_resolution(&self, message: &str, kinds: &[ErrorKind]) -> Result<()> {
        self.tracker.notify_resolution(message, kinds).await
    }

    async fn notify_file_mitigation(
        &self,
        action: MitigationAction,
        element_id: &str,
        reason: MitigationReason,
        info: FileInfos,
    ) -> Result<()> {
        let event = MitigationEvent::new(action, element_id, reason, info.into());
        self.notifier.notify(event.into()).await
    }

    async fn notify_email_mitigation(
        &self,
        action: MitigationAction,
        element_id: &str,
        reason: MitigationReason,
        info: EmailInfos,
    ) -> Result<()> {
        let event = MitigationEvent::new(action, element_id, reason, info.into());
        self.notifier.notify(event.into()).await
    }

    async fn notify_url_mitigation(
        &self,
        action: MitigationAction,
        element_id: &str,
        reason: MitigationReason,
        info: UrlInfos,
    ) -> Result<()> {
        let event = MitigationEvent::new(action, element_id, reason, info.into());
        self.notifier.notify(event.into()).await
    }

    fn logger(&self) -> Logger {
        self.logger.clone()
    }
}

/// Handler that accepts everything and reports nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEventHandler;

#[async_trait]
impl EventHandler for NoopEventHandler {
    async fn notify_error(&self, _kind: ErrorKind, _error: &(dyn Display + Sync)) -> Result<()> {
        Ok(())
    }

    async fn notify_resolution(&self, _message: &str, _kinds: &[ErrorKind]) -> Result<()> {
        Ok(())
    }

    async fn notify_file_mitigation(
        &self,
        _action: MitigationAction,
        _element_id: &str,
        _reason: MitigationReason,
        _info: FileInfos,
    ) -> Result<()> {
        Ok(())
    }

    async fn notify_email_mitigation(
        &self,
        _action: MitigationAction,
        _element_id: &str,
        _reason: MitigationReason,
        _info: EmailInfos,
    ) -> Result<()> {
        Ok(())
    }

    async fn notify_url_mitigation(
        &self,
        _action: MitigationAction,
        _element_id: &str,
        _reason: MitigationReason,
        _info: UrlInfos,
    ) -> Result<()> {
        Ok(())
    }

    fn logger(&self) -> Logger {
        Logger::discard()
    }
}
