use tracing::warn;

use super::attr::Attr;
use super::handler::{LogHandler, Record};
use super::level::Level;

/// Logger whose records are forwarded to the connector manager console.
///
/// A discarding logger (no handler) accepts every call and does nothing.
/// Forwarding failures are reported through `tracing` and never returned to
/// the caller.
#[derive(Clone, Default)]
pub struct Logger {
    handler: Option<LogHandler>,
}

impl Logger {
    pub fn new(handler: LogHandler) -> Self {
        Self {
            handler: Some(handler),
        }
    }

    pub fn discard() -> Self {
        Self { handler: None }
    }

    pub fn handler(&self) -> Option<&LogHandler> {
        self.handler.as_ref()
    }

    /// Returns a logger that adds `attrs` to every record.
    pub fn with(&self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        Self {
            handler: self.handler.as_ref().map(|h| h.with_attrs(attrs)),
        }
    }

    /// Returns a logger whose subsequent attributes nest under `name`.
    pub fn with_group(&self, name: &str) -> Self {
        Self {
            handler: self.handler.as_ref().map(|h| h.with_group(name)),
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.handler.as_ref().is_some_and(|h| h.enabled(level))
    }

    pub async fn log(&self, level: Level, message: impl Into<String>, attrs: Vec<Attr>) {
        let Some(handler) = &self.handler else {
            return;
        };
        if !handler.enabled(level) {
            return;
        }
        let record = Record::new(level, message).with_attrs(attrs);
        if let Err(e) = handler.handle(record).await {
            warn!(error = %e, "failed to forward log record");
        }
    }

    pub async fn debug(&self, message: impl Into<String>, attrs: Vec<Attr>) {
        self.log(Level::Debug, message, attrs).await
    }

    pub async fn info(&self, message: impl Into<String>, attrs: Vec<Attr>) {
        self.log(Level::Info, message, attrs).await
    }

    pub async fn warn(&self, message: impl Into<String>, attrs: Vec<Attr>) {
        self.log(Level::Warn, message, attrs).await
    }

    pub async fn error(&self, message: impl Into<String>, attrs: Vec<Attr>) {
        self.log(Level::Error, message, attrs).await
    }
}
