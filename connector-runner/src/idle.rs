use anyhow::Result;
use async_trait::async_trait;
use connector_sdk::log_bridge::Attr;
use connector_sdk::{Connector, ConnectorStatus, Logger, RestoreActionContent};
use serde_json::value::RawValue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Connector without domain logic: it only tracks its started/stopped state
/// and the last configuration it received.
pub struct IdleConnector {
    started: AtomicBool,
    config: Mutex<Option<String>>,
    logger: Logger,
}

impl IdleConnector {
    pub fn new(started: bool, logger: Logger) -> Self {
        Self {
            started: AtomicBool::new(started),
            config: Mutex::new(None),
            logger: logger.with_group("idle-connector"),
        }
    }

    /// Last configuration applied, as raw JSON.
    pub fn config(&self) -> Option<String> {
        self.config.lock().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl Connector for IdleConnector {
    async fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::SeqCst);
        self.logger.info("connector started", vec![]).await;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.started.store(false, Ordering::SeqCst);
        self.logger.info("connector stopped", vec![]).await;
        Ok(())
    }

    async fn configure(&self, config: &RawValue) -> Result<()> {
        let raw = config.get().to_string();
        self.logger
            .debug("configuration updated", vec![Attr::new("size", raw.len())])
            .await;
        if let Ok(mut current) = self.config.lock() {
            *current = Some(raw);
        }
        Ok(())
    }

    async fn restore(&self, content: RestoreActionContent) -> Result<()> {
        self.logger
            .info("nothing to restore", vec![Attr::new("id", content.id)])
            .await;
        Ok(())
    }

    fn status(&self) -> ConnectorStatus {
        if self.started.load(Ordering::SeqCst) {
            ConnectorStatus::Started
        } else {
            ConnectorStatus::Stopped
        }
    }
}
