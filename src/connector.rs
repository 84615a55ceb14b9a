use anyhow::Result;
use async_trait::async_trait;
use serde_json::value::RawValue;

use crate::task::RestoreActionContent;

/// Whether a connector is currently processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectorStatus {
    Started,
    Stopped,
}

/// Connector interface driven by the task loop.
///
/// The task loop never inspects a connector's internals: it only calls these
/// operations in response to tasks issued by the connector manager, and
/// reports the outcome back as a task acknowledgement.
///
/// # Lifecycle
/// 1. The manager issues a `start`/`stop` task; the loop checks `status()`
///    and calls `start()` or `stop()` only when the state actually changes
/// 2. On `update-config` the loop fetches the current configuration and
///    hands the raw JSON to `configure()`
/// 3. On `restore` the loop decodes the element id and calls `restore()`
///
/// # Example
/// ```no_run
/// use connector_sdk::{Connector, ConnectorStatus, RestoreActionContent};
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::value::RawValue;
///
/// struct MailboxConnector {
///     running: std::sync::atomic::AtomicBool,
/// }
///
/// #[async_trait]
/// impl Connector for MailboxConnector {
///     async fn start(&self) -> Result<()> {
///         self.running.store(true, std::sync::atomic::Ordering::SeqCst);
///         Ok(())
///     }
///
///     async fn stop(&self) -> Result<()> {
///         self.running.store(false, std::sync::atomic::Ordering::SeqCst);
///         Ok(())
///     }
///
///     async fn configure(&self, config: &RawValue) -> Result<()> {
///         // Parse and apply the connector specific configuration
///         let _ = config.get();
///         Ok(())
///     }
///
///     async fn restore(&self, content: RestoreActionContent) -> Result<()> {
///         // Release `content.id` from quarantine
///         Ok(())
///     }
///
///     fn status(&self) -> ConnectorStatus {
///         if self.running.load(std::sync::atomic::Ordering::SeqCst) {
///             ConnectorStatus::Started
///         } else {
///             ConnectorStatus::Stopped
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync {
    /// Starts processing. Only called while stopped.
    async fn start(&self) -> Result<()>;

    /// Stops processing. Only called while started.
    async fn stop(&self) -> Result<()>;

    /// Applies a new configuration, as raw JSON from the manager.
    async fn configure(&self, config: &RawValue) -> Result<()>;

    /// Restores a previously mitigated element. `content.id` is never empty.
    async fn restore(&self, content: RestoreActionContent) -> Result<()>;

    fn status(&self) -> ConnectorStatus;
}
