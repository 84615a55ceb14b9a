//! Connector SDK - client runtime for connectors driven by a connector manager.
//!
//! A connector registers with the connector manager, then pulls tasks
//! (start, stop, update-config, restore) and reports back through typed
//! events: task acknowledgements, mitigations, errors, resolutions and logs.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            │  TaskLoop                    │  GET tasks ──▶ queue ──▶ Connector
//!            └──────────────┬───────────────┘
//!                           │ task ack
//!   Logger / ConsoleLayer ──┤
//!   ErrorStateTracker ──────┤ (error / resolution, deduplicated)
//!   mitigations ────────────┤
//!                           ▼
//!            ┌──────────────────────────────┐
//!            │  EventNotifier (type tag)    │
//!            └──────────────┬───────────────┘
//!                           ▼
//!            ┌──────────────────────────────┐
//!            │  Transport                   │  ApiKey auth, X-Request-Id,
//!            │  (retry on network / 502)    │  401 → Unauthorized (fatal)
//!            └──────────────────────────────┘
//! ```
//!
//! # Core Types
//!
//! - [`Connector`] - Trait implemented by the connector and driven by the task loop
//! - [`ConnectorManagerClient`] - Registration, configuration, tasks and events
//! - [`EventHandler`] - What connector code uses to report errors, mitigations and logs
//! - [`Event`] - The five event shapes sent to the manager
//!
//! # Running a Connector
//!
//! ```no_run
//! use connector_sdk::{ClientConfig, Connector, ConnectorManagerClient, EventHandler, LevelVar, StopReason};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run(connector: &dyn Connector) -> anyhow::Result<()> {
//!     let client = ConnectorManagerClient::new(&ClientConfig::from_env()?)?;
//!     let info: connector_sdk::RegistrationInfo = client.register("1.0.0").await?;
//!
//!     let level = LevelVar::default();
//!     let handler = client.console_event_handler(level, info.unresolved_errors);
//!     let _logger = handler.logger();
//!
//!     let cancel = CancellationToken::new();
//!     if client.start(connector, cancel).await == StopReason::Unauthorized {
//!         anyhow::bail!("api key rejected");
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
mod connector;
pub mod error;
pub mod error_state;
pub mod event;
pub mod handler;
pub mod log_bridge;
pub mod notifier;
pub mod task;
pub mod task_loop;
pub mod transport;

pub use client::{ConnectorManagerClient, RegistrationInfo};
pub use config::{load_config, ClientConfig};
pub use connector::{Connector, ConnectorStatus};
pub use error::{Error, Result};
pub use error_state::ErrorStateTracker;
pub use event::{ErrorKind, Event, EventType};
pub use handler::{ConsoleEventHandler, EventHandler, NoopEventHandler};
pub use log_bridge::{Attr, ConsoleLayer, Level, LevelVar, Logger};
pub use notifier::{EventNotifier, Notifier};
pub use task::{ActionType, RestoreActionContent, Task, TaskStatus};
pub use task_loop::{StopReason, TaskLoop};
pub use transport::{with_request_id, Transport};
