//! Connector manager client.
//!
//! Registration, configuration and task endpoints on top of [`Transport`],
//! plus event notification through [`EventNotifier`].

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{ClientConfig, LogBridgeConfig, TaskLoopConfig};
use crate::connector::Connector;
use crate::error::Result;
use crate::event::{ErrorKind, Event};
use crate::handler::ConsoleEventHandler;
use crate::log_bridge::LevelVar;
use crate::notifier::{EventNotifier, Notifier};
use crate::task::Task;
use crate::task_loop::{StopReason, TaskLoop};
use crate::transport::{Transport, NO_BODY};


/// Answer to `POST register`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(bound(deserialize = "C: Deserialize<'de> + Default"))]
pub struct RegistrationInfo<C = serde_json::Value> {
    #[serde(default)]
    pub stopped: bool,
    /// Connector specific configuration
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: C,
    /// Errors the manager still shows as unresolved for this connector
    #[serde(default, deserialize_with = "null_as_default")]
    pub unresolved_errors: HashMap<ErrorKind, String>,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    version: &'a str,
}

#[derive(Deserialize)]
struct GetConfigResponse {
    config: Option<Box<RawValue>>,
}

#[derive(Deserialize)]
struct GetTasksResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    tasks: Vec<Task>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone)]
pub struct ConnectorManagerClient {
    transport: Transport,
    notifier: EventNotifier,
    tasks: TaskLoopConfig,
    log: LogBridgeConfig,
}

impl ConnectorManagerClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = Transport::new(config)?;
        Ok(Self {
            notifier: EventNotifier::new(transport.clone()),
            transport,
            tasks: config.tasks.clone(),
            log: config.log.clone(),
        })
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Announces this connector and its version to the manager.
    pub async fn register<C>(&self, version: &str) -> Result<RegistrationInfo<C>>
    where
        C: DeserializeOwned + Default,
    {
        let info = self
            .transport
            .call(Method::POST, "register", Some(&RegisterRequest { version }))
            .await?;
        Ok(info.unwrap_or_default())
    }

    /// Current connector configuration, as raw JSON (`null` when unset).
    pub async fn get_config(&self) -> Result<Box<RawValue>> {
        let response: Option<GetConfigResponse> =
            self.transport.call(Method::GET, "config", NO_BODY).await?;
        match response.and_then(|r| r.config) {
            Some(config) => Ok(config),
            None => Ok(RawValue::from_string("null".to_string())?),
        }
    }

    /// Next batch of pending tasks.
    pub async fn get_tasks(&self) -> Result<Vec<Task>> {
        let response: Option<GetTasksResponse> =
            self.transport.call(Method::GET, "tasks", NO_BODY).await?;
        Ok(response.map(|r| r.tasks).unwrap_or_default())
    }

    /// Event handler reporting to this manager, seeded with the errors
    /// returned at registration.
    pub fn console_event_handler(
        &self,
        level: LevelVar,
        unresolved_errors: HashMap<ErrorKind, String>,
    ) -> ConsoleEventHandler {
        ConsoleEventHandler::new(
            Arc::new(self.notifier.clone()),
            level,
            unresolved_errors,
            self.log.notify_timeout(),
        )
    }

    /// Runs the task loop for `connector` until `cancel` fires or the API key
    /// is rejected.
    pub async fn start(&self, connector: &dyn Connector, cancel: CancellationToken) -> StopReason {
        info!("starting task loop");
        TaskLoop::new(self.clone(), self.tasks.clone())
            .run(connector, cancel)
            .await
    }
}

#[async_trait]
impl Notifier for ConnectorManagerClient {
    async fn notify(&self, event: Event) -> Result<()> {
        self.notifier.notify(event).await
    }
}
