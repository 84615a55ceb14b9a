//! Task fetching and dispatch.
//!
//! ```text
//!   producer (spawned)                        consumer (run)
//!   GET tasks ──▶ mpsc queue (bounded) ──▶ dispatch to Connector ──▶ POST events (task ack)
//!      │                                                                  │
//!      └─ 401: stop, close queue                               401: stop ─┘
//! ```
//!
//! Every dispatched task is acknowledged exactly once, with an empty
//! `error_message` on success. Failures of the connector are reported in the
//! acknowledgement and never stop the loop; only cancellation or a rejected
//! API key does.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::client::ConnectorManagerClient;
use crate::config::TaskLoopConfig;
use crate::connector::{Connector, ConnectorStatus};
use crate::event::TaskAckEvent;
use crate::notifier::Notifier;
use crate::task::{ActionType, RestoreActionContent, Task};

#[cfg(test)]
mod tests;

/// Why [`TaskLoop::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    /// The manager rejected the API key; the connector must not keep polling.
    Unauthorized,
}

pub struct TaskLoop {
    client: ConnectorManagerClient,
    config: TaskLoopConfig,
}

impl TaskLoop {
    pub fn new(client: ConnectorManagerClient, config: TaskLoopConfig) -> Self {
        Self { client, config }
    }

    /// Fetches and dispatches tasks until `cancel` fires or the API key is rejected.
    pub async fn run(&self, connector: &dyn Connector, cancel: CancellationToken) -> StopReason {
        let producer_cancel = cancel.child_token();
        let (tx, mut rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let producer = tokio::spawn(produce(
            self.client.clone(),
            tx,
            producer_cancel.clone(),
            self.config.clone(),
        ));

        let reason = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("task loop cancelled");
                    break StopReason::Cancelled;
                }
                task = rx.recv() => {
                    let Some(task) = task else {
                        warn!("tasks queue is closed");
                        break if cancel.is_cancelled() {
                            StopReason::Cancelled
                        } else {
                            StopReason::Unauthorized
                        };
                    };
                    debug!(task_id = %task.id, action = %task.action, "received task");

                    let error_message = self.dispatch(connector, &task).await;
                    let ack = TaskAckEvent::new(task.id.clone(), error_message);
                    match self.client.notify(ack.into()).await {
                        Ok(()) => {}
                        Err(e) if e.is_unauthorized() => break StopReason::Unauthorized,
                        Err(e) => error!(task_id = %task.id, error = %e, "could not push event to ack task"),
                    }
                }
            }
        };

        producer_cancel.cancel();
        drop(rx);
        if let Err(e) = producer.await {
            error!(error = %e, "task producer failed");
        }
        reason
    }

    /// Executes `task` and returns the acknowledgement error message, empty on success.
    async fn dispatch(&self, connector: &dyn Connector, task: &Task) -> String {
        match &task.action {
            ActionType::UpdateConfig => {
                let config = match self.client.get_config().await {
                    Ok(config) => config,
                    Err(e) => return format!("error cannot get updated config, error: {}", e),
                };
                match connector.configure(&config).await {
                    Ok(()) => String::new(),
                    Err(e) => format!("error reconfiguring connector, error: {}", e),
                }
            }
            ActionType::Stop => {
                if connector.status() == ConnectorStatus::Stopped {
                    return "error stopping connector, error: connector is already stopped".to_string();
                }
                match connector.stop().await {
                    Ok(()) => String::new(),
                    Err(e) => format!("error stopping connector, error: {}", e),
                }
            }
            ActionType::Start => {
                if connector.status() == ConnectorStatus::Started {
                    return "error starting connector, error: connector is already started".to_string();
                }
                match connector.start().await {
                    Ok(()) => String::new(),
                    Err(e) => format!("error starting connector, error: {}", e),
                }
            }
            ActionType::Restore => {
                let content = match restore_content(task) {
                    Ok(content) => content,
                    Err(e) => return format!("error reading restore task, error: {}", e),
                };
                if content.id.is_empty() {
                    return "error reading restore task, the id of the element to restore is not provided"
                        .to_string();
                }
                let id = content.id.clone();
                match connector.restore(content).await {
                    Ok(()) => String::new(),
                    Err(e) => {
                        let message = format!("error restoring element {}, error: {}", id, e);
                        error!("{}", message);
                        message
                    }
                }
            }
            ActionType::Other(action) => {
                debug!(action = %action, "ignoring unknown task action");
                String::new()
            }
        }
    }
}

/// A restore task without payload has no element id.
fn restore_content(task: &Task) -> serde_json::Result<RestoreActionContent> {
    match task.content.as_deref() {
        Some(raw) => serde_json::from_str(raw.get()),
        None => Ok(RestoreActionContent::default()),
    }
}

async fn produce(
    client: ConnectorManagerClient,
    tx: mpsc::Sender<Task>,
    cancel: CancellationToken,
    config: TaskLoopConfig,
) {
    loop {
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return,
            fetched = client.get_tasks() => fetched,
        };

        let tasks = match fetched {
            Ok(tasks) => tasks,
            Err(e) if e.is_unauthorized() => {
                warn!("stop fetching tasks: api key rejected");
                return;
            }
            Err(e) => {
                error!(error = %e, "cannot get tasks");
                if !pause(&cancel, config.fetch_error_delay()).await {
                    return;
                }
                continue;
            }
        };

        if tasks.is_empty() && !pause(&cancel, config.idle_poll_delay()).await {
            return;
        }
        for task in tasks {
            tokio::select! {
                _ = cancel.cancelled() => return,
                sent = tx.send(task) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Sleeps for `delay`; returns false if cancelled first.
async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
