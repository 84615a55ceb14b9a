use anyhow::{bail, Context, Result};
use connector_sdk::log_bridge::LogHandler;
use connector_sdk::{
    ClientConfig, ConnectorManagerClient, ConsoleLayer, EventHandler, Level, LevelVar,
    RegistrationInfo, StopReason,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Subscriber};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

mod idle;

use idle::IdleConnector;

/// Part of the registration config the runner understands.
#[derive(Debug, Default, Deserialize)]
struct RunnerConfig {
    #[serde(default)]
    debug: bool,
}

/// Local output filtered by `filter`, plus forwarding to the manager console.
///
/// The console layer is not behind `filter`: its threshold is the shared
/// `LevelVar` of its handler.
fn subscriber(
    console: ConsoleLayer,
    filter: EnvFilter,
) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(console)
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClientConfig::from_env().context("Failed to load connector manager config")?;
    let client = ConnectorManagerClient::new(&config).context("Failed to build client")?;
    let level = LevelVar::default();

    let console = LogHandler::new(Arc::new(client.clone()), level.clone())
        .with_timeout(config.log.notify_timeout());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "connector_runner=info,connector_sdk=info".into());
    subscriber(
        ConsoleLayer::new(console).with_capacity(config.log.console_queue_capacity),
        filter,
    )
    .init();

    info!(url = %config.url, "Connector runner starting...");

    let info: RegistrationInfo<RunnerConfig> = client
        .register(env!("CARGO_PKG_VERSION"))
        .await
        .context("Failed to register with connector manager")?;
    if info.config.debug {
        level.set(Level::Debug);
    }
    info!(
        stopped = info.stopped,
        unresolved_errors = info.unresolved_errors.len(),
        "Registered"
    );

    let events = client.console_event_handler(level.clone(), info.unresolved_errors);
    let connector = IdleConnector::new(!info.stopped, events.logger());

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!(error = %e, "Failed to listen for ctrl_c signal"),
        }
        signal_cancel.cancel();
    });

    match client.start(&connector, cancel).await {
        StopReason::Cancelled => {
            info!("Connector runner stopped");
            Ok(())
        }
        StopReason::Unauthorized => bail!("connector's api key is either revoked or invalid"),
    }
}
