use super::*;
use crate::config::{ClientConfig, RetryConfig};
use anyhow::anyhow;
use async_trait::async_trait;
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;
use serde_json::value::RawValue;
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
    started: bool,
    configs: Vec<String>,
    restored: Vec<String>,
    fail: bool,
}

#[derive(Default)]
struct FakeConnector {
    state: Mutex<FakeState>,
}

impl FakeConnector {
    fn started() -> Self {
        let connector = Self::default();
        connector.state.lock().unwrap().started = true;
        connector
    }

    fn failing() -> Self {
        let connector = Self::default();
        connector.state.lock().unwrap().fail = true;
        connector
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.state.lock().unwrap().fail {
            return Err(anyhow!("boom"));
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn start(&self) -> anyhow::Result<()> {
        self.check()?;
        self.state.lock().unwrap().started = true;
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.check()?;
        self.state.lock().unwrap().started = false;
        Ok(())
    }

    async fn configure(&self, config: &RawValue) -> anyhow::Result<()> {
        self.check()?;
        self.state.lock().unwrap().configs.push(config.get().to_string());
        Ok(())
    }

    async fn restore(&self, content: RestoreActionContent) -> anyhow::Result<()> {
        self.check()?;
        self.state.lock().unwrap().restored.push(content.id);
        Ok(())
    }

    fn status(&self) -> ConnectorStatus {
        if self.state.lock().unwrap().started {
            ConnectorStatus::Started
        } else {
            ConnectorStatus::Stopped
        }
    }
}

fn test_config(url: &str) -> ClientConfig {
    let mut config = ClientConfig::new(url, "test-key");
    config.retry = RetryConfig {
        initial_interval_ms: 10,
        max_interval_ms: 50,
        multiplier: 1.5,
        randomization_factor: 0.0,
        max_elapsed_ms: 100,
    };
    config.tasks.fetch_error_delay_ms = 10;
    config.tasks.idle_poll_delay_ms = 10;
    config
}

fn task_loop(server: &ServerGuard) -> TaskLoop {
    let config = test_config(&server.url());
    let client = ConnectorManagerClient::new(&config).unwrap();
    TaskLoop::new(client, config.tasks)
}

fn task(value: serde_json::Value) -> Task {
    serde_json::from_str(&value.to_string()).unwrap()
}

async fn wait_matched(mocks: &[&Mock]) {
    for _ in 0..200 {
        let mut all = true;
        for mock in mocks {
            all &= mock.matched_async().await;
        }
        if all {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("mocks were not matched in time");
}

#[tokio::test]
async fn test_update_config() {
    let mut server = mockito::Server::new_async().await;
    let _config = server
        .mock("GET", "/api/v1/connectors/config")
        .with_status(200)
        .with_body(r#"{"config": {"mailbox": "inbox"}}"#)
        .create_async()
        .await;

    let connector = FakeConnector::default();
    let message = task_loop(&server)
        .dispatch(&connector, &task(json!({"id": "t", "connector_id": "c", "action": "update-config"})))
        .await;

    assert_eq!(message, "");
    assert_eq!(connector.state.lock().unwrap().configs, vec![r#"{"mailbox":"inbox"}"#]);
}

#[tokio::test]
async fn test_update_config_fetch_failure() {
    let mut server = mockito::Server::new_async().await;
    let _config = server
        .mock("GET", "/api/v1/connectors/config")
        .with_status(500)
        .with_body("database down")
        .create_async()
        .await;

    let connector = FakeConnector::default();
    let message = task_loop(&server)
        .dispatch(&connector, &task(json!({"id": "t", "connector_id": "c", "action": "update-config"})))
        .await;

    assert!(message.starts_with("error cannot get updated config, error: "), "{}", message);
    assert!(message.contains("database down"));
    assert!(connector.state.lock().unwrap().configs.is_empty());
}

#[tokio::test]
async fn test_update_config_connector_failure() {
    let mut server = mockito::Server::new_async().await;
    let _config = server
        .mock("GET", "/api/v1/connectors/config")
        .with_status(200)
        .with_body(r#"{"config": {}}"#)
        .create_async()
        .await;

    let message = task_loop(&server)
        .dispatch(
            &FakeConnector::failing(),
            &task(json!({"id": "t", "connector_id": "c", "action": "update-config"})),
        )
        .await;

    assert_eq!(message, "error reconfiguring connector, error: boom");
}

#[tokio::test]
async fn test_start_and_stop_state_checks() {
    let server = mockito::Server::new_async().await;
    let task_loop = task_loop(&server);
    let start = task(json!({"id": "t1", "connector_id": "c", "action": "start"}));
    let stop = task(json!({"id": "t2", "connector_id": "c", "action": "stop"}));

    let connector = FakeConnector::default();
    assert_eq!(
        task_loop.dispatch(&connector, &stop).await,
        "error stopping connector, error: connector is already stopped"
    );
    assert_eq!(task_loop.dispatch(&connector, &start).await, "");
    assert_eq!(connector.status(), ConnectorStatus::Started);
    assert_eq!(
        task_loop.dispatch(&connector, &start).await,
        "error starting connector, error: connector is already started"
    );
    assert_eq!(task_loop.dispatch(&connector, &stop).await, "");
    assert_eq!(connector.status(), ConnectorStatus::Stopped);
}

#[tokio::test]
async fn test_stop_failure_is_reported() {
    let server = mockito::Server::new_async().await;
    let connector = FakeConnector::started();
    connector.state.lock().unwrap().fail = true;

    let message = task_loop(&server)
        .dispatch(&connector, &task(json!({"id": "t", "connector_id": "c", "action": "stop"})))
        .await;
    assert_eq!(message, "error stopping connector, error: boom");
}

#[tokio::test]
async fn test_restore() {
    let server = mockito::Server::new_async().await;
    let task_loop = task_loop(&server);
    let connector = FakeConnector::default();

    let ok = task(json!({"id": "t", "connector_id": "c", "action": "restore", "content": {"id": "e-1"}}));
    assert_eq!(task_loop.dispatch(&connector, &ok).await, "");
    assert_eq!(connector.state.lock().unwrap().restored, vec!["e-1"]);

    let missing_id = task(json!({"id": "t", "connector_id": "c", "action": "restore", "content": {}}));
    assert_eq!(
        task_loop.dispatch(&connector, &missing_id).await,
        "error reading restore task, the id of the element to restore is not provided"
    );

    let no_content = task(json!({"id": "t", "connector_id": "c", "action": "restore"}));
    assert_eq!(
        task_loop.dispatch(&connector, &no_content).await,
        "error reading restore task, the id of the element to restore is not provided"
    );

    let malformed = task(json!({"id": "t", "connector_id": "c", "action": "restore", "content": {"id": 12}}));
    assert!(task_loop
        .dispatch(&connector, &malformed)
        .await
        .starts_with("error reading restore task, error: "));
}

#[tokio::test]
async fn test_restore_failure() {
    let server = mockito::Server::new_async().await;
    let restore = task(json!({"id": "t", "connector_id": "c", "action": "restore", "content": {"id": "e-7"}}));

    let message = task_loop(&server)
        .dispatch(&FakeConnector::failing(), &restore)
        .await;
    assert_eq!(message, "error restoring element e-7, error: boom");
}

#[tokio::test]
async fn test_unknown_action_is_ignored() {
    let server = mockito::Server::new_async().await;
    let connector = FakeConnector::failing();

    let message = task_loop(&server)
        .dispatch(&connector, &task(json!({"id": "t", "connector_id": "c", "action": "reboot"})))
        .await;
    assert_eq!(message, "");
}

#[tokio::test]
async fn test_task_without_action_is_a_no_op() {
    let server = mockito::Server::new_async().await;
    let connector = FakeConnector::failing();

    let message = task_loop(&server)
        .dispatch(&connector, &task(json!({"id": "t"})))
        .await;
    assert_eq!(message, "");
}

#[tokio::test]
async fn test_failed_task_is_acked_and_loop_keeps_running() {
    let mut server = mockito::Server::new_async().await;
    let _tasks = server
        .mock("GET", "/api/v1/connectors/tasks")
        .with_status(200)
        .with_body(
            json!({"tasks": [
                {"id": "t-1", "connector_id": "c", "action": "update-config"},
                {"id": "t-2", "connector_id": "c", "action": "start"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    let _config = server
        .mock("GET", "/api/v1/connectors/config")
        .with_status(500)
        .with_body("no config")
        .create_async()
        .await;
    let failed_ack = server
        .mock("POST", "/api/v1/connectors/events")
        .match_body(Matcher::Regex(
            r#""task_id":"t-1","error_message":"error cannot get updated config"#.to_string(),
        ))
        .with_status(200)
        .create_async()
        .await;
    let ok_ack = server
        .mock("POST", "/api/v1/connectors/events")
        .match_body(Matcher::PartialJson(json!({
            "type": "task",
            "event": {"task_id": "t-2", "error_message": ""}
        })))
        .with_status(200)
        .create_async()
        .await;

    let task_loop = task_loop(&server);
    let connector = FakeConnector::default();
    let cancel = CancellationToken::new();

    let run = task_loop.run(&connector, cancel.clone());
    let check = async {
        wait_matched(&[&failed_ack, &ok_ack]).await;
        cancel.cancel();
    };
    let (reason, ()) = tokio::join!(run, check);

    assert_eq!(reason, StopReason::Cancelled);
    assert_eq!(connector.status(), ConnectorStatus::Started);
}

#[tokio::test]
async fn test_unauthorized_fetch_stops_loop() {
    let mut server = mockito::Server::new_async().await;
    let tasks = server
        .mock("GET", "/api/v1/connectors/tasks")
        .with_status(401)
        .with_body(r#"{"code": 1}"#)
        .expect(1)
        .create_async()
        .await;

    let reason = tokio::time::timeout(
        Duration::from_secs(5),
        task_loop(&server).run(&FakeConnector::default(), CancellationToken::new()),
    )
    .await
    .unwrap();

    assert_eq!(reason, StopReason::Unauthorized);
    tasks.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized_ack_stops_loop() {
    let mut server = mockito::Server::new_async().await;
    let _tasks = server
        .mock("GET", "/api/v1/connectors/tasks")
        .with_status(200)
        .with_body(json!({"tasks": [{"id": "t-1", "connector_id": "c", "action": "start"}]}).to_string())
        .create_async()
        .await;
    let _events = server
        .mock("POST", "/api/v1/connectors/events")
        .with_status(401)
        .with_body(r#"{"code": 2}"#)
        .create_async()
        .await;

    let reason = tokio::time::timeout(
        Duration::from_secs(5),
        task_loop(&server).run(&FakeConnector::default(), CancellationToken::new()),
    )
    .await
    .unwrap();

    assert_eq!(reason, StopReason::Unauthorized);
}

#[tokio::test]
async fn test_fetch_errors_are_retried() {
    let mut server = mockito::Server::new_async().await;
    let tasks = server
        .mock("GET", "/api/v1/connectors/tasks")
        .with_status(500)
        .expect_at_least(2)
        .create_async()
        .await;

    let cancel = CancellationToken::new();
    let task_loop = task_loop(&server);
    let connector = FakeConnector::default();
    let run = task_loop.run(&connector, cancel.clone());
    let stop = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    };
    let (reason, ()) = tokio::join!(run, stop);

    assert_eq!(reason, StopReason::Cancelled);
    tasks.assert_async().await;
}

#[tokio::test]
async fn test_cancel_before_any_task() {
    let mut server = mockito::Server::new_async().await;
    let _tasks = server
        .mock("GET", "/api/v1/connectors/tasks")
        .with_status(200)
        .with_body(r#"{"tasks": []}"#)
        .create_async()
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let reason = task_loop(&server)
        .run(&FakeConnector::default(), cancel)
        .await;
    assert_eq!(reason, StopReason::Cancelled);
}
