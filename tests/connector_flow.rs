use async_trait::async_trait;
use connector_sdk::config::RetryConfig;
use connector_sdk::event::{EmailInfos, MitigationAction, MitigationReason};
use connector_sdk::log_bridge::Attr;
use connector_sdk::{
    ClientConfig, Connector, ConnectorManagerClient, ConnectorStatus, ErrorKind, EventHandler,
    LevelVar, RegistrationInfo, RestoreActionContent, StopReason,
};
use mockito::{Matcher, Mock, Server};
use serde_json::json;
use serde_json::value::RawValue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn test_config(url: &str) -> ClientConfig {
    let mut config = ClientConfig::new(url, "integration-key");
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

struct SwitchConnector {
    started: AtomicBool,
}

#[async_trait]
impl Connector for SwitchConnector {
    async fn start(&self) -> anyhow::Result<()> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn configure(&self, _config: &RawValue) -> anyhow::Result<()> {
        Ok(())
    }

    async fn restore(&self, _content: RestoreActionContent) -> anyhow::Result<()> {
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

async fn wait_matched(mock: &Mock) {
    for _ in 0..200 {
        if mock.matched_async().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("mock was not matched in time");
}

#[tokio::test]
async fn test_register_then_report_through_console_handler() {
    let mut server = Server::new_async().await;
    let _register = server
        .mock("POST", "/api/v1/connectors/register")
        .with_status(200)
        .with_body(r#"{"stopped": false, "config": {}, "unresolved_errors": {"gmalware": "old"}}"#)
        .create_async()
        .await;
    let resolution = server
        .mock("POST", "/api/v1/connectors/events")
        .match_body(Matcher::PartialJson(json!({
            "type": "resolution",
            "event": {"type": ["gmalware"], "resolution": "analysis back"}
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let mitigation = server
        .mock("POST", "/api/v1/connectors/events")
        .match_body(Matcher::PartialJson(json!({
            "type": "mitigation",
            "event": {"type": "block", "info_type": "email", "element_id": "mail-1", "reason": "phishing"}
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let client = ConnectorManagerClient::new(&test_config(&server.url())).unwrap();
    let info: RegistrationInfo = client.register("1.0.0").await.unwrap();
    let handler = client.console_event_handler(LevelVar::default(), info.unresolved_errors);

    handler
        .notify_resolution("analysis back", &[ErrorKind::GMALWARE])
        .await
        .unwrap();
    handler
        .notify_resolution("analysis back", &[ErrorKind::GMALWARE])
        .await
        .unwrap();
    handler
        .notify_email_mitigation(
            MitigationAction::Block,
            "mail-1",
            MitigationReason::Phishing,
            EmailInfos {
                subject: "invoice".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    resolution.assert_async().await;
    mitigation.assert_async().await;
}

async fn log_mock(server: &mut Server, pattern: &str) -> Mock {
    server
        .mock("POST", "/api/v1/connectors/events")
        .match_body(Matcher::Regex(pattern.to_string()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn test_sibling_loggers_send_disjoint_attributes() {
    let mut server = Server::new_async().await;
    let first = log_mock(&mut server, r#""message":"one","time":\d+,"attributes":\{"attr1":"toto"\}\}"#).await;
    let second = log_mock(&mut server, r#""message":"two","time":\d+,"attributes":\{"attr2":"foo"\}\}"#).await;

    let client = ConnectorManagerClient::new(&test_config(&server.url())).unwrap();
    let handler = client.console_event_handler(LevelVar::default(), Default::default());
    let base = handler.logger();

    base.with([Attr::new("attr1", "toto")]).info("one", vec![]).await;
    base.with([Attr::new("attr2", "foo")]).info("two", vec![]).await;

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_task_loop_acks_and_stops_on_revoked_key() {
    let mut server = Server::new_async().await;
    let _tasks = server
        .mock("GET", "/api/v1/connectors/tasks")
        .with_status(200)
        .with_body(json!({"tasks": [{"id": "t-1", "connector_id": "c", "action": "start"}]}).to_string())
        .create_async()
        .await;
    let ack = server
        .mock("POST", "/api/v1/connectors/events")
        .match_header("authorization", "ApiKey integration-key")
        .match_body(Matcher::PartialJson(json!({"type": "task", "event": {"task_id": "t-1"}})))
        .with_status(401)
        .with_body(r#"{"code": 2}"#)
        .create_async()
        .await;

    let client = ConnectorManagerClient::new(&test_config(&server.url())).unwrap();
    let connector = SwitchConnector {
        started: AtomicBool::new(false),
    };

    let reason = tokio::time::timeout(
        Duration::from_secs(5),
        client.start(&connector, CancellationToken::new()),
    )
    .await
    .unwrap();

    assert_eq!(reason, StopReason::Unauthorized);
    assert_eq!(connector.status(), ConnectorStatus::Started);
    wait_matched(&ack).await;
}
