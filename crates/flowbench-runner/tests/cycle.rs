//! Full import/execute/collect passes.

use std::fs;

use flowbench_client::EngineClient;
use flowbench_config::FlowbenchConfig;
use flowbench_runner::Workbench;
use flowbench_types::ExecutionMethod;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn workbench(server: &MockServer, base: &TempDir) -> Workbench {
    let client = EngineClient::builder()
        .base_url(server.uri())
        .api_key("k")
        .build()
        .unwrap();
    let mut config = FlowbenchConfig::default();
    config.polling.interval_ms = 1;
    config.polling.max_polls = 3;
    config.cli.executable = "/nonexistent/flowbench-test/n8n".to_string();
    Workbench::new(client, config, base.path())
}

fn write_definition(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("nightly-report.json");
    fs::write(
        &path,
        json!({
            "name": "Nightly Report",
            "nodes": [{ "name": "Start", "type": "n8n-nodes-base.manualTrigger", "position": [0, 0] }],
            "connections": {}
        })
        .to_string(),
    )
    .unwrap();
    path
}

async fn mount_engine(server: &MockServer, finished: bool) {
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wf-5", "name": "Nightly Report", "active": false
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows/wf-5/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "ex-5" })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/executions/ex-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ex-5",
            "finished": finished,
            "stoppedAt": if finished { json!("2026-01-01T00:00:00Z") } else { json!(null) }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_debug_cycle_stops_on_success() {
    let server = MockServer::start().await;
    mount_engine(&server, true).await;

    let base = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let json_path = write_definition(&source);

    let report = workbench(&server, &base)
        .debug_cycle(&json_path, 3)
        .await
        .unwrap();

    assert!(report.succeeded);
    assert_eq!(report.iterations, 1);
    assert!(report.workspace.root().starts_with(base.path().join("workflows")));

    let run = report.last_run.unwrap();
    assert_eq!(run.import.workflow_id, "wf-5");
    let execution = run.execution.unwrap();
    assert_eq!(execution.result.method, ExecutionMethod::Api);

    let context = run.context.unwrap();
    assert!(context.json_path.is_file());
    assert!(context.summary_path.is_file());
    assert_eq!(context.context.engine.version, "unknown");

    let meta = report.workspace.load_metadata().unwrap();
    assert_eq!(meta.workflow_id.as_deref(), Some("wf-5"));
    assert!(meta.last_execution.is_some());
}

#[tokio::test]
async fn test_debug_cycle_gives_up_after_max_iterations() {
    let server = MockServer::start().await;
    mount_engine(&server, false).await;

    let base = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let json_path = write_definition(&source);

    let report = workbench(&server, &base)
        .debug_cycle(&json_path, 2)
        .await
        .unwrap();

    assert!(!report.succeeded);
    assert_eq!(report.iterations, 2);
    let run = report.last_run.unwrap();
    assert!(!run.succeeded());
}

#[tokio::test]
async fn test_run_unknown_workspace() {
    let server = MockServer::start().await;
    let base = TempDir::new().unwrap();
    assert!(workbench(&server, &base).run("missing", false).await.is_err());
}

#[tokio::test]
async fn test_collector_probes_configured_engine() {
    let server = MockServer::start().await;
    let base = TempDir::new().unwrap();
    let options = workbench(&server, &base).collector_options();

    let address = server.address();
    assert_eq!(options.engine_port, address.port());
    assert_eq!(options.engine_host, address.ip().to_string());
    assert_eq!(options.base_url, server.uri());
}

#[test]
fn test_collector_uses_scheme_default_port() {
    let base = TempDir::new().unwrap();
    let client = EngineClient::builder()
        .base_url("https://engine.example.com")
        .build()
        .unwrap();
    let options =
        Workbench::new(client, FlowbenchConfig::default(), base.path()).collector_options();
    assert_eq!(options.engine_host, "engine.example.com");
    assert_eq!(options.engine_port, 443);
}
