//! Import and webhook registration against a mock engine.

use std::fs;

use flowbench_client::EngineClient;
use flowbench_runner::{ImportOptions, Importer, RunnerError, WebhookResolver, validate};
use flowbench_workspace::Workspace;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> EngineClient {
    EngineClient::builder()
        .base_url(server.uri())
        .api_key("k")
        .build()
        .unwrap()
}

fn workspace_with(dir: &TempDir, definition: Value) -> Workspace {
    let ws = Workspace::create(dir.path().join("orders")).unwrap();
    fs::write(
        ws.workflow_path(),
        serde_json::to_string_pretty(&definition).unwrap(),
    )
    .unwrap();
    ws
}

fn orders_definition() -> Value {
    json!({
        "name": "Orders",
        "nodes": [
            { "name": "Hook", "type": "n8n-nodes-base.webhook", "position": [0, 0],
              "parameters": { "path": "orders", "httpMethod": "POST" } },
            { "name": "Set", "type": "n8n-nodes-base.set", "position": [200, 0] }
        ],
        "connections": {}
    })
}

fn import_logs(ws: &Workspace) -> Vec<Value> {
    fs::read_dir(ws.logs_dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("import_"))
        .map(|e| serde_json::from_str(&fs::read_to_string(e.path()).unwrap()).unwrap())
        .collect()
}

#[tokio::test]
async fn test_import_creates_workflow_and_records_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wf-9", "name": "Orders", "active": false, "nodes": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ws = workspace_with(&dir, orders_definition());

    let outcome = Importer::new(client(&server))
        .import(&ws, ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.workflow_id, "wf-9");
    assert!(!outcome.updated);
    assert_eq!(outcome.webhook_count, 1);
    // Nothing answers the probe on the mock server.
    assert_eq!(outcome.registrations.len(), 1);
    assert!(!outcome.registrations[0].registration.registered);
    assert_eq!(
        outcome.registrations[0].registration.reason.as_deref(),
        Some("endpoint_not_found")
    );
    assert_eq!(outcome.warnings.len(), 1);

    let meta = ws.load_metadata().unwrap();
    assert_eq!(meta.workflow_id.as_deref(), Some("wf-9"));
    let last_import = meta.last_import.unwrap();
    assert_eq!(last_import.workflow_id, "wf-9");
    assert_eq!(last_import.node_count, 2);
    let hooks = meta.webhook_config.unwrap().webhooks;
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].method, "POST");
    assert_eq!(
        hooks[0].production_url.as_deref(),
        Some(format!("{}/webhook/orders", server.uri()).as_str())
    );

    let logs = import_logs(&ws);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "success");
    assert_eq!(logs[0]["workflow_id"], "wf-9");
}

#[tokio::test]
async fn test_import_with_id_updates_without_read_only_fields() {
    let server = MockServer::start().await;
    let mut definition = orders_definition();
    definition["id"] = json!("wf-3");
    definition["active"] = json!(true);

    Mock::given(method("PUT"))
        .and(path("/api/v1/workflows/wf-3"))
        .and(body_json(orders_definition()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wf-3", "name": "Orders", "active": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ws = workspace_with(&dir, definition);
    let options = ImportOptions {
        extract_webhooks: false,
        activate: false,
    };

    let outcome = Importer::new(client(&server))
        .import(&ws, options)
        .await
        .unwrap();
    assert!(outcome.updated);
    assert_eq!(outcome.webhook_count, 0);
    assert!(ws.load_metadata().unwrap().webhook_config.is_none());
}

#[tokio::test]
async fn test_update_response_without_id_keeps_definition_id() {
    let server = MockServer::start().await;
    let mut definition = orders_definition();
    definition["id"] = json!("wf-7");

    Mock::given(method("PUT"))
        .and(path("/api/v1/workflows/wf-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Orders" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ws = workspace_with(&dir, definition);
    let options = ImportOptions {
        extract_webhooks: false,
        activate: false,
    };

    let outcome = Importer::new(client(&server))
        .import(&ws, options)
        .await
        .unwrap();
    assert_eq!(outcome.workflow_id, "wf-7");

    let meta = ws.load_metadata().unwrap();
    assert_eq!(meta.workflow_id.as_deref(), Some("wf-7"));
    assert_eq!(meta.last_import.unwrap().workflow_id, "wf-7");
}

#[tokio::test]
async fn test_create_response_without_id_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Orders" })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ws = workspace_with(&dir, orders_definition());

    let err = Importer::new(client(&server))
        .import(&ws, ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::MissingWorkflowId(_)));
    assert!(ws.load_metadata().unwrap().workflow_id.is_none());

    let logs = import_logs(&ws);
    assert_eq!(logs[0]["status"], "failed");
}

#[tokio::test]
async fn test_failed_import_logs_upstream_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "message": "request/body must have required property 'settings'" })),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ws = workspace_with(&dir, orders_definition());

    let err = Importer::new(client(&server))
        .import(&ws, ImportOptions::default())
        .await
        .unwrap_err();
    assert!(err.upstream_body().unwrap().contains("settings"));

    let logs = import_logs(&ws);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "failed");
    assert!(logs[0]["error"].as_str().unwrap().contains("settings"));
    assert!(ws.load_metadata().unwrap().workflow_id.is_none());
}

#[tokio::test]
async fn test_invalid_definition_never_reaches_engine() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ws = workspace_with(&dir, json!({ "name": "Broken", "nodes": [] }));

    assert!(matches!(validate(&ws), Err(RunnerError::Validation(_))));
    let err = Importer::new(client(&server))
        .import(&ws, ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::Validation(_)));
}

#[tokio::test]
async fn test_registration_method_not_allowed() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .and(path("/webhook/orders"))
        .respond_with(ResponseTemplate::new(204).insert_header("allow", "POST"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/webhook/orders"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let resolver = WebhookResolver::new(client(&server));
    let url = format!("{}/webhook/orders", server.uri());

    let reg = resolver.verify_registration(&url, "GET").await;
    assert!(!reg.registered);
    assert_eq!(reg.reason.as_deref(), Some("method_not_allowed"));
    assert_eq!(reg.allowed.as_deref(), Some("POST"));

    assert!(resolver.verify_registration(&url, "post").await.registered);
}

#[tokio::test]
async fn test_registration_connection_error() {
    let server = MockServer::start().await;
    let resolver = WebhookResolver::new(client(&server));
    let reg = resolver
        .verify_registration("http://127.0.0.1:1/webhook/none", "GET")
        .await;
    assert!(!reg.registered);
    assert_eq!(reg.reason.as_deref(), Some("connection_error"));
}

#[tokio::test]
async fn test_batch_trigger_records_each_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/ok"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-n8n-execution-id", "ex-1"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhook/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let urls = vec![
        format!("{}/webhook/ok", server.uri()),
        format!("{}/webhook/broken", server.uri()),
    ];
    let outcomes = WebhookResolver::new(client(&server))
        .batch_trigger(&urls, None, std::time::Duration::ZERO)
        .await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].execution_id.as_deref(), Some("ex-1"));
    assert!(!outcomes[1].success);
    assert_eq!(outcomes[1].status, Some(500));
    assert_eq!(outcomes[1].error.as_deref(), Some("boom"));
}
