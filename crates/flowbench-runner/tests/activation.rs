//! Activation against a mock engine.

use flowbench_client::EngineClient;
use flowbench_runner::{ActivationController, RunnerError};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn controller(server: &MockServer) -> ActivationController {
    let client = EngineClient::builder()
        .base_url(server.uri())
        .api_key("k")
        .build()
        .unwrap();
    ActivationController::new(client)
}

fn workflow(id: &str, active: bool) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": id,
        "name": format!("Workflow {id}"),
        "active": active,
        "nodes": []
    }))
}

#[tokio::test]
async fn test_activate_reads_back_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/wf-42"))
        .respond_with(workflow("wf-42", false))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows/wf-42/activate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/wf-42"))
        .respond_with(workflow("wf-42", true))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = controller(&server).activate("wf-42").await.unwrap();
    assert!(outcome.active);
    assert!(outcome.changed);
    assert_eq!(outcome.name, "Workflow wf-42");
}

#[tokio::test]
async fn test_activate_already_active_sends_no_action() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/wf-1"))
        .respond_with(workflow("wf-1", true))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows/wf-1/activate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctrl = controller(&server);
    for _ in 0..2 {
        let outcome = ctrl.activate("wf-1").await.unwrap();
        assert!(outcome.active);
        assert!(!outcome.changed);
    }
}

#[tokio::test]
async fn test_state_that_does_not_stick_is_a_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/wf-2"))
        .respond_with(workflow("wf-2", true))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows/wf-2/deactivate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let err = controller(&server).deactivate("wf-2").await.unwrap_err();
    assert!(matches!(
        err,
        RunnerError::ActivationMismatch { ref id, observed: true } if id == "wf-2"
    ));
}

#[tokio::test]
async fn test_batch_isolates_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/a"))
        .respond_with(workflow("a", true))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/b"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "not found" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/c"))
        .respond_with(workflow("c", false))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows/c/activate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/c"))
        .respond_with(workflow("c", true))
        .mount(&server)
        .await;

    let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let report = controller(&server).batch(&ids, true).await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.changed, 1);
    assert_eq!(report.unchanged, 1);
    assert!(!report.results[1].is_ok());
    assert!(report.results[1].error.as_deref().unwrap().contains("not found"));
    assert_eq!(report.results[2].id, "c");
}

#[tokio::test]
async fn test_list_summaries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": 7, "name": "Seven", "active": true }]
        })))
        .mount(&server)
        .await;

    let list = controller(&server).list().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, "7");
    assert!(list[0].active);
}
