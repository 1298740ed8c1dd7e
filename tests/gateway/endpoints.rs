use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};
use slawarden::SlaEngine;
use slawarden::transport::gateway::run_gateway_with_listener;
use tempfile::TempDir;

use crate::engine_harness::{harness, install_crypto_provider, labeled, scalar, scripted, test_config};

struct GatewayTestServer {
    port: u16,
    engine: Arc<SlaEngine>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
    _workspace: TempDir,
}

impl GatewayTestServer {
    async fn start() -> Self {
        install_crypto_provider();
        let workspace = TempDir::new().expect("temp workspace should be created");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let port = listener
            .local_addr()
            .expect("ephemeral gateway listener should expose local address")
            .port();

        let h = harness(
            &test_config(workspace.path()),
            vec![
                ("users", scripted(vec![scalar(25.0)])),
                ("requests", scripted(vec![scalar(3.0)])),
                ("cpu", scripted(vec![labeled(&[("5000", 0.04)])])),
            ],
        );
        let engine = Arc::clone(&h.engine);
        let handle = tokio::spawn(async move {
            run_gateway_with_listener("127.0.0.1", listener, h.engine).await
        });

        wait_until_gateway_ready(port).await;

        Self {
            port,
            engine,
            handle,
            _workspace: workspace,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }
}

impl Drop for GatewayTestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wait_until_gateway_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..80 {
        let health = client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await;
        if matches!(health, Ok(resp) if resp.status() == StatusCode::OK) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("gateway did not become ready on port {port}");
}

#[tokio::test]
async fn metrics_endpoint_serves_text_exposition() {
    let server = GatewayTestServer::start().await;
    server.engine.run_cycle().await;

    let response = reqwest::get(server.url("/metrics"))
        .await
        .expect("scrape should complete");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = response.text().await.expect("scrape body should be text");
    assert!(body.contains("# TYPE users gauge"));
    assert!(body.contains("users 25"));
    assert!(body.contains("sla_check_results{check=\"users_check\"} 0"));
    assert!(body.contains("sla_check_results{check=\"cpu_check_5000\"} 1"));
    assert!(body.contains("sla_violations_lifetime_total 1"));
}

#[tokio::test]
async fn scrape_does_not_run_a_cycle() {
    let server = GatewayTestServer::start().await;

    for _ in 0..3 {
        let response = reqwest::get(server.url("/metrics"))
            .await
            .expect("scrape should complete");
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(server.engine.cycles_run(), 0);
}

#[tokio::test]
async fn sla_update_round_trips_through_get() {
    let server = GatewayTestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/sla"))
        .json(&json!({"users_desired": 30, "requests_desired": "many"}))
        .send()
        .await
        .expect("update should complete");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("update response should be json");
    assert_eq!(body["applied"], json!(["users_desired"]));
    assert!(body["ignored"]["requests_desired"].is_string());

    let status: Value = reqwest::get(server.url("/sla"))
        .await
        .expect("status should complete")
        .json()
        .await
        .expect("status should be json");
    assert_eq!(status["users_desired"], json!(30.0));
    assert_eq!(status["requests_desired"], json!(12.0));

    let rejected = client
        .put(server.url("/sla"))
        .json(&json!({"sla_violations_lifetime_total": 0}))
        .send()
        .await
        .expect("update should complete");
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn violations_and_probability_reflect_last_cycle() {
    let server = GatewayTestServer::start().await;
    server.engine.run_cycle().await;

    let violations: Value = reqwest::get(server.url("/violations"))
        .await
        .expect("violations should complete")
        .json()
        .await
        .expect("violations should be json");
    assert_eq!(violations["lifetime_count"], json!(1));
    assert_eq!(violations["windows"].as_array().map(Vec::len), Some(3));

    let probability: Value = reqwest::get(server.url("/probability_of_violations/1"))
        .await
        .expect("probability should complete")
        .json()
        .await
        .expect("probability should be json");
    assert_eq!(probability["probability"], json!(10.0));

    let zero: Value = reqwest::get(server.url("/probability_of_violations/0"))
        .await
        .expect("probability should complete")
        .json()
        .await
        .expect("probability should be json");
    assert_eq!(zero["probability"], json!(0.0));

    let malformed = reqwest::get(server.url("/probability_of_violations/soon"))
        .await
        .expect("probability should complete");
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metric_lifecycle_over_http() {
    let server = GatewayTestServer::start().await;
    server.engine.run_cycle().await;
    let client = reqwest::Client::new();

    let removed = client
        .post(server.url("/remove_metric/users"))
        .send()
        .await
        .expect("remove should complete");
    assert_eq!(removed.status(), StatusCode::OK);
    let scrape = reqwest::get(server.url("/metrics"))
        .await
        .expect("scrape should complete")
        .text()
        .await
        .expect("scrape body should be text");
    assert!(!scrape.contains("users 25"));

    let again: Value = client
        .post(server.url("/remove_metric/users"))
        .send()
        .await
        .expect("remove should complete")
        .json()
        .await
        .expect("remove response should be json");
    assert_eq!(again["changed"], json!(false));

    let restored = client
        .post(server.url("/add_metric/users"))
        .send()
        .await
        .expect("add should complete");
    assert_eq!(restored.status(), StatusCode::OK);
    let scrape = reqwest::get(server.url("/metrics"))
        .await
        .expect("scrape should complete")
        .text()
        .await
        .expect("scrape body should be text");
    assert!(scrape.contains("users 25"));

    let missing = client
        .post(server.url("/add_metric/ghost"))
        .send()
        .await
        .expect("add should complete");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn state_lists_persisted_rows() {
    let server = GatewayTestServer::start().await;
    server.engine.run_cycle().await;

    let rows: Value = reqwest::get(server.url("/state"))
        .await
        .expect("state should complete")
        .json()
        .await
        .expect("state should be json");
    let names: Vec<&str> = rows
        .as_array()
        .expect("state should be an array")
        .iter()
        .filter_map(|row| row["name"].as_str())
        .collect();
    assert!(names.contains(&"users_check"));
    assert!(names.contains(&"cpu_check_5000"));
}
