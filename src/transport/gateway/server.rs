use super::handlers::{
    handle_add_metric, handle_health, handle_metrics, handle_probability, handle_remove_metric,
    handle_sla_get, handle_sla_update, handle_state, handle_violations,
};
use super::{AppState, MAX_BODY_SIZE, REQUEST_TIMEOUT_SECS};
use crate::engine::SlaEngine;
use crate::platform::health;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Bind `host:port` and serve the gateway.
pub async fn run_gateway(host: &str, port: u16, engine: Arc<SlaEngine>) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("parse gateway bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind gateway socket")?;

    run_gateway_with_listener(host, listener, engine).await
}

/// Run the HTTP gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    host: &str,
    listener: tokio::net::TcpListener,
    engine: Arc<SlaEngine>,
) -> Result<()> {
    let actual_port = listener
        .local_addr()
        .context("get gateway listener local address")?
        .port();
    tracing::info!(address = %format!("{host}:{actual_port}"), "gateway listening");
    health::mark_component_ok("gateway");

    let app = build_app(AppState { engine });
    axum::serve(listener, app)
        .await
        .context("serve HTTP gateway")?;

    Ok(())
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .route(
            "/sla",
            get(handle_sla_get)
                .post(handle_sla_update)
                .put(handle_sla_update),
        )
        .route("/violations", get(handle_violations))
        .route(
            "/probability_of_violations/{minutes}",
            get(handle_probability),
        )
        .route("/add_metric/{name}", post(handle_add_metric))
        .route("/remove_metric/{name}", post(handle_remove_metric))
        .route("/state", get(handle_state))
        .route("/health", get(handle_health))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}
