//! Process entry point (§2 dataflow, §4.5, §5): load config, pre-warm
//! every worker's pools and route table up front, then serve one axum
//! fallback that hands each request to `runtime_http::handle` against a
//! round-robin-picked worker — mirroring `autosint_fetch::main`'s shape
//! (tracing init → metrics recorder → bind → serve) with the routing
//! itself delegated to the custom router/dispatch stack instead of
//! `axum::Router::route` per path.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use http::StatusCode;
use metrics_exporter_prometheus::PrometheusBuilder;

use runtime_http::{context_from_request, error_response, handle};
use runtime_server::config;
use runtime_server::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("runtime-server starting");

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus metrics recorder");

    let config_dir = std::env::var("RUNTIME_CONFIG_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("./config"));

    let runtime_config = config::load_config(&config_dir).expect("failed to load configuration");
    let host = runtime_config.system.server.host.clone();
    let port = runtime_config.system.server.port;

    let state = AppState::build(runtime_config, metrics_handle)
        .await
        .expect("failed to build application state");

    let app = axum::Router::new()
        .fallback(dispatch)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .expect("failed to bind TCP listener");

    tracing::info!(host = %host, port, "runtime-server listening");

    axum::serve(listener, app).await.expect("HTTP server error");
}

/// The single fallback service every request passes through (§4.5): pick a
/// worker, wait for it to report ready, then run the full runtime-core
/// pipeline against its router and global middleware chain.
async fn dispatch(State(state): State<Arc<AppState>>, req: axum::extract::Request) -> Response {
    let (mut ctx, status) = context_from_request(req).await;
    if status != StatusCode::OK {
        return error_response(
            &runtime_common::RuntimeError::InvalidInput("failed to read request body".to_string()),
            state.config.debug,
        );
    }

    let worker = state.pick_worker();

    if let Err(e) = worker.worker.ready().wait_ready().await {
        return error_response(&e, state.config.debug);
    }

    handle(&worker.router, &worker.global_pipeline, &mut ctx, state.config.debug).await
}
