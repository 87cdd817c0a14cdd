// MXBridge Exporter - Prometheus exporter for MXBridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # MXBridge Exporter
//!
//! Collects managed attributes from Jolokia agents and serves them as
//! Prometheus metrics.
//!
//! ## Usage
//!
//! ```bash
//! # Poll every second, serve on the default port
//! mxbridge-exporter --config jmx.json
//!
//! # Slower cycle, bounded requests
//! mxbridge-exporter --config jmx.json --interval-secs 5 --request-timeout-secs 2
//! ```

mod error;
mod metrics;
mod poller;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use clap::Parser;
use error::{ExporterError, Result};
use metrics::encode_metrics;
use mxbridge::ModuleConfig;
use mxbridge_jolokia::JolokiaConnector;
use poller::{PollerConfig, PollerState, ServerStatus};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// MXBridge Prometheus Exporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Module configuration file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value = "9100")]
    port: u16,

    /// Seconds between collection cycles
    #[arg(short, long, default_value = "1")]
    interval_secs: u64,

    /// Abort agent requests after this many seconds
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Application state shared across handlers.
struct AppState {
    poller: Arc<PollerState>,
    start_time: Instant,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("MXBridge Exporter v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = ModuleConfig::from_file(&args.config)?;
    info!(
        "Loaded {} servers and {} common charts from {}",
        config.jmx_servers.len(),
        config.common_charts.len(),
        args.config.display()
    );

    let connector = match args.request_timeout_secs {
        Some(secs) => JolokiaConnector::with_timeout(Duration::from_secs(secs)),
        None => JolokiaConnector::new(),
    };
    let poller_config = PollerConfig {
        interval: Duration::from_secs(args.interval_secs.max(1)),
    };

    let poller_state = Arc::new(PollerState::default());
    let loop_state = Arc::clone(&poller_state);

    // The blocking HTTP client must live and die outside the runtime.
    let poller = tokio::task::spawn_blocking(move || {
        poller::run(config, Arc::new(connector), poller_config, loop_state)
    });

    let state = Arc::new(AppState {
        poller: Arc::clone(&poller_state),
        start_time: Instant::now(),
    });

    // Build router
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(source) => {
            poller_state.stop();
            return Err(ExporterError::Bind { addr, source });
        }
    };
    info!("Starting server on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    let shutdown_state = Arc::clone(&poller_state);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Cannot listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
            shutdown_state.stop();
        })
        .await;

    poller_state.stop();
    poller
        .await
        .map_err(|e| ExporterError::Poller(e.to_string()))?;
    served?;
    Ok(())
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>MXBridge Exporter</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #2c3e50; }
        a { color: #3498db; text-decoration: none; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>MXBridge Exporter</h1>
    <p>Prometheus exporter for managed attributes read through Jolokia agents.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div class="endpoint"><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div class="endpoint"><a href="/health">/health</a> - Health check</div>
        <div class="endpoint"><a href="/status">/status</a> - Collector status (JSON)</div>
    </div>

    <h2>Metrics</h2>
    <ul>
        <li><code>mxbridge_dimension_value</code> - Latest value per server, chart and dimension</li>
        <li><code>mxbridge_server_connected</code> - Connection state (1=connected)</li>
        <li><code>mxbridge_queries_enabled</code> - Queries sampled each cycle</li>
        <li><code>mxbridge_collection_cycles_total</code> - Completed cycles</li>
        <li><code>mxbridge_cycle_duration_seconds</code> - Duration of the last cycle</li>
    </ul>
</body>
</html>"#,
    )
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = encode_metrics();
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        metrics,
    )
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.poller.is_running() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Poller stopped")
    }
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    cycles: u64,
    servers: Vec<ServerStatus>,
}

/// Status handler - returns JSON status.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        cycles: state.poller.cycles(),
        servers: state.poller.servers(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["mxbridge-exporter", "--config", "jmx.json"]);
        assert_eq!(args.port, 9100);
        assert_eq!(args.interval_secs, 1);
        assert_eq!(args.request_timeout_secs, None);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"jmxServers": [{{"name": "app", "serviceUrl": "http://localhost:8778/jolokia"}}]}}"#
        )
        .unwrap();

        let config = ModuleConfig::from_file(file.path()).unwrap();
        assert_eq!(config.jmx_servers.len(), 1);
        assert!(config.auto_detect_local_virtual_machines);
    }

    #[test]
    fn test_status_serializes() {
        let status = StatusResponse {
            version: "test".to_string(),
            uptime_secs: 3,
            cycles: 7,
            servers: Vec::new(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["cycles"], 7);
        assert!(json["servers"].as_array().unwrap().is_empty());
    }
}
