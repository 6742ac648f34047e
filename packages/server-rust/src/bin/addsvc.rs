//! `addsvc` process: metrics on the debug address, JSON over HTTP and gRPC,
//! all sharing one set of decorated endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use addsvc_core::BasicService;
use addsvc_server::network::{NetworkConfig, NetworkModule};
use addsvc_server::rpc::serve_grpc;
use addsvc_server::service::middleware::describe_metrics;
use addsvc_server::service::{EndpointSet, ServerConfig, Telemetry};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use metrics_exporter_prometheus::PrometheusBuilder;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tokio::sync::watch;
use tracing::{error, info, Dispatch};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "addsvc", about = "Sum and Concat over HTTP/JSON and gRPC")]
struct Args {
    /// Debug and metrics listen address (`/metrics`).
    #[arg(long, env = "ADDSVC_DEBUG_ADDR", default_value = "0.0.0.0:8080")]
    debug_addr: SocketAddr,

    /// HTTP/JSON listen address.
    #[arg(long, env = "ADDSVC_HTTP_ADDR", default_value = "0.0.0.0:8081")]
    http_addr: SocketAddr,

    /// gRPC listen address.
    #[arg(long, env = "ADDSVC_GRPC_ADDR", default_value = "0.0.0.0:8082")]
    grpc_addr: SocketAddr,

    /// Deadline for each business call, in milliseconds.
    #[arg(long, env = "ADDSVC_OPERATION_TIMEOUT_MS", default_value_t = 30_000)]
    operation_timeout_ms: u64,

    /// Log output format.
    #[arg(long, env = "ADDSVC_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

/// Builds the log formatter plus the OpenTelemetry layer that assigns trace
/// and span ids to every `endpoint` span.
///
/// The returned dispatcher is also installed globally for bootstrap logs.
fn init_tracing(format: LogFormat) -> anyhow::Result<(Dispatch, SdkTracerProvider)> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let provider = SdkTracerProvider::builder().build();
    let otel = tracing_opentelemetry::layer().with_tracer(provider.tracer("addsvc"));
    let registry = tracing_subscriber::registry().with(filter).with(otel);
    let dispatch = match format {
        LogFormat::Text => Dispatch::new(registry.with(tracing_subscriber::fmt::layer())),
        LogFormat::Json => Dispatch::new(registry.with(tracing_subscriber::fmt::layer().json())),
    };
    tracing::dispatcher::set_global_default(dispatch.clone())
        .context("failed to install tracing subscriber")?;
    Ok((dispatch, provider))
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Future that resolves once the shutdown flag flips.
async fn wait_for(mut rx: watch::Receiver<bool>) {
    // A dropped sender also means shut down.
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn run(args: Args, dispatch: Dispatch) -> anyhow::Result<()> {
    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(args.debug_addr)
        .build()
        .with_context(|| format!("failed to start metrics listener on {}", args.debug_addr))?;
    tokio::spawn(async move {
        if let Err(e) = exporter.await {
            error!(error = ?e, "metrics listener failed");
        }
    });
    let telemetry = Telemetry::new(dispatch, Arc::new(recorder));
    telemetry.record(describe_metrics);
    info!("metrics listening on {}", args.debug_addr);

    let config = ServerConfig {
        default_operation_timeout_ms: args.operation_timeout_ms,
        telemetry,
        ..ServerConfig::default()
    };
    let endpoints = EndpointSet::new(Arc::new(BasicService::new()), &config);

    let mut http = NetworkModule::new(
        NetworkConfig {
            host: args.http_addr.ip().to_string(),
            port: args.http_addr.port(),
            ..NetworkConfig::default()
        },
        endpoints.clone(),
    );
    http.start()
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", args.http_addr))?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = stop_tx.send(true);
    });

    tokio::try_join!(
        http.serve(wait_for(stop_rx.clone())),
        serve_grpc(args.grpc_addr, endpoints, wait_for(stop_rx)),
    )?;

    info!("addsvc stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (dispatch, provider) = init_tracing(args.log_format)?;

    let result = run(args, dispatch).await;
    if let Err(e) = provider.shutdown() {
        error!(error = %e, "failed to shut down tracer provider");
    }
    if let Err(e) = &result {
        error!(error = ?e, "addsvc failed");
    }
    result
}
