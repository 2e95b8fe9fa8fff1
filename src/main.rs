use std::net::SocketAddr;
use std::sync::Arc;

use kvns_proxy::config::Config;
use kvns_proxy::server::{self, ServerLimits};
use kvns_proxy::{Client, MemoryStore, Namespace, NamespacedClient, RespConnection};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let metrics_addr: SocketAddr = config
        .metrics_listen_addr()
        .parse()
        .expect("invalid metrics listen address");
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .expect("failed to install Prometheus exporter");

    metrics::describe_histogram!(
        "kvns_proxy_command_duration_seconds",
        "Latency of namespaced commands in seconds, including the store round trip"
    );
    metrics::describe_counter!(
        "kvns_proxy_flushed_keys_total",
        "Number of keys deleted by namespace-scoped FLUSHDB"
    );
    metrics::describe_counter!(
        "kvns_proxy_rejected_commands_total",
        "Commands refused because their keys cannot be namespaced"
    );

    let namespace = match Namespace::new(config.namespace.clone().unwrap_or_default()) {
        Ok(ns) => ns,
        Err(e) => {
            error!(error = %e, "invalid KVNS_PROXY_NAMESPACE");
            std::process::exit(1);
        }
    };

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await.expect("failed to bind");
    let limits = ServerLimits::from_config(&config);

    match &config.upstream {
        Some(upstream) => {
            let conn = match RespConnection::connect(upstream.as_str()).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, upstream = %upstream, "failed to connect to upstream store");
                    std::process::exit(1);
                }
            };
            info!(addr = %addr, namespace = %namespace, upstream = %upstream, "kvns-proxy listening");
            run(listener, conn, namespace, limits).await;
        }
        None => {
            info!(addr = %addr, namespace = %namespace, "kvns-proxy listening on embedded store");
            run(listener, MemoryStore::new(), namespace, limits).await;
        }
    }

    info!("shut down");
}

async fn run<C: Client + 'static>(
    listener: TcpListener,
    client: C,
    namespace: Namespace,
    limits: ServerLimits,
) {
    let proxy = Arc::new(NamespacedClient::new(client, namespace));
    server::serve(listener, proxy, limits, shutdown_signal()).await;
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = signal::ctrl_c() => info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("received SIGINT, shutting down");
    }
}
