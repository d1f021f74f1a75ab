mod cli;
mod config;
mod telemetry;

use std::sync::Arc;

use auction_coordinator::RemoteAuctioneerWorker;
use auction_pool_client::{
    pubsub::PubSubPoolClient,
    RepPoolClient,
};
use clap::Parser as _;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = cli::Cli::parse();
    let conf = config::get(cli)?;
    telemetry::init(&conf.log)?;
    install_contract_violation_abort_hook();

    if let Some(metrics_addr) = &conf.metrics_addr {
        let addr: std::net::SocketAddr = metrics_addr
            .parse()
            .map_err(|error| eyre::eyre!("invalid --metrics-addr `{metrics_addr}`: {error}"))?;
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|error| eyre::eyre!("failed to install Prometheus exporter: {error}"))?;
        info!(%metrics_addr, "serving metrics");
    }

    let addrs = conf.nats_addr_list();
    let client = async_nats::connect(addrs.clone())
        .await
        .map_err(|error| eyre::eyre!("failed to connect to NATS at `{addrs:?}`: {error}"))?;

    let pool: Arc<dyn RepPoolClient> = Arc::new(PubSubPoolClient::new(client.clone(), conf.timeout()));
    let worker = RemoteAuctioneerWorker::new(client, pool, conf.max_concurrent);

    let shutdown = CancellationToken::new();
    let handle = worker
        .spawn(shutdown.clone())
        .await
        .map_err(|error| eyre::eyre!("failed to subscribe on the auction subject: {error}"))?;

    println!("auctioneering");
    info!(addrs = ?addrs, timeout_ms = conf.timeout_ms, max_concurrent = conf.max_concurrent, "auctioneering");

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping auctioneer node");
    shutdown.cancel();

    if let Err(error) = handle.await {
        eyre::bail!("auctioneer worker task panicked: {error}");
    }

    Ok(())
}

/// A representative's contract violation panics rather than returning an
/// error. Tokio catches panics at the task boundary, so without this hook a
/// violation surfacing inside a spawned request handler would only kill
/// that one task and the node would keep running. Installing this hook
/// makes any panic on this process abort it instead.
fn install_contract_violation_abort_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        std::process::abort();
    }));
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("installing a SIGINT handler should always work on a unix host");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("installing a SIGTERM handler should always work on a unix host")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
