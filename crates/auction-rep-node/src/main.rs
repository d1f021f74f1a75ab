mod cli;
mod config;
mod telemetry;

use auction_representative::{
    http,
    pubsub,
    sweeper,
    Representative,
};
use clap::Parser as _;
use tokio_util::sync::CancellationToken;
use tracing::{
    error,
    info,
};

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

    let rep = Representative::new(conf.guid.clone(), conf.resources);
    info!(guid = %conf.guid, resources = conf.resources, "representative initialized");

    let shutdown = CancellationToken::new();
    let mut tasks = vec![sweeper::spawn(rep.clone(), sweeper::DEFAULT_HORIZON, shutdown.clone())];

    if let Some(http_addr) = &conf.http_addr {
        let listener = tokio::net::TcpListener::bind(http_addr)
            .await
            .map_err(|error| eyre::eyre!("failed to bind HTTP listener on `{http_addr}`: {error}"))?;
        let router = http::router(rep.clone());
        let shutdown = shutdown.clone();
        println!("listening");
        info!(%http_addr, "listening");
        tasks.push(tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                shutdown.cancelled().await;
            });
            if let Err(error) = server.await {
                error!(%error, "HTTP server exited with an error");
            }
        }));
    }

    let nats_addrs = conf.nats_addr_list();
    if !nats_addrs.is_empty() {
        let client = async_nats::connect(nats_addrs.clone())
            .await
            .map_err(|error| eyre::eyre!("failed to connect to NATS at `{nats_addrs:?}`: {error}"))?;
        let handle = pubsub::spawn(client, rep.clone(), shutdown.clone())
            .await
            .map_err(|error| eyre::eyre!("failed to subscribe on the representative's subjects: {error}"))?;
        println!("serving");
        info!(addrs = ?nats_addrs, "serving");
        tasks.push(handle);
    }

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping representative node");
    shutdown.cancel();

    for task in tasks {
        let _ = task.await;
    }

    Ok(())
}

/// A contract violation (see [`auction_representative::Representative::release`]
/// and [`Representative::claim`][auction_representative::Representative::claim])
/// panics rather than returning an error. Tokio catches panics at the task
/// boundary, so without this hook a violation in a spawned request handler
/// would only kill that one task and the node would keep serving corrupted
/// state. Installing this hook makes any panic on this process abort it.
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
