use clap::Parser;
use serde::Serialize;

/// Flags for the auctioneer node binary.
///
/// See [`crate::config`] for why every field here is optional even though
/// `nats_addrs` is, in practice, required.
#[derive(Debug, Parser, Serialize)]
pub struct Cli {
    /// Comma-separated NATS server addresses to subscribe for remote
    /// auction requests on.
    #[arg(long = "nats-addrs")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nats_addrs: Option<String>,

    /// Per-RPC transport timeout against representatives, e.g. `500ms`,
    /// `1s`.
    #[arg(long, value_parser = parse_duration_ms)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Maximum number of auctions this worker runs concurrently.
    #[arg(long = "max-concurrent")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<usize>,

    /// Log filter directive, e.g. `info` or `auction_node=debug,info`.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,

    /// Address to serve Prometheus metrics on. Disabled if unset.
    #[arg(long = "metrics-addr")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_addr: Option<String>,
}

fn parse_duration_ms(raw: &str) -> Result<u64, String> {
    let duration = humantime::parse_duration(raw).map_err(|error| error.to_string())?;
    Ok(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
