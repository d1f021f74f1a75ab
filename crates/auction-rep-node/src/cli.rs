use clap::Parser;
use serde::Serialize;

/// Flags for the representative node binary.
///
/// Every field is optional here even though `guid` is ultimately required:
/// the merge order in [`crate::config::get`] is CLI over env, and a
/// `clap`-level `required` on an optional-for-figment field would reject a
/// purely env-configured run before figment ever got a chance to fill it in.
#[derive(Debug, Parser, Serialize)]
pub struct Cli {
    /// Stable identifier for this representative.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,

    /// Fixed capacity this representative offers, in resource units.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<u32>,

    /// Address to serve the HTTP transport on, e.g. `0.0.0.0:8080`.
    #[arg(long = "http-addr")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_addr: Option<String>,

    /// Comma-separated NATS server addresses for the pub-sub transport.
    #[arg(long = "nats-addrs")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nats_addrs: Option<String>,

    /// Log filter directive, e.g. `info` or `auction_rep_node=debug,info`.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,

    /// Address to serve Prometheus metrics on. Disabled if unset.
    #[arg(long = "metrics-addr")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_addr: Option<String>,
}
