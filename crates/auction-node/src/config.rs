use figment::{
    providers::{
        Env,
        Serialized,
    },
    Figment,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::cli::Cli;

const ENV_PREFIX: &str = "AUCTION_NODE_";

/// The auctioneer node's resolved configuration: environment variables
/// under [`ENV_PREFIX`], overridden field-by-field by whichever CLI flags
/// were actually passed.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub nats_addrs: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_log")]
    pub log: String,

    #[serde(default)]
    pub metrics_addr: Option<String>,
}

fn default_timeout_ms() -> u64 {
    500
}

fn default_max_concurrent() -> usize {
    100
}

fn default_log() -> String {
    "info".to_owned()
}

impl Config {
    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn nats_addr_list(&self) -> Vec<String> {
        self.nats_addrs.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect()
    }
}

/// Loads configuration from `AUCTION_NODE_*` environment variables, then
/// layers `cli` on top so that any flag the operator actually passed wins.
///
/// # Errors
/// Returns an error if `nats_addrs` is missing from both sources.
pub fn get(cli: Cli) -> eyre::Result<Config> {
    let config: Config = Figment::new()
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::defaults(cli))
        .extract()?;
    Ok(config)
}
