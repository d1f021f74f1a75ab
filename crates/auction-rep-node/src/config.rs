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

const ENV_PREFIX: &str = "AUCTION_REP_";

/// The representative node's resolved configuration: environment variables
/// under [`ENV_PREFIX`], overridden field-by-field by whichever CLI flags
/// were actually passed.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub guid: String,

    #[serde(default = "default_resources")]
    pub resources: u32,

    #[serde(default)]
    pub http_addr: Option<String>,

    #[serde(default)]
    pub nats_addrs: Option<String>,

    #[serde(default = "default_log")]
    pub log: String,

    #[serde(default)]
    pub metrics_addr: Option<String>,
}

fn default_resources() -> u32 {
    100
}

fn default_log() -> String {
    "info".to_owned()
}

impl Config {
    /// `nats_addrs` split on commas, trimmed, with empties dropped.
    #[must_use]
    pub fn nats_addr_list(&self) -> Vec<String> {
        self.nats_addrs
            .as_deref()
            .map(|addrs| addrs.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect())
            .unwrap_or_default()
    }

    fn validate(self) -> eyre::Result<Self> {
        if self.http_addr.is_none() && self.nats_addr_list().is_empty() {
            eyre::bail!("at least one of --http-addr or --nats-addrs must be set");
        }
        Ok(self)
    }
}

/// Loads configuration from `AUCTION_REP_*` environment variables, then
/// layers `cli` on top so that any flag the operator actually passed wins.
///
/// # Errors
/// Returns an error if `guid` is missing from both sources, or if neither
/// an HTTP nor a NATS address was configured.
pub fn get(cli: Cli) -> eyre::Result<Config> {
    let config: Config = Figment::new()
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::defaults(cli))
        .extract()?;
    config.validate()
}
