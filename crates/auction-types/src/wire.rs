use std::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    AuctionRules,
    Instance,
};

/// One representative's answer to a `Vote` fan-out.
///
/// Carries its own error rather than using `Result` on the wire: a pool
/// client fans this out to many representatives and must be able to report
/// a per-representative failure (insufficient resources, timeout, decode
/// failure) without losing the identity of who failed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoteResult {
    #[serde(rename = "r")]
    pub rep: String,
    #[serde(rename = "s")]
    pub score: f64,
    #[serde(rename = "e", default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl VoteResult {
    #[must_use]
    pub fn ok(rep: impl Into<String>, score: f64) -> Self {
        Self {
            rep: rep.into(),
            score,
            error: String::new(),
        }
    }

    #[must_use]
    pub fn err(rep: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            rep: rep.into(),
            score: 0.0,
            error: error.into(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }
}

/// A request to run one auction, as dispatched over the remote-auctioneer
/// subject.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuctionRequest {
    #[serde(rename = "i")]
    pub instance: Instance,
    #[serde(rename = "rg")]
    pub rep_guids: Vec<String>,
    #[serde(rename = "r")]
    pub rules: AuctionRules,
}

/// The outcome of one auction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuctionResult {
    #[serde(rename = "i")]
    pub instance: Instance,
    /// Empty when the auction failed to place the instance within
    /// `rules.max_rounds`.
    #[serde(rename = "w")]
    pub winner: String,
    #[serde(rename = "nr")]
    pub num_rounds: u32,
    #[serde(rename = "nv")]
    pub num_votes: u32,
    #[serde(rename = "d")]
    pub duration: DurationNanos,
}

impl AuctionResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.winner.is_empty()
    }
}

/// `Duration` serialized as whole nanoseconds, matching the wire contract's
/// `d` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationNanos(u64);

impl From<Duration> for DurationNanos {
    fn from(value: Duration) -> Self {
        Self(u64::try_from(value.as_nanos()).unwrap_or(u64::MAX))
    }
}

impl From<DurationNanos> for Duration {
    fn from(value: DurationNanos) -> Self {
        Duration::from_nanos(value.0)
    }
}
